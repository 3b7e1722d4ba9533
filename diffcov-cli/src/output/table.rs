//! Table output formatting using the `tabled` crate

use super::OutputConfig;
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment, Modify, Width},
    Table,
};

/// Table output formatter
pub struct TableOutput;

impl TableOutput {
    /// Two-column table with the keys right-aligned.
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();
        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();
        table.with(Modify::new(Columns::first()).with(Alignment::right()));
        finish(table, config)
    }

    /// Table with a header row. Columns in `right_aligned` hold numbers.
    pub fn from_rows(
        headers: &[&str],
        rows: &[Vec<String>],
        right_aligned: &[usize],
        config: &OutputConfig,
    ) -> String {
        if rows.is_empty() {
            return "(no results)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());
        for row in rows {
            builder.push_record(row.iter().map(String::as_str));
        }

        let mut table = builder.build();
        for &column in right_aligned {
            table.with(Modify::new(Columns::single(column)).with(Alignment::right()));
        }
        finish(table, config)
    }
}

fn finish(mut table: Table, config: &OutputConfig) -> String {
    if config.compact {
        table.with(Style::blank());
    } else {
        table.with(Style::rounded());
    }
    if config.should_truncate() {
        table.with(Width::wrap(config.effective_width()));
    }
    table.to_string()
}

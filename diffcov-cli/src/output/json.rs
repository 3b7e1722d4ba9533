//! JSON output formatting for machine-readable output.

use super::OutputConfig;
use serde::Serialize;

/// JSON output formatter
pub struct JsonOutput;

impl JsonOutput {
    /// Format data as JSON string
    ///
    /// Uses pretty-printing by default. When `config.compact` is true,
    /// outputs minified JSON on a single line.
    pub fn format<T: Serialize + ?Sized>(data: &T, config: &OutputConfig) -> String {
        if config.compact {
            serde_json::to_string(data).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string_pretty(data)
                .unwrap_or_else(|e| format!("{{\n  \"error\": \"{}\"\n}}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[derive(Serialize)]
    struct Totals {
        covered_lines: u64,
        coverage_percent: Option<f64>,
    }

    #[test]
    fn test_format_pretty() {
        let data = Totals {
            covered_lines: 3,
            coverage_percent: Some(75.0),
        };
        let config = OutputConfig::plain(OutputFormat::Json);
        let output = JsonOutput::format(&data, &config);

        assert!(output.contains("\"covered_lines\": 3"));
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact_null_percent() {
        let data = Totals {
            covered_lines: 0,
            coverage_percent: None,
        };
        let mut config = OutputConfig::plain(OutputFormat::Json);
        config.compact = true;

        assert_eq!(
            JsonOutput::format(&data, &config),
            r#"{"covered_lines":0,"coverage_percent":null}"#
        );
    }
}

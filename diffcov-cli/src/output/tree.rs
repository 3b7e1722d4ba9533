//! Tree output formatting for hierarchical display.
//!
//! Renders a pre-order node list like the `tree` command, with Unicode
//! box-drawing characters for visual hierarchy.

use super::OutputConfig;
use colored::Colorize;

/// Tree branch characters
struct TreeChars {
    /// Vertical line for continuing branches (|)
    pipe: &'static str,
    /// Branch for non-last items (|-)
    branch: &'static str,
    /// Branch for last item in a level (L-)
    last: &'static str,
    /// Spacing for items under last branch
    space: &'static str,
}

impl TreeChars {
    const UNICODE: TreeChars = TreeChars {
        pipe: "\u{2502}   ",                 // |
        branch: "\u{251c}\u{2500}\u{2500} ", // |--
        last: "\u{2514}\u{2500}\u{2500} ",   // L--
        space: "    ",
    };

    const ASCII: TreeChars = TreeChars {
        pipe: "|   ",
        branch: "|-- ",
        last: "`-- ",
        space: "    ",
    };

    /// Box-drawing characters need a color-capable terminal.
    fn get(config: &OutputConfig) -> &'static TreeChars {
        if config.use_colors() {
            &Self::UNICODE
        } else {
            &Self::ASCII
        }
    }
}

/// One line of tree output.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub label: String,
    /// Trailing detail, dimmed when colors are on.
    pub detail: String,
    /// Distance from the root; nodes are given in pre-order.
    pub depth: usize,
    /// Whether the node has children (drawn bold).
    pub is_branch: bool,
}

/// Tree output formatter
pub struct TreeOutput;

impl TreeOutput {
    /// Render pre-order `nodes` (root first) as an indented tree.
    pub fn from_nodes(nodes: &[TreeNode], config: &OutputConfig) -> String {
        let chars = TreeChars::get(config);
        let use_colors = config.use_colors();
        let mut lines = Vec::with_capacity(nodes.len());
        // for each open ancestor level: whether it was the last sibling
        let mut open: Vec<bool> = Vec::new();

        for (i, node) in nodes.iter().enumerate() {
            let label = if use_colors && node.is_branch {
                node.label.bold().to_string()
            } else {
                node.label.clone()
            };
            let detail = if use_colors {
                node.detail.dimmed().to_string()
            } else {
                node.detail.clone()
            };

            if node.depth == 0 {
                open.clear();
                lines.push(format!("{} {}", label, detail));
                continue;
            }

            open.truncate(node.depth - 1);
            let mut prefix = String::new();
            for &ancestor_last in &open {
                prefix.push_str(if ancestor_last { chars.space } else { chars.pipe });
            }

            let is_last = Self::is_last_sibling(nodes, i);
            let connector = if is_last { chars.last } else { chars.branch };
            lines.push(format!("{}{}{} {}", prefix, connector, label, detail));
            open.push(is_last);
        }

        lines.join("\n")
    }

    /// No later sibling follows before the parent's subtree ends.
    fn is_last_sibling(nodes: &[TreeNode], index: usize) -> bool {
        let depth = nodes[index].depth;
        nodes[index + 1..]
            .iter()
            .take_while(|n| n.depth >= depth)
            .all(|n| n.depth != depth)
    }
}

/*!
 * CLI style helpers
 *
 * Colors, icons and table presets shared by every subcommand.
 */

use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

/// Colors for consistent styling
pub struct Theme;

impl Theme {
    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }
}

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const ARROW_RIGHT: &'static str = "→";
}

/// Create a styled data table with the given header row
pub fn create_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// Cell for a call status: green on 200, red when the node was unreachable
pub fn status_cell(status: u16) -> Cell {
    let cell = Cell::new(status);
    match status {
        200 => cell.fg(Color::Green),
        0 => cell.fg(Color::Red),
        _ => cell.fg(Color::Yellow),
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
}

pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING),
        Theme::warning(message)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_header() {
        let mut table = create_table(&["Cluster", "Node"]);
        table.add_row(vec!["eu", "mx1"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Cluster"));
        assert!(rendered.contains("mx1"));
    }

    #[test]
    fn test_status_cell_content() {
        let mut table = create_table(&["Status"]);
        table.add_row(vec![status_cell(0), status_cell(200), status_cell(503)]);
        let rendered = table.to_string();
        assert!(rendered.contains("503"));
    }
}

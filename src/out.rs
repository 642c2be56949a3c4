//! Text styling used for everything a session writes.

use colored::{Color, Colorize};

/// Paint `text` with `color`. Respects the global `colored` override.
pub fn colorize(text: impl AsRef<str>, color: Color) -> String {
    text.as_ref().color(color).to_string()
}

/// Render `text` as a large boxed banner with spaced upper-case letters.
pub fn banner(text: &str) -> String {
    let body: String = text
        .to_uppercase()
        .chars()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let width = body.chars().count() + 4;
    let rule = format!("+{}+", "=".repeat(width));
    let pad = format!("|{}|", " ".repeat(width));
    format!("{rule}\n{pad}\n|  {body}  |\n{pad}\n{rule}")
}

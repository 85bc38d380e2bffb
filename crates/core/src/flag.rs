//! Loose boolean parsing shared by query strings and spreadsheet cells.

/// Parse a yes/no style flag, case-insensitively and ignoring surrounding
/// whitespace.
///
/// ```text
/// true:   1  true   yes  y  on
/// false:  0  false  no   n  off  (empty)
/// ```
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "" | "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

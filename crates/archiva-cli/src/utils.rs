//! Utility functions for Archiva CLI

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dialoguer::Password;
use std::io::{BufRead, IsTerminal};

/// Format a datetime for display
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Read a password: a masked prompt on a terminal, otherwise one line of stdin
pub fn read_password(prompt: &str) -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .context("Failed to read password");
    }

    read_password_line(stdin.lock())
}

/// First line of `reader` without its line terminator
pub fn read_password_line<R: BufRead>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Show a placeholder for empty values in text output
pub fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(format_datetime(&dt), "2024-03-09 07:05:00");
    }

    #[test]
    fn test_piped_password_reads_first_line_only() {
        let input = std::io::Cursor::new("s3cret pass\r\nsecond line\n");
        assert_eq!(read_password_line(input).unwrap(), "s3cret pass");

        let input = std::io::Cursor::new("no-newline");
        assert_eq!(read_password_line(input).unwrap(), "no-newline");

        // trailing spaces belong to the password
        let input = std::io::Cursor::new("pad \n");
        assert_eq!(read_password_line(input).unwrap(), "pad ");
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(""), "-");
        assert_eq!(or_dash("jdoe"), "jdoe");
    }
}

//! Progress output for the revendor CLI.

use camino::Utf8Path;
use std::io::Write;

/// Writes one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Formats the closing message of an update run.
#[must_use]
pub fn success_message(count: usize, vendor_dir: &Utf8Path) -> String {
    let plural = if count == 1 { "library" } else { "libraries" };
    format!("Vendored {count} {plural} into {vendor_dir}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::singular(1, "1 library")]
    #[case::plural(7, "7 libraries")]
    fn success_message_pluralises_correctly(#[case] count: usize, #[case] expected: &str) {
        let msg = success_message(count, Utf8Path::new("src/pip/_vendor"));
        assert!(msg.contains(expected));
        assert!(msg.ends_with("src/pip/_vendor"));
    }

    #[rstest]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "Cleaning vendor directory...");
        assert_eq!(buffer, b"Cleaning vendor directory...\n");
    }
}

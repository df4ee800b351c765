//! Output formatting for the sitesync CLI.
//!
//! Progress lines go to an injected writer (stderr in production) so that
//! orchestration code can be exercised against an in-memory buffer.

use camino::Utf8Path;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format the summary printed after a fresh installation.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use sitesync_installer::output::installed_message;
///
/// let msg = installed_message("v1.2.0", 3, Utf8Path::new("/srv/site"));
/// assert_eq!(msg, "Installed release v1.2.0 (3 files) to /srv/site");
/// ```
#[must_use]
pub fn installed_message(tag: &str, file_count: usize, content_root: &Utf8Path) -> String {
    let plural = if file_count == 1 { "file" } else { "files" };
    format!("Installed release {tag} ({file_count} {plural}) to {content_root}")
}

/// Format the summary printed after plugin bundles were overlaid.
#[must_use]
pub fn overlay_message(bundle_count: usize) -> String {
    let plural = if bundle_count == 1 { "bundle" } else { "bundles" };
    format!("Loaded {bundle_count} plugin {plural} into the manifest")
}

/// Format the banner printed once the server accepts connections.
#[must_use]
pub fn serving_message(url: &str, content_root: &Utf8Path) -> String {
    format!("Serving {content_root} at {url}\nPress Enter to stop the server.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::singular(1, "(1 file)")]
    #[case::plural(12, "(12 files)")]
    fn installed_message_pluralises_correctly(#[case] count: usize, #[case] expected: &str) {
        let msg = installed_message("v1", count, Utf8Path::new("/tmp/site"));
        assert!(msg.contains(expected), "message: {msg}");
    }

    #[rstest]
    #[case::none(0, "0 plugin bundles")]
    #[case::singular(1, "1 plugin bundle into")]
    fn overlay_message_pluralises_correctly(#[case] count: usize, #[case] expected: &str) {
        assert!(overlay_message(count).contains(expected));
    }

    #[test]
    fn serving_message_mentions_url_and_stop_hint() {
        let msg = serving_message("http://127.0.0.1:8080/", Utf8Path::new("site"));
        assert!(msg.contains("http://127.0.0.1:8080/"));
        assert!(msg.contains("Press Enter"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}

//! Mirror file naming.
//!
//! Page files are `{sequence_id}-{sanitized name}.{page}.png` inside the
//! bucket directory, so a plain directory listing sorts by sequence id and
//! the id prefix survives renames.

/// Sidecar ledger file, one per bucket directory. The `0` prefix keeps it at
/// the top of directory listings, ahead of the page files.
pub const LEDGER_FILE_NAME: &str = "0info.txt";

/// Replace runs of filesystem-hostile characters with a single `_`.
///
/// The set matches what the upstream system strips from document names:
/// `/ \ ? % * : | " < >`.
pub fn sanitize_display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if matches!(c, '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>') {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// File-name prefix shared by every page of an entry.
pub fn entry_prefix(sequence_id: u64) -> String {
    format!("{sequence_id}-")
}

/// File name of one rasterized page.
pub fn page_file_name(sequence_id: u64, display_name: &str, page: usize) -> String {
    format!(
        "{sequence_id}-{}.{page}.png",
        sanitize_display_name(display_name)
    )
}

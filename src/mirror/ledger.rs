//! The per-bucket sidecar ledger.
//!
//! A line-oriented text file mapping sequence id to display name:
//!
//! ```text
//! 5: Invoice March
//! 6: Receipt
//! ```
//!
//! Users edit it to rename documents; the engine re-reads it on change and
//! pushes the edits back to the remote source. Writes always merge with the
//! on-disk content so ids absent from the current batch survive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::paths::LEDGER_FILE_NAME;

/// Parse ledger text. Lines are `{sequence_id}: {name}`; anything without a
/// leading integer and colon is ignored, so stray user edits don't poison the
/// whole file.
pub fn parse(text: &str) -> BTreeMap<u64, String> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some((id, rest)) = line.split_once(':') else {
            continue;
        };
        let id = id.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(id) = id.parse::<u64>() else {
            continue;
        };
        let name = rest.strip_prefix(' ').unwrap_or(rest);
        out.insert(id, name.to_string());
    }
    out
}

/// Render a ledger map back to text, ids ascending. Names are flattened onto
/// one line since the format is line-oriented.
pub fn render(map: &BTreeMap<u64, String>) -> String {
    let mut out = String::new();
    for (id, name) in map {
        let name = name.replace(['\r', '\n'], " ");
        out.push_str(&format!("{id}: {name}\n"));
    }
    out
}

/// Path of the ledger inside a bucket directory.
pub fn ledger_path(bucket_dir: &Path) -> PathBuf {
    bucket_dir.join(LEDGER_FILE_NAME)
}

/// Read and parse a bucket's ledger. A missing file is an empty ledger; an
/// unreadable one is logged and also treated as empty.
pub async fn load(bucket_dir: &Path) -> BTreeMap<u64, String> {
    let path = ledger_path(bucket_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => parse(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read ledger, treating as empty");
            BTreeMap::new()
        }
    }
}

/// Merge `updates` into the bucket's on-disk ledger and write it back.
///
/// Keys already on disk but absent from `updates` are preserved; keys present
/// in both take the updated name.
pub async fn merge_write(
    bucket_dir: &Path,
    updates: &BTreeMap<u64, String>,
) -> std::io::Result<PathBuf> {
    let mut merged = load(bucket_dir).await;
    for (id, name) in updates {
        merged.insert(*id, name.clone());
    }
    let path = ledger_path(bucket_dir);
    tokio::fs::write(&path, render(&merged)).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(u64, &str)]) -> BTreeMap<u64, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("faxmirror-ledger-tests").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parse_reads_id_colon_name_lines() {
        let parsed = parse("5: Invoice\n6: Receipt\n");
        assert_eq!(parsed, map(&[(5, "Invoice"), (6, "Receipt")]));
    }

    #[test]
    fn parse_ignores_unmatched_lines() {
        let parsed = parse("# comment\n\n5: Invoice\nnot a line\n-3: negative\nx7: nope\n");
        assert_eq!(parsed, map(&[(5, "Invoice")]));
    }

    #[test]
    fn parse_keeps_colons_inside_names() {
        let parsed = parse("5: Invoice: March\n");
        assert_eq!(parsed, map(&[(5, "Invoice: March")]));
    }

    #[test]
    fn parse_handles_crlf() {
        let parsed = parse("5: Invoice\r\n6: Receipt\r\n");
        assert_eq!(parsed, map(&[(5, "Invoice"), (6, "Receipt")]));
    }

    #[test]
    fn render_round_trips_exact_decimal_ids() {
        let original = map(&[(5, "Invoice"), (u64::MAX, "huge")]);
        let text = render(&original);
        assert!(text.contains("18446744073709551615: huge\n"));
        assert_eq!(parse(&text), original);
    }

    #[test]
    fn render_flattens_embedded_newlines() {
        let text = render(&map(&[(5, "two\nlines")]));
        assert_eq!(text, "5: two lines\n");
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = test_dir("missing");
        assert!(load(&dir).await.is_empty());
    }

    #[tokio::test]
    async fn merge_preserves_unrelated_ids() {
        let dir = test_dir("merge-preserve");
        std::fs::write(ledger_path(&dir), "5: Invoice\n").unwrap();

        merge_write(&dir, &map(&[(6, "Receipt")])).await.unwrap();

        let merged = load(&dir).await;
        assert_eq!(merged, map(&[(5, "Invoice"), (6, "Receipt")]));
    }

    #[tokio::test]
    async fn merge_lets_the_batch_win_on_conflict() {
        let dir = test_dir("merge-conflict");
        std::fs::write(ledger_path(&dir), "5: Old Name\n").unwrap();

        merge_write(&dir, &map(&[(5, "New Name")])).await.unwrap();

        assert_eq!(load(&dir).await, map(&[(5, "New Name")]));
    }
}

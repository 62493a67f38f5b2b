use clap::Parser;

use crate::types::LogLevel;

/// Mirror a remote fax inbox into a local directory tree.
///
/// Documents appear as rasterized PNG pages under one directory per receive
/// date; renaming a document in a bucket's `0info.txt` renames it remotely.
#[derive(Debug, Parser)]
#[command(name = "faxmirror", version)]
pub struct Cli {
    /// Base URL of the inbox gateway.
    #[arg(long, env = "FAXMIRROR_BASE_URL")]
    pub base_url: String,

    /// Gateway account name.
    #[arg(long, short = 'u', env = "FAXMIRROR_USERNAME")]
    pub username: String,

    /// Gateway password. Prompted interactively when omitted.
    #[arg(long, env = "FAXMIRROR_PASSWORD")]
    pub password: Option<String>,

    /// Mirror root directory.
    #[arg(long, short = 'd', default_value = "~/fax")]
    pub directory: String,

    /// Seconds between listing polls.
    #[arg(long, default_value_t = 30)]
    pub poll_interval: u64,

    /// Milliseconds to let a ledger write settle before re-reading it.
    #[arg(long, default_value_t = 100)]
    pub debounce_ms: u64,

    /// Fixed start of the listing window, YYYYMMDD. Defaults to today, so
    /// only the current day's documents are mirrored.
    #[arg(long)]
    pub start_date: Option<String>,

    /// Run the initial population pass and exit instead of staying resident.
    #[arg(long)]
    pub once: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_apply() {
        let cli = Cli::try_parse_from(["faxmirror", "--base-url", "http://gw", "-u", "office"])
            .unwrap();
        assert_eq!(cli.poll_interval, 30);
        assert_eq!(cli.debounce_ms, 100);
        assert_eq!(cli.directory, "~/fax");
        assert!(!cli.once);
        assert_eq!(cli.log_level, LogLevel::Info);
    }
}

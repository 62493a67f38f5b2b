use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;

use crate::cli::Cli;
use crate::types::LogLevel;

/// Validated runtime configuration.
pub struct Config {
    pub base_url: String,
    pub username: String,
    pub password: Option<String>,
    pub directory: PathBuf,
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub start_date: Option<NaiveDate>,
    pub once: bool,
    pub log_level: LogLevel,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("directory", &self.directory)
            .field("poll_interval", &self.poll_interval)
            .field("start_date", &self.start_date)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        if cli.poll_interval == 0 {
            anyhow::bail!("--poll-interval must be at least 1 second");
        }
        let start_date = cli
            .start_date
            .as_deref()
            .map(parse_bucket_date)
            .transpose()?;
        Ok(Self {
            base_url: cli.base_url,
            username: cli.username,
            password: cli.password,
            directory: expand_tilde(&cli.directory),
            poll_interval: Duration::from_secs(cli.poll_interval),
            debounce: Duration::from_millis(cli.debounce_ms),
            start_date,
            once: cli.once,
            log_level: cli.log_level,
        })
    }
}

fn parse_bucket_date(text: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y%m%d")
        .with_context(|| format!("invalid date '{text}', expected YYYYMMDD"))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["faxmirror", "--base-url", "http://gw", "-u", "office"];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn start_date_parses_bucket_format() {
        let config = Config::from_cli(cli(&["--start-date", "20231201"])).unwrap();
        assert_eq!(
            config.start_date,
            Some(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap())
        );
    }

    #[test]
    fn bad_start_date_is_rejected() {
        assert!(Config::from_cli(cli(&["--start-date", "2023-12-01"])).is_err());
        assert!(Config::from_cli(cli(&["--start-date", "tomorrow"])).is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(Config::from_cli(cli(&["--poll-interval", "0"])).is_err());
    }

    #[test]
    fn non_tilde_paths_pass_through() {
        assert_eq!(expand_tilde("/srv/fax"), PathBuf::from("/srv/fax"));
        assert_eq!(expand_tilde("relative/fax"), PathBuf::from("relative/fax"));
    }

    #[test]
    fn debug_redacts_password() {
        let mut parsed = cli(&[]);
        parsed.password = Some("hunter2".into());
        let config = Config::from_cli(parsed).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}

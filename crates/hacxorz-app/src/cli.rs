//! CLI argument definitions for the HacXorZ terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// HacXorZ: a terminal chat client with confidence-scored replies.
#[derive(Parser, Debug)]
#[command(name = "hacxorz", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory for the SQLite session store.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Owner identity that scopes the session history.
    #[arg(short = 'u', long = "owner")]
    pub owner: Option<String>,

    /// Use the local offline engine instead of the configured provider.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Do not start the periodic nudge rotation.
    #[arg(long = "no-nudges")]
    pub no_nudges: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HACXORZ_CONFIG env var > ~/.hacxorz/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HACXORZ_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory. `None` means use the config value.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Resolve the log level filter.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Resolve the owner identity.
    ///
    /// Priority: --owner flag > config file value > $USER.
    /// Returns `None` when nothing names an owner.
    pub fn resolve_owner(&self, config_owner: &str) -> Option<String> {
        if let Some(ref owner) = self.owner {
            return Some(owner.clone());
        }
        if !config_owner.trim().is_empty() {
            return Some(config_owner.trim().to_string());
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|u| !u.is_empty())
    }

    /// Resolve the inference provider name.
    pub fn resolve_provider(&self, config_provider: &str) -> String {
        if self.offline {
            "offline".to_string()
        } else {
            config_provider.to_string()
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    home_dir()
        .map(|home| home.join(".hacxorz").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("hacxorz").chain(args.iter().copied()))
    }

    #[test]
    fn test_explicit_config_wins() {
        let args = parse(&["--config", "/tmp/custom.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_log_level_precedence() {
        assert_eq!(parse(&[]).resolve_log_level("warn"), "warn");
        assert_eq!(parse(&["-l", "debug"]).resolve_log_level("warn"), "debug");
    }

    #[test]
    fn test_owner_precedence() {
        assert_eq!(
            parse(&["--owner", "alice"]).resolve_owner("bob").as_deref(),
            Some("alice")
        );
        assert_eq!(parse(&[]).resolve_owner(" bob ").as_deref(), Some("bob"));
    }

    #[test]
    fn test_offline_overrides_provider() {
        assert_eq!(parse(&["--offline"]).resolve_provider("sentiment"), "offline");
        assert_eq!(parse(&[]).resolve_provider("sentiment"), "sentiment");
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/var/lib/hacxorz"), PathBuf::from("/var/lib/hacxorz"));
        assert_eq!(expand_home("data"), PathBuf::from("data"));
    }
}

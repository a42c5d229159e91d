// Application configuration, loaded from environment variables and CLI flags.

use std::time::Duration;

use crate::random::RANDOM_ORG_URL;
use crate::roster::DEFAULT_MAX_SESSIONS;

/// Where battle draws come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomSourceKind {
    Local,
    RandomOrg,
}

impl RandomSourceKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "random_org" | "random.org" => Some(Self::RandomOrg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    pub random_source: RandomSourceKind,
    pub random_org_url: String,
    pub random_org_timeout: Duration,
    /// Cap on concurrently open battle sessions.
    pub max_sessions: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite:meal_max.db?mode=rwc".to_string(),
            port: 5000,
            random_source: RandomSourceKind::Local,
            random_org_url: RANDOM_ORG_URL.to_string(),
            random_org_timeout: Duration::from_secs(5),
            max_sessions: DEFAULT_MAX_SESSIONS,
            log_format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:meal_max.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 5000)
    /// - `RANDOM_SOURCE` - `local` or `random_org` (default: `local`)
    /// - `RANDOM_ORG_URL` - random.org decimal-fraction endpoint
    /// - `RANDOM_ORG_TIMEOUT_SECS` - request timeout (default: 5)
    /// - `MAX_SESSIONS` - open battle session cap (default: 1024)
    /// - `LOG_FORMAT` - `compact` or `json`
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--random-source <SOURCE>` - Override the random source
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        let database_url = env("DATABASE_URL").unwrap_or(defaults.database_url);

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let random_source = Self::parse_cli_value(args, "--random-source")
            .or_else(|| env("RANDOM_SOURCE"))
            .map(|v| {
                RandomSourceKind::parse(&v).unwrap_or_else(|| {
                    tracing::warn!("Unknown random source '{v}', using local RNG");
                    RandomSourceKind::Local
                })
            })
            .unwrap_or(defaults.random_source);

        let random_org_url = env("RANDOM_ORG_URL").unwrap_or(defaults.random_org_url);

        let random_org_timeout = env("RANDOM_ORG_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.random_org_timeout);

        let max_sessions = env("MAX_SESSIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_sessions);

        let log_format = match env("LOG_FORMAT") {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => defaults.log_format,
        };

        Config {
            database_url,
            port,
            random_source,
            random_org_url,
            random_org_timeout,
            max_sessions,
            log_format,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

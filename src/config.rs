use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{AccessToken, Credentials, DEFAULT_IDP_URL};
use crate::error::CatalysisError;
use crate::http_client::DEFAULT_API_URL;
use crate::operations::{
    parse_date, Resolution, DEFAULT_ALERTS_PAGE_SIZE, DEFAULT_EVENTS_PAGE_SIZE,
};

/// Petivity API client
///
/// Credentials are read from PETIVITY_JWT, PETIVITY_CLIENT_ID and PETIVITY_REFRESH_TOKEN.
#[derive(Parser, Debug)]
#[command(name = "catalysis", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Log level for diagnostics on stderr (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// GraphQL API endpoint
    #[arg(long, env = "PETIVITY_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Identity provider endpoint used for token renewal
    #[arg(long, env = "PETIVITY_IDP_URL", default_value = DEFAULT_IDP_URL, global = true)]
    pub idp_url: String,

    /// Directory holding the GraphQL query documents
    #[arg(long, env = "PETIVITY_QUERIES_DIR", default_value = "queries", global = true)]
    pub queries_dir: String,

    /// HTTP request timeout in seconds (transport default when unset)
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", global = true)]
    pub http_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Render the request instead of sending it
#[derive(Args, Debug, Clone, Copy, PartialEq, Default)]
pub struct DryRun {
    /// Print what would be sent, with secrets truncated, and exit without network I/O
    #[arg(
        long = "dry-run",
        env = "DRY_RUN",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub enabled: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch the household overview (cats, machines, recent events)
    Status {
        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Fetch aggregated weight for a cat (defaults to the last 7 days by DAY)
    Weight {
        cat_id: String,
        #[arg(value_parser = parse_date)]
        start_date: Option<NaiveDate>,
        #[arg(value_parser = parse_date)]
        end_date: Option<NaiveDate>,
        #[arg(value_enum, default_value_t = Resolution::Day)]
        resolution: Resolution,
        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Fetch paginated alerts for a cat
    Alerts {
        cat_id: String,
        #[arg(value_parser = parse_date)]
        start_date: NaiveDate,
        #[arg(value_parser = parse_date)]
        end_date: NaiveDate,
        #[arg(default_value_t = DEFAULT_ALERTS_PAGE_SIZE)]
        page_size: u32,
        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Compare a cat's insights between a current and a previous period
    Insights {
        cat_id: String,
        #[arg(value_parser = parse_date)]
        current_start: NaiveDate,
        #[arg(value_parser = parse_date)]
        current_end: NaiveDate,
        #[arg(value_parser = parse_date)]
        previous_start: NaiveDate,
        #[arg(value_parser = parse_date)]
        previous_end: NaiveDate,
        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Fetch paginated event history between two RFC 3339 datetimes
    Events {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        #[arg(default_value_t = DEFAULT_EVENTS_PAGE_SIZE)]
        page_size: u32,
        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Force a token renewal and print the new access token
    ///
    /// The token is printed in full on stdout so it can be exported or piped;
    /// diagnostics on stderr only ever show its preview.
    Refresh {
        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Show the current token's claims and freshness without renewing
    TokenInfo,

    /// Overview plus latest weight for every cat, condensed
    Summary {
        #[command(flatten)]
        dry_run: DryRun,
    },

    /// Verify query documents and credential variables without network I/O
    Check,
}

impl Command {
    pub fn is_dry_run(&self) -> bool {
        match self {
            Command::Status { dry_run }
            | Command::Weight { dry_run, .. }
            | Command::Alerts { dry_run, .. }
            | Command::Insights { dry_run, .. }
            | Command::Events { dry_run, .. }
            | Command::Refresh { dry_run }
            | Command::Summary { dry_run } => dry_run.enabled,
            Command::TokenInfo | Command::Check => false,
        }
    }

    /// Environment variables that must be set before this command runs
    pub fn required_env(&self) -> &'static [&'static str] {
        match self {
            Command::Refresh { .. } => &[Credentials::CLIENT_ID_VAR, Credentials::REFRESH_TOKEN_VAR],
            Command::Check => &[],
            _ => &[Credentials::ACCESS_TOKEN_VAR],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub idp_url: String,
    pub queries_dir: PathBuf,
    pub http_timeout: Option<Duration>,
    pub log_level: String,
    pub credentials: Credentials,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Ok(Self::from_args(args, Credentials::from_env()))
    }

    pub fn from_args(args: CliArgs, credentials: Credentials) -> (Self, Command) {
        let config = Config {
            api_url: args.api_url,
            idp_url: args.idp_url,
            queries_dir: expand_tilde(&args.queries_dir),
            http_timeout: args.http_timeout.map(Duration::from_secs),
            log_level: args.log_level,
            credentials,
        };

        (config, args.command)
    }

    /// Fail before any network activity if `command` lacks its inputs
    pub fn validate_for(&self, command: &Command) -> std::result::Result<(), CatalysisError> {
        let missing: Vec<&str> = command
            .required_env()
            .iter()
            .copied()
            .filter(|var| !self.has_credential(var))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(CatalysisError::Configuration(format!(
            "{} must be set in the environment",
            missing.join(", ")
        )))
    }

    fn has_credential(&self, var: &str) -> bool {
        let creds = &self.credentials;
        match var {
            Credentials::ACCESS_TOKEN_VAR => creds.access_token.is_some(),
            Credentials::CLIENT_ID_VAR => creds.client_id.is_some(),
            Credentials::REFRESH_TOKEN_VAR => creds.refresh_token.is_some(),
            _ => false,
        }
    }

    pub fn access_token(&self) -> std::result::Result<AccessToken, CatalysisError> {
        self.credentials.access_token.clone().ok_or_else(|| {
            CatalysisError::Configuration(format!(
                "{} must be set in the environment",
                Credentials::ACCESS_TOKEN_VAR
            ))
        })
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

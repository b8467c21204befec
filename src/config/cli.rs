use crate::domain::model::{RawTimeRange, ScopedVars, TextValuePair, TimeRange};
use crate::utils::error::{DataSourceError, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// 相對時間範圍的上限：十年
pub const MAX_HOURS: i64 = 24 * 366 * 10;

#[derive(Debug, Clone, Parser)]
#[command(name = "json-datasource")]
#[command(about = "Talk to a simple JSON backend the way a dashboard data source does")]
pub struct CliConfig {
    #[arg(long, short, default_value = "datasource.toml", help = "Path to the TOML configuration")]
    pub config: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check that the backend answers with HTTP 200
    Test,

    /// Send query targets to /query
    Query {
        #[arg(long = "target", required = true)]
        targets: Vec<String>,

        /// Scoped variable, NAME=VALUE
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        #[command(flatten)]
        time: TimeArgs,
    },

    /// Run a metric-find query against /search
    Search {
        query: String,

        #[arg(long = "type")]
        kind: Option<String>,
    },

    /// Fetch tag keys from /tag-keys
    TagKeys {
        /// JSON options body
        #[arg(long)]
        body: Option<String>,
    },

    /// Fetch tag values from /tag-values
    TagValues {
        /// JSON options body, e.g. '{"key":"City"}'
        #[arg(long)]
        body: String,
    },

    /// Run an annotation query against /annotations
    Annotations {
        #[arg(long)]
        name: String,

        #[arg(long)]
        text: String,

        #[arg(long)]
        icon_color: Option<String>,

        #[command(flatten)]
        time: TimeArgs,
    },

    /// Print the current template variable snapshot
    Variables,

    /// Interpolate a pattern as JSON and strip surrounding quotes
    CleanMatch { pattern: String },
}

#[derive(Debug, Clone, Args)]
pub struct TimeArgs {
    /// Absolute start (RFC 3339); requires --to
    #[arg(long, requires = "to")]
    pub from: Option<DateTime<Utc>>,

    /// Absolute end (RFC 3339); requires --from
    #[arg(long, requires = "from")]
    pub to: Option<DateTime<Utc>>,

    /// Relative range ending now, in hours
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(i64).range(1..=MAX_HOURS))]
    pub hours: i64,
}

impl TimeArgs {
    pub fn range(&self) -> Result<(TimeRange, RawTimeRange)> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            return Ok((
                TimeRange { from, to },
                RawTimeRange {
                    from: from.to_rfc3339(),
                    to: to.to_rfc3339(),
                },
            ));
        }

        let range = Duration::try_hours(self.hours)
            .filter(|_| (1..=MAX_HOURS).contains(&self.hours))
            .and_then(TimeRange::last)
            .ok_or_else(|| DataSourceError::InvalidConfigValueError {
                field: "hours".to_string(),
                value: self.hours.to_string(),
                reason: format!("Value must be between 1 and {}", MAX_HOURS),
            })?;

        Ok((
            range,
            RawTimeRange {
                from: format!("now-{}h", self.hours),
                to: "now".to_string(),
            },
        ))
    }
}

pub fn scoped_vars(vars: &[(String, String)]) -> ScopedVars {
    vars.iter()
        .map(|(name, value)| {
            (
                name.clone(),
                TextValuePair::new(value.as_str(), value.as_str()),
            )
        })
        .collect()
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    Ok((key.to_string(), value.to_string()))
}

// Fixed GraphQL operations and their query documents

use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{CatalysisError, Result};
use crate::graphql::GraphQlRequest;

/// Days of history the weight operation covers by default
pub const WEIGHT_WINDOW_DAYS: i64 = 7;

pub const DEFAULT_ALERTS_PAGE_SIZE: u32 = 20;
pub const DEFAULT_EVENTS_PAGE_SIZE: u32 = 50;

/// Bucket size for aggregated weight data
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum Resolution {
    Hour,
    Day,
    Week,
    Month,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hour => "HOUR",
            Resolution::Day => "DAY",
            Resolution::Week => "WEEK",
            Resolution::Month => "MONTH",
        }
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(CatalysisError::Configuration(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending on `end`
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }
}

/// One of the API operations this tool knows how to send
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Household overview: cats, machines, recent events
    Status,

    Weight {
        cat_id: String,
        range: DateRange,
        resolution: Resolution,
    },

    Alerts {
        cat_id: String,
        range: DateRange,
        page_size: u32,
    },

    Insights {
        cat_id: String,
        current: DateRange,
        previous: DateRange,
    },

    Events {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        page_size: u32,
    },
}

impl Operation {
    pub fn document(&self) -> &'static str {
        match self {
            Operation::Status => "status.graphql",
            Operation::Weight { .. } => "cat-weight.graphql",
            Operation::Alerts { .. } => "cat-alerts.graphql",
            Operation::Insights { .. } => "cat-insights.graphql",
            Operation::Events { .. } => "event-history.graphql",
        }
    }

    pub fn operation_name(&self) -> &'static str {
        match self {
            Operation::Status => "GetStatus",
            Operation::Weight { .. } => "GetCatWeight",
            Operation::Alerts { .. } => "GetCatAlerts",
            Operation::Insights { .. } => "GetCatInsights",
            Operation::Events { .. } => "GetEventHistory",
        }
    }

    /// Variables other than the token
    pub fn variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        let mut put = |key: &str, value: Value| {
            vars.insert(key.to_string(), value);
        };

        match self {
            Operation::Status => {}
            Operation::Weight {
                cat_id,
                range,
                resolution,
            } => {
                put("catId", cat_id.as_str().into());
                put("startDate", range.start.to_string().into());
                put("endDate", range.end.to_string().into());
                put("resolution", resolution.as_str().into());
            }
            Operation::Alerts {
                cat_id,
                range,
                page_size,
            } => {
                put("catId", cat_id.as_str().into());
                put("startDate", range.start.to_string().into());
                put("endDate", range.end.to_string().into());
                put("first", (*page_size).into());
            }
            Operation::Insights {
                cat_id,
                current,
                previous,
            } => {
                put("catId", cat_id.as_str().into());
                put("currentStartDate", current.start.to_string().into());
                put("currentEndDate", current.end.to_string().into());
                put("previousStartDate", previous.start.to_string().into());
                put("previousEndDate", previous.end.to_string().into());
            }
            Operation::Events {
                start,
                end,
                page_size,
            } => {
                put("startTime", start.to_rfc3339().into());
                put("endTime", end.to_rfc3339().into());
                put("first", (*page_size).into());
            }
        }

        vars
    }
}

/// Every document the CLI can load
pub const DOCUMENTS: &[&str] = &[
    "status.graphql",
    "cat-weight.graphql",
    "cat-alerts.graphql",
    "cat-insights.graphql",
    "event-history.graphql",
];

/// Directory of GraphQL query documents
#[derive(Debug, Clone)]
pub struct QueryStore {
    dir: PathBuf,
}

impl QueryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, document: &str) -> PathBuf {
        self.dir.join(document)
    }

    pub fn load(&self, document: &str) -> Result<String> {
        let path = self.path(document);
        match std::fs::read_to_string(&path) {
            Ok(query) => Ok(query),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CatalysisError::QueryDocumentMissing(path))
            }
            Err(e) => Err(CatalysisError::Internal(
                anyhow::Error::from(e)
                    .context(format!("Failed to read query document {}", path.display())),
            )),
        }
    }

    /// Documents absent from the directory
    pub fn missing(&self) -> Vec<PathBuf> {
        DOCUMENTS
            .iter()
            .map(|doc| self.path(doc))
            .filter(|path| !path.is_file())
            .collect()
    }

    /// Build the payload for `operation`; the token is added at dispatch
    pub fn request(&self, operation: &Operation) -> Result<GraphQlRequest> {
        let query = self.load(operation.document())?;
        tracing::debug!(
            document = operation.document(),
            operation = operation.operation_name(),
            "Loaded query document"
        );

        let mut request = GraphQlRequest::new(operation.operation_name(), query);
        request.variables = operation.variables();
        Ok(request)
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got {:?}", s))
        .map_err(|e| CatalysisError::Configuration(format!("{:#}", e)))
}

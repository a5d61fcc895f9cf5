use crate::error::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `redirect` as sent by clients: a JSON bool or the strings `"true"`/`"false"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RedirectFlag {
    Bool(bool),
    Text(String),
}

impl RedirectFlag {
    /// Only an explicit false suppresses the redirect.
    pub fn enabled(&self) -> bool {
        match self {
            RedirectFlag::Bool(b) => *b,
            RedirectFlag::Text(s) => s != "false",
        }
    }
}

/// Body of `POST /api/download`. A mistyped field is treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadBody {
    #[serde(default, deserialize_with = "lenient")]
    pub os: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub redirect: Option<RedirectFlag>,
}

/// Query string shared by both download entry points.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub os: Option<String>,
    pub redirect: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQueryParams {
    pub period: Option<String>,
    pub os: Option<String>,
}

/// Platform families; both Windows builds fold into `windows`.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Breakdown {
    pub windows: u64,
    pub macos: u64,
    pub linux: u64,
}

#[derive(Debug, Serialize)]
pub struct DownloadStats {
    pub period: &'static str,
    pub generated_at: DateTime<Utc>,
    pub downloads: BTreeMap<&'static str, u64>,
    pub total: u64,
    pub breakdown: Breakdown,
}

//! The data types shared between the data source, the refresh controller and
//! the UI.
//!
//! Everything here is a plain value: the backend creates and updates service
//! checks, and the dashboard only ever receives a fresh snapshot per poll.
//!
//! ## Wire format
//!
//! `GET /api/services` returns a JSON array of groups:
//!
//! ```json
//! [
//!   {
//!     "title": "All Services",
//!     "status": "Operational",
//!     "checks": [
//!       {
//!         "id": 1,
//!         "name": "GitHub",
//!         "url": "https://github.com",
//!         "checkType": "HTTP",
//!         "currentStatus": "Operational",
//!         "lastCheckedAt": "2025-10-27T22:00:00Z"
//!       }
//!     ]
//!   }
//! ]
//! ```
//!
//! Only `title`, `checks` and each check's `name` are required.  Unknown
//! fields are ignored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Health of a single check or of a whole group.
///
/// Deserialization never fails: unrecognized strings, `null`, missing values
/// and non-string JSON (numbers, objects, ...) all become
/// [`ServiceStatus::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "Value")]
pub enum ServiceStatus {
    Operational,
    Degraded,
    Maintenance,
    Down,
    #[default]
    Unknown,
}

impl ServiceStatus {
    /// Parse a backend status string, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        const KNOWN: [ServiceStatus; 4] = [
            ServiceStatus::Operational,
            ServiceStatus::Degraded,
            ServiceStatus::Maintenance,
            ServiceStatus::Down,
        ];

        KNOWN
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(raw.trim()))
            .unwrap_or(ServiceStatus::Unknown)
    }

    /// Display label, identical to the backend's spelling.
    pub fn label(self) -> &'static str {
        match self {
            ServiceStatus::Operational => "Operational",
            ServiceStatus::Degraded => "Degraded",
            ServiceStatus::Maintenance => "Maintenance",
            ServiceStatus::Down => "Down",
            ServiceStatus::Unknown => "Unknown",
        }
    }

    /// Aggregate a group's status from its checks: any `Down` wins, then any
    /// `Degraded`, otherwise the group is `Operational`.
    pub fn aggregate<'a>(statuses: impl IntoIterator<Item = &'a ServiceStatus>) -> Self {
        let mut degraded = false;
        for status in statuses {
            match status {
                ServiceStatus::Down => return ServiceStatus::Down,
                ServiceStatus::Degraded => degraded = true,
                _ => {}
            }
        }
        if degraded {
            ServiceStatus::Degraded
        } else {
            ServiceStatus::Operational
        }
    }
}

impl From<Value> for ServiceStatus {
    fn from(raw: Value) -> Self {
        match raw {
            Value::String(s) => Self::parse(&s),
            _ => ServiceStatus::Unknown,
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One monitored endpoint, as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawCheck")]
pub struct ServiceCheck {
    /// Backend row id.  Older backends omit it.
    pub id: Option<i64>,

    /// Display name.
    pub name: String,

    /// The URL the backend probes.
    pub url: Option<String>,

    /// How the backend probes it (e.g. `"HTTP"`).
    pub check_type: Option<String>,

    /// Current health.
    pub current_status: ServiceStatus,

    /// When the backend last completed a check.  `None` means never.
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Wire shape of a check.  Older backends send `status` instead of
/// `currentStatus`; some send both, in which case `currentStatus` wins.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCheck {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    check_type: Option<String>,
    #[serde(default)]
    current_status: Option<ServiceStatus>,
    #[serde(default)]
    status: Option<ServiceStatus>,
    #[serde(default)]
    last_checked_at: Option<DateTime<Utc>>,
}

impl From<RawCheck> for ServiceCheck {
    fn from(raw: RawCheck) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            url: raw.url,
            check_type: raw.check_type,
            current_status: raw.current_status.or(raw.status).unwrap_or_default(),
            last_checked_at: raw.last_checked_at,
        }
    }
}

/// A named collection of checks, kept in the order the backend returned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceGroup {
    pub title: String,
    pub checks: Vec<ServiceCheck>,
    /// Aggregate status as reported by the backend, if it reported one.
    #[serde(default)]
    pub status: Option<ServiceStatus>,
}

impl ServiceGroup {
    /// The group's aggregate status, derived from its checks when the
    /// backend did not supply one.
    pub fn status(&self) -> ServiceStatus {
        self.status.unwrap_or_else(|| {
            ServiceStatus::aggregate(self.checks.iter().map(|c| &c.current_status))
        })
    }
}

/// Severity of an [`Incident`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentKind {
    Warning,
    Info,
}

/// A human-authored note about a past or ongoing disruption.
///
/// Incidents come from static configuration, not from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub service_name: String,
    pub kind: IncidentKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Common types shared by client and repair requests.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a client or repair request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::New,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    /// Statuses an executor is allowed to see on their own requests
    pub const EXECUTOR_VISIBLE: [RequestStatus; 2] =
        [RequestStatus::InProgress, RequestStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        Self::New
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown request status: {}", s)),
        }
    }
}

impl From<String> for RequestStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// The `status` query parameter of list pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// No status parameter, or `all`
    #[default]
    All,
    Only(RequestStatus),
}

impl StatusFilter {
    /// Parse the raw query value. Missing, empty and `all` mean no filter.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Ok(Self::All),
            Some(other) => other.parse().map(Self::Only),
        }
    }

    pub fn status(&self) -> Option<RequestStatus> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(*status),
        }
    }
}

/// Query string shared by the request list pages
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_stored_status_defaults_to_new() {
        assert_eq!(RequestStatus::from("archived".to_string()), RequestStatus::New);
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!(StatusFilter::parse(None).unwrap(), StatusFilter::All);
        assert_eq!(StatusFilter::parse(Some("all")).unwrap(), StatusFilter::All);
        assert_eq!(StatusFilter::parse(Some("")).unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::parse(Some("in_progress")).unwrap(),
            StatusFilter::Only(RequestStatus::InProgress)
        );
        assert!(StatusFilter::parse(Some("done")).is_err());
    }
}

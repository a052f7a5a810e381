/// Content moderation
///
/// Reports against posts feed a threshold engine: the third report on a
/// post triggers a warning to the post owner, the fifth deactivates the
/// owner's account. Thresholds fire on exact equality of the report count.
mod reports;

pub use reports::ReportManager;

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report count at which the post owner receives a warning
pub const WARNING_THRESHOLD: i64 = 3;
/// Report count at which the post owner's account is deactivated
pub const DEACTIVATION_THRESHOLD: i64 = 5;

/// Maximum length of the free-text description
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Report reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Spam,
    Inappropriate,
    Harassment,
    Fake,
    Other,
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::Spam => "spam",
            ReportReason::Inappropriate => "inappropriate",
            ReportReason::Harassment => "harassment",
            ReportReason::Fake => "fake",
            ReportReason::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "spam" => Ok(ReportReason::Spam),
            "inappropriate" => Ok(ReportReason::Inappropriate),
            "harassment" => Ok(ReportReason::Harassment),
            "fake" => Ok(ReportReason::Fake),
            "other" => Ok(ReportReason::Other),
            _ => Err(ApiError::Validation(format!("Invalid report reason: {}", s))),
        }
    }
}

/// Report lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> ApiResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "reviewed" => Ok(ReportStatus::Reviewed),
            "resolved" => Ok(ReportStatus::Resolved),
            "rejected" => Ok(ReportStatus::Rejected),
            _ => Err(ApiError::Validation(format!("Invalid report status: {}", s))),
        }
    }
}

/// Report record
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: i64,
    pub post_id: i64,
    pub reporter_user_id: i64,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub admin_note: Option<String>,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Moderation action fired by crossing a report threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "action")]
pub enum ThresholdAction {
    Warning,
    Deactivation,
}

/// Result of a report submission.
///
/// `triggered` names the threshold action the transaction took, if any; the
/// caller dispatches the matching notification after the commit.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub report: Report,
    pub total_reports: i64,
    pub post_owner_id: i64,
    pub triggered: Option<ThresholdAction>,
}

/// A report joined with its reporter's identity, for admin listings
#[derive(Debug, Clone, Serialize)]
pub struct ReportWithReporter {
    #[serde(flatten)]
    pub report: Report,
    pub reporter_name: String,
    pub reporter_email: String,
}

/// Per-reason report counts for a post
#[derive(Debug, Clone, Serialize)]
pub struct ReasonCount {
    pub reason: ReportReason,
    pub count: i64,
}

/// Admin view of all reports against one post
#[derive(Debug, Clone, Serialize)]
pub struct PostReportSummary {
    pub post_id: i64,
    pub total: i64,
    pub reports: Vec<ReportWithReporter>,
    pub by_reason: Vec<ReasonCount>,
}

/// Filters for the admin report listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportListFilter {
    /// `pending`, `reviewed`, `resolved`, or `rejected`
    pub status: Option<String>,
    /// `spam`, `inappropriate`, `harassment`, `fake`, or `other`
    pub reason: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One page of the admin report listing, newest first
#[derive(Debug, Clone, Serialize)]
pub struct ReportPage {
    pub reports: Vec<ReportWithReporter>,
    pub total: i64,
    pub pending: i64,
    pub page: i64,
    pub per_page: i64,
}

//! Stage records owned by a proposal.
//!
//! Each proposal embeds exactly one record per approval/execution stage.
//! Records are created empty at submission, written only by the guarded
//! transition for their stage, and never deleted. Rejection is terminal for
//! a stage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Internal status of an approval-type stage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StageStatus {
    /// Not yet acted upon.
    #[default]
    Pending,
    /// Approved (or, for the work order, issued).
    Approved,
    /// Rejected; terminal for the stage.
    Rejected,
}

/// Outcome of the technical approval stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TechnicalApproval {
    /// Current status of the stage.
    pub status: StageStatus,
    /// Approval order number, set on approval.
    pub approval_number: Option<String>,
    /// Date carried on the approval order.
    pub approval_date: Option<NaiveDate>,
    /// Technically sanctioned amount.
    pub sanctioned_amount: Option<u64>,
    /// Free-form remarks from the approver.
    pub remarks: Option<String>,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Identity of the deciding actor.
    pub decided_by: Option<String>,
}

/// Outcome of the administrative approval stage.
///
/// Same shape as [`TechnicalApproval`]; kept as its own type so each stage
/// is written only by its own transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdministrativeApproval {
    /// Current status of the stage.
    pub status: StageStatus,
    /// Approval order number, set on approval.
    pub approval_number: Option<String>,
    /// Date carried on the approval order.
    pub approval_date: Option<NaiveDate>,
    /// Administratively approved amount.
    pub approved_amount: Option<u64>,
    /// Free-form remarks from the approver.
    pub remarks: Option<String>,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Identity of the deciding actor.
    pub decided_by: Option<String>,
}

/// Sub-status of the tender process.
///
/// Advances strictly forward; cancellation resets to [`Self::NotStarted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TenderStage {
    /// No tender activity yet.
    #[default]
    NotStarted,
    /// Tender notice published.
    Published,
    /// Bids opened.
    BidsOpened,
    /// Bids under evaluation.
    UnderEvaluation,
    /// Contract awarded.
    Awarded,
}

impl TenderStage {
    /// Ordinal used to enforce forward-only advancement.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Published => 1,
            Self::BidsOpened => 2,
            Self::UnderEvaluation => 3,
            Self::Awarded => 4,
        }
    }

    /// Returns the string representation used in logs and audit rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Published => "PUBLISHED",
            Self::BidsOpened => "BIDS_OPENED",
            Self::UnderEvaluation => "UNDER_EVALUATION",
            Self::Awarded => "AWARDED",
        }
    }
}

impl std::fmt::Display for TenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of the competitive tender stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TenderProcess {
    /// Sub-status within the tender lifecycle.
    pub stage: TenderStage,
    /// Tender notice number.
    pub notice_number: Option<String>,
    /// Date the notice was published.
    pub published_on: Option<NaiveDate>,
    /// Winning contractor, set on award.
    pub contractor: Option<String>,
    /// Awarded contract amount.
    pub awarded_amount: Option<u64>,
    /// Date of the award.
    pub award_date: Option<NaiveDate>,
    /// Reason recorded on the most recent cancellation.
    pub cancellation_reason: Option<String>,
    /// Identity of the deciding actor.
    pub decided_by: Option<String>,
}

impl TenderProcess {
    /// Resets the record after cancellation, retaining only the reason.
    pub fn reset_after_cancellation(&mut self, reason: String, actor: String) {
        *self = Self {
            cancellation_reason: Some(reason),
            decided_by: Some(actor),
            ..Self::default()
        };
    }
}

/// The issued work order for a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Current status of the stage.
    pub status: StageStatus,
    /// Work-order number, unique across all proposals.
    pub order_number: Option<String>,
    /// Date carried on the order.
    pub order_date: Option<NaiveDate>,
    /// Ordered amount; also the ledger's initial sanction.
    pub amount: Option<u64>,
    /// Contractor the order was issued to.
    pub contractor: Option<String>,
    /// Identity of the issuing actor.
    pub issued_by: Option<String>,
}

/// Metadata-only reference to an externally stored document.
///
/// The blob itself lives with the out-of-scope attachment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// File name as supplied by the uploader.
    pub name: String,
    /// Size of the document in bytes.
    pub size_bytes: u64,
    /// MIME type of the document.
    pub content_type: String,
    /// Identity of the uploading caller.
    pub owner_id: String,
    /// Instant the reference was recorded.
    pub uploaded_at: DateTime<Utc>,
}

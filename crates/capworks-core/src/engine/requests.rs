//! Transition payloads.
//!
//! Transport-agnostic request bodies for each lifecycle operation. The
//! engine validates required fields before any mutation; optional fields
//! here are genuinely optional, not merely nullable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::proposal::TenderStage;

/// Descriptive fields for a new proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProposal {
    /// Category of work from the work-type catalog.
    pub work_type: String,
    /// Name of the work.
    pub name: String,
    /// Submitting agency.
    pub agency: String,
    /// Funding scheme.
    #[serde(default)]
    pub scheme: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Financial year, e.g. `2026-27`.
    pub financial_year: String,
    /// Department executing the work.
    pub work_department: String,
    /// Department that raised the demand.
    pub user_department: String,
    /// Department whose approvers decide the approval stages.
    pub approving_department: String,
    /// Administrative block of the work site.
    #[serde(default)]
    pub block: String,
    /// Village or locality of the work site.
    #[serde(default)]
    pub village: String,
    /// Amount requested.
    pub proposed_amount: u64,
    /// Whether a detailed project report must accompany the proposal.
    #[serde(default)]
    pub requires_dpr: bool,
    /// Whether the work must go through competitive tender.
    #[serde(default)]
    pub requires_tender: bool,
}

/// Approve-or-reject action shared by the approval stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    /// Approve the stage.
    Approve,
    /// Reject the stage; terminal for the proposal.
    Reject,
}

/// Technical approval decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDecision {
    /// Approve or reject.
    pub action: DecisionAction,
    /// Approval order number; required to approve.
    #[serde(default)]
    pub approval_number: Option<String>,
    /// Technically sanctioned amount; required to approve.
    #[serde(default)]
    pub sanctioned_amount: Option<u64>,
    /// Date carried on the approval order.
    #[serde(default)]
    pub approval_date: Option<NaiveDate>,
    /// Free-form remarks.
    #[serde(default)]
    pub remarks: Option<String>,
    /// Reason; required to reject.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Administrative approval decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrativeDecision {
    /// Approve or reject.
    pub action: DecisionAction,
    /// Approval order number; required to approve.
    #[serde(default)]
    pub approval_number: Option<String>,
    /// Administratively approved amount; required to approve.
    #[serde(default)]
    pub approved_amount: Option<u64>,
    /// Date carried on the approval order.
    #[serde(default)]
    pub approval_date: Option<NaiveDate>,
    /// Free-form remarks.
    #[serde(default)]
    pub remarks: Option<String>,
    /// Reason; required to reject.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Opens the tender process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTender {
    /// Tender notice number.
    pub notice_number: String,
    /// Date the notice was published.
    pub published_on: NaiveDate,
}

/// Moves the tender sub-stage forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceTender {
    /// Target sub-stage; must be strictly ahead of the current one and
    /// before award.
    pub stage: TenderStage,
}

/// Awards the tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardTender {
    /// Winning contractor.
    pub contractor: String,
    /// Awarded contract amount.
    pub amount: u64,
    /// Date of the award.
    pub award_date: NaiveDate,
}

/// Cancels the tender and resets its sub-stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelTender {
    /// Why the tender was cancelled.
    pub reason: String,
}

/// Issues the work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkOrder {
    /// Work-order number, unique across all proposals.
    pub number: String,
    /// Date carried on the order.
    pub date: NaiveDate,
    /// Ordered amount; becomes the ledger sanction.
    pub amount: u64,
    /// Contractor the order is issued to.
    pub contractor: String,
}

/// Amends the work order before work starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateWorkOrder {
    /// New ordered amount; re-derives the ledger balance.
    #[serde(default)]
    pub amount: Option<u64>,
    /// New contractor.
    #[serde(default)]
    pub contractor: Option<String>,
}

/// Releases an installment against the sanction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInstallment {
    /// Amount to release.
    pub amount: u64,
    /// Date of the release.
    pub date: NaiveDate,
}

/// Records physical progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProgress {
    /// Progress percentage, `0..=100`, non-decreasing.
    pub percent: u8,
    /// Running expenditure figure, if being reported.
    #[serde(default)]
    pub expenditure: Option<u64>,
}

/// Explicitly completes the work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompleteWork {
    /// Final expenditure; falls back to the recorded expenditure, then the
    /// work-order amount.
    #[serde(default)]
    pub final_expenditure: Option<u64>,
}

/// Cancels the work (override only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelWork {
    /// Why the work was cancelled.
    pub reason: String,
}

/// Records attachment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachDocument {
    /// File name.
    pub name: String,
    /// Size of the document in bytes.
    pub size_bytes: u64,
    /// MIME type.
    pub content_type: String,
}

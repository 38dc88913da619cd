//! Canonical proposal status and the aggregate root.
//!
//! The status enum is the single source of truth for a proposal's position
//! in the pipeline. The display label is derived from the status at read
//! time rather than stored alongside it, so the two can never diverge.
//!
//! ```text
//! PendingTechnicalApproval ---> RejectedTechnicalApproval (terminal)
//!          |
//!          v
//! PendingAdministrativeApproval ---> RejectedAdministrativeApproval (terminal)
//!          |
//!          +--> PendingTender <---> TenderInProgress   (requires_tender)
//!          |                            |
//!          v                            v (award)
//!       PendingWorkOrder <--------------+
//!          |
//!          v
//!    WorkOrderCreated --> WorkInProgress --> WorkCompleted (terminal)
//!          |                   |
//!          +---> WorkCancelled <---+  (terminal, override only)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::{
    AdministrativeApproval, AttachmentRef, TechnicalApproval, TenderProcess, WorkOrder,
};
use crate::ledger::DisbursementLedger;
use crate::serial::SerialNumber;

/// Canonical lifecycle state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ProposalStatus {
    /// Awaiting the technical approval decision.
    PendingTechnicalApproval,
    /// Technically rejected; terminal.
    RejectedTechnicalApproval,
    /// Awaiting the administrative approval decision.
    PendingAdministrativeApproval,
    /// Administratively rejected; terminal.
    RejectedAdministrativeApproval,
    /// Awaiting the tender process to start.
    PendingTender,
    /// Tender process underway.
    TenderInProgress,
    /// Awaiting work-order issuance.
    PendingWorkOrder,
    /// Work order issued; ledger initialized.
    WorkOrderCreated,
    /// Physical work underway.
    WorkInProgress,
    /// Work finished; terminal.
    WorkCompleted,
    /// Work cancelled by override; terminal.
    WorkCancelled,
}

impl ProposalStatus {
    /// Returns all statuses.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PendingTechnicalApproval,
            Self::RejectedTechnicalApproval,
            Self::PendingAdministrativeApproval,
            Self::RejectedAdministrativeApproval,
            Self::PendingTender,
            Self::TenderInProgress,
            Self::PendingWorkOrder,
            Self::WorkOrderCreated,
            Self::WorkInProgress,
            Self::WorkCompleted,
            Self::WorkCancelled,
        ]
    }

    /// Returns the stable string representation stored in indexed columns
    /// and audit rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingTechnicalApproval => "PENDING_TECHNICAL_APPROVAL",
            Self::RejectedTechnicalApproval => "REJECTED_TECHNICAL_APPROVAL",
            Self::PendingAdministrativeApproval => "PENDING_ADMINISTRATIVE_APPROVAL",
            Self::RejectedAdministrativeApproval => "REJECTED_ADMINISTRATIVE_APPROVAL",
            Self::PendingTender => "PENDING_TENDER",
            Self::TenderInProgress => "TENDER_IN_PROGRESS",
            Self::PendingWorkOrder => "PENDING_WORK_ORDER",
            Self::WorkOrderCreated => "WORK_ORDER_CREATED",
            Self::WorkInProgress => "WORK_IN_PROGRESS",
            Self::WorkCompleted => "WORK_COMPLETED",
            Self::WorkCancelled => "WORK_CANCELLED",
        }
    }

    /// Parses the stable string representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.as_str() == value)
    }

    /// Human-readable label, derived rather than stored.
    #[must_use]
    pub const fn display_label(&self) -> &'static str {
        match self {
            Self::PendingTechnicalApproval => "Pending Technical Approval",
            Self::RejectedTechnicalApproval => "Rejected at Technical Approval",
            Self::PendingAdministrativeApproval => "Pending Administrative Approval",
            Self::RejectedAdministrativeApproval => "Rejected at Administrative Approval",
            Self::PendingTender => "Pending Tender",
            Self::TenderInProgress => "Tender In Progress",
            Self::PendingWorkOrder => "Pending Work Order",
            Self::WorkOrderCreated => "Work Order Created",
            Self::WorkInProgress => "Work In Progress",
            Self::WorkCompleted => "Work Completed",
            Self::WorkCancelled => "Work Cancelled",
        }
    }

    /// Returns `true` if no further lifecycle transition is defined.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RejectedTechnicalApproval
                | Self::RejectedAdministrativeApproval
                | Self::WorkCompleted
                | Self::WorkCancelled
        )
    }

    /// Returns `true` once the proposal has left the initial pending state.
    ///
    /// Physical deletion is restricted to the initial state (or override).
    #[must_use]
    pub const fn past_initial(&self) -> bool {
        !matches!(self, Self::PendingTechnicalApproval)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The aggregate root: one capital-works item moving through the pipeline.
///
/// Owns one ledger (once a work order exists) and one record per stage.
/// All mutation goes through the lifecycle engine; the store persists the
/// whole aggregate as a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Internal identifier (UUID).
    pub id: String,
    /// Human-readable serial number, immutable once assigned.
    pub serial_number: SerialNumber,
    /// Category of work from the (out-of-scope) work-type catalog.
    pub work_type: String,
    /// Name of the work.
    pub name: String,
    /// Submitting agency.
    pub agency: String,
    /// Funding scheme.
    pub scheme: String,
    /// Free-form description.
    pub description: String,
    /// Financial year the proposal belongs to, e.g. `2026-27`.
    pub financial_year: String,
    /// Department executing the work.
    pub work_department: String,
    /// Department that raised the demand.
    pub user_department: String,
    /// Department whose approvers decide the approval stages.
    pub approving_department: String,
    /// Administrative block of the work site.
    pub block: String,
    /// Village or locality of the work site.
    pub village: String,
    /// Amount requested at submission.
    pub proposed_amount: u64,
    /// Whether a detailed project report must accompany the proposal.
    pub requires_dpr: bool,
    /// Whether the work must go through competitive tender.
    pub requires_tender: bool,
    /// Canonical lifecycle status.
    pub status: ProposalStatus,
    /// Identity of the submitting caller; never reassigned.
    pub submitted_by: String,
    /// Instant the proposal was created.
    pub created_at: DateTime<Utc>,
    /// Instant of the most recent status change.
    pub status_changed_at: DateTime<Utc>,
    /// Technical approval stage record.
    pub technical: TechnicalApproval,
    /// Administrative approval stage record.
    pub administrative: AdministrativeApproval,
    /// Tender process stage record.
    pub tender: TenderProcess,
    /// Work-order stage record.
    pub work_order: WorkOrder,
    /// Disbursement ledger; `None` until a work order is created.
    pub ledger: Option<DisbursementLedger>,
    /// Set only on transition into [`ProposalStatus::WorkCompleted`].
    pub completion_date: Option<DateTime<Utc>>,
    /// Final cost stamped at completion.
    pub final_cost: Option<u64>,
    /// Reason recorded when work is cancelled.
    pub cancellation_reason: Option<String>,
    /// Metadata references to externally stored documents.
    pub attachments: Vec<AttachmentRef>,
}

impl Proposal {
    /// Derived display label for the current status.
    ///
    /// Deriving the label instead of storing it next to the status makes
    /// divergence between the two unrepresentable.
    #[must_use]
    pub const fn display_status(&self) -> &'static str {
        self.status.display_label()
    }

    /// Moves the proposal to `status`, restamping the status-change instant.
    ///
    /// Callers must have validated the transition; this only performs the
    /// mechanical update so the stamp can never be forgotten.
    pub fn set_status(&mut self, status: ProposalStatus, now: DateTime<Utc>) {
        self.status = status;
        self.status_changed_at = now;
    }

    /// The ledger, if a work order has been created.
    #[must_use]
    pub fn ledger(&self) -> Option<&DisbursementLedger> {
        self.ledger.as_ref()
    }
}

//! Caller identity as consumed from the external identity collaborator.
//!
//! The engine never resolves credentials itself. Every operation receives an
//! opaque [`CallerContext`] produced by the out-of-scope identity layer and
//! checks it against the authorization policy.

use serde::{Deserialize, Serialize};

/// Roles recognized by the lifecycle guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Role {
    /// Submits proposals and owns them for their lifetime.
    Submitter,
    /// Decides the technical approval stage.
    TechnicalApprover,
    /// Decides the administrative approval stage.
    AdministrativeApprover,
    /// Drives the tender process.
    TenderManager,
    /// Issues and amends work orders, releases installments.
    WorkOrderManager,
    /// Records physical progress and completion.
    ProgressMonitor,
    /// Unrestricted authority over every transition.
    Override,
}

impl Role {
    /// Returns all roles.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Submitter,
            Self::TechnicalApprover,
            Self::AdministrativeApprover,
            Self::TenderManager,
            Self::WorkOrderManager,
            Self::ProgressMonitor,
            Self::Override,
        ]
    }

    /// Returns the string representation used in logs and audit rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitter => "SUBMITTER",
            Self::TechnicalApprover => "TECHNICAL_APPROVER",
            Self::AdministrativeApprover => "ADMINISTRATIVE_APPROVER",
            Self::TenderManager => "TENDER_MANAGER",
            Self::WorkOrderManager => "WORK_ORDER_MANAGER",
            Self::ProgressMonitor => "PROGRESS_MONITOR",
            Self::Override => "OVERRIDE",
        }
    }

    /// Returns `true` for the unrestricted override role.
    #[must_use]
    pub const fn is_override(&self) -> bool {
        matches!(self, Self::Override)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque caller identity attached to every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Stable identity of the caller.
    pub id: String,
    /// Role granted by the identity collaborator.
    pub role: Role,
    /// Department the caller acts for.
    pub department: String,
}

impl CallerContext {
    /// Creates a caller context.
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role, department: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            department: department.into(),
        }
    }
}

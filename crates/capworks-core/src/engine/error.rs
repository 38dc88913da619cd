//! Lifecycle engine error types.

use thiserror::Error;

use crate::context::Role;
use crate::ledger::LedgerError;
use crate::policy::{PolicyDenial, TransitionKind};
use crate::proposal::ProposalStatus;
use crate::store::StoreError;

/// Errors surfaced by lifecycle operations.
///
/// Guards and validation run before any mutation; when one of these is
/// returned, no partial state change was persisted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Unknown proposal id.
    #[error("proposal not found: {proposal_id}")]
    NotFound {
        /// The id that was not found.
        proposal_id: String,
    },

    /// Transition attempted from a state that does not permit it.
    #[error("transition {transition} is not valid from state {current}")]
    InvalidState {
        /// The proposal's current status.
        current: ProposalStatus,
        /// The transition that was attempted.
        transition: TransitionKind,
    },

    /// Required payload field missing or malformed.
    #[error("validation failed on {field}: {reason}")]
    Validation {
        /// The violated field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Caller role/department does not satisfy the guard.
    #[error("{role} may not drive {transition}: {reason}")]
    Forbidden {
        /// The caller's role.
        role: Role,
        /// The attempted transition.
        transition: TransitionKind,
        /// The guard that failed.
        reason: String,
    },

    /// Duplicate unique key.
    #[error("conflict on {field}: '{value}' is already in use")]
    Conflict {
        /// The conflicting field.
        field: &'static str,
        /// The duplicate value.
        value: String,
    },

    /// Disbursement would exceed the sanctioned amount.
    #[error(
        "release of {requested} would exceed sanction: {total_released} of {sanctioned_amount} already released"
    )]
    Overrun {
        /// Amount the caller asked to release.
        requested: u64,
        /// Amount released so far.
        total_released: u64,
        /// The sanctioned ceiling.
        sanctioned_amount: u64,
    },

    /// Optimistic retries exhausted under sustained contention.
    #[error("gave up on proposal {proposal_id} after {attempts} contended attempts")]
    Contention {
        /// The contended proposal id.
        proposal_id: String,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Unexpected persistence failure; the aggregate was left unchanged.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<PolicyDenial> for EngineError {
    fn from(denial: PolicyDenial) -> Self {
        Self::Forbidden {
            role: denial.role,
            transition: denial.transition,
            reason: denial.reason,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { proposal_id } => Self::NotFound { proposal_id },
            StoreError::DuplicateSerial { serial } => Self::Conflict {
                field: "serial_number",
                value: serial,
            },
            StoreError::DuplicateWorkOrderNumber { number } => Self::Conflict {
                field: "work_order_number",
                value: number,
            },
            other => Self::Storage(other),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Overrun {
                requested,
                total_released,
                sanctioned_amount,
            } => Self::Overrun {
                requested,
                total_released,
                sanctioned_amount,
            },
            other @ (LedgerError::ZeroAmount | LedgerError::SanctionBelowReleased { .. }) => {
                Self::Validation {
                    field: "amount",
                    reason: other.to_string(),
                }
            },
            other @ (LedgerError::PercentOutOfRange { .. }
            | LedgerError::ProgressDecrease { .. }) => Self::Validation {
                field: "percent",
                reason: other.to_string(),
            },
        }
    }
}

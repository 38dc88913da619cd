//! Table-driven authorization for lifecycle transitions.
//!
//! Guard logic lives in a single table keyed by transition kind rather than
//! inline in the transition handlers: each row names the roles allowed to
//! drive the transition and whether the caller's department must match the
//! proposal's approving department. The override role bypasses every row.
//! The table is data, so it is testable without an engine.
//!
//! Guards fail closed: a transition kind missing from the table (impossible
//! for the built-in table, but relevant for future rows) denies everyone
//! but override.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::{CallerContext, Role};

/// Every lifecycle transition the engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TransitionKind {
    /// Create a proposal in the initial pending state.
    Submit,
    /// Approve or reject the technical stage.
    DecideTechnical,
    /// Approve or reject the administrative stage.
    DecideAdministrative,
    /// Open the tender process.
    StartTender,
    /// Move the tender sub-stage forward.
    AdvanceTender,
    /// Award the tender to a contractor.
    AwardTender,
    /// Cancel the tender and reset its sub-stage.
    CancelTender,
    /// Issue the work order and initialize the ledger.
    CreateWorkOrder,
    /// Amend the work order before work starts.
    UpdateWorkOrder,
    /// Mark physical work as started.
    StartWork,
    /// Record physical progress.
    UpdateProgress,
    /// Release an installment against the sanction.
    AddInstallment,
    /// Explicitly complete the work.
    CompleteWork,
    /// Cancel the work (override only).
    CancelWork,
    /// Record attachment metadata.
    AttachDocument,
    /// Physically delete the proposal.
    DeleteProposal,
}

impl TransitionKind {
    /// Returns all transition kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Submit,
            Self::DecideTechnical,
            Self::DecideAdministrative,
            Self::StartTender,
            Self::AdvanceTender,
            Self::AwardTender,
            Self::CancelTender,
            Self::CreateWorkOrder,
            Self::UpdateWorkOrder,
            Self::StartWork,
            Self::UpdateProgress,
            Self::AddInstallment,
            Self::CompleteWork,
            Self::CancelWork,
            Self::AttachDocument,
            Self::DeleteProposal,
        ]
    }

    /// Parses the stable string representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.as_str() == value)
    }

    /// Returns the string representation used in logs and audit rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "SUBMIT",
            Self::DecideTechnical => "DECIDE_TECHNICAL",
            Self::DecideAdministrative => "DECIDE_ADMINISTRATIVE",
            Self::StartTender => "START_TENDER",
            Self::AdvanceTender => "ADVANCE_TENDER",
            Self::AwardTender => "AWARD_TENDER",
            Self::CancelTender => "CANCEL_TENDER",
            Self::CreateWorkOrder => "CREATE_WORK_ORDER",
            Self::UpdateWorkOrder => "UPDATE_WORK_ORDER",
            Self::StartWork => "START_WORK",
            Self::UpdateProgress => "UPDATE_PROGRESS",
            Self::AddInstallment => "ADD_INSTALLMENT",
            Self::CompleteWork => "COMPLETE_WORK",
            Self::CancelWork => "CANCEL_WORK",
            Self::AttachDocument => "ATTACH_DOCUMENT",
            Self::DeleteProposal => "DELETE_PROPOSAL",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the authorization table.
#[derive(Debug, Clone, Copy)]
struct PolicyRow {
    /// Roles permitted to drive the transition (override is implicit).
    roles: &'static [Role],
    /// Whether the caller's department must match the proposal's
    /// approving department.
    department_match: bool,
}

/// The built-in table. `CancelWork` has an empty role set: override only.
const TABLE: &[(TransitionKind, PolicyRow)] = &[
    (
        TransitionKind::Submit,
        PolicyRow {
            roles: &[Role::Submitter],
            department_match: false,
        },
    ),
    (
        TransitionKind::DecideTechnical,
        PolicyRow {
            roles: &[Role::TechnicalApprover],
            department_match: true,
        },
    ),
    (
        TransitionKind::DecideAdministrative,
        PolicyRow {
            roles: &[Role::AdministrativeApprover],
            department_match: true,
        },
    ),
    (
        TransitionKind::StartTender,
        PolicyRow {
            roles: &[Role::TenderManager],
            department_match: false,
        },
    ),
    (
        TransitionKind::AdvanceTender,
        PolicyRow {
            roles: &[Role::TenderManager],
            department_match: false,
        },
    ),
    (
        TransitionKind::AwardTender,
        PolicyRow {
            roles: &[Role::TenderManager],
            department_match: false,
        },
    ),
    (
        TransitionKind::CancelTender,
        PolicyRow {
            roles: &[Role::TenderManager],
            department_match: false,
        },
    ),
    (
        TransitionKind::CreateWorkOrder,
        PolicyRow {
            roles: &[Role::WorkOrderManager],
            department_match: false,
        },
    ),
    (
        TransitionKind::UpdateWorkOrder,
        PolicyRow {
            roles: &[Role::WorkOrderManager],
            department_match: false,
        },
    ),
    (
        TransitionKind::StartWork,
        PolicyRow {
            roles: &[Role::WorkOrderManager, Role::ProgressMonitor],
            department_match: false,
        },
    ),
    (
        TransitionKind::UpdateProgress,
        PolicyRow {
            roles: &[Role::ProgressMonitor],
            department_match: false,
        },
    ),
    (
        TransitionKind::AddInstallment,
        PolicyRow {
            roles: &[Role::WorkOrderManager],
            department_match: false,
        },
    ),
    (
        TransitionKind::CompleteWork,
        PolicyRow {
            roles: &[Role::ProgressMonitor],
            department_match: false,
        },
    ),
    (
        TransitionKind::CancelWork,
        PolicyRow {
            roles: &[],
            department_match: false,
        },
    ),
    (
        TransitionKind::AttachDocument,
        PolicyRow {
            roles: &[Role::Submitter],
            department_match: false,
        },
    ),
    (
        TransitionKind::DeleteProposal,
        PolicyRow {
            roles: &[Role::Submitter],
            department_match: false,
        },
    ),
];

/// Why a caller was denied a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDenial {
    /// The caller's role.
    pub role: Role,
    /// The transition that was attempted.
    pub transition: TransitionKind,
    /// Human-readable guard that failed.
    pub reason: String,
}

/// The (role, transition) authorization table.
#[derive(Debug)]
pub struct AuthorizationPolicy {
    rows: HashMap<TransitionKind, PolicyRow>,
}

impl AuthorizationPolicy {
    /// The built-in policy table.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            rows: TABLE.iter().copied().collect(),
        }
    }

    /// Checks the caller's role against the table row for `transition`.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyDenial`] naming the failed guard.
    pub fn authorize_role(
        &self,
        caller: &CallerContext,
        transition: TransitionKind,
    ) -> Result<(), PolicyDenial> {
        if caller.role.is_override() {
            return Ok(());
        }
        let allowed = self
            .rows
            .get(&transition)
            .is_some_and(|row| row.roles.contains(&caller.role));
        if allowed {
            Ok(())
        } else {
            Err(PolicyDenial {
                role: caller.role,
                transition,
                reason: format!("role {} may not drive {transition}", caller.role),
            })
        }
    }

    /// Checks the department guard for `transition`, if the table requires
    /// one.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyDenial`] when the departments differ.
    pub fn authorize_department(
        &self,
        caller: &CallerContext,
        transition: TransitionKind,
        approving_department: &str,
    ) -> Result<(), PolicyDenial> {
        if caller.role.is_override() {
            return Ok(());
        }
        let required = self
            .rows
            .get(&transition)
            .is_some_and(|row| row.department_match);
        if required && caller.department != approving_department {
            return Err(PolicyDenial {
                role: caller.role,
                transition,
                reason: format!(
                    "department {} does not match approving department {approving_department}",
                    caller.department
                ),
            });
        }
        Ok(())
    }

    /// Checks an ownership-scoped transition against the record owner.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyDenial`] when the caller does not own the record.
    pub fn authorize_owner(
        &self,
        caller: &CallerContext,
        transition: TransitionKind,
        owner_id: &str,
    ) -> Result<(), PolicyDenial> {
        if caller.role.is_override() || caller.id == owner_id {
            Ok(())
        } else {
            Err(PolicyDenial {
                role: caller.role,
                transition,
                reason: format!("caller {} does not own this proposal", caller.id),
            })
        }
    }
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role, department: &str) -> CallerContext {
        CallerContext::new("caller-1", role, department)
    }

    #[test]
    fn test_table_covers_every_transition() {
        let policy = AuthorizationPolicy::standard();
        for kind in TransitionKind::all() {
            assert!(policy.rows.contains_key(kind), "missing row for {kind}");
        }
    }

    #[test]
    fn test_transition_kind_string_round_trip() {
        for kind in TransitionKind::all() {
            assert_eq!(TransitionKind::parse(kind.as_str()), Some(*kind));
        }
        assert_eq!(TransitionKind::parse("NOT_A_TRANSITION"), None);
    }

    #[test]
    fn test_matching_role_allowed() {
        let policy = AuthorizationPolicy::standard();
        let result = policy.authorize_role(
            &caller(Role::TechnicalApprover, "PWD"),
            TransitionKind::DecideTechnical,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_role_denied() {
        let policy = AuthorizationPolicy::standard();
        let err = policy
            .authorize_role(
                &caller(Role::Submitter, "PWD"),
                TransitionKind::DecideTechnical,
            )
            .unwrap_err();
        assert_eq!(err.role, Role::Submitter);
        assert_eq!(err.transition, TransitionKind::DecideTechnical);
    }

    #[test]
    fn test_override_bypasses_every_row() {
        let policy = AuthorizationPolicy::standard();
        let ctx = caller(Role::Override, "anywhere");
        for kind in [
            TransitionKind::Submit,
            TransitionKind::DecideTechnical,
            TransitionKind::CancelWork,
            TransitionKind::DeleteProposal,
        ] {
            assert!(policy.authorize_role(&ctx, kind).is_ok());
            assert!(policy.authorize_department(&ctx, kind, "PWD").is_ok());
            assert!(policy.authorize_owner(&ctx, kind, "someone-else").is_ok());
        }
    }

    #[test]
    fn test_cancel_work_denied_to_every_regular_role() {
        let policy = AuthorizationPolicy::standard();
        for role in Role::all() {
            if role.is_override() {
                continue;
            }
            assert!(
                policy
                    .authorize_role(&caller(*role, "PWD"), TransitionKind::CancelWork)
                    .is_err(),
                "{role} must not cancel work"
            );
        }
    }

    #[test]
    fn test_department_guard_only_on_approval_stages() {
        let policy = AuthorizationPolicy::standard();
        let approver = caller(Role::TechnicalApprover, "Irrigation");

        let err = policy
            .authorize_department(&approver, TransitionKind::DecideTechnical, "PWD")
            .unwrap_err();
        assert!(err.reason.contains("approving department"));

        // Non-approval transitions carry no department guard.
        assert!(
            policy
                .authorize_department(
                    &caller(Role::TenderManager, "Irrigation"),
                    TransitionKind::StartTender,
                    "PWD",
                )
                .is_ok()
        );
    }

    #[test]
    fn test_ownership_guard() {
        let policy = AuthorizationPolicy::standard();
        let owner = caller(Role::Submitter, "PWD");
        assert!(
            policy
                .authorize_owner(&owner, TransitionKind::DeleteProposal, "caller-1")
                .is_ok()
        );
        assert!(
            policy
                .authorize_owner(&owner, TransitionKind::DeleteProposal, "caller-2")
                .is_err()
        );
    }
}

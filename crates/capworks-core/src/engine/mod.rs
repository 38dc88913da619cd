//! Lifecycle engine: the guarded transitions of the proposal pipeline.
//!
//! Every operation follows the same discipline: authorize the caller's
//! role, load the aggregate, verify the exact source state, validate the
//! payload, mutate in memory, and commit the whole aggregate plus its audit
//! row in one atomic store update. Guard failures never leave a partial
//! mutation behind.
//!
//! # Concurrency
//!
//! Commits are optimistic: the store only accepts an update carrying the
//! version the engine read. A losing writer reloads the aggregate and
//! re-runs its guards against the fresh state, so two concurrent
//! installment releases can never both fit under the sanction from a stale
//! `total_released`. Retries are bounded by configuration; sustained
//! contention surfaces as [`EngineError::Contention`].

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::context::CallerContext;
use crate::ledger::{DisbursementLedger, Installment};
use crate::policy::{AuthorizationPolicy, TransitionKind};
use crate::proposal::{
    AdministrativeApproval, AttachmentRef, Proposal, ProposalStatus, StageStatus,
    TechnicalApproval, TenderStage, WorkOrder,
};
use crate::serial::SerialNumber;
use crate::store::{ProposalStore, StoreError, TransitionRecord, VersionedProposal};

mod error;
mod requests;


pub use error::EngineError;
pub use requests::{
    AddInstallment, AdministrativeDecision, AdvanceTender, AttachDocument, AwardTender,
    CancelTender, CancelWork, CompleteWork, CreateWorkOrder, DecisionAction, StartTender,
    SubmitProposal, TechnicalDecision, UpdateProgress, UpdateWorkOrder,
};

/// Result of releasing an installment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentReceipt {
    /// The recorded installment.
    pub installment: Installment,
    /// Cumulative released amount after the release.
    pub total_released: u64,
    /// Remaining balance after the release.
    pub remaining_balance: u64,
}

/// The lifecycle engine.
///
/// Holds the store, the authorization table, and the serial settings; all
/// operations take `&self` and may be driven from multiple threads.
pub struct LifecycleEngine<S> {
    store: S,
    policy: AuthorizationPolicy,
    serial_prefix: String,
    serial_pad_width: usize,
    max_update_retries: u32,
}

impl<S: ProposalStore> LifecycleEngine<S> {
    /// Creates an engine over `store` with the standard policy table.
    #[must_use]
    pub fn new(store: S, config: &EngineConfig) -> Self {
        Self {
            store,
            policy: AuthorizationPolicy::standard(),
            serial_prefix: config.serial.prefix.clone(),
            serial_pad_width: config.serial.pad_width,
            max_update_retries: config.store.max_update_retries,
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Loads a proposal for reading.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown id.
    pub fn proposal(&self, proposal_id: &str) -> Result<Proposal, EngineError> {
        Ok(self.store.load(proposal_id)?.proposal)
    }

    /// Reads the audit feed for one proposal, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn transitions(&self, proposal_id: &str) -> Result<Vec<TransitionRecord>, EngineError> {
        Ok(self.store.transitions(proposal_id)?)
    }

    /// Creates a proposal in the initial pending state.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] on missing required descriptive fields,
    /// [`EngineError::Forbidden`] when the caller may not submit.
    pub fn submit(
        &self,
        request: &SubmitProposal,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        self.policy.authorize_role(caller, TransitionKind::Submit)?;
        require_text("work_type", &request.work_type)?;
        require_text("name", &request.name)?;
        require_text("agency", &request.agency)?;
        require_text("financial_year", &request.financial_year)?;
        require_text("work_department", &request.work_department)?;
        require_text("user_department", &request.user_department)?;
        require_text("approving_department", &request.approving_department)?;
        require_positive("proposed_amount", request.proposed_amount)?;

        let now = Utc::now();
        let year = now.year();
        let seq = self.store.next_serial_seq(year)?;
        let serial = SerialNumber::format(&self.serial_prefix, year, seq, self.serial_pad_width);

        let proposal = Proposal {
            id: Uuid::new_v4().to_string(),
            serial_number: serial,
            work_type: request.work_type.clone(),
            name: request.name.clone(),
            agency: request.agency.clone(),
            scheme: request.scheme.clone(),
            description: request.description.clone(),
            financial_year: request.financial_year.clone(),
            work_department: request.work_department.clone(),
            user_department: request.user_department.clone(),
            approving_department: request.approving_department.clone(),
            block: request.block.clone(),
            village: request.village.clone(),
            proposed_amount: request.proposed_amount,
            requires_dpr: request.requires_dpr,
            requires_tender: request.requires_tender,
            status: ProposalStatus::PendingTechnicalApproval,
            submitted_by: caller.id.clone(),
            created_at: now,
            status_changed_at: now,
            technical: TechnicalApproval::default(),
            administrative: AdministrativeApproval::default(),
            tender: crate::proposal::TenderProcess::default(),
            work_order: WorkOrder::default(),
            ledger: None,
            completion_date: None,
            final_cost: None,
            cancellation_reason: None,
            attachments: Vec::new(),
        };

        let log = TransitionRecord {
            proposal_id: proposal.id.clone(),
            transition: TransitionKind::Submit,
            from_status: None,
            to_status: proposal.status,
            actor_id: caller.id.clone(),
            occurred_at: now,
        };
        self.store.insert(&proposal, &log)?;

        tracing::info!(
            proposal_id = %proposal.id,
            serial = %proposal.serial_number,
            "proposal submitted"
        );
        Ok(proposal)
    }

    /// Decides the technical approval stage.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] unless the proposal is pending
    /// technical approval; [`EngineError::Validation`] when the decision
    /// payload is incomplete.
    pub fn decide_technical(
        &self,
        proposal_id: &str,
        decision: &TechnicalDecision,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::DecideTechnical;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::PendingTechnicalApproval, kind)?;
            self.policy
                .authorize_department(caller, kind, &proposal.approving_department)?;
            match decision.action {
                DecisionAction::Approve => {
                    let number =
                        require_present("approval_number", decision.approval_number.as_deref())?;
                    let amount =
                        require_amount("sanctioned_amount", decision.sanctioned_amount)?;
                    proposal.technical = TechnicalApproval {
                        status: StageStatus::Approved,
                        approval_number: Some(number),
                        approval_date: Some(
                            decision.approval_date.unwrap_or_else(|| now.date_naive()),
                        ),
                        sanctioned_amount: Some(amount),
                        remarks: decision.remarks.clone(),
                        rejection_reason: None,
                        decided_by: Some(caller.id.clone()),
                    };
                    proposal.set_status(ProposalStatus::PendingAdministrativeApproval, now);
                },
                DecisionAction::Reject => {
                    let reason =
                        require_present("rejection_reason", decision.rejection_reason.as_deref())?;
                    proposal.technical = TechnicalApproval {
                        status: StageStatus::Rejected,
                        rejection_reason: Some(reason),
                        remarks: decision.remarks.clone(),
                        decided_by: Some(caller.id.clone()),
                        ..TechnicalApproval::default()
                    };
                    proposal.set_status(ProposalStatus::RejectedTechnicalApproval, now);
                },
            }
            Ok(())
        })
    }

    /// Decides the administrative approval stage; approval branches on
    /// `requires_tender`.
    ///
    /// # Errors
    ///
    /// As [`Self::decide_technical`], against the administrative stage.
    pub fn decide_administrative(
        &self,
        proposal_id: &str,
        decision: &AdministrativeDecision,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::DecideAdministrative;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::PendingAdministrativeApproval, kind)?;
            self.policy
                .authorize_department(caller, kind, &proposal.approving_department)?;
            match decision.action {
                DecisionAction::Approve => {
                    let number =
                        require_present("approval_number", decision.approval_number.as_deref())?;
                    let amount = require_amount("approved_amount", decision.approved_amount)?;
                    proposal.administrative = AdministrativeApproval {
                        status: StageStatus::Approved,
                        approval_number: Some(number),
                        approval_date: Some(
                            decision.approval_date.unwrap_or_else(|| now.date_naive()),
                        ),
                        approved_amount: Some(amount),
                        remarks: decision.remarks.clone(),
                        rejection_reason: None,
                        decided_by: Some(caller.id.clone()),
                    };
                    let next = if proposal.requires_tender {
                        ProposalStatus::PendingTender
                    } else {
                        ProposalStatus::PendingWorkOrder
                    };
                    proposal.set_status(next, now);
                },
                DecisionAction::Reject => {
                    let reason =
                        require_present("rejection_reason", decision.rejection_reason.as_deref())?;
                    proposal.administrative = AdministrativeApproval {
                        status: StageStatus::Rejected,
                        rejection_reason: Some(reason),
                        remarks: decision.remarks.clone(),
                        decided_by: Some(caller.id.clone()),
                        ..AdministrativeApproval::default()
                    };
                    proposal.set_status(ProposalStatus::RejectedAdministrativeApproval, now);
                },
            }
            Ok(())
        })
    }

    /// Opens the tender process.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] unless the proposal is pending tender.
    pub fn start_tender(
        &self,
        proposal_id: &str,
        request: &StartTender,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::StartTender;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::PendingTender, kind)?;
            require_text("notice_number", &request.notice_number)?;
            proposal.tender.stage = TenderStage::Published;
            proposal.tender.notice_number = Some(request.notice_number.clone());
            proposal.tender.published_on = Some(request.published_on);
            proposal.tender.decided_by = Some(caller.id.clone());
            proposal.set_status(ProposalStatus::TenderInProgress, now);
            Ok(())
        })
    }

    /// Moves the tender sub-stage forward.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] when the target stage is not strictly
    /// ahead, or is the award (awarding has its own transition).
    pub fn advance_tender(
        &self,
        proposal_id: &str,
        request: &AdvanceTender,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::AdvanceTender;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, _now| {
            expect_status(proposal, ProposalStatus::TenderInProgress, kind)?;
            let target = request.stage;
            if matches!(target, TenderStage::NotStarted | TenderStage::Awarded) {
                return Err(EngineError::Validation {
                    field: "stage",
                    reason: format!("cannot advance to {target}"),
                });
            }
            if target.ordinal() <= proposal.tender.stage.ordinal() {
                return Err(EngineError::Validation {
                    field: "stage",
                    reason: format!(
                        "tender stage may only move forward, not {} to {target}",
                        proposal.tender.stage
                    ),
                });
            }
            proposal.tender.stage = target;
            proposal.tender.decided_by = Some(caller.id.clone());
            Ok(())
        })
    }

    /// Awards the tender and moves the proposal on to work-order issuance.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] unless a tender is in progress.
    pub fn award_tender(
        &self,
        proposal_id: &str,
        request: &AwardTender,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::AwardTender;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::TenderInProgress, kind)?;
            require_text("contractor", &request.contractor)?;
            require_positive("amount", request.amount)?;
            proposal.tender.stage = TenderStage::Awarded;
            proposal.tender.contractor = Some(request.contractor.clone());
            proposal.tender.awarded_amount = Some(request.amount);
            proposal.tender.award_date = Some(request.award_date);
            proposal.tender.decided_by = Some(caller.id.clone());
            proposal.set_status(ProposalStatus::PendingWorkOrder, now);
            Ok(())
        })
    }

    /// Cancels the tender, resetting its sub-stage for a fresh attempt.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] unless a tender is in progress.
    pub fn cancel_tender(
        &self,
        proposal_id: &str,
        request: &CancelTender,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::CancelTender;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::TenderInProgress, kind)?;
            require_text("reason", &request.reason)?;
            proposal
                .tender
                .reset_after_cancellation(request.reason.clone(), caller.id.clone());
            proposal.set_status(ProposalStatus::PendingTender, now);
            Ok(())
        })
    }

    /// Issues the work order and initializes the disbursement ledger.
    ///
    /// # Errors
    ///
    /// [`EngineError::Conflict`] when the order number is already used by
    /// another proposal.
    pub fn create_work_order(
        &self,
        proposal_id: &str,
        request: &CreateWorkOrder,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::CreateWorkOrder;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::PendingWorkOrder, kind)?;
            require_text("number", &request.number)?;
            require_text("contractor", &request.contractor)?;
            require_positive("amount", request.amount)?;
            proposal.work_order = WorkOrder {
                status: StageStatus::Approved,
                order_number: Some(request.number.clone()),
                order_date: Some(request.date),
                amount: Some(request.amount),
                contractor: Some(request.contractor.clone()),
                issued_by: Some(caller.id.clone()),
            };
            proposal.ledger = Some(DisbursementLedger::new(request.amount));
            proposal.set_status(ProposalStatus::WorkOrderCreated, now);
            Ok(())
        })
    }

    /// Amends the work order before work starts.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] once work is in progress or done;
    /// [`EngineError::Validation`] when the new amount would drop the
    /// sanction below what was already released.
    pub fn update_work_order(
        &self,
        proposal_id: &str,
        request: &UpdateWorkOrder,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::UpdateWorkOrder;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, _now| {
            expect_status(proposal, ProposalStatus::WorkOrderCreated, kind)?;
            if request.amount.is_none() && request.contractor.is_none() {
                return Err(EngineError::Validation {
                    field: "payload",
                    reason: "at least one of amount or contractor is required".to_string(),
                });
            }
            if let Some(contractor) = &request.contractor {
                require_text("contractor", contractor)?;
                proposal.work_order.contractor = Some(contractor.clone());
            }
            if let Some(amount) = request.amount {
                require_positive("amount", amount)?;
                let ledger = ledger_mut(proposal, kind)?;
                ledger.revise_sanction(amount)?;
                proposal.work_order.amount = Some(amount);
            }
            Ok(())
        })
    }

    /// Marks physical work as started.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] unless a work order was created.
    pub fn start_work(
        &self,
        proposal_id: &str,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::StartWork;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::WorkOrderCreated, kind)?;
            proposal.set_status(ProposalStatus::WorkInProgress, now);
            Ok(())
        })
    }

    /// Releases an installment against the sanction.
    ///
    /// # Errors
    ///
    /// [`EngineError::Overrun`] if the release would exceed the sanctioned
    /// amount; the ledger is left untouched.
    pub fn add_installment(
        &self,
        proposal_id: &str,
        request: &AddInstallment,
        caller: &CallerContext,
    ) -> Result<InstallmentReceipt, EngineError> {
        let kind = TransitionKind::AddInstallment;
        self.policy.authorize_role(caller, kind)?;
        let proposal = self.apply(proposal_id, kind, caller, |proposal, now| {
            if !matches!(
                proposal.status,
                ProposalStatus::WorkOrderCreated | ProposalStatus::WorkInProgress
            ) {
                return Err(EngineError::InvalidState {
                    current: proposal.status,
                    transition: kind,
                });
            }
            let ledger = ledger_mut(proposal, kind)?;
            ledger.add_installment(request.amount, request.date, now)?;
            Ok(())
        })?;

        let ledger = proposal.ledger().ok_or_else(|| corrupt_after_commit(proposal_id))?;
        let installment = ledger
            .installments()
            .last()
            .cloned()
            .ok_or_else(|| corrupt_after_commit(proposal_id))?;
        Ok(InstallmentReceipt {
            total_released: ledger.total_released(),
            remaining_balance: ledger.remaining_balance(),
            installment,
        })
    }

    /// Records physical progress; reaching 100 completes the work.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for a percentage above 100 or below the
    /// recorded figure.
    pub fn update_progress(
        &self,
        proposal_id: &str,
        request: &UpdateProgress,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::UpdateProgress;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            if !matches!(
                proposal.status,
                ProposalStatus::WorkOrderCreated | ProposalStatus::WorkInProgress
            ) {
                return Err(EngineError::InvalidState {
                    current: proposal.status,
                    transition: kind,
                });
            }
            let expenditure = {
                let ledger = ledger_mut(proposal, kind)?;
                ledger.record_progress(request.percent)?;
                if let Some(amount) = request.expenditure {
                    ledger.record_expenditure(amount);
                }
                ledger.expenditure()
            };
            if request.percent == 100 {
                proposal.final_cost = expenditure.or(proposal.work_order.amount);
                proposal.completion_date = Some(now);
                proposal.set_status(ProposalStatus::WorkCompleted, now);
            } else if proposal.status == ProposalStatus::WorkOrderCreated {
                proposal.set_status(ProposalStatus::WorkInProgress, now);
            }
            Ok(())
        })
    }

    /// Explicitly completes the work, forcing progress to 100.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] unless work is in progress.
    pub fn complete_work(
        &self,
        proposal_id: &str,
        request: &CompleteWork,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::CompleteWork;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            expect_status(proposal, ProposalStatus::WorkInProgress, kind)?;
            let expenditure = {
                let ledger = ledger_mut(proposal, kind)?;
                ledger.force_complete();
                if let Some(amount) = request.final_expenditure {
                    ledger.record_expenditure(amount);
                }
                ledger.expenditure()
            };
            proposal.final_cost = request
                .final_expenditure
                .or(expenditure)
                .or(proposal.work_order.amount);
            proposal.completion_date = Some(now);
            proposal.set_status(ProposalStatus::WorkCompleted, now);
            Ok(())
        })
    }

    /// Cancels the work. Only the override role may drive this; the state
    /// exists for exceptional administrative action.
    ///
    /// # Errors
    ///
    /// [`EngineError::Forbidden`] for every non-override caller.
    pub fn cancel_work(
        &self,
        proposal_id: &str,
        request: &CancelWork,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::CancelWork;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            if !matches!(
                proposal.status,
                ProposalStatus::WorkOrderCreated | ProposalStatus::WorkInProgress
            ) {
                return Err(EngineError::InvalidState {
                    current: proposal.status,
                    transition: kind,
                });
            }
            require_text("reason", &request.reason)?;
            proposal.cancellation_reason = Some(request.reason.clone());
            proposal.set_status(ProposalStatus::WorkCancelled, now);
            Ok(())
        })
    }

    /// Records attachment metadata on a live proposal.
    ///
    /// # Errors
    ///
    /// [`EngineError::Forbidden`] unless the caller owns the proposal (or
    /// overrides); [`EngineError::InvalidState`] on terminal proposals.
    pub fn attach_document(
        &self,
        proposal_id: &str,
        request: &AttachDocument,
        caller: &CallerContext,
    ) -> Result<Proposal, EngineError> {
        let kind = TransitionKind::AttachDocument;
        self.policy.authorize_role(caller, kind)?;
        self.apply(proposal_id, kind, caller, |proposal, now| {
            if proposal.status.is_terminal() {
                return Err(EngineError::InvalidState {
                    current: proposal.status,
                    transition: kind,
                });
            }
            self.policy
                .authorize_owner(caller, kind, &proposal.submitted_by)?;
            require_text("name", &request.name)?;
            require_text("content_type", &request.content_type)?;
            proposal.attachments.push(AttachmentRef {
                name: request.name.clone(),
                size_bytes: request.size_bytes,
                content_type: request.content_type.clone(),
                owner_id: caller.id.clone(),
                uploaded_at: now,
            });
            Ok(())
        })
    }

    /// Physically deletes a proposal.
    ///
    /// Regular callers may only delete their own proposal while it is still
    /// pending technical approval; override may delete from any state.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] past the initial state for regular
    /// callers.
    pub fn delete_proposal(
        &self,
        proposal_id: &str,
        caller: &CallerContext,
    ) -> Result<(), EngineError> {
        let kind = TransitionKind::DeleteProposal;
        self.policy.authorize_role(caller, kind)?;

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let VersionedProposal { proposal, version } = self.store.load(proposal_id)?;
            if !caller.role.is_override() {
                self.policy
                    .authorize_owner(caller, kind, &proposal.submitted_by)?;
                if proposal.status.past_initial() {
                    return Err(EngineError::InvalidState {
                        current: proposal.status,
                        transition: kind,
                    });
                }
            }
            let log = TransitionRecord {
                proposal_id: proposal_id.to_string(),
                transition: kind,
                from_status: Some(proposal.status),
                to_status: proposal.status,
                actor_id: caller.id.clone(),
                occurred_at: Utc::now(),
            };
            match self.store.delete(proposal_id, version, &log) {
                Ok(()) => {
                    tracing::info!(proposal_id, "proposal deleted");
                    return Ok(());
                },
                Err(StoreError::VersionConflict { .. }) if attempts < self.max_update_retries => {},
                Err(StoreError::VersionConflict { .. }) => {
                    return Err(EngineError::Contention {
                        proposal_id: proposal_id.to_string(),
                        attempts,
                    });
                },
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Shared load-mutate-commit loop with bounded optimistic retries.
    ///
    /// Guards run inside `mutate` against freshly loaded state on every
    /// attempt, so a retry can never commit a decision made against stale
    /// data.
    fn apply<F>(
        &self,
        proposal_id: &str,
        transition: TransitionKind,
        caller: &CallerContext,
        mutate: F,
    ) -> Result<Proposal, EngineError>
    where
        F: Fn(&mut Proposal, DateTime<Utc>) -> Result<(), EngineError>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let VersionedProposal {
                mut proposal,
                version,
            } = self.store.load(proposal_id)?;
            let now = Utc::now();
            let from = proposal.status;
            mutate(&mut proposal, now)?;

            let log = TransitionRecord {
                proposal_id: proposal.id.clone(),
                transition,
                from_status: Some(from),
                to_status: proposal.status,
                actor_id: caller.id.clone(),
                occurred_at: now,
            };
            match self.store.update(&proposal, version, Some(&log)) {
                Ok(_) => {
                    tracing::info!(
                        proposal_id = %proposal.id,
                        transition = %transition,
                        from = %from,
                        to = %proposal.status,
                        "transition committed"
                    );
                    return Ok(proposal);
                },
                Err(StoreError::VersionConflict { .. }) if attempts < self.max_update_retries => {
                    tracing::debug!(
                        proposal_id,
                        transition = %transition,
                        attempts,
                        "version conflict, retrying"
                    );
                },
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::warn!(
                        proposal_id,
                        transition = %transition,
                        attempts,
                        "giving up under contention"
                    );
                    return Err(EngineError::Contention {
                        proposal_id: proposal_id.to_string(),
                        attempts,
                    });
                },
                Err(other) => return Err(other.into()),
            }
        }
    }
}

/// Fails with `InvalidState` unless the proposal sits exactly at `expected`.
fn expect_status(
    proposal: &Proposal,
    expected: ProposalStatus,
    transition: TransitionKind,
) -> Result<(), EngineError> {
    if proposal.status == expected {
        Ok(())
    } else {
        Err(EngineError::InvalidState {
            current: proposal.status,
            transition,
        })
    }
}

/// The ledger must exist in every state that reaches these operations; a
/// missing ledger means the stored document was tampered with.
fn ledger_mut<'a>(
    proposal: &'a mut Proposal,
    transition: TransitionKind,
) -> Result<&'a mut DisbursementLedger, EngineError> {
    let current = proposal.status;
    proposal
        .ledger
        .as_mut()
        .ok_or(EngineError::InvalidState {
            current,
            transition,
        })
}

fn corrupt_after_commit(proposal_id: &str) -> EngineError {
    EngineError::Storage(StoreError::Corrupt {
        proposal_id: proposal_id.to_string(),
        details: "ledger missing from committed aggregate".to_string(),
    })
}

fn require_text(field: &'static str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        Err(EngineError::Validation {
            field,
            reason: "must not be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

fn require_present(field: &'static str, value: Option<&str>) -> Result<String, EngineError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(EngineError::Validation {
            field,
            reason: "required for this action".to_string(),
        }),
    }
}

fn require_amount(field: &'static str, value: Option<u64>) -> Result<u64, EngineError> {
    match value {
        Some(v) if v > 0 => Ok(v),
        Some(_) => Err(EngineError::Validation {
            field,
            reason: "must be positive".to_string(),
        }),
        None => Err(EngineError::Validation {
            field,
            reason: "required for this action".to_string(),
        }),
    }
}

fn require_positive(field: &'static str, value: u64) -> Result<(), EngineError> {
    if value == 0 {
        Err(EngineError::Validation {
            field,
            reason: "must be positive".to_string(),
        })
    } else {
        Ok(())
    }
}

//! Proposal aggregate: canonical status, stage records, and identity.
//!
//! A proposal is created at submission and from then on mutated exclusively
//! through lifecycle-engine transitions. It embeds one record per stage and
//! one disbursement ledger; none of these are independently addressable
//! entities.

mod stage;
mod state;

#[cfg(test)]
mod tests;

pub use stage::{
    AdministrativeApproval, AttachmentRef, StageStatus, TechnicalApproval, TenderProcess,
    TenderStage, WorkOrder,
};
pub use state::{Proposal, ProposalStatus};

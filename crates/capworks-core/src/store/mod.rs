//! Persistence collaborator for proposal aggregates.
//!
//! The whole aggregate (stage records and ledger included) persists as one
//! document per proposal, so every mutation is single-row and can commit
//! atomically. Concurrency control is optimistic: each row carries a
//! monotonic `version`, and an update only lands if the caller read the
//! version it is replacing. Losers observe [`StoreError::VersionConflict`]
//! and reload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::TransitionKind;
use crate::proposal::{Proposal, ProposalStatus};

mod sqlite;

pub use sqlite::SqliteProposalStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Aggregate document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No proposal with the given id.
    #[error("proposal not found: {proposal_id}")]
    NotFound {
        /// The id that was not found.
        proposal_id: String,
    },

    /// A concurrent writer committed first; reload and retry.
    #[error("version conflict on proposal {proposal_id}")]
    VersionConflict {
        /// The contended proposal id.
        proposal_id: String,
    },

    /// Serial number already assigned to another proposal.
    #[error("serial number already in use: {serial}")]
    DuplicateSerial {
        /// The conflicting serial number.
        serial: String,
    },

    /// Work-order number already used by another proposal.
    #[error("work-order number already in use: {number}")]
    DuplicateWorkOrderNumber {
        /// The conflicting order number.
        number: String,
    },

    /// Stored document failed integrity checks on load.
    #[error("corrupt record for proposal {proposal_id}: {details}")]
    Corrupt {
        /// The affected proposal id.
        proposal_id: String,
        /// What failed.
        details: String,
    },
}

/// A loaded aggregate together with the version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedProposal {
    /// The aggregate document.
    pub proposal: Proposal,
    /// Version to present back on update.
    pub version: u64,
}

/// One row of the append-only transition audit feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The proposal the transition applied to.
    pub proposal_id: String,
    /// The transition that committed.
    pub transition: TransitionKind,
    /// Status before the transition; `None` for submission.
    pub from_status: Option<ProposalStatus>,
    /// Status after the transition.
    pub to_status: ProposalStatus,
    /// Identity of the driving caller.
    pub actor_id: String,
    /// Commit instant.
    pub occurred_at: DateTime<Utc>,
}

/// Storage operations the lifecycle engine relies on.
///
/// Implementations must make `insert`/`update`/`delete` atomic with their
/// audit-log append, and `next_serial_seq` an atomic increment-and-read.
pub trait ProposalStore: Send + Sync {
    /// Inserts a freshly submitted aggregate at version 1.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateSerial`] if the serial number is taken.
    fn insert(&self, proposal: &Proposal, log: &TransitionRecord) -> Result<(), StoreError>;

    /// Loads an aggregate and its current version.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id; [`StoreError::Corrupt`]
    /// if the stored document fails integrity checks.
    fn load(&self, proposal_id: &str) -> Result<VersionedProposal, StoreError>;

    /// Replaces an aggregate if `expected_version` still matches, appending
    /// the audit row (when given) in the same transaction. Returns the new
    /// version.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] when a concurrent writer won;
    /// [`StoreError::DuplicateWorkOrderNumber`] on a unique-key collision.
    fn update(
        &self,
        proposal: &Proposal,
        expected_version: u64,
        log: Option<&TransitionRecord>,
    ) -> Result<u64, StoreError>;

    /// Physically deletes an aggregate if `expected_version` still matches.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] / [`StoreError::VersionConflict`] as above.
    fn delete(
        &self,
        proposal_id: &str,
        expected_version: u64,
        log: &TransitionRecord,
    ) -> Result<(), StoreError>;

    /// Atomically allocates the next serial sequence for `year`.
    ///
    /// # Errors
    ///
    /// Returns a database error if the counter cannot be advanced.
    fn next_serial_seq(&self, year: i32) -> Result<u64, StoreError>;

    /// Reads the audit feed for one proposal, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    fn transitions(&self, proposal_id: &str) -> Result<Vec<TransitionRecord>, StoreError>;
}

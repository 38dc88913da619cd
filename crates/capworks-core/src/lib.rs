//! Core lifecycle engine for public capital-works proposals.
//!
//! A proposal moves through submission, technical approval, administrative
//! approval, optional competitive tender, work-order issuance,
//! milestone-based fund disbursement, and completion. This crate owns the
//! part with real invariants: the lifecycle state machine, the guards on
//! every transition, and the disbursement ledger releasing installments
//! against a sanctioned ceiling.
//!
//! Identity resolution, reporting, attachment storage, and the transport
//! layer are external collaborators; the engine consumes an opaque
//! [`context::CallerContext`] and persists whole aggregates through
//! [`store::ProposalStore`].
//!
//! # Example
//!
//! ```rust
//! use capworks_core::config::EngineConfig;
//! use capworks_core::context::{CallerContext, Role};
//! use capworks_core::engine::{LifecycleEngine, SubmitProposal};
//! use capworks_core::store::SqliteProposalStore;
//!
//! let store = SqliteProposalStore::in_memory().expect("in-memory store");
//! let engine = LifecycleEngine::new(store, &EngineConfig::default());
//!
//! let submitter = CallerContext::new("user-1", Role::Submitter, "PWD");
//! let proposal = engine
//!     .submit(
//!         &SubmitProposal {
//!             work_type: "Road".into(),
//!             name: "Village link road".into(),
//!             agency: "District Council".into(),
//!             scheme: String::new(),
//!             description: String::new(),
//!             financial_year: "2026-27".into(),
//!             work_department: "PWD".into(),
//!             user_department: "PWD".into(),
//!             approving_department: "PWD".into(),
//!             block: String::new(),
//!             village: String::new(),
//!             proposed_amount: 100_000,
//!             requires_dpr: false,
//!             requires_tender: false,
//!         },
//!         &submitter,
//!     )
//!     .expect("submission");
//! assert_eq!(proposal.display_status(), "Pending Technical Approval");
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod ledger;
pub mod policy;
pub mod proposal;
pub mod serial;
pub mod store;

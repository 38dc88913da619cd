//! `SQLite`-backed proposal store.
//!
//! One row per aggregate: indexed columns for the keys the engine and the
//! (out-of-scope) reporting readers filter on, plus the aggregate document
//! as JSON. WAL mode allows concurrent reads while writes are in progress.
//! All multi-statement writes run inside a transaction so an aggregate can
//! never be observed half-updated.

// SQLite returns i64 for row IDs and counts, but they're always non-negative.
// Mutex poisoning indicates a panic in another thread, which is unrecoverable.
#![allow(clippy::cast_sign_loss, clippy::missing_panics_doc)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use super::{ProposalStore, StoreError, TransitionRecord, VersionedProposal};
use crate::policy::TransitionKind;
use crate::proposal::{Proposal, ProposalStatus};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// The proposal store backed by `SQLite`.
pub struct SqliteProposalStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProposalStore {
    /// Opens or creates a store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Maps a unique-constraint failure onto the domain conflict it means.
    fn map_constraint(err: rusqlite::Error, proposal: &Proposal) -> StoreError {
        if let rusqlite::Error::SqliteFailure(_, Some(ref msg)) = err {
            if msg.contains("proposals.serial_number") {
                return StoreError::DuplicateSerial {
                    serial: proposal.serial_number.as_str().to_string(),
                };
            }
            if msg.contains("proposals.work_order_number") {
                return StoreError::DuplicateWorkOrderNumber {
                    number: proposal
                        .work_order
                        .order_number
                        .clone()
                        .unwrap_or_default(),
                };
            }
        }
        StoreError::Database(err)
    }

    fn append_log(tx: &rusqlite::Transaction<'_>, log: &TransitionRecord) -> rusqlite::Result<()> {
        tx.execute(
            "INSERT INTO transition_log (proposal_id, transition, from_status, to_status, actor_id, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                log.proposal_id,
                log.transition.as_str(),
                log.from_status.map(|s| s.as_str()),
                log.to_status.as_str(),
                log.actor_id,
                log.occurred_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl ProposalStore for SqliteProposalStore {
    fn insert(&self, proposal: &Proposal, log: &TransitionRecord) -> Result<(), StoreError> {
        let record = serde_json::to_string(proposal)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO proposals (id, serial_number, status, work_order_number, version, record, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
            params![
                proposal.id,
                proposal.serial_number.as_str(),
                proposal.status.as_str(),
                proposal.work_order.order_number,
                record,
                log.occurred_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Self::map_constraint(e, proposal))?;

        Self::append_log(&tx, log)?;
        tx.commit()?;
        Ok(())
    }

    fn load(&self, proposal_id: &str) -> Result<VersionedProposal, StoreError> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT record, version FROM proposals WHERE id = ?1",
                params![proposal_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (record, version) = row.ok_or_else(|| StoreError::NotFound {
            proposal_id: proposal_id.to_string(),
        })?;

        let proposal: Proposal = serde_json::from_str(&record)?;
        if let Some(ledger) = proposal.ledger() {
            if !ledger.is_consistent() {
                return Err(StoreError::Corrupt {
                    proposal_id: proposal_id.to_string(),
                    details: "ledger derived fields do not reconcile".to_string(),
                });
            }
        }

        Ok(VersionedProposal {
            proposal,
            version: version as u64,
        })
    }

    fn update(
        &self,
        proposal: &Proposal,
        expected_version: u64,
        log: Option<&TransitionRecord>,
    ) -> Result<u64, StoreError> {
        let record = serde_json::to_string(proposal)?;
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let changed = tx
            .execute(
                "UPDATE proposals
                 SET status = ?1, work_order_number = ?2, record = ?3,
                     version = version + 1, updated_at = ?4
                 WHERE id = ?5 AND version = ?6",
                params![
                    proposal.status.as_str(),
                    proposal.work_order.order_number,
                    record,
                    now,
                    proposal.id,
                    expected_version,
                ],
            )
            .map_err(|e| Self::map_constraint(e, proposal))?;

        if changed == 0 {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM proposals WHERE id = ?1)",
                params![proposal.id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                StoreError::VersionConflict {
                    proposal_id: proposal.id.clone(),
                }
            } else {
                StoreError::NotFound {
                    proposal_id: proposal.id.clone(),
                }
            });
        }

        if let Some(log) = log {
            Self::append_log(&tx, log)?;
        }
        tx.commit()?;
        Ok(expected_version + 1)
    }

    fn delete(
        &self,
        proposal_id: &str,
        expected_version: u64,
        log: &TransitionRecord,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "DELETE FROM proposals WHERE id = ?1 AND version = ?2",
            params![proposal_id, expected_version],
        )?;

        if changed == 0 {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM proposals WHERE id = ?1)",
                params![proposal_id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                StoreError::VersionConflict {
                    proposal_id: proposal_id.to_string(),
                }
            } else {
                StoreError::NotFound {
                    proposal_id: proposal_id.to_string(),
                }
            });
        }

        Self::append_log(&tx, log)?;
        tx.commit()?;
        Ok(())
    }

    fn next_serial_seq(&self, year: i32) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let seq: i64 = conn.query_row(
            "INSERT INTO serial_counters (year, next_seq) VALUES (?1, 1)
             ON CONFLICT(year) DO UPDATE SET next_seq = next_seq + 1
             RETURNING next_seq",
            params![year],
            |row| row.get(0),
        )?;

        Ok(seq as u64)
    }

    fn transitions(&self, proposal_id: &str) -> Result<Vec<TransitionRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT proposal_id, transition, from_status, to_status, actor_id, occurred_at
             FROM transition_log
             WHERE proposal_id = ?1
             ORDER BY log_id ASC",
        )?;

        let rows = stmt
            .query_map(params![proposal_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (pid, transition, from_status, to_status, actor_id, occurred_at) in rows {
            let corrupt = |details: String| StoreError::Corrupt {
                proposal_id: pid.clone(),
                details,
            };
            records.push(TransitionRecord {
                transition: TransitionKind::parse(&transition)
                    .ok_or_else(|| corrupt(format!("unknown transition '{transition}'")))?,
                from_status: from_status
                    .map(|s| {
                        ProposalStatus::parse(&s)
                            .ok_or_else(|| corrupt(format!("unknown status '{s}'")))
                    })
                    .transpose()?,
                to_status: ProposalStatus::parse(&to_status)
                    .ok_or_else(|| corrupt(format!("unknown status '{to_status}'")))?,
                occurred_at: occurred_at
                    .parse::<DateTime<Utc>>()
                    .map_err(|e| corrupt(format!("bad timestamp: {e}")))?,
                proposal_id: pid,
                actor_id,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::proposal::{
        AdministrativeApproval, TechnicalApproval, TenderProcess, WorkOrder,
    };
    use crate::serial::SerialNumber;

    fn sample(id: &str, serial_seq: u64) -> Proposal {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
        Proposal {
            id: id.to_string(),
            serial_number: SerialNumber::format("CW", 2026, serial_seq, 4),
            work_type: "Road".to_string(),
            name: "Link road".to_string(),
            agency: "District Council".to_string(),
            scheme: "Rural Roads".to_string(),
            description: String::new(),
            financial_year: "2026-27".to_string(),
            work_department: "PWD".to_string(),
            user_department: "PWD".to_string(),
            approving_department: "PWD".to_string(),
            block: "North".to_string(),
            village: "Rampur".to_string(),
            proposed_amount: 100_000,
            requires_dpr: false,
            requires_tender: false,
            status: ProposalStatus::PendingTechnicalApproval,
            submitted_by: "user-1".to_string(),
            created_at: now,
            status_changed_at: now,
            technical: TechnicalApproval::default(),
            administrative: AdministrativeApproval::default(),
            tender: TenderProcess::default(),
            work_order: WorkOrder::default(),
            ledger: None,
            completion_date: None,
            final_cost: None,
            cancellation_reason: None,
            attachments: Vec::new(),
        }
    }

    fn submit_log(id: &str) -> TransitionRecord {
        TransitionRecord {
            proposal_id: id.to_string(),
            transition: TransitionKind::Submit,
            from_status: None,
            to_status: ProposalStatus::PendingTechnicalApproval,
            actor_id: "user-1".to_string(),
            occurred_at: Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_insert_and_load_round_trip() {
        let store = SqliteProposalStore::in_memory().unwrap();
        let proposal = sample("p-1", 1);

        store.insert(&proposal, &submit_log("p-1")).unwrap();
        let loaded = store.load("p-1").unwrap();

        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.proposal, proposal);
    }

    #[test]
    fn test_load_unknown_is_not_found() {
        let store = SqliteProposalStore::in_memory().unwrap();
        let err = store.load("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let store = SqliteProposalStore::in_memory().unwrap();
        store.insert(&sample("p-1", 1), &submit_log("p-1")).unwrap();

        let err = store
            .insert(&sample("p-2", 1), &submit_log("p-2"))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSerial { .. }));
    }

    #[test]
    fn test_stale_version_conflicts() {
        let store = SqliteProposalStore::in_memory().unwrap();
        let mut proposal = sample("p-1", 1);
        store.insert(&proposal, &submit_log("p-1")).unwrap();

        proposal.description = "first writer".to_string();
        let v2 = store.update(&proposal, 1, None).unwrap();
        assert_eq!(v2, 2);

        proposal.description = "stale writer".to_string();
        let err = store.update(&proposal, 1, None).unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let loaded = store.load("p-1").unwrap();
        assert_eq!(loaded.proposal.description, "first writer");
        assert_eq!(loaded.version, 2);
    }

    #[test]
    fn test_duplicate_work_order_number_rejected() {
        let store = SqliteProposalStore::in_memory().unwrap();
        let mut first = sample("p-1", 1);
        let mut second = sample("p-2", 2);
        store.insert(&first, &submit_log("p-1")).unwrap();
        store.insert(&second, &submit_log("p-2")).unwrap();

        first.work_order.order_number = Some("WO1".to_string());
        store.update(&first, 1, None).unwrap();

        second.work_order.order_number = Some("WO1".to_string());
        let err = store.update(&second, 1, None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateWorkOrderNumber { ref number } if number == "WO1"
        ));
    }

    #[test]
    fn test_serial_counter_monotone_per_year() {
        let store = SqliteProposalStore::in_memory().unwrap();
        assert_eq!(store.next_serial_seq(2026).unwrap(), 1);
        assert_eq!(store.next_serial_seq(2026).unwrap(), 2);
        assert_eq!(store.next_serial_seq(2027).unwrap(), 1);
        assert_eq!(store.next_serial_seq(2026).unwrap(), 3);
    }

    #[test]
    fn test_delete_with_version_check() {
        let store = SqliteProposalStore::in_memory().unwrap();
        let proposal = sample("p-1", 1);
        store.insert(&proposal, &submit_log("p-1")).unwrap();

        let mut log = submit_log("p-1");
        log.transition = TransitionKind::DeleteProposal;
        store.delete("p-1", 1, &log).unwrap();

        assert!(matches!(
            store.load("p-1").unwrap_err(),
            StoreError::NotFound { .. }
        ));
        // The audit trail outlives the row.
        let transitions = store.transitions("p-1").unwrap();
        assert_eq!(transitions.len(), 2);
    }

    #[test]
    fn test_transition_log_round_trip() {
        let store = SqliteProposalStore::in_memory().unwrap();
        let proposal = sample("p-1", 1);
        store.insert(&proposal, &submit_log("p-1")).unwrap();

        let transitions = store.transitions("p-1").unwrap();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].transition, TransitionKind::Submit);
        assert_eq!(transitions[0].from_status, None);
        assert_eq!(
            transitions[0].to_status,
            ProposalStatus::PendingTechnicalApproval
        );
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposals.db");
        {
            let store = SqliteProposalStore::open(&path).unwrap();
            store.insert(&sample("p-1", 1), &submit_log("p-1")).unwrap();
        }
        let store = SqliteProposalStore::open(&path).unwrap();
        assert_eq!(store.load("p-1").unwrap().version, 1);
    }
}

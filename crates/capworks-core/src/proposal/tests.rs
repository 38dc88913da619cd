//! Tests for the proposal aggregate and stage records.

use chrono::{TimeZone, Utc};

use super::{Proposal, ProposalStatus, TenderProcess, TenderStage};
use crate::ledger::DisbursementLedger;
use crate::serial::SerialNumber;

fn sample_proposal() -> Proposal {
    let now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
    Proposal {
        id: "7e3f0a1c-0000-0000-0000-000000000001".to_string(),
        serial_number: SerialNumber::format("CW", 2026, 1, 4),
        work_type: "Road".to_string(),
        name: "Village link road".to_string(),
        agency: "District Council".to_string(),
        scheme: "Rural Roads".to_string(),
        description: "1.2 km link road".to_string(),
        financial_year: "2026-27".to_string(),
        work_department: "PWD".to_string(),
        user_department: "Rural Development".to_string(),
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
        technical: super::TechnicalApproval::default(),
        administrative: super::AdministrativeApproval::default(),
        tender: TenderProcess::default(),
        work_order: super::WorkOrder::default(),
        ledger: None,
        completion_date: None,
        final_cost: None,
        cancellation_reason: None,
        attachments: Vec::new(),
    }
}

#[test]
fn test_status_string_round_trip() {
    for status in ProposalStatus::all() {
        assert_eq!(ProposalStatus::parse(status.as_str()), Some(*status));
    }
    assert_eq!(ProposalStatus::parse("NOT_A_STATUS"), None);
}

#[test]
fn test_terminal_states() {
    let terminal = [
        ProposalStatus::RejectedTechnicalApproval,
        ProposalStatus::RejectedAdministrativeApproval,
        ProposalStatus::WorkCompleted,
        ProposalStatus::WorkCancelled,
    ];
    for status in ProposalStatus::all() {
        assert_eq!(status.is_terminal(), terminal.contains(status));
    }
}

#[test]
fn test_display_label_always_tracks_status() {
    // The display label is derived, so equality with the canonical status
    // is structural.
    let mut proposal = sample_proposal();
    for status in ProposalStatus::all() {
        proposal.status = *status;
        assert_eq!(proposal.display_status(), status.display_label());
    }
}

#[test]
fn test_set_status_restamps_change_instant() {
    let mut proposal = sample_proposal();
    let later = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();

    proposal.set_status(ProposalStatus::PendingAdministrativeApproval, later);

    assert_eq!(proposal.status, ProposalStatus::PendingAdministrativeApproval);
    assert_eq!(proposal.status_changed_at, later);
    assert_ne!(proposal.created_at, proposal.status_changed_at);
}

#[test]
fn test_tender_reset_clears_interim_data() {
    let mut tender = TenderProcess {
        stage: TenderStage::UnderEvaluation,
        notice_number: Some("NT-9".to_string()),
        published_on: None,
        contractor: Some("ACME".to_string()),
        awarded_amount: Some(5_000),
        award_date: None,
        cancellation_reason: None,
        decided_by: Some("tm-1".to_string()),
    };

    tender.reset_after_cancellation("single bid".to_string(), "tm-2".to_string());

    assert_eq!(tender.stage, TenderStage::NotStarted);
    assert_eq!(tender.notice_number, None);
    assert_eq!(tender.contractor, None);
    assert_eq!(tender.awarded_amount, None);
    assert_eq!(tender.cancellation_reason.as_deref(), Some("single bid"));
    assert_eq!(tender.decided_by.as_deref(), Some("tm-2"));
}

#[test]
fn test_tender_stage_ordinals_strictly_increase() {
    let stages = [
        TenderStage::NotStarted,
        TenderStage::Published,
        TenderStage::BidsOpened,
        TenderStage::UnderEvaluation,
        TenderStage::Awarded,
    ];
    for pair in stages.windows(2) {
        assert!(pair[0].ordinal() < pair[1].ordinal());
    }
}

#[test]
fn test_aggregate_serde_round_trip() {
    let mut proposal = sample_proposal();
    proposal.ledger = Some(DisbursementLedger::new(90_000));

    let json = serde_json::to_string(&proposal).unwrap();
    let back: Proposal = serde_json::from_str(&json).unwrap();
    assert_eq!(back, proposal);
}

//! Tests for the disbursement ledger.

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use super::{DisbursementLedger, LedgerError};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
}

#[test]
fn test_new_ledger_balances() {
    let ledger = DisbursementLedger::new(90_000);
    assert_eq!(ledger.sanctioned_amount(), 90_000);
    assert_eq!(ledger.total_released(), 0);
    assert_eq!(ledger.remaining_balance(), 90_000);
    assert!(ledger.installments().is_empty());
    assert!(!ledger.has_disbursements());
    assert!(ledger.is_consistent());
}

#[test]
fn test_add_installment_updates_totals() {
    let mut ledger = DisbursementLedger::new(90_000);
    let installment = ledger.add_installment(50_000, date(2), now()).unwrap();

    assert_eq!(installment.number, 1);
    assert_eq!(installment.amount, 50_000);
    assert_eq!(ledger.total_released(), 50_000);
    assert_eq!(ledger.remaining_balance(), 40_000);
    assert!(ledger.has_disbursements());
    assert!(ledger.is_consistent());
}

#[test]
fn test_overrun_rejected_and_ledger_unchanged() {
    let mut ledger = DisbursementLedger::new(90_000);
    ledger.add_installment(50_000, date(2), now()).unwrap();

    let err = ledger.add_installment(45_000, date(3), now()).unwrap_err();
    match err {
        LedgerError::Overrun {
            requested,
            total_released,
            sanctioned_amount,
        } => {
            assert_eq!(requested, 45_000);
            assert_eq!(total_released, 50_000);
            assert_eq!(sanctioned_amount, 90_000);
        },
        other => panic!("expected Overrun, got {other:?}"),
    }
    assert_eq!(ledger.total_released(), 50_000);
    assert_eq!(ledger.remaining_balance(), 40_000);
    assert_eq!(ledger.installments().len(), 1);
}

#[test]
fn test_release_up_to_exact_sanction_allowed() {
    let mut ledger = DisbursementLedger::new(90_000);
    ledger.add_installment(50_000, date(2), now()).unwrap();
    ledger.add_installment(40_000, date(3), now()).unwrap();
    assert_eq!(ledger.remaining_balance(), 0);
    assert!(ledger.is_consistent());
}

#[test]
fn test_zero_amount_rejected() {
    let mut ledger = DisbursementLedger::new(90_000);
    let err = ledger.add_installment(0, date(2), now()).unwrap_err();
    assert!(matches!(err, LedgerError::ZeroAmount));
}

#[test]
fn test_installment_numbers_contiguous() {
    let mut ledger = DisbursementLedger::new(100_000);
    for day in 1..=5 {
        ledger.add_installment(10_000, date(day), now()).unwrap();
    }
    for (i, installment) in ledger.installments().iter().enumerate() {
        assert_eq!(installment.number as usize, i + 1);
    }
}

#[test]
fn test_revise_sanction_rederives_balance() {
    let mut ledger = DisbursementLedger::new(90_000);
    ledger.add_installment(50_000, date(2), now()).unwrap();

    ledger.revise_sanction(120_000).unwrap();
    assert_eq!(ledger.sanctioned_amount(), 120_000);
    assert_eq!(ledger.remaining_balance(), 70_000);
    assert!(ledger.is_consistent());
}

#[test]
fn test_revise_sanction_below_released_rejected() {
    let mut ledger = DisbursementLedger::new(90_000);
    ledger.add_installment(50_000, date(2), now()).unwrap();

    let err = ledger.revise_sanction(40_000).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::SanctionBelowReleased {
            new_amount: 40_000,
            total_released: 50_000,
        }
    ));
    assert_eq!(ledger.sanctioned_amount(), 90_000);
}

#[test]
fn test_progress_monotone() {
    let mut ledger = DisbursementLedger::new(90_000);
    ledger.record_progress(30).unwrap();
    ledger.record_progress(30).unwrap();
    ledger.record_progress(75).unwrap();

    let err = ledger.record_progress(60).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ProgressDecrease {
            current: 75,
            requested: 60,
        }
    ));
    assert_eq!(ledger.progress_percent(), 75);
}

#[test]
fn test_progress_over_100_rejected() {
    let mut ledger = DisbursementLedger::new(90_000);
    let err = ledger.record_progress(101).unwrap_err();
    assert!(matches!(err, LedgerError::PercentOutOfRange { value: 101 }));
}

#[test]
fn test_force_complete_sets_100() {
    let mut ledger = DisbursementLedger::new(90_000);
    ledger.record_progress(40).unwrap();
    ledger.force_complete();
    assert_eq!(ledger.progress_percent(), 100);
}

#[test]
fn test_expenditure_independent_of_released() {
    let mut ledger = DisbursementLedger::new(90_000);
    ledger.record_expenditure(12_345);
    assert_eq!(ledger.expenditure(), Some(12_345));
    assert_eq!(ledger.total_released(), 0);
}

proptest! {
    /// Whatever sequence of releases is attempted, the derived-balance
    /// invariants hold and the cap is never overshot.
    #[test]
    fn prop_ledger_invariants_hold(
        sanction in 1u64..10_000_000,
        amounts in proptest::collection::vec(0u64..1_000_000, 0..32),
    ) {
        let mut ledger = DisbursementLedger::new(sanction);
        for (i, amount) in amounts.iter().enumerate() {
            let day = u32::try_from(i % 28).unwrap() + 1;
            let _ = ledger.add_installment(*amount, date(day), now());
            prop_assert!(ledger.is_consistent());
            prop_assert!(ledger.total_released() <= sanction);
        }
        let sum: u64 = ledger.installments().iter().map(|i| i.amount).sum();
        prop_assert_eq!(sum, ledger.total_released());
        prop_assert_eq!(
            ledger.remaining_balance(),
            sanction - ledger.total_released()
        );
    }
}

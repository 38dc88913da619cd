//! Disbursement ledger for a sanctioned work order.
//!
//! Tracks the sanctioned amount, cumulative released amount, remaining
//! balance, and the ordered, append-only installment list for one proposal.
//! The ledger is fail-closed: a release that would exceed the sanction is
//! denied before any mutation.
//!
//! # Invariants
//!
//! - `remaining_balance == sanctioned_amount - total_released`, never
//!   negative.
//! - `total_released == sum(installments[].amount)`.
//! - `installments[i].number == i + 1` (1-based, contiguous, append-only).
//! - `progress_percent` stays within `0..=100` and never decreases.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Errors raised by ledger mutations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Release would exceed the sanctioned amount.
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

    /// Installment amounts must be positive.
    #[error("installment amount must be positive")]
    ZeroAmount,

    /// Sanction cannot be revised below what was already released.
    #[error("sanction {new_amount} is below the {total_released} already released")]
    SanctionBelowReleased {
        /// The proposed new sanction.
        new_amount: u64,
        /// Amount released so far.
        total_released: u64,
    },

    /// Progress percentage out of range.
    #[error("progress percentage {value} exceeds 100")]
    PercentOutOfRange {
        /// The offending value.
        value: u8,
    },

    /// Progress percentage may not decrease.
    #[error("progress may not decrease: currently {current}, requested {requested}")]
    ProgressDecrease {
        /// The recorded percentage.
        current: u8,
        /// The requested (lower) percentage.
        requested: u8,
    },
}

/// One disbursement event against the sanctioned amount.
///
/// Immutable once recorded; entries are never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position in the installment list.
    pub number: u32,
    /// Released amount, always positive.
    pub amount: u64,
    /// Date the funds were released, as supplied by the caller.
    pub released_on: NaiveDate,
    /// Instant the ledger recorded the entry.
    pub recorded_at: DateTime<Utc>,
}

/// The disbursement ledger embedded in a proposal once a work order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementLedger {
    sanctioned_amount: u64,
    total_released: u64,
    remaining_balance: u64,
    installments: Vec<Installment>,
    progress_percent: u8,
    expenditure: Option<u64>,
}

impl DisbursementLedger {
    /// Initializes a ledger against a freshly issued work order.
    #[must_use]
    pub const fn new(sanctioned_amount: u64) -> Self {
        Self {
            sanctioned_amount,
            total_released: 0,
            remaining_balance: sanctioned_amount,
            installments: Vec::new(),
            progress_percent: 0,
            expenditure: None,
        }
    }

    /// The sanctioned ceiling for releases.
    #[must_use]
    pub const fn sanctioned_amount(&self) -> u64 {
        self.sanctioned_amount
    }

    /// Cumulative released amount.
    #[must_use]
    pub const fn total_released(&self) -> u64 {
        self.total_released
    }

    /// Derived balance still available for release.
    #[must_use]
    pub const fn remaining_balance(&self) -> u64 {
        self.remaining_balance
    }

    /// The ordered installment list.
    #[must_use]
    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    /// Physical progress percentage, `0..=100`.
    #[must_use]
    pub const fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Running expenditure figure, independent of releases.
    #[must_use]
    pub const fn expenditure(&self) -> Option<u64> {
        self.expenditure
    }

    /// Returns `true` if at least one installment has been released.
    #[must_use]
    pub fn has_disbursements(&self) -> bool {
        !self.installments.is_empty()
    }

    /// Revises the sanctioned amount and re-derives the remaining balance
    /// from the current `total_released`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SanctionBelowReleased`] if the new sanction is
    /// below what was already released.
    pub fn revise_sanction(&mut self, new_amount: u64) -> Result<(), LedgerError> {
        if new_amount < self.total_released {
            return Err(LedgerError::SanctionBelowReleased {
                new_amount,
                total_released: self.total_released,
            });
        }
        self.sanctioned_amount = new_amount;
        self.remaining_balance = new_amount - self.total_released;
        Ok(())
    }

    /// Appends an installment with the next contiguous number and updates
    /// the released/remaining totals as one unit.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`] for a zero amount and
    /// [`LedgerError::Overrun`] if the release would exceed the sanction.
    /// On error the ledger is unchanged.
    pub fn add_installment(
        &mut self,
        amount: u64,
        released_on: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Result<Installment, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let new_total = self.total_released.checked_add(amount).ok_or({
            LedgerError::Overrun {
                requested: amount,
                total_released: self.total_released,
                sanctioned_amount: self.sanctioned_amount,
            }
        })?;
        if new_total > self.sanctioned_amount {
            return Err(LedgerError::Overrun {
                requested: amount,
                total_released: self.total_released,
                sanctioned_amount: self.sanctioned_amount,
            });
        }

        let number = u32::try_from(self.installments.len()).map_or(u32::MAX, |n| n + 1);
        let installment = Installment {
            number,
            amount,
            released_on,
            recorded_at,
        };
        self.installments.push(installment.clone());
        self.total_released = new_total;
        self.remaining_balance = self.sanctioned_amount - new_total;
        Ok(installment)
    }

    /// Records a new progress percentage.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PercentOutOfRange`] for values above 100 and
    /// [`LedgerError::ProgressDecrease`] when the value is below the
    /// recorded percentage.
    pub fn record_progress(&mut self, percent: u8) -> Result<(), LedgerError> {
        if percent > 100 {
            return Err(LedgerError::PercentOutOfRange { value: percent });
        }
        if percent < self.progress_percent {
            return Err(LedgerError::ProgressDecrease {
                current: self.progress_percent,
                requested: percent,
            });
        }
        self.progress_percent = percent;
        Ok(())
    }

    /// Forces progress to 100, used by explicit completion.
    pub fn force_complete(&mut self) {
        self.progress_percent = 100;
    }

    /// Records the running expenditure figure.
    pub fn record_expenditure(&mut self, amount: u64) {
        self.expenditure = Some(amount);
    }

    /// Verifies the derived-field invariants. Used by tests and the store's
    /// read path to detect corrupted documents.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let sum: u64 = self.installments.iter().map(|i| i.amount).sum();
        let contiguous = self
            .installments
            .iter()
            .enumerate()
            .all(|(i, inst)| inst.number as usize == i + 1);
        sum == self.total_released
            && self.sanctioned_amount >= self.total_released
            && self.remaining_balance == self.sanctioned_amount - self.total_released
            && self.progress_percent <= 100
            && contiguous
    }
}

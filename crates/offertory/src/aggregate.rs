//! Summary views over the donation list.
//!
//! Every function here is a pure fold over a record slice. Nothing is
//! cached; callers recompute from the ledger's current contents. Sums use
//! checked addition and report [`Error::AmountOverflow`] instead of
//! panicking.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::donation::{DonationCategory, DonationRecord};
use crate::error::{Error, Result};

/// Total donated under one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// The category.
    pub category: DonationCategory,
    /// Sum of amounts.
    pub total: Decimal,
}

/// Total donated in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthTotal {
    /// Month key, `YYYY-MM`.
    pub month: String,
    /// Sum of amounts.
    pub total: Decimal,
}

/// All records given under one exact donor name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorGroup {
    /// Donor display name, exactly as entered.
    pub donor_name: String,
    /// The donor's records, in ledger order.
    pub records: Vec<DonationRecord>,
}

impl DonorGroup {
    /// Sum of the donor's amounts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmountOverflow`] if the sum is not representable.
    pub fn total(&self) -> Result<Decimal> {
        total(&self.records)
    }

    /// Number of donations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// The donor code of the first record, if it has one.
    #[must_use]
    pub fn donor_code(&self) -> Option<&str> {
        self.records.first().and_then(|r| r.donor_code.as_deref())
    }
}

fn add(sum: Decimal, amount: Decimal) -> Result<Decimal> {
    sum.checked_add(amount).ok_or(Error::AmountOverflow)
}

/// Sum of all amounts.
///
/// # Errors
///
/// Returns [`Error::AmountOverflow`] if the sum is not representable.
pub fn total(records: &[DonationRecord]) -> Result<Decimal> {
    records
        .iter()
        .try_fold(Decimal::ZERO, |sum, r| add(sum, r.amount))
}

/// Totals per category, in order of each category's first appearance.
///
/// # Errors
///
/// Returns [`Error::AmountOverflow`] if a category total is not representable.
pub fn by_category(records: &[DonationRecord]) -> Result<Vec<CategoryTotal>> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for record in records {
        match totals.iter_mut().find(|t| t.category == record.category) {
            Some(entry) => entry.total = add(entry.total, record.amount)?,
            None => totals.push(CategoryTotal {
                category: record.category,
                total: record.amount,
            }),
        }
    }
    Ok(totals)
}

/// Totals per `YYYY-MM` month, oldest month first.
///
/// # Errors
///
/// Returns [`Error::AmountOverflow`] if a month total is not representable.
pub fn by_month(records: &[DonationRecord]) -> Result<Vec<MonthTotal>> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.month_key()).or_default();
        *entry = add(*entry, record.amount)?;
    }
    Ok(totals
        .into_iter()
        .map(|(month, total)| MonthTotal { month, total })
        .collect())
}

/// Records grouped by exact donor name.
///
/// Donors appear in order of first appearance; names are compared
/// byte-for-byte, so differently spelled names form separate groups.
#[must_use]
pub fn by_donor(records: &[DonationRecord]) -> Vec<DonorGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<DonorGroup> = Vec::new();
    for record in records {
        let slot = *index.entry(record.donor_name.as_str()).or_insert_with(|| {
            groups.push(DonorGroup {
                donor_name: record.donor_name.clone(),
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record.clone());
    }
    groups
}

/// The group for one donor name, if present.
#[must_use]
pub fn donor_group(records: &[DonationRecord], donor_name: &str) -> Option<DonorGroup> {
    let matching: Vec<DonationRecord> = records
        .iter()
        .filter(|r| r.donor_name == donor_name)
        .cloned()
        .collect();
    (!matching.is_empty()).then(|| DonorGroup {
        donor_name: donor_name.to_string(),
        records: matching,
    })
}

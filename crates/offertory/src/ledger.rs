//! The donation record store.
//!
//! A [`Ledger`] owns the ordered list of donation records (newest first) and
//! mirrors the full list into one storage slot after every change. On load
//! it restores that slot, or falls back to a small example dataset when the
//! slot is absent, blank, unreadable or corrupt.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::donation::{DonationForm, DonationRecord};
use crate::error::Result;
use crate::storage::Storage;

/// Default slot the ledger is persisted under.
pub const DEFAULT_SLOT_KEY: &str = "church_donations";

/// Example dataset used when nothing has been persisted yet.
const SEED_JSON: &str = r#"[
  {"id":"1","donorName":"林志遠","donorCode":"FZ0003","amount":5000,"date":"2025-01-19","category":"十一奉獻"},
  {"id":"2","donorName":"林志遠","donorCode":"FZ0003","amount":4000,"date":"2025-02-16","category":"十一奉獻"},
  {"id":"3","donorName":"張君如","donorCode":"FZ0004","amount":12000,"date":"2025-01-12","category":"十一奉獻"},
  {"id":"4","donorName":"張君如","donorCode":"FZ0004","amount":6000,"date":"2025-02-02","category":"感恩奉獻"}
]"#;

/// The example dataset, in store order.
#[must_use]
pub fn seed_records() -> Vec<DonationRecord> {
    serde_json::from_str(SEED_JSON).unwrap_or_else(|e| {
        warn!("Built-in seed dataset failed to parse: {}", e);
        Vec::new()
    })
}

/// Where the ledger's current contents came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOrigin {
    /// Restored from the persisted slot.
    Restored,
    /// Seeded with the example dataset.
    Seeded(SeedReason),
}

/// Why the example dataset was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedReason {
    /// The slot has never been written.
    Absent,
    /// The slot holds only whitespace.
    Blank,
    /// The slot could not be read from the database.
    Unreadable,
    /// The slot does not hold a valid record list.
    Corrupt,
}

impl std::fmt::Display for LedgerOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restored => write!(f, "restored"),
            Self::Seeded(SeedReason::Absent) => write!(f, "seeded (no saved data)"),
            Self::Seeded(SeedReason::Blank) => write!(f, "seeded (saved data was blank)"),
            Self::Seeded(SeedReason::Unreadable) => write!(f, "seeded (saved data unreadable)"),
            Self::Seeded(SeedReason::Corrupt) => write!(f, "seeded (saved data corrupt)"),
        }
    }
}

/// In-memory donation list mirrored to a storage slot.
#[derive(Debug)]
pub struct Ledger {
    storage: Storage,
    slot_key: String,
    records: Vec<DonationRecord>,
    origin: LedgerOrigin,
}

impl Ledger {
    /// Load the ledger from `slot_key`, seeding it if nothing usable is stored.
    ///
    /// Never fails: any problem reading the slot falls back to the seed data.
    /// The seed is not written back until the first mutation.
    #[must_use]
    pub fn load(storage: Storage, slot_key: impl Into<String>) -> Self {
        let slot_key = slot_key.into();
        let (records, origin) = match storage.read_slot(&slot_key) {
            Ok(Some(text)) if text.trim().is_empty() => {
                (seed_records(), LedgerOrigin::Seeded(SeedReason::Blank))
            }
            Ok(Some(text)) => match serde_json::from_str::<Vec<DonationRecord>>(&text) {
                Ok(records) => (admit_restored(records), LedgerOrigin::Restored),
                Err(e) => {
                    warn!("Saved ledger in slot {} is corrupt, using seed data: {}", slot_key, e);
                    (seed_records(), LedgerOrigin::Seeded(SeedReason::Corrupt))
                }
            },
            Ok(None) => (seed_records(), LedgerOrigin::Seeded(SeedReason::Absent)),
            Err(e) => {
                warn!("Could not read slot {}, using seed data: {}", slot_key, e);
                (seed_records(), LedgerOrigin::Seeded(SeedReason::Unreadable))
            }
        };

        info!("Loaded {} donation records ({})", records.len(), origin);
        Self {
            storage,
            slot_key,
            records,
            origin,
        }
    }

    /// Insert a record at the head of the ledger and persist.
    ///
    /// Returns `false` without changing anything when the donor name is
    /// empty, the amount is out of range, or the id is already in use.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails. The record stays in memory.
    pub fn add(&mut self, record: DonationRecord) -> Result<bool> {
        if !record.is_valid() {
            debug!(
                "Rejected donation for {:?} of {}",
                record.donor_name, record.amount
            );
            return Ok(false);
        }
        if self.get(&record.id).is_some() {
            debug!("Rejected donation with duplicate id {}", record.id);
            return Ok(false);
        }

        debug!("Adding donation {} for {}", record.id, record.donor_name);
        self.records.insert(0, record);
        self.persist()?;
        Ok(true)
    }

    /// Validate a form and add the resulting record.
    ///
    /// Returns the new record's id, or `None` if the form was rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn submit(&mut self, form: &DonationForm, today: NaiveDate) -> Result<Option<String>> {
        match form.validate(today) {
            Ok(record) => {
                let id = record.id.clone();
                Ok(self.add(record)?.then_some(id))
            }
            Err(reason) => {
                debug!("Form rejected: {}", reason);
                Ok(None)
            }
        }
    }

    /// Remove the record with the given id and persist.
    ///
    /// Returns `false` if no such record exists; nothing is written then.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            return Ok(false);
        }

        debug!("Removed donation {}", id);
        self.persist()?;
        Ok(true)
    }

    /// All records, newest first.
    #[must_use]
    pub fn all(&self) -> &[DonationRecord] {
        &self.records
    }

    /// The `limit` newest records.
    #[must_use]
    pub fn recent(&self, limit: usize) -> &[DonationRecord] {
        &self.records[..limit.min(self.records.len())]
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DonationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// The most recent calendar year any donation falls in.
    #[must_use]
    pub fn latest_year(&self) -> Option<i32> {
        self.records.iter().map(DonationRecord::year).max()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Where the current contents came from.
    #[must_use]
    pub fn origin(&self) -> LedgerOrigin {
        self.origin
    }

    /// The slot key the ledger persists under.
    #[must_use]
    pub fn slot_key(&self) -> &str {
        &self.slot_key
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.records)?;
        self.storage.write_slot(&self.slot_key, &json)
    }
}

/// Drop restored records that break the admission rules, and any record
/// whose id was already seen earlier in the list.
fn admit_restored(records: Vec<DonationRecord>) -> Vec<DonationRecord> {
    let total = records.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let admitted: Vec<DonationRecord> = records
        .into_iter()
        .filter(DonationRecord::is_valid)
        .filter(|r| seen.insert(r.id.clone()))
        .collect();
    if admitted.len() < total {
        warn!(
            "Ignored {} saved records that were invalid or reused an id",
            total - admitted.len()
        );
    }
    admitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::donation::DonationCategory;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn empty_ledger() -> Ledger {
        let storage = Storage::open_in_memory().unwrap();
        storage.write_slot(DEFAULT_SLOT_KEY, "[]").unwrap();
        Ledger::load(storage, DEFAULT_SLOT_KEY)
    }

    fn record(name: &str, amount: Decimal) -> DonationRecord {
        DonationRecord::new(
            name,
            None,
            amount,
            day(2025, 3, 1),
            DonationCategory::Sunday,
            None,
        )
    }

    fn persisted(ledger: &Ledger) -> Vec<DonationRecord> {
        let text = ledger
            .storage()
            .read_slot(ledger.slot_key())
            .unwrap()
            .unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_seed_records_parse() {
        let seed = seed_records();
        assert_eq!(seed.len(), 4);
        assert_eq!(seed[0].donor_name, "林志遠");
        assert_eq!(seed[0].amount, dec!(5000));
        assert_eq!(seed[3].category, DonationCategory::Thanksgiving);
    }

    #[test]
    fn test_load_absent_slot_seeds() {
        let ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        assert_eq!(ledger.origin(), LedgerOrigin::Seeded(SeedReason::Absent));
        assert_eq!(ledger.all(), seed_records().as_slice());
    }

    #[test]
    fn test_load_does_not_write_seed() {
        let ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        assert_eq!(ledger.storage().read_slot(DEFAULT_SLOT_KEY).unwrap(), None);
    }

    #[test]
    fn test_load_blank_slot_seeds() {
        let storage = Storage::open_in_memory().unwrap();
        storage.write_slot(DEFAULT_SLOT_KEY, "  ").unwrap();
        let ledger = Ledger::load(storage, DEFAULT_SLOT_KEY);
        assert_eq!(ledger.origin(), LedgerOrigin::Seeded(SeedReason::Blank));
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_load_corrupt_slot_seeds() {
        let storage = Storage::open_in_memory().unwrap();
        storage.write_slot(DEFAULT_SLOT_KEY, "{not json").unwrap();
        let ledger = Ledger::load(storage, DEFAULT_SLOT_KEY);
        assert_eq!(ledger.origin(), LedgerOrigin::Seeded(SeedReason::Corrupt));
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_load_empty_array_is_restored_not_seeded() {
        let ledger = empty_ledger();
        assert_eq!(ledger.origin(), LedgerOrigin::Restored);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_load_restores_saved_records() {
        let storage = Storage::open_in_memory().unwrap();
        let saved = vec![record("王", dec!(10))];
        storage
            .write_slot("custom", &serde_json::to_string(&saved).unwrap())
            .unwrap();

        let ledger = Ledger::load(storage, "custom");
        assert_eq!(ledger.origin(), LedgerOrigin::Restored);
        assert_eq!(ledger.all(), saved.as_slice());
    }

    #[test]
    fn test_load_skips_invalid_saved_records() {
        let storage = Storage::open_in_memory().unwrap();
        let json = r#"[
          {"id":"a","donorName":"王","amount":10,"date":"2025-03-01","category":"主日奉獻"},
          {"id":"b","donorName":"","amount":10,"date":"2025-03-01","category":"主日奉獻"},
          {"id":"c","donorName":"李","amount":0,"date":"2025-03-01","category":"主日奉獻"}
        ]"#;
        storage.write_slot(DEFAULT_SLOT_KEY, json).unwrap();

        let ledger = Ledger::load(storage, DEFAULT_SLOT_KEY);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get("a").is_some());
    }

    #[test]
    fn test_load_skips_oversized_and_duplicate_records() {
        let storage = Storage::open_in_memory().unwrap();
        let json = r#"[
          {"id":"a","donorName":"王","amount":10,"date":"2025-03-01","category":"主日奉獻"},
          {"id":"a","donorName":"李","amount":20,"date":"2025-03-02","category":"主日奉獻"},
          {"id":"b","donorName":"陳","amount":"50000000000000000000000000000","date":"2025-03-01","category":"主日奉獻"}
        ]"#;
        storage.write_slot(DEFAULT_SLOT_KEY, json).unwrap();

        let ledger = Ledger::load(storage, DEFAULT_SLOT_KEY);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.all()[0].donor_name, "王");
        assert!(crate::aggregate::total(ledger.all()).is_ok());
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut ledger = empty_ledger();
        let first = record("王", dec!(10));
        let mut copy = record("李", dec!(20));
        copy.id = first.id.clone();

        assert!(ledger.add(first.clone()).unwrap());
        assert!(!ledger.add(copy).unwrap());
        assert_eq!(ledger.all(), std::slice::from_ref(&first));

        assert!(ledger.remove(&first.id).unwrap());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_submit_oversized_amounts_keeps_totals_usable() {
        let mut ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        let huge = DonationForm {
            donor_name: "林志遠".to_string(),
            amount: "50000000000000000000000000000".to_string(),
            ..DonationForm::default()
        };

        assert_eq!(ledger.submit(&huge, day(2025, 3, 1)).unwrap(), None);
        assert_eq!(ledger.submit(&huge, day(2025, 3, 1)).unwrap(), None);
        assert_eq!(ledger.len(), 4);
        assert_eq!(crate::aggregate::total(ledger.all()).unwrap(), dec!(27000));
    }

    #[test]
    fn test_latest_year() {
        let mut ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        assert_eq!(ledger.latest_year(), Some(2025));

        let mut later = record("陳", dec!(1));
        later.date = day(2026, 1, 4);
        ledger.add(later).unwrap();
        assert_eq!(ledger.latest_year(), Some(2026));

        assert_eq!(empty_ledger().latest_year(), None);
    }

    #[test]
    fn test_add_puts_record_first() {
        let mut ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        let new = record("陳", dec!(300));
        let id = new.id.clone();

        assert!(ledger.add(new).unwrap());
        assert_eq!(ledger.all()[0].id, id);
        assert_eq!(ledger.len(), 5);
    }

    #[test]
    fn test_add_persists_full_list() {
        let mut ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        ledger.add(record("陳", dec!(300))).unwrap();
        assert_eq!(persisted(&ledger), ledger.all());
    }

    #[test]
    fn test_add_rejects_invalid_records() {
        let mut ledger = empty_ledger();
        assert!(!ledger.add(record("", dec!(100))).unwrap());
        assert!(!ledger.add(record("陳", dec!(0))).unwrap());
        assert!(!ledger.add(record("陳", dec!(-1))).unwrap());
        assert!(ledger.is_empty());
        assert_eq!(persisted(&ledger), Vec::<DonationRecord>::new());
    }

    #[test]
    fn test_submit_valid_form() {
        let mut ledger = empty_ledger();
        let form = DonationForm {
            donor_name: "林志遠".to_string(),
            amount: "5000".to_string(),
            ..DonationForm::default()
        };

        let id = ledger.submit(&form, day(2025, 1, 19)).unwrap().unwrap();
        assert_eq!(ledger.all()[0].id, id);
        assert_eq!(ledger.all()[0].date, day(2025, 1, 19));
    }

    #[test]
    fn test_submit_zero_amount_or_empty_name_is_noop() {
        let mut ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        let before = ledger.len();

        let zero = DonationForm {
            donor_name: "林志遠".to_string(),
            amount: "0".to_string(),
            ..DonationForm::default()
        };
        let nameless = DonationForm {
            amount: "100".to_string(),
            ..DonationForm::default()
        };

        assert_eq!(ledger.submit(&zero, day(2025, 1, 1)).unwrap(), None);
        assert_eq!(ledger.submit(&nameless, day(2025, 1, 1)).unwrap(), None);
        assert_eq!(ledger.len(), before);
        assert_eq!(ledger.storage().read_slot(DEFAULT_SLOT_KEY).unwrap(), None);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        assert!(ledger.remove("2").unwrap());

        let ids: Vec<&str> = ledger.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
        assert!(ledger.get("2").is_none());
        assert_eq!(persisted(&ledger), ledger.all());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        assert!(!ledger.remove("does-not-exist").unwrap());
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.storage().read_slot(DEFAULT_SLOT_KEY).unwrap(), None);
    }

    #[test]
    fn test_recent_limits() {
        let ledger = Ledger::load(Storage::open_in_memory().unwrap(), DEFAULT_SLOT_KEY);
        assert_eq!(ledger.recent(2).len(), 2);
        assert_eq!(ledger.recent(2)[0].id, "1");
        assert_eq!(ledger.recent(100).len(), 4);
        assert!(ledger.recent(0).is_empty());
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(LedgerOrigin::Restored.to_string(), "restored");
        assert!(LedgerOrigin::Seeded(SeedReason::Corrupt)
            .to_string()
            .contains("corrupt"));
    }
}

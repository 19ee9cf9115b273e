//! Core donation types for offertory.
//!
//! This module defines the donation record, the closed set of donation
//! categories, and the raw form input a record is built from.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Largest single donation accepted, in whole currency units.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

/// [`MAX_AMOUNT_UNITS`] as a [`Decimal`].
#[must_use]
pub fn max_amount() -> Decimal {
    Decimal::from(MAX_AMOUNT_UNITS)
}

/// The purpose a donation was given for.
///
/// Serialized as the Chinese label shown on receipts, which is also the
/// representation used in the persisted ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DonationCategory {
    /// Tithe.
    #[default]
    #[serde(rename = "十一奉獻")]
    Tithe,
    /// Thanksgiving offering.
    #[serde(rename = "感恩奉獻")]
    Thanksgiving,
    /// Building fund.
    #[serde(rename = "建堂奉獻")]
    Building,
    /// Love feast.
    #[serde(rename = "愛宴奉獻")]
    LoveFeast,
    /// Missions.
    #[serde(rename = "宣教奉獻")]
    Mission,
    /// Charity and relief.
    #[serde(rename = "慈惠奉獻")]
    Charity,
    /// Sunday offering.
    #[serde(rename = "主日奉獻")]
    Sunday,
    /// Designated special offering.
    #[serde(rename = "專項奉獻")]
    Special,
}

impl DonationCategory {
    /// Every category, in listing order.
    pub const ALL: [Self; 8] = [
        Self::Tithe,
        Self::Thanksgiving,
        Self::Building,
        Self::LoveFeast,
        Self::Mission,
        Self::Charity,
        Self::Sunday,
        Self::Special,
    ];

    /// The label printed on receipts and reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Tithe => "十一奉獻",
            Self::Thanksgiving => "感恩奉獻",
            Self::Building => "建堂奉獻",
            Self::LoveFeast => "愛宴奉獻",
            Self::Mission => "宣教奉獻",
            Self::Charity => "慈惠奉獻",
            Self::Sunday => "主日奉獻",
            Self::Special => "專項奉獻",
        }
    }

    /// The ASCII key used on the command line and in config files.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Tithe => "tithe",
            Self::Thanksgiving => "thanksgiving",
            Self::Building => "building",
            Self::LoveFeast => "love_feast",
            Self::Mission => "mission",
            Self::Charity => "charity",
            Self::Sunday => "sunday",
            Self::Special => "special",
        }
    }
}

impl std::fmt::Display for DonationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown donation category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for DonationCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label() == wanted || c.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A single recorded donation.
///
/// Records are immutable once created; the ledger only ever inserts or
/// removes whole records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    /// Unique identifier.
    pub id: String,

    /// Donor display name. Donor groups are keyed on this exact string.
    pub donor_name: String,

    /// Optional donor code printed on receipts (e.g. `FZ0003`).
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub donor_code: Option<String>,

    /// Donated amount; always positive.
    pub amount: Decimal,

    /// Date of the donation.
    pub date: NaiveDate,

    /// What the donation was for.
    pub category: DonationCategory,

    /// Free-text note.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
}

impl DonationRecord {
    /// Create a record with a freshly generated, time-ordered identifier.
    #[must_use]
    pub fn new(
        donor_name: impl Into<String>,
        donor_code: Option<String>,
        amount: Decimal,
        date: NaiveDate,
        category: DonationCategory,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            donor_name: donor_name.into(),
            donor_code: donor_code.filter(|c| !c.trim().is_empty()),
            amount,
            date,
            category,
            note: note.filter(|n| !n.trim().is_empty()),
        }
    }

    /// Whether the record satisfies the ledger's admission rules.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.donor_name.trim().is_empty()
            && self.amount > Decimal::ZERO
            && self.amount <= max_amount()
    }

    /// The `YYYY-MM` month key used for monthly totals.
    #[must_use]
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }

    /// The calendar year of the donation.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Why a donation form was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormRejection {
    /// The donor name was empty.
    #[error("donor name is required")]
    EmptyDonorName,

    /// The amount could not be read as a number.
    #[error("amount is not a number: {0:?}")]
    InvalidAmount(String),

    /// The amount was zero or negative.
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// The amount was above [`MAX_AMOUNT_UNITS`].
    #[error("amount must not exceed {max}, got {0}", max = MAX_AMOUNT_UNITS)]
    AmountTooLarge(Decimal),

    /// The date was not a valid `YYYY-MM-DD` calendar date.
    #[error("date is not a valid calendar date: {0:?}")]
    InvalidDate(String),
}

/// Raw, unvalidated donation input as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationForm {
    /// Donor display name.
    pub donor_name: String,
    /// Donor code; blank means none.
    pub donor_code: String,
    /// Amount as typed.
    pub amount: String,
    /// Date as typed; `None` means today.
    pub date: Option<String>,
    /// Selected category.
    pub category: DonationCategory,
    /// Free-text note; blank means none.
    pub note: String,
}

impl DonationForm {
    /// Validate the form and build a new record from it.
    ///
    /// `today` is used when no date was entered.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn validate(&self, today: NaiveDate) -> Result<DonationRecord, FormRejection> {
        if self.donor_name.trim().is_empty() {
            return Err(FormRejection::EmptyDonorName);
        }

        let amount = parse_amount(&self.amount)?;

        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => today,
            Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| FormRejection::InvalidDate(text.to_string()))?,
        };

        Ok(DonationRecord::new(
            self.donor_name.clone(),
            Some(self.donor_code.trim().to_string()),
            amount,
            date,
            self.category,
            Some(self.note.clone()),
        ))
    }
}

/// Parse a typed amount, accepting thousands separators.
///
/// # Errors
///
/// Returns an error for non-numeric, non-positive or oversized input.
pub fn parse_amount(text: &str) -> Result<Decimal, FormRejection> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| FormRejection::InvalidAmount(text.to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(FormRejection::NonPositiveAmount(amount));
    }
    if amount > max_amount() {
        return Err(FormRejection::AmountTooLarge(amount));
    }
    Ok(amount.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(name: &str, amount: &str) -> DonationForm {
        DonationForm {
            donor_name: name.to_string(),
            amount: amount.to_string(),
            ..DonationForm::default()
        }
    }

    #[test]
    fn test_category_labels_round_trip() {
        for category in DonationCategory::ALL {
            assert_eq!(category.label().parse::<DonationCategory>(), Ok(category));
            assert_eq!(category.key().parse::<DonationCategory>(), Ok(category));
        }
    }

    #[test]
    fn test_category_parse_is_case_insensitive_for_keys() {
        assert_eq!(
            "LOVE_FEAST".parse::<DonationCategory>(),
            Ok(DonationCategory::LoveFeast)
        );
        assert!("offering".parse::<DonationCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&DonationCategory::Thanksgiving).unwrap();
        assert_eq!(json, "\"感恩奉獻\"");
    }

    #[test]
    fn test_category_default_is_tithe() {
        assert_eq!(DonationCategory::default(), DonationCategory::Tithe);
        assert_eq!(DonationCategory::Tithe.to_string(), "十一奉獻");
    }

    #[test]
    fn test_new_record_gets_unique_id() {
        let a = DonationRecord::new(
            "林志遠",
            None,
            dec!(100),
            day(2025, 1, 1),
            DonationCategory::Tithe,
            None,
        );
        let b = DonationRecord::new(
            "林志遠",
            None,
            dec!(100),
            day(2025, 1, 1),
            DonationCategory::Tithe,
            None,
        );
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_record_drops_blank_code_and_note() {
        let record = DonationRecord::new(
            "張君如",
            Some("  ".to_string()),
            dec!(10),
            day(2025, 2, 2),
            DonationCategory::Mission,
            Some(String::new()),
        );
        assert!(record.donor_code.is_none());
        assert!(record.note.is_none());
    }

    #[test]
    fn test_month_key_and_year() {
        let record = DonationRecord::new(
            "林志遠",
            None,
            dec!(5000),
            day(2025, 1, 19),
            DonationCategory::Tithe,
            None,
        );
        assert_eq!(record.month_key(), "2025-01");
        assert_eq!(record.year(), 2025);
    }

    #[test]
    fn test_reads_legacy_json_with_numeric_amount() {
        let json = r#"{"id":"1","donorName":"林志遠","donorCode":"FZ0003","amount":5000,"date":"2025-01-19","category":"十一奉獻"}"#;
        let record: DonationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.amount, dec!(5000));
        assert_eq!(record.donor_code.as_deref(), Some("FZ0003"));
        assert_eq!(record.category, DonationCategory::Tithe);
        assert!(record.note.is_none());
    }

    #[test]
    fn test_reads_empty_donor_code_as_none() {
        let json = r#"{"id":"9","donorName":"王","donorCode":"","amount":"12.5","date":"2025-03-01","category":"主日奉獻","note":""}"#;
        let record: DonationRecord = serde_json::from_str(json).unwrap();
        assert!(record.donor_code.is_none());
        assert!(record.note.is_none());
        assert_eq!(record.amount, dec!(12.5));
    }

    #[test]
    fn test_rejects_invalid_calendar_date() {
        let json = r#"{"id":"9","donorName":"王","amount":1,"date":"2025-02-30","category":"主日奉獻"}"#;
        assert!(serde_json::from_str::<DonationRecord>(json).is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = DonationRecord::new(
            "林志遠",
            Some("FZ0003".to_string()),
            dec!(5000),
            day(2025, 1, 19),
            DonationCategory::Tithe,
            None,
        );
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"donorName\":\"林志遠\""));
        assert!(json.contains("\"donorCode\":\"FZ0003\""));
        assert!(json.contains("\"date\":\"2025-01-19\""));
        assert!(!json.contains("note"));
    }

    #[test]
    fn test_form_validates_into_record() {
        let mut input = form("林志遠", "5,000");
        input.donor_code = "FZ0003".to_string();
        input.date = Some("2025-01-19".to_string());

        let record = input.validate(day(2026, 1, 1)).unwrap();
        assert_eq!(record.amount, dec!(5000));
        assert_eq!(record.date, day(2025, 1, 19));
        assert_eq!(record.donor_code.as_deref(), Some("FZ0003"));
        assert!(record.is_valid());
    }

    #[test]
    fn test_form_defaults_date_to_today() {
        let record = form("林志遠", "10").validate(day(2026, 10, 18)).unwrap();
        assert_eq!(record.date, day(2026, 10, 18));
    }

    #[test]
    fn test_form_rejects_empty_name() {
        assert_eq!(
            form("", "100").validate(day(2025, 1, 1)),
            Err(FormRejection::EmptyDonorName)
        );
        assert_eq!(
            form("   ", "100").validate(day(2025, 1, 1)),
            Err(FormRejection::EmptyDonorName)
        );
    }

    #[test]
    fn test_form_rejects_zero_and_negative_amounts() {
        assert!(matches!(
            form("林志遠", "0").validate(day(2025, 1, 1)),
            Err(FormRejection::NonPositiveAmount(_))
        ));
        assert!(matches!(
            form("林志遠", "-5").validate(day(2025, 1, 1)),
            Err(FormRejection::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_form_rejects_non_numeric_amount() {
        assert!(matches!(
            form("林志遠", "abc").validate(day(2025, 1, 1)),
            Err(FormRejection::InvalidAmount(_))
        ));
        assert!(matches!(
            form("林志遠", "").validate(day(2025, 1, 1)),
            Err(FormRejection::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_form_rejects_bad_date() {
        let mut input = form("林志遠", "10");
        input.date = Some("2025-13-01".to_string());
        assert!(matches!(
            input.validate(day(2025, 1, 1)),
            Err(FormRejection::InvalidDate(_))
        ));
    }

    #[test]
    fn test_form_rejects_oversized_amount() {
        assert!(matches!(
            form("林志遠", "50000000000000000000000000000").validate(day(2025, 1, 1)),
            Err(FormRejection::AmountTooLarge(_))
        ));
        assert!(matches!(
            parse_amount("1000000000000.01"),
            Err(FormRejection::AmountTooLarge(_))
        ));
        assert_eq!(
            parse_amount("1,000,000,000,000").unwrap(),
            dec!(1000000000000)
        );
    }

    #[test]
    fn test_oversized_record_is_not_valid() {
        let mut record = form("林志遠", "10").validate(day(2025, 1, 1)).unwrap();
        record.amount = Decimal::MAX;
        assert!(!record.is_valid());
        record.amount = max_amount();
        assert!(record.is_valid());
    }

    #[test]
    fn test_parse_amount_keeps_cents() {
        assert_eq!(parse_amount("1,234.50").unwrap(), dec!(1234.5));
    }
}

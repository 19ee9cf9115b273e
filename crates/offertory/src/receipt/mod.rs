//! Per-donor tax receipts.
//!
//! [`compose`] turns one donor's records into a [`Receipt`], a structured
//! document that knows nothing about output formats. The [`render`] module
//! lays a receipt out as text or JSON and writes it to disk.

pub mod render;

use num_format::{Locale, ToFormattedString};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::config::ChurchInfo;
use crate::donation::DonationRecord;
use crate::error::Result;

pub use render::{file_name, render, write_to, ReceiptFormat};

/// Fixed title line under the organization name.
pub const RECEIPT_TITLE: &str = "奉 獻 收 據";

/// Label of the summary row.
pub const TOTAL_LABEL: &str = "奉 獻 合 計";

/// Printed when the donor has no code.
pub const MISSING_DONOR_CODE: &str = "N/A";

/// Column headings of the itemized table.
pub const COLUMN_HEADINGS: [&str; 3] = ["奉獻日期", "奉獻類別", "奉獻金額"];

/// Horizontal alignment of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Flush left.
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell text.
    pub text: String,
    /// Alignment within the cell.
    pub align: Align,
    /// Number of columns the cell covers.
    pub span: usize,
    /// Whether the text is emphasized.
    pub emphasized: bool,
}

impl Cell {
    fn new(text: impl Into<String>, align: Align) -> Self {
        Self {
            text: text.into(),
            align,
            span: 1,
            emphasized: false,
        }
    }

    fn spanning(mut self, span: usize) -> Self {
        self.span = span;
        self
    }

    fn emphasized(mut self) -> Self {
        self.emphasized = true;
        self
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Cells, left to right.
    pub cells: Vec<Cell>,
}

/// The itemized donations table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column headings.
    pub header: Row,
    /// One row per donation.
    pub items: Vec<Row>,
    /// The total row.
    pub summary: Row,
}

impl Table {
    /// Number of columns.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.header.cells.iter().map(|c| c.span).sum()
    }

    /// All rows in print order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        std::iter::once(&self.header)
            .chain(self.items.iter())
            .chain(std::iter::once(&self.summary))
    }
}

/// Issuer block printed under the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    /// Tax identification number.
    pub tax_id: String,
    /// Postal address.
    pub address: String,
    /// Phone number.
    pub phone: String,
    /// Person responsible for the receipt.
    pub handler: String,
}

/// A donor's receipt, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Issuing organization name.
    pub organization: String,
    /// Receipt title line.
    pub title: String,
    /// Donor code, or [`MISSING_DONOR_CODE`].
    pub donor_code: String,
    /// Donor display name.
    pub donor_name: String,
    /// Receipt year, used in the file name.
    pub year: i32,
    /// Itemized donations.
    pub table: Table,
    /// Sum of all itemized amounts.
    pub total: Decimal,
    /// Issuer details.
    pub footer: Footer,
}

/// Build the receipt for one donor.
///
/// The donor code is taken from the first record. With no records the
/// table has only its heading and total rows, and the total is zero.
///
/// # Errors
///
/// Returns an error if the records' total is not representable.
pub fn compose(
    donor_name: &str,
    records: &[DonationRecord],
    church: &ChurchInfo,
    year: i32,
) -> Result<Receipt> {
    let total = aggregate::total(records)?;

    let donor_code = records
        .first()
        .and_then(|r| r.donor_code.as_deref())
        .filter(|code| !code.trim().is_empty())
        .unwrap_or(MISSING_DONOR_CODE)
        .to_string();

    let header = Row {
        cells: COLUMN_HEADINGS
            .iter()
            .map(|heading| Cell::new(*heading, Align::Center))
            .collect(),
    };

    let items = records
        .iter()
        .map(|r| Row {
            cells: vec![
                Cell::new(r.date.format("%Y-%m-%d").to_string(), Align::Center),
                Cell::new(r.category.label(), Align::Center),
                Cell::new(format_amount(r.amount), Align::Right),
            ],
        })
        .collect();

    let summary = Row {
        cells: vec![
            Cell::new(TOTAL_LABEL, Align::Center)
                .spanning(2)
                .emphasized(),
            Cell::new(format_amount(total), Align::Right).emphasized(),
        ],
    };

    Ok(Receipt {
        organization: church.name.clone(),
        title: RECEIPT_TITLE.to_string(),
        donor_code,
        donor_name: donor_name.to_string(),
        year,
        table: Table {
            header,
            items,
            summary,
        },
        total,
        footer: Footer {
            tax_id: church.tax_id.clone(),
            address: church.address.clone(),
            phone: church.phone.clone(),
            handler: church.handler.clone(),
        },
    })
}

/// Format an amount with thousands separators, keeping any cents.
///
/// `12000` becomes `12,000`; `1234.5` becomes `1,234.5`.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let text = amount.normalize().abs().to_string();
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text.as_str(), None),
    };

    let grouped = integer
        .parse::<u128>()
        .map_or_else(|_| integer.to_string(), |n| n.to_formatted_string(&Locale::en));

    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

//! `offertory` - A church donation ledger
//!
//! This library keeps a list of donation records in a local store, summarizes
//! it by category, month and donor, composes per-donor tax receipts, and can
//! ask a text-generation service for a short analysis of the ledger.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod donation;
pub mod error;
pub mod insight;
pub mod ledger;
pub mod logging;
pub mod receipt;
pub mod storage;

pub use aggregate::{CategoryTotal, DonorGroup, MonthTotal};
pub use config::{ChurchInfo, Config};
pub use donation::{DonationCategory, DonationForm, DonationRecord, FormRejection};
pub use error::{Error, Result};
pub use insight::{GeminiGenerator, InsightRequester, TextGenerator};
pub use ledger::{Ledger, LedgerOrigin};
pub use logging::init_logging;
pub use receipt::{Receipt, ReceiptFormat};
pub use storage::{Storage, StorageStats};

//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::donation::{DonationCategory, DonationForm};
use crate::receipt::ReceiptFormat;

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Donor display name
    #[arg(short, long)]
    pub name: String,

    /// Donor code (e.g. FZ0001)
    #[arg(short = 'k', long, default_value = "")]
    pub code: String,

    /// Amount donated
    #[arg(short, long, allow_hyphen_values = true)]
    pub amount: String,

    /// Donation date, YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Donation category
    #[arg(short = 't', long, value_enum, default_value = "tithe")]
    pub category: CategoryArg,

    /// Free-text note
    #[arg(long, default_value = "")]
    pub note: String,
}

impl AddCommand {
    /// The raw form these arguments describe.
    #[must_use]
    pub fn to_form(&self) -> DonationForm {
        DonationForm {
            donor_name: self.name.clone(),
            donor_code: self.code.clone(),
            amount: self.amount.clone(),
            date: self.date.clone(),
            category: self.category.into(),
            note: self.note.clone(),
        }
    }
}

/// Remove command arguments.
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Identifier of the record to delete
    pub id: String,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Maximum number of records, newest first
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments shared by the summary commands.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Receipt command arguments.
#[derive(Debug, Args)]
pub struct ReceiptCommand {
    /// Donor name, matched exactly
    pub donor: String,

    #[command(flatten)]
    pub options: ReceiptOptions,
}

/// Options for writing receipts.
#[derive(Debug, Args)]
pub struct ReceiptOptions {
    /// Receipt year (defaults to config, then the newest year in the ledger)
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Include donations from every year instead of only the receipt year
    #[arg(long)]
    pub all_years: bool,

    /// Directory to write receipts into
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Receipt file format
    #[arg(short, long, value_enum)]
    pub format: Option<ReceiptFormatArg>,
}

/// Insight command arguments.
#[derive(Debug, Args)]
pub struct InsightCommand {
    /// Wrap the analysis at this many columns
    #[arg(short, long, default_value = "80")]
    pub width: usize,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Donation category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// 十一奉獻
    Tithe,
    /// 感恩奉獻
    Thanksgiving,
    /// 建堂奉獻
    Building,
    /// 愛宴奉獻
    LoveFeast,
    /// 宣教奉獻
    Mission,
    /// 慈惠奉獻
    Charity,
    /// 主日奉獻
    Sunday,
    /// 專項奉獻
    Special,
}

impl From<CategoryArg> for DonationCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Tithe => Self::Tithe,
            CategoryArg::Thanksgiving => Self::Thanksgiving,
            CategoryArg::Building => Self::Building,
            CategoryArg::LoveFeast => Self::LoveFeast,
            CategoryArg::Mission => Self::Mission,
            CategoryArg::Charity => Self::Charity,
            CategoryArg::Sunday => Self::Sunday,
            CategoryArg::Special => Self::Special,
        }
    }
}

/// Receipt file format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReceiptFormatArg {
    /// Printable plain text
    Txt,
    /// Structured JSON
    Json,
}

impl From<ReceiptFormatArg> for ReceiptFormat {
    fn from(arg: ReceiptFormatArg) -> Self {
        match arg {
            ReceiptFormatArg::Txt => Self::Text,
            ReceiptFormatArg::Json => Self::Json,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Plain,
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}

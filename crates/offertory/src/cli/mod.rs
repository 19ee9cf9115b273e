//! Command-line interface for offertory.
//!
//! This module provides the CLI structure for the `offertory` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, CategoryArg, ConfigCommand, InsightCommand, ListCommand, OutputFormat,
    ReceiptCommand, ReceiptFormatArg, ReceiptOptions, RemoveCommand, ReportCommand,
    StatusCommand,
};

use crate::logging::Verbosity;

/// offertory - Church donation ledger
///
/// Records donations, summarizes them by category, month and donor, and
/// writes per-donor tax receipts.
#[derive(Debug, Parser)]
#[command(name = "offertory")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a donation
    Add(AddCommand),

    /// Delete a donation by id
    Remove(RemoveCommand),

    /// List recent donations
    List(ListCommand),

    /// Show totals by category and by month
    Stats(ReportCommand),

    /// List donors with their totals
    Donors(ReportCommand),

    /// Write the receipt for one donor
    Receipt(ReceiptCommand),

    /// Write receipts for every donor
    ReceiptAll(ReceiptOptions),

    /// Ask the text-generation service for an analysis
    Insight(InsightCommand),

    /// Show ledger and storage status
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Info,
                2 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

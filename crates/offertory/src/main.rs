//! `offertory` - CLI for the church donation ledger
//!
//! This binary records donations, prints summaries and writes receipts.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use rust_decimal::Decimal;
use textwrap::core::display_width;
use tracing::{debug, warn};

use offertory::aggregate::{self, DonorGroup};
use offertory::cli::{
    AddCommand, Cli, Command, ConfigCommand, InsightCommand, ListCommand, OutputFormat,
    ReceiptOptions, StatusCommand,
};
use offertory::receipt::{self, format_amount, ReceiptFormat};
use offertory::{
    init_logging, Config, DonationRecord, GeminiGenerator, InsightRequester, Ledger, Storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    if let Command::Config(config_cmd) = cli.command {
        return handle_config(&config, config_cmd);
    }

    let mut ledger = open_ledger(&config)?;

    match cli.command {
        Command::Add(cmd) => handle_add(&mut ledger, &cmd),
        Command::Remove(cmd) => handle_remove(&mut ledger, &cmd.id),
        Command::List(cmd) => handle_list(&ledger, &cmd),
        Command::Stats(cmd) => handle_stats(&ledger, cmd.format),
        Command::Donors(cmd) => handle_donors(&ledger, cmd.format),
        Command::Receipt(cmd) => handle_receipt(&config, &ledger, Some(&cmd.donor), &cmd.options),
        Command::ReceiptAll(options) => handle_receipt(&config, &ledger, None, &options),
        Command::Insight(cmd) => handle_insight(&config, &ledger, &cmd).await,
        Command::Status(cmd) => handle_status(&config, &ledger, &cmd),
        Command::Config(_) => Ok(()),
    }
}

fn open_ledger(config: &Config) -> anyhow::Result<Ledger> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("could not open ledger at {}", path.display()))?;
    Ok(Ledger::load(storage, config.storage.slot_key.clone()))
}

fn handle_add(ledger: &mut Ledger, cmd: &AddCommand) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let record = match cmd.to_form().validate(today) {
        Ok(record) => record,
        Err(reason) => bail!("donation not recorded: {reason}"),
    };

    let id = record.id.clone();
    let summary = format!(
        "{} {} {} {}",
        record.date,
        record.donor_name,
        record.category,
        format_amount(record.amount)
    );
    if !ledger.add(record)? {
        bail!("donation not recorded");
    }

    println!("Recorded {summary}");
    println!("  id: {id}");
    Ok(())
}

fn handle_remove(ledger: &mut Ledger, id: &str) -> anyhow::Result<()> {
    if ledger.remove(id)? {
        println!("Removed {id}");
    } else {
        warn!("No donation with id {}", id);
        println!("No donation with id {id}");
    }
    Ok(())
}

fn handle_list(ledger: &Ledger, cmd: &ListCommand) -> anyhow::Result<()> {
    let records = ledger.recent(cmd.limit);

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => {
            for r in records {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    r.id,
                    r.date,
                    r.donor_name,
                    r.category,
                    r.amount.normalize()
                );
            }
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = records
                .iter()
                .map(|r| {
                    vec![
                        r.date.to_string(),
                        r.donor_name.clone(),
                        r.category.to_string(),
                        format_amount(r.amount),
                        r.id.clone(),
                    ]
                })
                .collect();
            print_table(&["Date", "Donor", "Category", "Amount", "Id"], &rows, &[3]);
            println!();
            println!("{} of {} donations", records.len(), ledger.len());
        }
    }
    Ok(())
}

fn handle_stats(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let records = ledger.all();
    let by_category = aggregate::by_category(records)?;
    let by_month = aggregate::by_month(records)?;
    let total = aggregate::total(records)?;

    match format {
        OutputFormat::Json => {
            let stats = serde_json::json!({
                "total": total,
                "by_category": by_category,
                "by_month": by_month,
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Plain => {
            for c in &by_category {
                println!("category\t{}\t{}", c.category, c.total.normalize());
            }
            for m in &by_month {
                println!("month\t{}\t{}", m.month, m.total.normalize());
            }
            println!("total\t{}", total.normalize());
        }
        OutputFormat::Table => {
            println!("By category");
            let rows: Vec<Vec<String>> = by_category
                .iter()
                .map(|c| vec![c.category.to_string(), format_amount(c.total)])
                .collect();
            print_table(&["Category", "Total"], &rows, &[1]);
            println!();

            println!("By month");
            let rows: Vec<Vec<String>> = by_month
                .iter()
                .map(|m| vec![m.month.clone(), format_amount(m.total)])
                .collect();
            print_table(&["Month", "Total"], &rows, &[1]);
            println!();

            println!("Total: {} ({} donations)", format_amount(total), records.len());
        }
    }
    Ok(())
}

fn handle_donors(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let groups: Vec<(DonorGroup, Decimal)> = aggregate::by_donor(ledger.all())
        .into_iter()
        .map(|g| g.total().map(|total| (g, total)))
        .collect::<Result<_, _>>()?;

    match format {
        OutputFormat::Json => {
            let donors: Vec<serde_json::Value> = groups
                .iter()
                .map(|(g, total)| {
                    serde_json::json!({
                        "donor_name": g.donor_name,
                        "donor_code": g.donor_code(),
                        "count": g.count(),
                        "total": total,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&donors)?);
        }
        OutputFormat::Plain => {
            for (g, total) in &groups {
                println!(
                    "{}\t{}\t{}\t{}",
                    g.donor_name,
                    g.donor_code().unwrap_or(receipt::MISSING_DONOR_CODE),
                    g.count(),
                    total.normalize()
                );
            }
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = groups
                .iter()
                .map(|(g, total)| {
                    vec![
                        g.donor_name.clone(),
                        g.donor_code()
                            .unwrap_or(receipt::MISSING_DONOR_CODE)
                            .to_string(),
                        g.count().to_string(),
                        format_amount(*total),
                    ]
                })
                .collect();
            print_table(&["Donor", "Code", "Count", "Total"], &rows, &[2, 3]);
        }
    }
    Ok(())
}

fn handle_receipt(
    config: &Config,
    ledger: &Ledger,
    donor: Option<&str>,
    options: &ReceiptOptions,
) -> anyhow::Result<()> {
    let year = options
        .year
        .unwrap_or_else(|| config.receipt_year(ledger.latest_year()));
    let dir = options
        .output
        .clone()
        .unwrap_or_else(|| config.receipt_dir());
    let format = options
        .format
        .map_or(config.receipt.format, ReceiptFormat::from);

    let records: Vec<DonationRecord> = if options.all_years {
        ledger.all().to_vec()
    } else {
        ledger
            .all()
            .iter()
            .filter(|r| r.year() == year)
            .cloned()
            .collect()
    };

    let groups: Vec<DonorGroup> = match donor {
        Some(name) => match aggregate::donor_group(&records, name) {
            Some(group) => vec![group],
            None if options.all_years => bail!("no donations from {name}"),
            None => bail!("no donations from {name} in {year} (use --all-years to include every year)"),
        },
        None => aggregate::by_donor(&records),
    };

    if groups.is_empty() {
        println!("No donations in {year}; no receipts written.");
        return Ok(());
    }

    debug!("Writing {} receipts for {} to {}", groups.len(), year, dir.display());
    for group in &groups {
        let doc = receipt::compose(&group.donor_name, &group.records, &config.church, year)?;
        let path = receipt::write_to(&doc, &dir, format)?;
        println!(
            "Wrote {} ({} donations, {})",
            path.display(),
            group.count(),
            format_amount(doc.total)
        );
    }
    Ok(())
}

async fn handle_insight(
    config: &Config,
    ledger: &Ledger,
    cmd: &InsightCommand,
) -> anyhow::Result<()> {
    let generator = GeminiGenerator::from_config(config)?;
    let requester = InsightRequester::new(generator);

    let analysis = requester.analyze(ledger.all()).await;
    println!("{}", textwrap::fill(&analysis, cmd.width.max(20)));
    Ok(())
}

fn handle_status(config: &Config, ledger: &Ledger, cmd: &StatusCommand) -> anyhow::Result<()> {
    let stats = ledger.storage().stats(ledger.slot_key())?;
    let total = aggregate::total(ledger.all())?;
    let donors = aggregate::by_donor(ledger.all()).len();

    if cmd.json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "slot_key": ledger.slot_key(),
            "origin": ledger.origin().to_string(),
            "records": ledger.len(),
            "donors": donors,
            "total": total,
            "slot_bytes": stats.slot_bytes,
            "db_size_bytes": stats.db_size_bytes,
            "last_write": stats.last_write,
            "api_key_configured": config.api_key().is_some(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("offertory status");
        println!("----------------");
        println!("Database:      {}", config.database_path().display());
        println!("Slot:          {}", ledger.slot_key());
        println!("Ledger:        {}", ledger.origin());
        println!("Donations:     {}", ledger.len());
        println!("Donors:        {donors}");
        println!("Total:         {}", format_amount(total));
        println!("Slot size:     {} bytes", stats.slot_bytes);
        println!("Database size: {} bytes", stats.db_size_bytes);
        match stats.last_write {
            Some(at) => println!("Last write:    {}", at.to_rfc3339()),
            None => println!("Last write:    never"),
        }
        println!(
            "API key:       {}",
            if config.api_key().is_some() {
                "configured"
            } else {
                "missing"
            }
        );
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
                println!("  Slot key:       {}", config.storage.slot_key);
                println!();
                println!("[Church]");
                println!("  Name:           {}", config.church.name);
                println!("  Tax id:         {}", config.church.tax_id);
                println!("  Address:        {}", config.church.address);
                println!("  Phone:          {}", config.church.phone);
                println!("  Handler:        {}", config.church.handler);
                println!();
                println!("[Receipt]");
                println!("  Output dir:     {}", config.receipt_dir().display());
                match config.receipt.year {
                    Some(year) => println!("  Year:           {year}"),
                    None => println!("  Year:           newest year in the ledger"),
                }
                println!("  Format:         {}", config.receipt.format.extension());
                println!();
                println!("[Insight]");
                println!("  Endpoint:       {}", config.insight.endpoint);
                println!("  Model:          {}", config.insight.model);
                println!("  Timeout (secs): {}", config.insight.timeout_secs);
                println!(
                    "  API key:        {}",
                    if config.api_key().is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Print rows under headings, padding by display width so CJK text lines up.
/// Columns listed in `right` are right-aligned.
fn print_table(headings: &[&str], rows: &[Vec<String>], right: &[usize]) {
    let mut widths: Vec<usize> = headings.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(display_width(cell));
            }
        }
    }

    let header: Vec<&str> = headings.to_vec();
    println!("{}", format_row(&header, &widths, right));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        println!("{}", format_row(&cells, &widths, right));
    }
}

fn format_row(cells: &[&str], widths: &[usize], right: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            let fill = " ".repeat(width.saturating_sub(display_width(cell)));
            if right.contains(&i) {
                format!("{fill}{cell}")
            } else {
                format!("{cell}{fill}")
            }
        })
        .collect();
    padded.join("  ").trim_end().to_string()
}

//! Receipt output formats and file writing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use textwrap::core::display_width;
use tracing::info;

use super::{Align, Receipt, Row};
use crate::error::{Error, Result};

/// Width of the printed page in terminal columns.
const PAGE_WIDTH: usize = 72;

/// Output format of a saved receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReceiptFormat {
    /// Plain text laid out for printing.
    #[default]
    #[serde(rename = "txt")]
    Text,
    /// The structured receipt as JSON.
    #[serde(rename = "json")]
    Json,
}

impl ReceiptFormat {
    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

/// File name for a donor's receipt: `<donor>_<year>年度奉獻收據.<ext>`.
///
/// Path separators in the donor name are replaced so the name stays a
/// single path component.
#[must_use]
pub fn file_name(donor_name: &str, year: i32, format: ReceiptFormat) -> String {
    let donor: String = donor_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{donor}_{year}年度奉獻收據.{}", format.extension())
}

/// Render a receipt in the given format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(receipt: &Receipt, format: ReceiptFormat) -> Result<String> {
    match format {
        ReceiptFormat::Text => Ok(render_text(receipt)),
        ReceiptFormat::Json => Ok(serde_json::to_string_pretty(receipt)?),
    }
}

/// Render and save a receipt into `dir`, returning the written path.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot
/// be written.
pub fn write_to(receipt: &Receipt, dir: &Path, format: ReceiptFormat) -> Result<PathBuf> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let path = dir.join(file_name(&receipt.donor_name, receipt.year, format));
    let body = render(receipt, format)?;
    std::fs::write(&path, body).map_err(|source| Error::FileWrite {
        path: path.clone(),
        source,
    })?;

    info!(
        "Wrote receipt for {} ({} items) to {}",
        receipt.donor_name,
        receipt.table.items.len(),
        path.display()
    );
    Ok(path)
}

fn render_text(receipt: &Receipt) -> String {
    let mut lines = Vec::new();

    lines.push(pad(&receipt.organization, PAGE_WIDTH, Align::Center));
    lines.push(pad(&receipt.title, PAGE_WIDTH, Align::Center));
    lines.push(String::new());
    lines.push(format!("奉獻編號：{}", receipt.donor_code));
    lines.push(format!("奉獻姓名：{}", receipt.donor_name));
    lines.push(String::new());

    let widths = column_widths(receipt);
    let divider = divider_line(&widths);
    lines.push(divider.clone());
    lines.push(row_line(&receipt.table.header, &widths));
    lines.push(divider.clone());
    for row in &receipt.table.items {
        lines.push(row_line(row, &widths));
    }
    lines.push(divider.clone());
    lines.push(row_line(&receipt.table.summary, &widths));
    lines.push(divider);

    lines.push(String::new());
    lines.push("=".repeat(PAGE_WIDTH));
    lines.push(format!("統一編號：{}", receipt.footer.tax_id));
    lines.push(format!("地 址：{}", receipt.footer.address));
    lines.push(format!(
        "電 話：{}     經手人：{}",
        receipt.footer.phone, receipt.footer.handler
    ));

    let mut text = lines
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    text.push('\n');
    text
}

/// Content width of each column, wide enough for every cell.
fn column_widths(receipt: &Receipt) -> Vec<usize> {
    let mut widths = vec![0; receipt.table.columns()];

    for row in receipt.table.rows() {
        let mut column = 0;
        for cell in &row.cells {
            if cell.span == 1 && column < widths.len() {
                widths[column] = widths[column].max(display_width(&cell.text));
            }
            column += cell.span;
        }
    }

    // Spanning cells borrow the separators between their columns; widen the
    // last spanned column if that is still not enough.
    for row in receipt.table.rows() {
        let mut column = 0;
        for cell in &row.cells {
            if cell.span > 1 && column + cell.span <= widths.len() {
                let available = spanned_width(&widths[column..column + cell.span]);
                let needed = display_width(&cell.text);
                if needed > available {
                    widths[column + cell.span - 1] += needed - available;
                }
            }
            column += cell.span;
        }
    }

    widths
}

/// Inner width of a cell covering `widths`, including absorbed separators.
fn spanned_width(widths: &[usize]) -> usize {
    let separators = widths.len().saturating_sub(1) * 3;
    widths.iter().sum::<usize>() + separators
}

fn divider_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn row_line(row: &Row, widths: &[usize]) -> String {
    let mut line = String::from("|");
    let mut column = 0;
    for cell in &row.cells {
        let end = (column + cell.span).min(widths.len());
        let width = spanned_width(&widths[column.min(end)..end]);
        line.push(' ');
        line.push_str(&pad(&cell.text, width, cell.align));
        line.push_str(" |");
        column += cell.span;
    }
    line
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let gap = width.saturating_sub(display_width(text));
    let (left, right) = match align {
        Align::Left => (0, gap),
        Align::Right => (gap, 0),
        Align::Center => (gap / 2, gap - gap / 2),
    };
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

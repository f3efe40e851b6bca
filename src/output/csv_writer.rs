//! CSV lead report
//!
//! The header row is a fixed contract: downstream sheets import it by column
//! name and order.

use crate::lead::AnalyzedLead;
use crate::output::traits::{LeadWriter, OutputError, OutputResult};
use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Column names, in order
pub const CSV_HEADER: [&str; 9] = [
    "Company Name",
    "Website",
    "Lead Category",
    "Contact Emails",
    "Motivation Notes",
    "Review Status",
    "Review Notes",
    "Source URL",
    "Date Added",
];

const EMAIL_SEPARATOR: &str = "; ";

/// Writes leads to a CSV file
#[derive(Debug, Clone)]
pub struct CsvWriter {
    path: PathBuf,
}

impl CsvWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One CSV row for `lead`, dated `date_added`
pub fn lead_record(lead: &AnalyzedLead, date_added: &str) -> [String; 9] {
    let emails = lead
        .contact_emails()
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(EMAIL_SEPARATOR);

    [
        lead.name().to_string(),
        lead.website().to_string(),
        lead.category().as_str().to_string(),
        emails,
        lead.motivation_notes().to_string(),
        lead.review_status().as_str().to_string(),
        lead.review_notes().to_string(),
        lead.source_url().unwrap_or_default().to_string(),
        date_added.to_string(),
    ]
}

/// Writes the header and one row per lead, dated today
fn write_rows<W: io::Write>(
    writer: &mut csv::Writer<W>,
    leads: &[AnalyzedLead],
) -> OutputResult<()> {
    let date_added = Local::now().format("%Y-%m-%d").to_string();

    writer.write_record(CSV_HEADER)?;
    for lead in leads {
        writer.write_record(lead_record(lead, &date_added))?;
    }
    writer.flush()?;
    Ok(())
}

impl LeadWriter for CsvWriter {
    fn write(&self, leads: &[AnalyzedLead]) -> OutputResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(OutputError::Write("output path is empty".to_string()));
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        write_rows(&mut writer, leads)?;

        tracing::debug!("Wrote {} row(s) to {}", leads.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Renders the CSV report into memory
///
/// Clones share one buffer: hand one to the orchestrator and read the
/// report back through another once the run is done.
#[derive(Debug, Clone, Default)]
pub struct CsvBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CsvBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the rendered report, leaving the buffer empty
    pub fn take(&self) -> OutputResult<Vec<u8>> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| OutputError::Write("CSV buffer lock poisoned".to_string()))?;
        Ok(std::mem::take(&mut *bytes))
    }
}

impl LeadWriter for CsvBuffer {
    fn write(&self, leads: &[AnalyzedLead]) -> OutputResult<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_rows(&mut writer, leads)?;
        let rendered = writer
            .into_inner()
            .map_err(|e| OutputError::Write(e.to_string()))?;

        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| OutputError::Write("CSV buffer lock poisoned".to_string()))?;
        *bytes = rendered;
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory CSV".to_string()
    }
}

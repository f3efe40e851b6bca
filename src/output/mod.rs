//! Output module for writing lead reports and run summaries
//!
//! This module handles:
//! - Writing analyzed leads to the CSV report, on disk or in memory
//! - Summarizing run statistics for the terminal

mod csv_writer;
pub mod stats;
mod traits;

pub use csv_writer::{lead_record, CsvBuffer, CsvWriter, CSV_HEADER};
pub use stats::{print_run_summary, RunSummary};
pub use traits::{LeadWriter, OutputError, OutputResult};

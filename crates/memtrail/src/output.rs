use std::fmt;

use colored::Colorize;

use crate::origin::Origin;

/// One leaked block: an allocation still present in the ledger at report
/// time.
#[derive(Debug, Clone)]
pub struct LeakRecord {
    pub size: usize,
    pub address: usize,
    pub origin: Origin,
}

impl fmt::Display for LeakRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} byte(s) lost at 0x{:08x}: {}",
            self.size, self.address, self.origin
        )
    }
}

/// Snapshot of every allocation that was still unreleased when the report
/// was taken, in insertion order.
///
/// The `Display` output is the textual contract: one line per leaked block,
/// then a summary line (`All blocks were freed` when the ledger is empty).
#[derive(Debug, Clone, Default)]
pub struct LeakReport {
    records: Vec<LeakRecord>,
}

impl LeakReport {
    pub(crate) fn new(records: Vec<LeakRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[LeakRecord] {
        &self.records
    }

    pub fn leaked_blocks(&self) -> usize {
        self.records.len()
    }

    pub fn leaked_bytes(&self) -> usize {
        self.records.iter().map(|r| r.size).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        if self.records.is_empty() {
            write!(f, "All blocks were freed")
        } else {
            write!(f, "{} block(s) hasn't been freed", self.records.len())
        }
    }
}

/// Sink for leak reports.
///
/// The default [`ConsoleReporter`] prints to stdout; custom reporters can
/// route the report into logging systems, CI pipelines or files.
pub trait Reporter: Send + Sync {
    fn report(&self, report: &LeakReport) -> Result<(), Box<dyn std::error::Error>>;
}

/// Prints the report to stdout, coloring the summary line. Colors are
/// disabled automatically when stdout is not a terminal, so piped output
/// keeps the exact contract text.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, report: &LeakReport) -> Result<(), Box<dyn std::error::Error>> {
        for record in report.records() {
            println!("{record}");
        }
        if report.is_clean() {
            println!("{}", "All blocks were freed".green());
        } else {
            let summary = format!("{} block(s) hasn't been freed", report.leaked_blocks());
            println!("{}", summary.yellow().bold());
        }
        Ok(())
    }
}

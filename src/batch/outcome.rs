//! Outcome aggregation and the download report

use crate::types::{AssetReference, BatchCounts, ReportEntry};
use std::fmt::Write;

/// Overall classification of a finished batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchVerdict {
    /// Every asset was downloaded
    Complete,
    /// At least one asset was downloaded and at least one failed
    Partial,
    /// Nothing was downloaded from a non-empty batch
    TotalFailure,
}

/// Running tally of one batch's outcomes
#[derive(Debug)]
pub struct OutcomeAggregator {
    total: usize,
    downloaded: usize,
    failures: Vec<ReportEntry>,
}

impl OutcomeAggregator {
    /// Start a tally for `total` resolved references
    pub fn new(total: usize) -> Self {
        Self {
            total,
            downloaded: 0,
            failures: Vec::new(),
        }
    }

    /// Count a successful download
    pub fn record_success(&mut self) {
        self.downloaded += 1;
    }

    /// Count a failed download, keeping arrival order
    pub fn record_failure(&mut self, reference: &AssetReference, reason: &str, status: Option<u16>) {
        self.failures.push(ReportEntry {
            id: reference.id.clone(),
            name: reference.name.clone(),
            reason: reason.to_string(),
            status,
        });
    }

    /// Counts so far
    pub fn counts(&self) -> BatchCounts {
        BatchCounts {
            total: self.total,
            downloaded: self.downloaded,
            failed: self.failures.len(),
        }
    }

    /// Whether every expected outcome has been recorded
    pub fn is_settled(&self) -> bool {
        self.downloaded + self.failures.len() == self.total
    }

    /// Classify the batch
    ///
    /// Any success yields a served archive, however small the fraction.
    pub fn verdict(&self) -> BatchVerdict {
        if self.downloaded == 0 && self.total > 0 {
            BatchVerdict::TotalFailure
        } else if self.failures.is_empty() {
            BatchVerdict::Complete
        } else {
            BatchVerdict::Partial
        }
    }

    /// Failures in the order they were observed
    pub fn failures(&self) -> &[ReportEntry] {
        &self.failures
    }

    /// Give up the failure list
    pub fn into_failures(self) -> Vec<ReportEntry> {
        self.failures
    }

    /// Human-readable report for the archive, or `None` when nothing failed
    pub fn report(&self, order_name: &str) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }

        let mut report = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(report, "Download report for order: {order_name}");
        let _ = writeln!(report, "Downloaded: {}/{}", self.downloaded, self.total);
        let _ = writeln!(report);
        let _ = writeln!(report, "Failed:");
        for failure in &self.failures {
            let _ = writeln!(
                report,
                "  - {} ({}): {}",
                failure.id, failure.name, failure.reason
            );
        }
        let _ = writeln!(report);
        let _ = writeln!(report, "To recover these images:");
        let _ = writeln!(
            report,
            "  1. Retry the batch endpoint, already-processed images download instantly."
        );
        let _ = write!(
            report,
            "  2. Or fetch individually: GET /v3/images/{{image_id}}/enhanced"
        );
        Some(report)
    }
}

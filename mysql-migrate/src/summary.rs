//! Per-record outcomes and the end-of-run tally

use tracing::info;

/// Terminal state of one record. There is no retry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Succeeded => self.succeeded += 1,
            RecordOutcome::Failed => self.failed += 1,
            RecordOutcome::Skipped => self.skipped += 1,
        }
    }

    /// True when every record succeeded; failures and skips both need attention.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Log the summary block under `title`.
    pub fn log(&self, title: &str, with_skipped: bool) {
        let rule = "=".repeat(60);
        info!("{}", rule);
        info!("{}", title);
        info!("{}", rule);
        info!("Total databases: {}", self.total);
        info!("Successful: {}", self.succeeded);
        info!("Failed: {}", self.failed);
        if with_skipped {
            info!("Skipped: {}", self.skipped);
        }
    }
}

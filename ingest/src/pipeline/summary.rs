use crate::models::WorkItem;
use crate::pipeline::events::FailureStage;

/// How the local `.csv` came to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    AlreadyStaged,
    Downloaded,
}

/// How the object came to be present in the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    AlreadyPresent,
    Uploaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub local: LocalStatus,
    pub remote: RemoteStatus,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub item: WorkItem,
    pub result: Result<Delivery, FailureStage>,
}

/// Tally of a run. `processed == successful + failed` holds for every value
/// produced by `record`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub already_staged: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub uploaded: usize,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(mut self, outcome: &ItemOutcome) -> Self {
        self.processed += 1;
        match &outcome.result {
            Ok(delivery) => {
                self.successful += 1;
                match delivery.local {
                    LocalStatus::AlreadyStaged => self.already_staged += 1,
                    LocalStatus::Downloaded => self.downloaded += 1,
                }
                match delivery.remote {
                    RemoteStatus::AlreadyPresent => self.already_present += 1,
                    RemoteStatus::Uploaded => self.uploaded += 1,
                }
            }
            Err(FailureStage::Download) => self.failed += 1,
            // The file was downloaded even though the item failed later.
            Err(FailureStage::Decompress) => {
                self.failed += 1;
                self.downloaded += 1;
            }
            Err(FailureStage::Upload) => self.failed += 1,
        }
        self
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(item: WorkItem, local: LocalStatus, remote: RemoteStatus) -> ItemOutcome {
        ItemOutcome {
            item,
            result: Ok(Delivery {
                local,
                remote,
                uri: "memory://trips/x.csv".to_string(),
            }),
        }
    }

    fn failed(item: WorkItem, stage: FailureStage) -> ItemOutcome {
        ItemOutcome {
            item,
            result: Err(stage),
        }
    }

    #[test]
    fn test_fold_over_outcomes() {
        let outcomes = vec![
            ok(WorkItem::new("green", 2019, 1), LocalStatus::Downloaded, RemoteStatus::Uploaded),
            ok(WorkItem::new("green", 2019, 2), LocalStatus::AlreadyStaged, RemoteStatus::AlreadyPresent),
            failed(WorkItem::new("green", 2019, 3), FailureStage::Download),
            failed(WorkItem::new("green", 2019, 4), FailureStage::Upload),
            failed(WorkItem::new("green", 2019, 5), FailureStage::Decompress),
        ];

        let summary = outcomes
            .iter()
            .fold(RunSummary::new(5), |summary, outcome| summary.record(outcome));

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.processed, summary.successful + summary.failed);
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.already_staged, 1);
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.already_present, 1);
        assert_eq!(summary.processed, summary.total);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::new(48);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
        assert!(!summary.has_failures());
    }
}

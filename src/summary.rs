use serde::{Deserialize, Serialize};

use crate::task::{TaskId, TaskResult};

/// Aggregate statistics over one batch.
///
/// Character, word and time totals only count successful results.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Number of tasks submitted.
    pub total_strings: usize,
    /// Sum of `char_count` over successful results.
    pub total_chars: usize,
    /// Sum of `word_count` over successful results.
    pub total_words: usize,
    /// Largest `processing_time` among successful results: the critical
    /// path of a parallel run, not the sum.
    pub total_time: f64,
    /// Number of successful results.
    pub success_count: usize,
    /// Number of failed results.
    pub failure_count: usize,
}

impl Summary {
    /// Aggregates `results` for a batch of `total_strings` tasks.
    pub fn aggregate(total_strings: usize, results: &[TaskResult]) -> Summary {
        let mut summary = Summary {
            total_strings,
            ..Summary::default()
        };
        for result in results {
            match result.stats() {
                Some(stats) => {
                    summary.success_count += 1;
                    summary.total_chars += stats.char_count;
                    summary.total_words += stats.word_count;
                    summary.total_time = summary.total_time.max(stats.processing_time);
                }
                None => summary.failure_count += 1,
            }
        }
        summary
    }
}

/// Whether the coordinator saw every result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// All submitted tasks reported back.
    Complete,
    /// The wait deadline passed first; `missing` lists the tasks with no
    /// result, in ascending order.
    PartialTimeout {
        /// Ids of the tasks that had not reported back.
        missing: Vec<TaskId>,
    },
}

/// Everything a caller gets back from one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Results sorted by ascending `task_id`.
    pub results: Vec<TaskResult>,
    /// Aggregates over `results`.
    pub summary: Summary,
    /// Whether the batch is complete.
    pub status: BatchStatus,
    /// Most workers observed running a task body at the same time.
    pub peak_active: usize,
}

impl BatchResult {
    /// Sorts `results` by task id and aggregates them.
    pub fn new(
        total_strings: usize,
        mut results: Vec<TaskResult>,
        status: BatchStatus,
        peak_active: usize,
    ) -> BatchResult {
        results.sort_by_key(|r| r.task_id);
        let summary = Summary::aggregate(total_strings, &results);
        BatchResult {
            results,
            summary,
            status,
            peak_active,
        }
    }

    /// The result set for an empty batch.
    pub fn empty() -> BatchResult {
        BatchResult::new(0, Vec::new(), BatchStatus::Complete, 0)
    }

    /// Whether every task reported back.
    pub fn is_complete(&self) -> bool {
        self.status == BatchStatus::Complete
    }
}

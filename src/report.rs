//! Console rendering of a processed batch.

use std::io::{self, Write};

use crate::summary::{BatchResult, BatchStatus, Summary};
use crate::task::{Outcome, TaskResult};

const RULE: &str = "--------------------------------------------------";

/// Writes the banner printed before a batch starts.
pub fn write_start<W: Write>(out: &mut W, strings_count: usize) -> io::Result<()> {
    writeln!(out, "Starting to process {strings_count} strings...")
}

/// Writes one block per result, in task order.
pub fn write_results<W: Write>(out: &mut W, results: &[TaskResult]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== Processing Complete ===")?;
    writeln!(out, "Processed {} strings", results.len())?;
    writeln!(out)?;
    writeln!(out, "Results:")?;
    writeln!(out, "{RULE}")?;
    for result in results {
        writeln!(out, "  Content:    '{}'", result.payload)?;
        match &result.outcome {
            Outcome::Success(stats) => {
                writeln!(out, "  Characters: {}", stats.char_count)?;
                writeln!(out, "  Words:      {}", stats.word_count)?;
                writeln!(out, "  Time:       {:.2} seconds", stats.processing_time)?;
            }
            Outcome::Failure(err) => writeln!(out, "  Error:      {err}")?,
        }
        writeln!(out, "{RULE}")?;
    }
    Ok(())
}

/// Writes the summary block. Nothing is written for an empty batch.
pub fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    if summary.total_strings == 0 {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "Summary:")?;
    writeln!(out, "  Total strings processed: {}", summary.total_strings)?;
    writeln!(out, "  Succeeded: {}", summary.success_count)?;
    writeln!(out, "  Failed: {}", summary.failure_count)?;
    writeln!(out, "  Total characters: {}", summary.total_chars)?;
    writeln!(out, "  Total words: {}", summary.total_words)?;
    writeln!(out, "  Total processing time: {:.2} seconds", summary.total_time)
}

/// Writes results, summary and, for a timed out batch, the missing tasks.
pub fn write_report<W: Write>(out: &mut W, batch: &BatchResult) -> io::Result<()> {
    write_results(out, &batch.results)?;
    write_summary(out, &batch.summary)?;
    if let BatchStatus::PartialTimeout { missing } = &batch.status {
        writeln!(out)?;
        writeln!(out, "Timed out waiting for tasks: {missing:?}")?;
    }
    Ok(())
}

use std::io::Write;

use anyhow::Context;
use libejalign::structs::PriorTable;

/// Write the learned table as tab-separated text: one line per
/// (English phoneme, segment) edge, phonemes sorted, segments in
/// descending probability order.
pub fn write_table(out: &mut impl Write, prior: &PriorTable) -> anyhow::Result<()> {
    writeln!(out, "# english\tsegment\tprobability")?;
    for (english, segments) in prior.sorted_distributions() {
        for (segment, probability) in segments {
            writeln!(out, "{english}\t{segment}\t{probability:.6}")?;
        }
    }
    Ok(())
}

pub fn write_json(out: &mut impl Write, prior: &PriorTable) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, prior)
        .context("failed to serialize probability table")?;
    writeln!(out)?;
    Ok(())
}

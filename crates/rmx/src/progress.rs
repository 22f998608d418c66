//! 📊 progress.rs — "Are we there yet?" — every transfer, every time, forever.
//!
//! A scroll cursor doesn't announce how many documents are behind it, so
//! there is no percent and no ETA — just a live counter and, at the end,
//! a summary table with the numbers an operator actually writes down in
//! the migration ticket: documents moved, documents failed, elapsed time,
//! docs per second.
//!
//! ⚠️  Warning: watching the counter will not make it go faster. We've
//! tried. Science says no.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

use crate::transfer::TransferReport;

/// 🔢 Formats a number with commas for the 3 people in the audience who
/// like readability. "1000000 docs" → "1,000,000 docs" — you're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// The live terminal counter for one transfer run.
pub(crate) struct TransferProgress {
    bar: ProgressBar,
    label: String,
    docs: u64,
    failed: u64,
}

impl std::fmt::Debug for TransferProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("TransferProgress")
            .field("label", &self.label)
            .field("docs", &self.docs)
            .field("failed", &self.failed)
            .finish()
    }
}

impl TransferProgress {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                // safe unwrap: template string is hardcoded and valid, I checked, twice
                .unwrap(),
        );
        Self {
            bar,
            label: label.into(),
            docs: 0,
            failed: 0,
        }
    }

    /// Feed the counter after every bulk write.
    pub(crate) fn update(&mut self, docs_delta: u64, failed_delta: u64) {
        self.docs += docs_delta;
        self.failed += failed_delta;
        self.bar.set_message(format!(
            "{}: {} docs ({} failed)",
            self.label,
            format_number(self.docs),
            format_number(self.failed),
        ));
        self.bar.tick();
    }

    /// ✅ Ring the bell. We made it. (Or the scroll ran dry. Same energy.)
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// 🍽️ The end-of-run summary as a comfy table — two columns, right-aligned,
/// no borders, because the borders looked bad.
pub(crate) fn render_summary(report: &TransferReport) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let rows: [(&str, String); 4] = [
        ("reindexed docs", format_number(report.total_docs)),
        ("failed docs", format_number(report.failures.len() as u64)),
        ("elapsed", format!("{:.1}s", report.elapsed.as_secs_f64())),
        ("docs/s", format!("{:.0}", report.docs_per_sec())),
    ];
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label).set_alignment(CellAlignment::Right),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_commas_find_their_places() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}

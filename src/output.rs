use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::leaderboard::{Leaderboards, Metric};
use crate::results::Entry;

// ============================================================================
// OUTPUT OPTIONS
// ============================================================================

/// Configuration for exported tables
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Maximum rows per table or leaderboard (None = all rows)
    pub top_n: Option<usize>,
}

fn score_cell(score: Option<f64>) -> String {
    score.map(|s| s.to_string()).unwrap_or_default()
}

// ============================================================================
// ENTRIES CSV OUTPUT
// ============================================================================

/// Writes entries in the order given, one row each
pub fn write_entries_csv<W: Write>(out: W, entries: &[&Entry], options: &OutputOptions) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    writer.write_record([
        "year", "class_no", "class_name", "entry_no", "winemaker", "wine_name", "wine_type", "vintage",
        "score", "score100", "medal", "best_in_class", "champion", "trophies",
    ])?;

    let limit = options.top_n.unwrap_or(usize::MAX);
    for entry in entries.iter().take(limit) {
        let row: Vec<String> = vec![
            entry.year.to_string(),
            entry.class_no.clone(),
            entry.class_name.clone(),
            entry.entry_no.clone(),
            entry.winemaker.clone(),
            entry.wine_name.clone(),
            entry.wine_type.clone(),
            entry.wine_vintage.clone().unwrap_or_default(),
            score_cell(entry.score),
            score_cell(entry.score100),
            entry.display_medal().unwrap_or_default().to_string(),
            entry.best_in_class.to_string(),
            entry.champion.to_string(),
            entry.trophies.join(" | "),
        ];
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

// ============================================================================
// LEADERBOARD CSV OUTPUT
// ============================================================================

/// Writes all three leaderboards as `metric,rank,winemaker,value` rows
pub fn write_leaderboards_csv<W: Write>(out: W, leaderboards: &Leaderboards, options: &OutputOptions) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["metric", "rank", "winemaker", "value"])?;

    let limit = options.top_n.unwrap_or(usize::MAX);
    for metric in Metric::ALL {
        for (index, row) in leaderboards.rows(metric).iter().take(limit).enumerate() {
            writer.write_record([
                metric.key().to_string(),
                (index + 1).to_string(),
                row.winemaker.clone(),
                row.value.to_string(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

// ============================================================================
// WRITING
// ============================================================================

/// Writes to `path` (creating parent directories) or to stdout when None
pub fn write_output(path: Option<&Path>, contents: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
            tracing::info!(path = %path.display(), bytes = contents.len(), "output written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

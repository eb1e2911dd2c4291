//! Tables for ingestion reports, retrieval results and index stats.

use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};

use crate::ingest::{IngestReport, IngestStage};
use crate::vector::{IndexStats, ScoredChunk};

/// Longest chunk preview shown in result tables.
const PREVIEW_CHARS: usize = 160;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

/// Two-column summary of an ingestion run, complete or not.
pub fn ingest_report_table(report: &IngestReport) -> String {
    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec!["Source", &report.source.display().to_string()]);
    table.add_row(vec!["Index", &report.index_path.display().to_string()]);
    table.add_row(vec!["Documents loaded", &report.documents_loaded.to_string()]);
    table.add_row(vec!["Files skipped", &report.skipped.len().to_string()]);
    table.add_row(vec!["Chunks", &report.chunks.to_string()]);
    if let Some(dimension) = report.dimension {
        table.add_row(vec!["Dimension", &dimension.to_string()]);
    }
    if report.partitions > 0 {
        table.add_row(vec!["Partitions", &report.partitions.to_string()]);
    }
    table.add_row(vec!["Elapsed", &format!("{:.2}s", report.elapsed.as_secs_f64())]);

    let (stage, color) = if report.stage == IngestStage::Done {
        ("complete".to_string(), Color::Green)
    } else {
        (format!("stopped at: {}", report.stage.label()), Color::Red)
    };
    table.add_row(vec![
        Cell::new("Status"),
        Cell::new(stage).fg(color).add_attribute(Attribute::Bold),
    ]);
    table.to_string()
}

/// Files skipped during loading with their reasons.
pub fn skipped_table(report: &IngestReport) -> String {
    let mut table = new_table(&["Skipped file", "Reason"]);
    for skipped in &report.skipped {
        table.add_row(vec![skipped.path.display().to_string(), skipped.reason.clone()]);
    }
    table.to_string()
}

/// Ranked retrieval results with a text preview.
pub fn results_table(results: &[ScoredChunk]) -> String {
    let mut table = new_table(&["#", "Score", "Source", "Chunk", "Text"]);
    for (rank, result) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(format!("{:.4}", result.score.get())),
            Cell::new(result.chunk.citation()),
            Cell::new(result.chunk.position),
            Cell::new(preview(&result.chunk.text)),
        ]);
    }
    table.to_string()
}

pub fn index_stats_table(stats: &IndexStats) -> String {
    let mut table = new_table(&["Property", "Value"]);
    table.add_row(vec!["Entries", &stats.entries.to_string()]);
    table.add_row(vec!["Sources", &stats.sources.to_string()]);
    table.add_row(vec!["Dimension", &stats.dimension.to_string()]);
    table.add_row(vec!["Metric", stats.metric.as_str()]);
    table.add_row(vec![
        "Model",
        if stats.model.is_empty() {
            "unknown"
        } else {
            stats.model.as_str()
        },
    ]);
    let partitions = if stats.partitions == 0 {
        "none (exact search)".to_string()
    } else {
        stats.partitions.to_string()
    };
    table.add_row(vec!["Partitions", &partitions]);
    table.add_row(vec![
        "Created",
        &stats.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ]);
    table.to_string()
}

/// Collapses whitespace and truncates on a char boundary.
fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

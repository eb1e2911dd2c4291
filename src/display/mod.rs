//! Terminal output for the CLI: spinners, tables and colors.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{StageProgress, create_spinner, with_spinner};
pub use tables::{index_stats_table, ingest_report_table, results_table, skipped_table};
pub use theme::{THEME, Theme};

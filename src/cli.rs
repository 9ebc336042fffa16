use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "geostats",
    version,
    about = "Collect running statistics over newline-delimited GeoJSON features"
)]
pub struct Cli {
    /// Input file of newline-delimited GeoJSON features (gzip allowed). Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Collect covered tiles for every zoom from 0 up to this level (capped at 20).
    #[arg(long, allow_negative_numbers = true)]
    pub max_zoom: Option<i32>,

    /// Tile size in pixels used when projecting coordinates to tiles.
    #[arg(long, default_value_t = 256)]
    pub tile_size: u32,

    /// Write every input feature, unchanged, to this path (`-` for stdout).
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Comma separated report sections (summary,bbox,density,duplicates,coordinates,tiles).
    #[arg(long)]
    pub stats: Option<String>,

    #[arg(long, value_enum, default_value_t = InvalidMode::Abort)]
    pub on_invalid: InvalidMode,

    /// Number of parsed features buffered between the reader thread and the aggregator.
    #[arg(long, default_value_t = 1_000)]
    pub read_buffer: usize,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    /// Log level (error|warn|info|debug|trace)
    #[arg(long, default_value = "info")]
    pub log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    Ndjson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InvalidMode {
    Abort,
    Skip,
}

impl Cli {
    pub fn passthrough_to_stdout(&self) -> bool {
        self.output
            .as_deref()
            .is_some_and(|path| path.as_os_str() == "-")
    }
}

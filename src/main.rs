use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{info, warn};

use geostats::cli::{Cli, InvalidMode, ReportFormat};
use geostats::input::{open_input, spawn_reader};
use geostats::output::{apply_stats_filter, ndjson_lines, parse_stats_filter, text_lines};
use geostats::{GeoStats, StatsOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let filter = parse_stats_filter(cli.stats.as_deref())?;
    let mut stats = GeoStats::new(StatsOptions {
        max_zoom: cli.max_zoom,
        tile_size: cli.tile_size,
    })?;

    let mut passthrough: Option<Box<dyn Write>> = match cli.output.as_deref() {
        Some(_) if cli.passthrough_to_stdout() => Some(Box::new(BufWriter::new(io::stdout().lock()))),
        Some(path) => Some(Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("create output: {}", path.display()))?,
        ))),
        None => None,
    };

    let reader = open_input(cli.input.as_deref())?;
    let (records, handle) = spawn_reader(reader, cli.read_buffer);
    let progress = progress_spinner(cli.no_progress);
    let mut skipped = 0_u64;

    for record in records.iter() {
        let record = record?;
        if let Some(feature) = record.feature {
            if let Err(err) = feature.and_then(|feature| stats.process(feature)) {
                match cli.on_invalid {
                    InvalidMode::Abort => anyhow::bail!("line {}: {err}", record.line),
                    InvalidMode::Skip => {
                        warn!(line = record.line, error = %err, "excluding invalid feature from stats");
                        skipped += 1;
                    }
                }
            }
            progress.inc(1);
        }
        if let Some(out) = passthrough.as_mut() {
            out.write_all(&record.raw)
                .context("write passthrough feature")?;
        }
    }
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("input reader thread panicked"))?;
    progress.finish_and_clear();
    if let Some(mut out) = passthrough.take() {
        out.flush().context("flush passthrough output")?;
    }

    let snapshot = stats.snapshot();
    info!(features = snapshot.features, skipped, "finished reading features");
    let report = apply_stats_filter(snapshot, &filter);

    let mut out: Box<dyn Write> = if cli.passthrough_to_stdout() {
        Box::new(io::stderr().lock())
    } else {
        Box::new(io::stdout().lock())
    };
    match cli.format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            writeln!(out, "{}", json)?;
        }
        ReportFormat::Ndjson => {
            for line in ndjson_lines(&report)? {
                writeln!(out, "{}", line)?;
            }
        }
        ReportFormat::Text => {
            for line in text_lines(&report) {
                writeln!(out, "{}", line)?;
            }
        }
    }
    out.flush()?;

    Ok(())
}

fn progress_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} ({pos} features processed)")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message("collecting stats");
    spinner
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

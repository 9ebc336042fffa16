use std::collections::BTreeMap;
use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::aggregate::StatsSnapshot;
use crate::algo::BoundingBox;
use crate::stats::StatSummary;
use crate::tiles::TileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatsSection {
    Summary,
    Bbox,
    Density,
    Duplicates,
    Coordinates,
    Tiles,
}

impl StatsSection {
    pub const ALL: [StatsSection; 6] = [
        StatsSection::Summary,
        StatsSection::Bbox,
        StatsSection::Density,
        StatsSection::Duplicates,
        StatsSection::Coordinates,
        StatsSection::Tiles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatsSection::Summary => "summary",
            StatsSection::Bbox => "bbox",
            StatsSection::Density => "density",
            StatsSection::Duplicates => "duplicates",
            StatsSection::Coordinates => "coordinates",
            StatsSection::Tiles => "tiles",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsFilter {
    sections: BTreeSet<StatsSection>,
}

impl StatsFilter {
    pub fn all() -> Self {
        Self {
            sections: StatsSection::ALL.into_iter().collect(),
        }
    }

    pub fn includes(&self, section: StatsSection) -> bool {
        self.sections.contains(&section)
    }
}

fn possible_values() -> String {
    StatsSection::ALL
        .iter()
        .map(StatsSection::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses a comma separated section list. `None` selects every section.
pub fn parse_stats_filter(value: Option<&str>) -> Result<StatsFilter> {
    let Some(value) = value else {
        return Ok(StatsFilter::all());
    };
    let mut sections = BTreeSet::new();
    for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let section = StatsSection::from_name(part).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown stats section: {part} (possible values: {})",
                possible_values()
            )
        })?;
        sections.insert(section);
    }
    if sections.is_empty() {
        anyhow::bail!(
            "stats section list is empty (possible values: {})",
            possible_values()
        );
    }
    Ok(StatsFilter { sections })
}

/// A snapshot narrowed to the sections a caller asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Option<BoundingBox>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<TileId>>,
}

pub fn apply_stats_filter(snapshot: StatsSnapshot, filter: &StatsFilter) -> StatsReport {
    StatsReport {
        features: filter
            .includes(StatsSection::Summary)
            .then_some(snapshot.features),
        bbox: filter.includes(StatsSection::Bbox).then_some(snapshot.bbox),
        density: filter
            .includes(StatsSection::Density)
            .then_some(snapshot.density),
        duplicates: filter
            .includes(StatsSection::Duplicates)
            .then_some(snapshot.duplicates),
        coordinates: filter
            .includes(StatsSection::Coordinates)
            .then_some(snapshot.coordinates),
        tiles: if filter.includes(StatsSection::Tiles) {
            snapshot.tiles
        } else {
            None
        },
    }
}

fn format_opt(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.6}"),
        None => "-".to_string(),
    }
}

fn stat_line(name: &str, stat: &StatSummary) -> String {
    format!(
        "{}: count={} mean={} stddev={} min={} max={}",
        name,
        stat.count,
        format_opt(stat.mean),
        format_opt(stat.stddev),
        format_opt(stat.min),
        format_opt(stat.max)
    )
}

fn tiles_by_zoom(tiles: &[TileId]) -> BTreeMap<u8, u64> {
    let mut counts = BTreeMap::new();
    for tile in tiles {
        *counts.entry(tile.zoom).or_insert(0) += 1;
    }
    counts
}

pub fn text_lines(report: &StatsReport) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(features) = report.features {
        lines.push(format!("features: {features}"));
    }
    if let Some(bbox) = report.bbox.as_ref() {
        match bbox {
            Some(bbox) => lines.push(format!(
                "bbox: min_x={} min_y={} max_x={} max_y={}",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            )),
            None => lines.push("bbox: -".to_string()),
        }
    }
    if let Some(stat) = report.coordinates.as_ref() {
        lines.push(stat_line("coordinates", stat));
    }
    if let Some(stat) = report.density.as_ref() {
        lines.push(stat_line("density_m", stat));
    }
    if let Some(stat) = report.duplicates.as_ref() {
        lines.push(stat_line("duplicates", stat));
    }
    if let Some(tiles) = report.tiles.as_ref() {
        lines.push(format!("tiles: {}", tiles.len()));
        for (zoom, count) in tiles_by_zoom(tiles) {
            lines.push(format!("z={zoom}: tiles={count}"));
        }
    }
    lines
}

pub fn ndjson_lines(report: &StatsReport) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    if let Some(features) = report.features {
        lines.push(serde_json::to_string(&json!({
            "type": "summary",
            "features": features,
        }))?);
    }
    if let Some(bbox) = report.bbox.as_ref() {
        lines.push(serde_json::to_string(&json!({
            "type": "bbox",
            "bbox": bbox,
        }))?);
    }
    for (name, stat) in [
        ("coordinates", report.coordinates.as_ref()),
        ("density", report.density.as_ref()),
        ("duplicates", report.duplicates.as_ref()),
    ] {
        if let Some(stat) = stat {
            lines.push(serde_json::to_string(&json!({
                "type": "stat",
                "name": name,
                "stat": stat,
            }))?);
        }
    }
    if let Some(tiles) = report.tiles.as_ref() {
        for tile in tiles.iter() {
            lines.push(serde_json::to_string(&json!({
                "type": "tile",
                "tile": tile,
            }))?);
        }
    }
    Ok(lines)
}

use serde::Serialize;
use tracing::{debug, trace};

use crate::algo::{great_circle_distance, is_duplicate, BoundingBox};
use crate::error::{Result, StatsError};
use crate::geometry::{flatten_coords, Feature};
use crate::stats::{RunningStat, StatSummary};
use crate::tiles::{TileCoverage, TileId, DEFAULT_TILE_SIZE, MAX_ZOOM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsOptions {
    /// Highest zoom to collect tiles for. `None` disables tile tracking.
    pub max_zoom: Option<i32>,
    pub tile_size: u32,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            max_zoom: None,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl StatsOptions {
    pub fn with_max_zoom(max_zoom: i32) -> Self {
        Self {
            max_zoom: Some(max_zoom),
            ..Self::default()
        }
    }

    /// Validated max zoom, clamped to [`MAX_ZOOM`].
    pub fn resolve_max_zoom(&self) -> Result<Option<u8>> {
        let Some(max_zoom) = self.max_zoom else {
            return Ok(None);
        };
        if max_zoom < 0 {
            return Err(StatsError::Configuration(format!(
                "max zoom must be between 0 and {MAX_ZOOM}, got {max_zoom}"
            )));
        }
        if max_zoom > MAX_ZOOM as i32 {
            debug!(requested = max_zoom, max_zoom = MAX_ZOOM, "clamping max zoom");
        }
        Ok(Some(max_zoom.min(MAX_ZOOM as i32) as u8))
    }
}

/// Everything one feature adds to the aggregate, computed before any of it is
/// committed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureContribution {
    pub coordinates: usize,
    pub distances: Vec<f64>,
    pub duplicates: usize,
    pub bbox: BoundingBox,
    pub tiles: Vec<TileId>,
}

impl FeatureContribution {
    pub fn measure(feature: &Feature, coverage: Option<&TileCoverage>) -> Result<Self> {
        let coords = flatten_coords(&feature.geometry)?;
        let mut distances = Vec::with_capacity(coords.len().saturating_sub(1));
        let mut duplicates = 0;
        for pair in coords.windows(2) {
            if is_duplicate(pair[0], pair[1]) {
                duplicates += 1;
            } else {
                distances.push(great_circle_distance(pair[0], pair[1]));
            }
        }
        let bbox = BoundingBox::compute(&coords)?;
        let tiles = coverage
            .map(|coverage| coverage.tiles_for(&bbox))
            .unwrap_or_default();
        Ok(Self {
            coordinates: coords.len(),
            distances,
            duplicates,
            bbox,
            tiles,
        })
    }
}

/// Public view of the aggregate at one point in the stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub bbox: Option<BoundingBox>,
    pub density: StatSummary,
    pub duplicates: StatSummary,
    pub coordinates: StatSummary,
    pub features: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<TileId>>,
}

#[derive(Debug, Clone, PartialEq)]
struct AggregateState {
    bbox: Option<BoundingBox>,
    density: RunningStat,
    duplicates: RunningStat,
    coordinates: RunningStat,
    features: u64,
    tiles: Option<TileCoverage>,
}

/// Single-pass statistics over a stream of features.
///
/// Features must be fed one at a time in arrival order. Callers receiving
/// features from several sources serialize them before calling [`process`].
///
/// [`process`]: GeoStats::process
#[derive(Debug, Clone, PartialEq)]
pub struct GeoStats {
    state: AggregateState,
}

impl GeoStats {
    pub fn new(options: StatsOptions) -> Result<Self> {
        if options.tile_size == 0 {
            return Err(StatsError::Configuration(
                "tile size must be greater than zero".to_string(),
            ));
        }
        let tiles = options
            .resolve_max_zoom()?
            .map(|max_zoom| TileCoverage::new(max_zoom, options.tile_size));
        Ok(Self {
            state: AggregateState {
                bbox: None,
                density: RunningStat::new(),
                duplicates: RunningStat::new(),
                coordinates: RunningStat::new(),
                features: 0,
                tiles,
            },
        })
    }

    /// Folds one feature into the aggregate and hands it back unchanged.
    ///
    /// On error the aggregate is left exactly as it was.
    pub fn process(&mut self, feature: Feature) -> Result<Feature> {
        let contribution = FeatureContribution::measure(&feature, self.state.tiles.as_ref())?;
        self.commit(contribution);
        Ok(feature)
    }

    /// Commits a contribution measured with [`FeatureContribution::measure`].
    pub fn commit(&mut self, contribution: FeatureContribution) {
        let state = &mut self.state;
        state.features += 1;
        state.coordinates.write(contribution.coordinates as f64);
        for distance in contribution.distances.iter() {
            state.density.write(*distance);
        }
        state.duplicates.write(contribution.duplicates as f64);
        state.bbox = Some(match state.bbox {
            Some(bbox) => bbox.merge(&contribution.bbox),
            None => contribution.bbox,
        });
        let new_tiles = match state.tiles.as_mut() {
            Some(coverage) => coverage.extend(contribution.tiles),
            None => 0,
        };
        trace!(
            feature = state.features,
            coordinates = contribution.coordinates,
            duplicates = contribution.duplicates,
            new_tiles,
            "feature processed"
        );
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bbox: self.state.bbox,
            density: self.state.density.snapshot(),
            duplicates: self.state.duplicates.snapshot(),
            coordinates: self.state.coordinates.snapshot(),
            features: self.state.features,
            tiles: self.state.tiles.as_ref().map(TileCoverage::to_vec),
        }
    }

    /// Wraps a feature iterator so every feature flows through this
    /// aggregator on its way to the consumer.
    pub fn stream<I>(&mut self, features: I) -> GeoStatsStream<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Feature>,
    {
        GeoStatsStream {
            stats: self,
            inner: features.into_iter(),
        }
    }
}

/// Passthrough iterator returned by [`GeoStats::stream`].
pub struct GeoStatsStream<'a, I> {
    stats: &'a mut GeoStats,
    inner: I,
}

impl<I> Iterator for GeoStatsStream<'_, I>
where
    I: Iterator<Item = Feature>,
{
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        let feature = self.inner.next()?;
        Some(self.stats.process(feature))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

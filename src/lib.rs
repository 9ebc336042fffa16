//! Single-pass statistics over streams of GeoJSON features.
//!
//! [`GeoStats`] folds features into a running aggregate (bounding box,
//! coordinate spacing, duplicate coordinates, coordinates per feature and,
//! optionally, the set of covered map tiles) and hands every feature back
//! unchanged so it can sit in the middle of a larger pipeline.

pub mod aggregate;
pub mod algo;
pub mod cli;
pub mod error;
pub mod geometry;
pub mod input;
pub mod output;
pub mod stats;
pub mod tiles;

pub use aggregate::{FeatureContribution, GeoStats, GeoStatsStream, StatsOptions, StatsSnapshot};
pub use algo::BoundingBox;
pub use error::{Result, StatsError};
pub use geometry::{flatten_coords, Feature, Geometry, Position};
pub use stats::{RunningStat, StatSummary};
pub use tiles::{TileCoverage, TileId};

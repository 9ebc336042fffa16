//! Spherical-mercator tile coverage.
//!
//! Tile ids follow the XYZ convention: `y = 0` is the northernmost row. The
//! pixel size only changes how coordinates are rounded onto the pixel grid;
//! it never changes which ids exist at a zoom level.

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

use serde::Serialize;

use crate::algo::BoundingBox;

pub const MAX_ZOOM: u8 = 20;
pub const DEFAULT_TILE_SIZE: u32 = 256;

const MAX_SIN_LAT: f64 = 0.9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileId {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Inclusive tile index range at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    pub fn tile_count(&self) -> u64 {
        (self.max_x - self.min_x + 1) as u64 * (self.max_y - self.min_y + 1) as u64
    }

    pub fn tiles(self) -> impl Iterator<Item = TileId> {
        let TileRange {
            zoom,
            min_x,
            min_y,
            max_x,
            max_y,
        } = self;
        (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| TileId::new(zoom, x, y)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalMercator {
    size: f64,
}

impl SphericalMercator {
    pub fn new(tile_size: u32) -> Self {
        Self {
            size: tile_size as f64,
        }
    }

    /// Projects lon/lat to whole world pixels at `zoom`, capped at the world
    /// edge.
    pub fn px(&self, lon: f64, lat: f64, zoom: u8) -> (f64, f64) {
        let world = self.size * 2_f64.powi(zoom as i32);
        let center = world / 2.0;
        let f = lat.to_radians().sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
        let x = (center + lon * world / 360.0).round();
        let y = (center - 0.5 * ((1.0 + f) / (1.0 - f)).ln() * world / (2.0 * PI)).round();
        (x.min(world), y.min(world))
    }

    /// Tiles touched by `bbox` at `zoom`. Edges landing exactly on a tile
    /// boundary count the tile on both sides.
    pub fn tile_range(&self, bbox: &BoundingBox, zoom: u8) -> TileRange {
        let (ll_x, ll_y) = self.px(bbox.min_x, bbox.min_y, zoom);
        let (ur_x, ur_y) = self.px(bbox.max_x, bbox.max_y, zoom);
        let xs = [
            (ll_x / self.size).floor(),
            ((ur_x - 1.0) / self.size).floor(),
        ];
        let ys = [
            (ur_y / self.size).floor(),
            ((ll_y - 1.0) / self.size).floor(),
        ];
        let last = (1_u64 << zoom) as f64 - 1.0;
        let clamp = |v: f64| v.clamp(0.0, last) as u32;
        TileRange {
            zoom,
            min_x: clamp(xs[0].min(xs[1])),
            min_y: clamp(ys[0].min(ys[1])),
            max_x: clamp(xs[0].max(xs[1])),
            max_y: clamp(ys[0].max(ys[1])),
        }
    }
}

/// Tiles intersecting a bounding box at every zoom from 0 to `max_zoom`.
pub fn tiles_for_bbox(mercator: &SphericalMercator, bbox: &BoundingBox, max_zoom: u8) -> Vec<TileId> {
    (0..=max_zoom)
        .flat_map(|zoom| mercator.tile_range(bbox, zoom).tiles())
        .collect()
}

/// Running set of every tile touched so far.
///
/// This is the only structure in the aggregate that grows with the input:
/// it holds one entry per distinct tile, so wide features at high zooms can
/// make it large.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCoverage {
    max_zoom: u8,
    mercator: SphericalMercator,
    tiles: BTreeSet<TileId>,
}

impl TileCoverage {
    pub fn new(max_zoom: u8, tile_size: u32) -> Self {
        Self {
            max_zoom: max_zoom.min(MAX_ZOOM),
            mercator: SphericalMercator::new(tile_size),
            tiles: BTreeSet::new(),
        }
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn tiles_for(&self, bbox: &BoundingBox) -> Vec<TileId> {
        tiles_for_bbox(&self.mercator, bbox, self.max_zoom)
    }

    /// Adds tiles to the set, returning how many were new.
    pub fn extend<I: IntoIterator<Item = TileId>>(&mut self, tiles: I) -> usize {
        let before = self.tiles.len();
        self.tiles.extend(tiles);
        self.tiles.len() - before
    }

    pub fn cover(&mut self, bbox: &BoundingBox) -> usize {
        let tiles = self.tiles_for(bbox);
        self.extend(tiles)
    }

    pub fn contains(&self, tile: &TileId) -> bool {
        self.tiles.contains(tile)
    }

    /// Tiles ordered by zoom, then x, then y.
    pub fn to_vec(&self) -> Vec<TileId> {
        self.tiles.iter().copied().collect()
    }
}

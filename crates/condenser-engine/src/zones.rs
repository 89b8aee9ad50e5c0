//! Court zone occupancy testing.
//!
//! Zones are the serve-ready standing areas drawn once per camera setup.
//! Each frame, ankle points are tested against every (scaled) zone polygon;
//! a zone is occupied when at least one ankle lies inside it or on its edge.
//! Zone counts are tiny (about 4), so a linear scan is used.

use std::path::Path;

use condenser_models::{Point, Vertex, ZoneFile};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

/// Tolerance for treating a point as lying on a polygon edge.
const EDGE_EPSILON: f64 = 1e-9;

/// A simple polygon in frame-pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    vertices: Vec<Vertex>,
}

impl Zone {
    /// Build a zone, rejecting polygons with fewer than 3 vertices.
    pub fn new(index: usize, vertices: Vec<Vertex>) -> EngineResult<Self> {
        if vertices.len() < 3 {
            return Err(EngineError::invalid_zone(
                index,
                format!("needs at least 3 vertices, got {}", vertices.len()),
            ));
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Copy of this zone with every vertex multiplied by `ratio`.
    pub fn scaled(&self, ratio: f64) -> Zone {
        Zone {
            vertices: self.vertices.iter().map(|v| v.scaled(ratio)).collect(),
        }
    }

    /// Point-in-polygon test that counts the boundary as inside.
    pub fn contains(&self, p: &Point) -> bool {
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let a = to_point(self.vertices[i]);
            let b = to_point(self.vertices[j]);

            if on_segment(p, &a, &b) {
                return true;
            }

            // Even-odd ray cast towards +x
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }

        inside
    }
}

fn to_point(v: Vertex) -> Point {
    Point::new(v.x as f64, v.y as f64)
}

fn on_segment(p: &Point, a: &Point, b: &Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}

/// Per-frame zone occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZoneStatus {
    /// One flag per zone, in zone order.
    pub occupancy: Vec<bool>,
    /// Number of occupied zones.
    pub active_count: usize,
}

/// Tests ankle points against the court zones.
#[derive(Debug, Clone)]
pub struct ZoneTester {
    zones: Vec<Zone>,
    scaled_zones: Vec<Zone>,
    scale_factor: f64,
}

impl ZoneTester {
    /// Create a tester from already-validated zones.
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            scaled_zones: Vec::new(),
            scale_factor: 1.0,
        }
    }

    /// Validate and wrap polygons loaded from a zone file.
    pub fn from_zone_file(file: ZoneFile) -> EngineResult<Self> {
        let zones = file
            .0
            .into_iter()
            .enumerate()
            .map(|(index, vertices)| Zone::new(index, vertices))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self::new(zones))
    }

    /// Parse zones from a JSON string.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Self::from_zone_file(ZoneFile::from_json(json)?)
    }

    /// Load zones from a zone file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let tester = Self::from_zone_file(ZoneFile::from_path(path)?)?;
        info!(zones = tester.len(), path = %path.display(), "Loaded court zones");
        Ok(tester)
    }

    /// Rescale all zones from the authoring width to the processing width.
    pub fn scale(&mut self, original_width: u32, target_width: u32) -> EngineResult<()> {
        if original_width == 0 {
            return Err(EngineError::invalid_video("original width must be > 0"));
        }
        self.scale_factor = target_width as f64 / original_width as f64;
        self.scaled_zones = self.zones.iter().map(|z| z.scaled(self.scale_factor)).collect();

        debug!(
            original_width,
            target_width,
            scale_factor = self.scale_factor,
            "Scaled court zones"
        );
        Ok(())
    }

    /// Ratio `target_width / original_width` recorded by the last `scale`.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Zones used for testing: the scaled copy once `scale` ran, else the originals.
    pub fn active_zones(&self) -> &[Zone] {
        if self.scaled_zones.is_empty() {
            &self.zones
        } else {
            &self.scaled_zones
        }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Report which zones contain at least one ankle.
    pub fn check(&self, ankles: &[Point]) -> ZoneStatus {
        let zones = self.active_zones();
        let mut occupancy = vec![false; zones.len()];

        for ankle in ankles {
            for (i, zone) in zones.iter().enumerate() {
                if !occupancy[i] && zone.contains(ankle) {
                    occupancy[i] = true;
                }
            }
        }

        let active_count = occupancy.iter().filter(|&&o| o).count();
        ZoneStatus {
            occupancy,
            active_count,
        }
    }
}

//! Geographic bounding boxes, their `"west,south,east,north"` text form, and
//! the UV remap used when a textured mesh moves to a new box.

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coords::LatLon;

/// Errors produced while parsing or validating a [`BoundingBox`].
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    /// The text did not contain exactly four comma-separated values.
    #[error("bounding box needs 4 comma-separated values, got {0}")]
    ComponentCount(usize),
    /// One of the components was not a number.
    #[error("invalid bounding box component `{0}`")]
    InvalidNumber(String),
    /// A component is NaN or infinite.
    #[error("bounding box component is not finite")]
    NonFinite,
    /// Latitudes outside [-90, 90], or south not below north.
    #[error("invalid latitude range {south}..{north}")]
    LatitudeRange {
        /// Southern edge in degrees.
        south: f64,
        /// Northern edge in degrees.
        north: f64,
    },
}

/// A latitude/longitude rectangle in degrees.
///
/// Longitudes may cross the antimeridian (`east < west`); the longitudinal
/// extent then wraps through 180°.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge (longitude, degrees).
    pub west: f64,
    /// Southern edge (latitude, degrees).
    pub south: f64,
    /// Eastern edge (longitude, degrees).
    pub east: f64,
    /// Northern edge (latitude, degrees).
    pub north: f64,
}

impl BoundingBox {
    /// The whole planet.
    pub const GLOBAL: BoundingBox = BoundingBox {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    /// Create a box, validating the latitude range.
    ///
    /// Every component must be finite and the box must have a non-zero
    /// latitudinal extent.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, GeoError> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(GeoError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) || south >= north {
            return Err(GeoError::LatitudeRange { south, north });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Longitudinal extent in degrees, wrapping through the antimeridian when `east <= west`.
    pub fn width(&self) -> f64 {
        let width = self.east - self.west;
        if width <= 0.0 { width + 360.0 } else { width }
    }

    /// Latitudinal extent in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Geographic center of the box, longitude wrapped to [-180, 180].
    pub fn median(&self) -> LatLon {
        let mut lon = self.west + self.width() / 2.0;
        if lon > 180.0 {
            lon -= 360.0;
        }
        LatLon::new((self.south + self.north) / 2.0, lon)
    }

    /// Normalized (u, v) position of a coordinate inside the box.
    ///
    /// `u` runs west→east and `v` south→north; values outside `[0, 1]` lie outside the box.
    pub fn normalized(&self, coord: LatLon) -> Vec2 {
        let mut dlon = coord.lon - self.west;
        if dlon < 0.0 {
            dlon += 360.0;
        }
        let u = dlon / self.width();
        let v = (coord.lat - self.south) / self.height();
        Vec2::new(u as f32, v as f32)
    }

    /// Coordinate at a normalized (u, v) position inside the box.
    pub fn lerp(&self, u: f64, v: f64) -> LatLon {
        LatLon::new(
            self.south + v * self.height(),
            self.west + u * self.width(),
        )
    }

    /// Build the smallest non-wrapping box spanning two corner coordinates.
    ///
    /// Corners sharing a latitude span no area and are rejected like any
    /// other invalid box.
    pub fn from_corners(a: LatLon, b: LatLon) -> Result<Self, GeoError> {
        Self::new(
            a.lon.min(b.lon),
            a.lat.min(b.lat),
            a.lon.max(b.lon),
            a.lat.max(b.lat),
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl FromStr for BoundingBox {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(GeoError::ComponentCount(parts.len()));
        }
        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| GeoError::InvalidNumber((*part).to_string()))?;
        }
        BoundingBox::new(values[0], values[1], values[2], values[3])
    }
}

/// Texture transform applied to an existing texture after its mesh moved to a new box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvScaleOffset {
    /// Multiplier applied to mesh UVs.
    pub scale: Vec2,
    /// Added after scaling.
    pub offset: Vec2,
}

impl UvScaleOffset {
    /// The identity transform.
    pub const IDENTITY: UvScaleOffset = UvScaleOffset {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    /// Map a UV in new-box space to the matching UV of the old texture.
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv * self.scale + self.offset
    }
}

/// Compute the transform that lets a texture rendered for `old` keep lining up
/// with a mesh whose UVs now span `new`.
///
/// A mesh UV `uv` (in `new`) samples the old texture at `uv * scale + offset`.
/// An `old` box without area (only constructible field by field) yields the
/// identity.
pub fn calculate_uv_scale_offset(old: &BoundingBox, new: &BoundingBox) -> UvScaleOffset {
    let old_width = old.width();
    let old_height = old.height();
    if !(old_width > 0.0 && old_height > 0.0 && old_width.is_finite() && old_height.is_finite()) {
        return UvScaleOffset::IDENTITY;
    }

    // Offset from the old center, wrapped to [-180, 180).
    let from_center = (new.west - old.median().lon + 180.0).rem_euclid(360.0) - 180.0;
    let dlon = from_center + old_width / 2.0;

    UvScaleOffset {
        scale: Vec2::new(
            (new.width() / old_width) as f32,
            (new.height() / old_height) as f32,
        ),
        offset: Vec2::new(
            (dlon / old_width) as f32,
            ((new.south - old.south) / old_height) as f32,
        ),
    }
}

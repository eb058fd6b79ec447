//! Elevation input for mesh generation.
//!
//! The mesh worker pulls elevation grids from an [`ElevationSource`], which in
//! production fronts the DEM raster service. [`NoiseElevation`] synthesizes a
//! planet-wide DEM from fractal simplex noise for offline use.

use noise::{NoiseFn, Simplex};
use thiserror::Error;
use trek_geo::{BoundingBox, lat_lon_to_direction};

/// Errors produced while fetching elevation data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ElevationError {
    /// No elevation product with this id.
    #[error("unknown DEM `{0}`")]
    UnknownDem(String),
    /// Sample buffer does not match the requested grid.
    #[error("elevation grid has {actual} samples, expected {expected}")]
    SizeMismatch {
        /// `width * height`.
        expected: usize,
        /// Samples received.
        actual: usize,
    },
    /// Failure inside the elevation provider.
    #[error("elevation source failed: {0}")]
    Source(String),
}

/// Row-major grid of elevations in meters, row 0 along the southern edge.
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationGrid {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl ElevationGrid {
    /// Wrap a sample buffer, checking it holds `width * height` values.
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, ElevationError> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(ElevationError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Grid of constant elevation.
    pub fn flat(width: u32, height: u32, elevation: f32) -> Self {
        Self {
            width,
            height,
            samples: vec![elevation; width as usize * height as usize],
        }
    }

    /// Samples per row.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Elevation at column `x`, row `y`.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.samples[(y * self.width + x) as usize]
    }
}

/// Provider of elevation grids, called from the mesh worker thread.
pub trait ElevationSource: Send + Sync {
    /// Sample `width` x `height` elevations evenly spaced over `bbox`,
    /// edges inclusive.
    fn sample(
        &self,
        dem_id: &str,
        bbox: &BoundingBox,
        width: u32,
        height: u32,
    ) -> Result<ElevationGrid, ElevationError>;
}

/// Parameters of the fBm noise DEM.
#[derive(Clone, Debug)]
pub struct NoiseElevationParams {
    /// Noise seed.
    pub seed: u32,
    /// Octaves summed per sample.
    pub octaves: u32,
    /// Frequency of the first octave, in cycles per planet radius.
    pub base_frequency: f64,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Amplitude of the first octave in meters.
    pub amplitude: f64,
}

impl Default for NoiseElevationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            base_frequency: 1.5,
            lacunarity: 2.0,
            persistence: 0.5,
            amplitude: 6000.0,
        }
    }
}

/// Seamless procedural DEM sampled on the unit sphere, so it tiles across the
/// antimeridian and poles. Accepts any DEM id.
pub struct NoiseElevation {
    noise: Simplex,
    params: NoiseElevationParams,
}

impl NoiseElevation {
    /// Create a source with the given parameters.
    pub fn new(params: NoiseElevationParams) -> Self {
        Self {
            noise: Simplex::new(params.seed),
            params,
        }
    }

    fn elevation_at(&self, lat: f64, lon: f64) -> f32 {
        let dir = lat_lon_to_direction(trek_geo::LatLon::new(lat, lon)).as_dvec3();
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;
        for _ in 0..self.params.octaves {
            let p = dir * frequency;
            total += self.noise.get([p.x, p.y, p.z]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }
        total as f32
    }
}

impl Default for NoiseElevation {
    fn default() -> Self {
        Self::new(NoiseElevationParams::default())
    }
}

impl ElevationSource for NoiseElevation {
    fn sample(
        &self,
        _dem_id: &str,
        bbox: &BoundingBox,
        width: u32,
        height: u32,
    ) -> Result<ElevationGrid, ElevationError> {
        let du = 1.0 / f64::from(width.max(2) - 1);
        let dv = 1.0 / f64::from(height.max(2) - 1);
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let coord = bbox.lerp(f64::from(x) * du, f64::from(y) * dv);
                samples.push(self.elevation_at(coord.lat, coord.lon));
            }
        }
        ElevationGrid::new(width, height, samples)
    }
}

//! Selection sub-controllers armed by the globe controller's activities.
//!
//! Selectors receive model-local hit directions, so selections stay attached
//! to the surface while the globe rotates.

use glam::Vec3;
use tracing::debug;
use trek_geo::{BoundingBox, LatLon, angular_distance, direction_to_lat_lon};

/// A finished selection.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// Area picked with the bounding-box selector.
    BoundingBox(BoundingBox),
    /// Points picked with the path selector.
    Path {
        /// What the path measures.
        mode: PathMode,
        /// Picked coordinates in order.
        points: Vec<LatLon>,
    },
}

/// Interface shared by the selection sub-controllers.
pub trait SelectionController {
    /// Arm or disarm the selector. Disarming cancels any selection in progress.
    fn set_enabled(&mut self, enabled: bool);

    /// Whether the selector is armed.
    fn is_enabled(&self) -> bool;

    /// Drop the selection in progress.
    fn cancel_selection(&mut self);

    /// Pick the surface point in `local_direction`. Returns a selection once
    /// enough points have been picked.
    fn make_selection(&mut self, local_direction: Vec3) -> Option<Selection>;

    /// Move the preview cursor to `local_direction`.
    fn update_cursor(&mut self, local_direction: Vec3);
}

/// Two-corner bounding-box selector.
#[derive(Clone, Debug, Default)]
pub struct BoundingBoxSelector {
    enabled: bool,
    first_corner: Option<LatLon>,
    cursor: Option<LatLon>,
}

impl BoundingBoxSelector {
    /// Box spanned by the first corner and the cursor, while selecting.
    pub fn preview(&self) -> Option<BoundingBox> {
        BoundingBox::from_corners(self.first_corner?, self.cursor?).ok()
    }

    /// The first picked corner.
    pub fn first_corner(&self) -> Option<LatLon> {
        self.first_corner
    }
}

impl SelectionController for BoundingBoxSelector {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.cancel_selection();
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn cancel_selection(&mut self) {
        self.first_corner = None;
        self.cursor = None;
    }

    fn make_selection(&mut self, local_direction: Vec3) -> Option<Selection> {
        if !self.enabled {
            return None;
        }
        let coord = direction_to_lat_lon(local_direction);
        match self.first_corner.take() {
            None => {
                self.first_corner = Some(coord);
                None
            }
            Some(first) => match BoundingBox::from_corners(first, coord) {
                Ok(bbox) => {
                    debug!(%bbox, "Bounding box selected");
                    self.cursor = None;
                    Some(Selection::BoundingBox(bbox))
                }
                Err(err) => {
                    // Keep the first corner so the user can pick again.
                    debug!(%err, "Ignoring degenerate bounding box");
                    self.first_corner = Some(first);
                    None
                }
            },
        }
    }

    fn update_cursor(&mut self, local_direction: Vec3) {
        if self.enabled {
            self.cursor = Some(direction_to_lat_lon(local_direction));
        }
    }
}

/// What a path selection measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathMode {
    /// Running distance along any number of points.
    Distance,
    /// Elevation profile between two points.
    HeightProfile,
}

impl PathMode {
    fn max_points(self) -> Option<usize> {
        match self {
            PathMode::Distance => None,
            PathMode::HeightProfile => Some(2),
        }
    }
}

/// Point-path selector for distance and height-profile measurement.
#[derive(Clone, Debug)]
pub struct PathSelector {
    enabled: bool,
    mode: PathMode,
    points: Vec<LatLon>,
    complete: bool,
    cursor: Option<LatLon>,
}

impl Default for PathSelector {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: PathMode::Distance,
            points: Vec::new(),
            complete: false,
            cursor: None,
        }
    }
}

impl PathSelector {
    /// Switch measurement mode, dropping any points picked so far.
    pub fn set_mode(&mut self, mode: PathMode) {
        if self.mode != mode {
            self.mode = mode;
            self.cancel_selection();
        }
    }

    /// Current measurement mode.
    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// Points picked so far.
    pub fn points(&self) -> &[LatLon] {
        &self.points
    }

    /// Preview cursor position.
    pub fn cursor(&self) -> Option<LatLon> {
        self.cursor
    }

    /// Great-circle length of the path on a sphere of `radius`.
    pub fn path_length(&self, radius: f64) -> f64 {
        self.points
            .windows(2)
            .map(|pair| angular_distance(pair[0], pair[1]) * radius)
            .sum()
    }
}

impl SelectionController for PathSelector {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.cancel_selection();
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn cancel_selection(&mut self) {
        self.points.clear();
        self.complete = false;
        self.cursor = None;
    }

    fn make_selection(&mut self, local_direction: Vec3) -> Option<Selection> {
        if !self.enabled {
            return None;
        }
        if self.complete {
            self.points.clear();
            self.complete = false;
        }
        self.points.push(direction_to_lat_lon(local_direction));

        if self.points.len() < 2 {
            return None;
        }
        if let Some(max) = self.mode.max_points() {
            if self.points.len() < max {
                return None;
            }
            self.complete = true;
        }
        Some(Selection::Path {
            mode: self.mode,
            points: self.points.clone(),
        })
    }

    fn update_cursor(&mut self, local_direction: Vec3) {
        if self.enabled {
            self.cursor = Some(direction_to_lat_lon(local_direction));
        }
    }
}

//! Geographic primitives shared by the terrain crates: bounding boxes and their
//! text format, UV remapping between boxes, lat/lon directions, and model transforms.

mod bbox;
mod coords;
mod transform;

pub use bbox::{BoundingBox, GeoError, UvScaleOffset, calculate_uv_scale_offset};
pub use coords::{
    LatLon, angular_distance, direction_to_lat_lon, distance_point_segment, lat_lon_to_direction,
    project_on_plane,
};
pub use transform::Transform;

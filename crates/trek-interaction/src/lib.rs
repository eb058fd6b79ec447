//! Direct manipulation of a terrain globe: activity state machine, grab and
//! grip rotation, animated navigate-to, and surface selection tools.

mod activity;
mod controller;
mod grab;
mod input;
mod navigate;
mod overlay;
mod selection;

pub use activity::Activity;
pub use controller::{GlobeController, Interactable};
pub use grab::{GrabState, drag_rotation, grab_lost, grab_point_distance, grip_rotation};
pub use input::{ControllerId, ControllerPose, DoubleClickDetector, PoseSource, RayHit};
pub use navigate::{Navigation, oriented_rotation};
pub use overlay::CoordinateOverlay;
pub use selection::{BoundingBoxSelector, PathMode, PathSelector, Selection, SelectionController};

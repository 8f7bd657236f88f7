//! Label data for duplicate detection.
//!
//! A dataset image is described only by its YOLO label file: a list of
//! class ids with normalized center-format boxes. No pixel data is read.

mod bbox;
pub mod io_yolo;

pub use bbox::{iou, BoundingBox};
pub use io_yolo::LabelSet;

//! Text geometry: detections, fragment merging and region cropping.
//!
//! Recognition itself happens outside the crate, either as a detection dump
//! covering the whole screen or through a [`TextRecognizer`] called on one
//! cropped row at a time.

pub mod engine;
pub mod merge;
pub mod preprocess;
pub mod text_box;

pub use engine::{CommandRecognizer, RawDetection, TextRecognizer, load_detections, parse_detections};
pub use merge::{BoxQuery, MergeParams, TextMatch, TextMerger, Tolerance, find_by_box, find_by_text, merge_and_sort};
pub use preprocess::{crop_rect, threshold_bright_pixels};
pub use text_box::{MergedLine, Rect, TextBox};

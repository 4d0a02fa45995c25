//! Relic scanner: turns OCR output of a relic detail panel into validated,
//! exportable relic records.
//!
//! Detections are merged into lines ([`ocr`]), looked up per screen region
//! ([`layout`], [`scan`]) and resolved against a closed vocabulary
//! ([`relic`]).

pub mod config;
pub mod errors;
pub mod layout;
pub mod logging;
pub mod ocr;
pub mod paths;
pub mod relic;
pub mod scan;

pub use errors::{RelicError, ScanError, StructuralError, ValidationError};

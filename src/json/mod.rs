//! Coercing near-JSON model output into structured values.

pub mod extractor;
pub mod repair;

pub use extractor::{bracket_span, extract};
pub use repair::{JsonInput, JsonRepairer, repair_locally};

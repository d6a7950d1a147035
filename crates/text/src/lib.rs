#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Pure text transforms backing the inline suggestion engine.
//!
//! Everything here is a plain function over strings: segmenting a line into
//! word/punctuation runs, turning an overlap spec like `"1+1"` into a typed-
//! character threshold, and cleaning up raw provider output before it is
//! shown. No I/O, no state, no async.

pub mod overlap;
pub mod postprocess;
pub mod words;

pub use overlap::OverlapSpec;
pub use postprocess::{postprocess, strip_code_fences, strip_context_overlap};
pub use words::{CharClass, Segment, classify, segments};

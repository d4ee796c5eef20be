//! Direct HTTP acquisition.
//!
//! The non-browser half of the pipeline: a plain GET with markup stripping
//! as the fallback extractor, and JSON-LD parsing as the structured-data
//! salvage path.

pub mod http_fetch;
pub mod structured;

pub use http_fetch::{FetchAttempt, FetchFailure, HttpFetcher};
pub use structured::extract_jsonld_text;

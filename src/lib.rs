//! Ingest pipeline for vaccine-trial sieve analysis data.
//!
//! Four flat files (treatment assignments, aligned amino-acid sequences,
//! per-site distances to the reference, per-site test results) are parsed,
//! cross-referenced by participant ID and merged into a position-major
//! [`model::SieveModel`], with per-position Shannon entropy computed for
//! the full cohort and each treatment group. Rendering is somebody else's
//! job; this crate ends at the finished model.

pub mod model;
pub mod parse;
pub mod process;
pub mod stats;

#[cfg(test)]
mod tests {
    mod cli_tests;
    mod pipeline_tests;
    mod stats_tests;
}

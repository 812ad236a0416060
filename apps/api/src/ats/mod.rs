//! Applicant ranking: feature extraction, job profiles, scoring and the
//! per-job ranking aggregator.

pub mod features;
pub mod handlers;
pub mod impact;
pub mod profile;
pub mod ranking;
pub mod scoring;
pub mod source;
pub mod structure;
pub mod text;

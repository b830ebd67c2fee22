//! Heuristic news-credibility service.
//!
//! [`analyzer::Analyzer`] turns article text into a real / fake verdict with a
//! confidence and four pseudo-model rows. An [`store::AnalysisStore`] keeps every
//! analysis, in memory ([`store::MemoryStore`]) or on disk ([`sled_store::SledStore`]).
//! [`api::app`] exposes both over HTTP.

pub mod analysis;
pub mod analyzer;
pub mod api;
pub mod config;
pub mod error;
pub mod remote;
pub mod sled_store;
pub mod store;

//! Lead Enrichment Library
//!
//! Enriches a lead (an email address plus an optional company name) with data from
//! three external providers: social profile lookup, AI company research and AI
//! persona classification. All provider calls share one rate-limited request queue
//! and are retried with exponential backoff.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `enrichment`: Enrichment orchestration (`EnrichmentClient`).
//! - `errors`: Error handling types.
//! - `models`: Profiles, persona buckets, options and statistics.
//! - `providers`: Provider traits and their HTTP adapters.
//! - `rate_limiter`: Sliding-window request queue.
//! - `retry`: Exponential backoff.
//! - `stats`: Shared usage counters.

pub mod config;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod providers;
pub mod rate_limiter;
pub mod retry;
pub mod stats;

pub use config::EnrichmentConfig;
pub use enrichment::EnrichmentClient;
pub use errors::EnrichmentError;
pub use models::{
    BatchOptions, CompanyIntel, ContentAnalysis, EnrichOptions, EnrichedProfile, EnrichmentStats,
    PersonaBucket, SocialNetwork, SocialProfiles,
};

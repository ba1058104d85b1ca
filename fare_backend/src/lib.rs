//! # Fare Backend
//!
//! Baseline and deal engine for travel prices.
//!
//! This crate turns raw flight and hotel price observations into expected
//! prices, anomaly and rarity scores, price-drop estimates and bundled
//! flight + hotel packages. It is driven by a periodic batch job
//! (`fare-batch`) and exposes read-side queries for ranked deals, route
//! summaries and model accuracy.
//!
//! ## Features
//!
//! - **Baselines**: Additive Holt-Winters fit per route or region with a grid
//!   search over the smoothing parameters
//! - **Scoring**: Robust (MAD-based) z-score, deviation from expectation and
//!   empirical rarity
//! - **Drop Estimates**: Logistic models for single records and packages
//! - **Packages**: Flight + hotel assembly, pricing, deduplication and
//!   replacement of the stored set
//! - **Queries**: Top deals, route analytics, model performance
//!
//! ## Architecture
//!
//! - [`algorithms`]: Pure numerical models (fitter, scorer, drop models)
//! - [`models`]: Observation and package records
//! - [`db`]: Repository traits, in-memory implementation and factory
//! - [`services`]: Batch jobs and queries, generic over the repository
//! - [`config`]: `fare.toml` loading and validation
//!

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

pub use algorithms::{estimate_drop_probability, fit_series, rarity, score};
pub use config::EngineConfig;
pub use services::{build_packages, refresh_all_baselines, refresh_baselines};

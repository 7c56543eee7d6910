//! StockRadar merchant churn dataset generator.
//!
//! Synthesizes a deliberately dirty, longitudinal SaaS dataset: merchants,
//! subscription lifecycle, app usage, SMS reliability and recovered sales,
//! with churn labels driven by hidden per-merchant traits.
//!
//! ```no_run
//! use stockradar_core::{config::SimConfig, engine::SimEngine, store::SimStore};
//!
//! let engine = SimEngine::new(SimConfig::default())?;
//! let dataset = engine.run();
//! let mut store = SimStore::in_memory()?;
//! store.migrate()?;
//! store.write_dataset(&dataset)?;
//! # Ok::<(), stockradar_core::error::SimError>(())
//! ```

pub mod churn;
pub mod config;
pub mod dataset;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod export;
pub mod latent;
pub mod population;
pub mod rng;
pub mod store;
pub mod synth;
pub mod types;

//! # scan-organizer
//!
//! Three-stage concurrent pipeline that reorganizes scanned publication
//! pages into a canonical folder layout, delegating the semantic judgments
//! (page ordering, cover metadata, table-of-contents parsing) to a
//! vision-capable inference backend.
//!
//! ## Pipeline
//!
//! - **Scanner** — lists each source folder under the input root and asks
//!   the backend to order its page files, emitting one [`PageSet`] per folder
//! - **Analyzer** — derives [`PublicationMetadata`] from the cover page and
//!   a secondary content index (with per-entry review records) from the
//!   pages after it, emitting at most one [`Publication`] per PageSet
//! - **Copier** — materializes
//!   `<output>/<title>/Numéro <NN> | <Months> <YYYY>/<NNN>.<ext>`
//!
//! Stages run as independent tokio tasks linked by unbounded channels;
//! dropping a stage's sender is the shutdown signal for the stage below it.
//! Failures isolate to the smallest skippable unit (one source folder, one
//! PageSet, one referenced page) and are recorded to an append-only
//! [`AuditSink`] rather than aborting the run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scan_organizer::{AuditSink, Config, InferenceClient, Pipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = Arc::new(InferenceClient::new(
//!         reqwest::Client::new(),
//!         config.base_url.clone(),
//!         config.api_key.clone(),
//!         config.model.clone(),
//!         config.timeout,
//!     ));
//!     let audit = Arc::new(AuditSink::new("."));
//!
//!     Pipeline::new(config, client, audit).run().await;
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod audit;
pub mod client;
pub mod config;
pub mod copier;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod scanner;
pub mod types;

pub use audit::{AuditEvent, AuditSink, Severity};
pub use client::InferenceClient;
pub use config::{Config, ConfigBuilder, ConfigError};
pub use error::{OrganizerError, Result};
pub use pipeline::Pipeline;
pub use types::{
    ContentIndex, ContentIndexEntry, Page, PageSet, Publication, PublicationMetadata,
    ReviewRecord,
};

//! Brand Guardian - video compliance auditing
//!
//! Audits a video for brand and regulatory compliance by extracting its spoken and
//! on-screen text, retrieving the relevant policy rules and asking a language model
//! for a structured verdict.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `source` - Video URL validation and download
//! - `video_indexer` - Azure Video Indexer client (auth, upload, polling, extraction)
//! - `embedding` - Embedding generation
//! - `vector_store` - Policy vector store abstraction
//! - `knowledge` - Policy PDF ingestion into the vector store
//! - `rag` - Rule retrieval and chat model access
//! - `pipeline` - Pipeline state and the ingestion and audit stages
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use brand_guardian::config::Settings;
//! use brand_guardian::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let state = orchestrator
//!         .run("https://youtu.be/dQw4w9WgXcQ", "vid_launch_ad")
//!         .await;
//!     println!("{}: {}", state.status(), state.final_report);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod rag;
pub mod source;
pub mod vector_store;
pub mod video_indexer;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{GuardianError, Result};

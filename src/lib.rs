//! Verse Engine
//!
//! Bible reference resolution and annotation layers for note-taking vaults.
//!
//! # Modules
//!
//! - `corpus`: canon table, book aliases and the per-translation verse index
//! - `reference`: canonical addresses, ranges and the reference parser
//! - `annotations`: layered highlights, notes and bookmarks
//! - `collections`: verse-card collections with versioned import/export
//! - `search`: literal or regex search over verse text and notes
//! - `render`: escaping highlight renderer for search spans
//! - `persist`: storage backends and the background save queue
//! - `session`: one vault's corpus, config, stores and persistence

pub mod annotations;
pub mod cancel;
pub mod collections;
pub mod config;
pub mod corpus;
pub mod error;
pub mod persist;
pub mod reference;
pub mod render;
pub mod search;
pub mod session;

pub use cancel::CancellationFlag;
pub use config::SessionConfig;
pub use error::{EngineError, Result};
pub use session::Session;

//! # Kashi Common Library
//!
//! Shared code for the Kashi lyrics engine:
//! - Canonical lyrics data model (documents, lines, syllables)
//! - Cache key derivation
//! - Event types (LyricsEvent enum)
//! - Configuration loading
//! - Error taxonomy
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod types;

pub use config::{CacheStrategy, ProviderKind, Settings, TranslationEngine};
pub use error::{Error, Result};
pub use types::{LyricsDocument, LyricsKind, SongIdentity, VersionedLyrics};

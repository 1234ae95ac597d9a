//! HTTP/SSE control interface
//!
//! The transport between the engine and its consumers: requests are matched
//! to responses by song key, and state changes stream out as `LyricsEvent`
//! SSE messages.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, AppContext};

//! # Kashi Sync Display Engine (kashi-sd)
//!
//! Keeps a lyrics display aligned with an independently advancing playback
//! clock: flattens a resolved document into a time-sorted render model,
//! locates the primary line for each time sample, diffs the active
//! line/syllable set against the previous frame, and drives a staggered,
//! interruptible scroll arbitrated against user scrolling.
//!
//! The engine never blocks on I/O; every tick only reads an already-resolved
//! render model. Rendering itself (DOM, pixels) is the consumer's problem;
//! the engine emits transitions and scroll commands.

pub mod engine;
pub mod highlight;
pub mod locate;
pub mod model;
pub mod retime;
pub mod scroll;
pub mod ticker;

pub use engine::{FrameUpdate, SyncConfig, Synchronizer};
pub use model::{DisplayMode, RenderLine, RenderModel, RenderSyllable};

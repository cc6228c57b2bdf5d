//! Playback engine.
//!
//! A session runs three tasks that talk only through channels:
//! - the interpreter walks the script tree, waiting out each delay while
//!   listening for control signals;
//! - the dispatcher drains the outbound queue onto the connection and owns
//!   its teardown;
//! - the listener reads server messages and hands frames to an active
//!   WaitForIt through a single-slot rendezvous.
//!
//! Closing the signal channel (`Playback::stop`) is the only shutdown trigger.

mod dispatcher;
mod interpreter;
mod listener;
mod scope;
mod session;
mod state;
mod sync;

pub use session::{Playback, PlaybackDeps, PlaybackInfo};
pub use state::PlaybackState;

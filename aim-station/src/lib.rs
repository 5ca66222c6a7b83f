//! Runtime pieces of the aiming station
//!
//! The frame loop runs the measurement pipeline on a blocking thread while
//! the controller link runs as a tokio task. They share the live
//! configuration and a latest-value measurement slot, nothing else.

pub mod device;
pub mod frame_loop;
pub mod session;

pub use frame_loop::FrameLoop;
pub use session::{CycleOutcome, SessionDriver, SessionError, SessionSettings};

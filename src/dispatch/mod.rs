//! Frame dispatch.
//!
//! One loop on one thread pulls frames from the input, classifies video
//! frames against their predecessor, drives the recording session, keeps
//! the pre-roll buffer, and forwards frames to an open clip. Signal
//! handlers only ever touch atomic flags that the loop polls.

mod dispatcher;
mod trigger;

pub use dispatcher::{DispatchError, Dispatcher, RunStats, Step};
pub use trigger::{ManualTrigger, ShutdownFlag};

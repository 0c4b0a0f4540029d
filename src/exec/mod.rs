// src/exec/mod.rs

//! Copy transport layer.
//!
//! The scheduler never moves bytes itself. [`backend`] provides the
//! `CopyRunner` trait the runtime hands reserved copies and task starts to,
//! and a channel-backed implementation for production wiring.

pub mod backend;

pub use backend::{ChannelCopyRunner, CopyRequest, CopyRunner};

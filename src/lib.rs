//! Scarlet - cached world minimaps
//!
//! Renders block worlds as PNG minimaps through a disk-backed memoizing
//! cache that coordinates every process sharing its directory.

pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod service;
pub mod ui;
pub mod world;

pub use error::{ScarletError, ScarletResult};

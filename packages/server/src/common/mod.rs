//! Helpers shared across layers.

pub mod time;

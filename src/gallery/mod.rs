//! Community sample gallery: one row per item, listed newest first.

pub mod handler;
pub mod seed;
pub mod store;
pub mod types;

//! Pure transforms from fetched payloads to display-ready structures. Nothing in
//! here performs I/O or touches the state store.

pub mod activity;
pub mod agents;
pub mod format;
pub mod inference;
pub mod schedule;
pub mod sessions;
pub mod usage;

//! Core logic for the minnow terminal time tracker: the entry model,
//! duration and tag parsing, the aggregation engine, tag suggestions, and
//! the circular dial controller, plus the store and dashboard plumbing.

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod slider;
pub mod storage;
pub mod stores;
pub mod suggest;
pub mod ui;

//! Simulator internals

pub mod allocator;
pub mod arena;
pub mod config;
pub mod error;
pub mod report;
pub mod stats;
pub mod workload;

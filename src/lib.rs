// Library crate exposing modules for the binary and integration tests

pub mod adapters;
pub mod config;
pub mod diff;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod repository;
pub mod snapshot;
pub mod util;

//! Integration test modules for ostinato
//!
//! Test categories:
//! - engine: Engine construction, configuration, parameters, diagnostics
//! - transport: Sample position, seconds, block count
//! - graph: Graph construction, routing, rejection and removal

pub mod engine;
pub mod graph;
pub mod transport;

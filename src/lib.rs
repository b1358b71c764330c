pub mod cache;
pub mod cli;
pub mod config;
pub mod fs;
pub mod graph;
pub mod model;
pub mod resolver;
pub mod synthesizer;

mod api;

pub use api::{Modcache, ModcacheBuilder, PlanError, PlanOptions, Stage};
pub use resolver::{RebuildMode, ResolutionOutput};

//! Command-line front end for the graph stream generator.

pub mod commands;
pub mod config;

pub use commands::{export_graphml, generate, render_summary, validate};
pub use config::{resolve_input_path, Overrides};

//! Graph stream generator: synthesizes multi-stream graph event logs from pattern templates.

pub mod config;
pub mod document;
pub mod graphml;
pub mod history;
pub mod instance;
pub mod output;
pub mod pattern;
pub mod resolver;
pub mod scheduler;
pub mod state;
pub mod types;

pub use config::{GenerationParams, OutputFormat, SamplingPolicy, TimeFormat};
pub use document::InputDocument;
pub use graphml::{export_file, write_graphml, ExportSummary};
pub use history::StreamHistory;
pub use instance::attempt_instantiate;
pub use output::{Artifacts, OccurrenceLog, StreamRecord, StreamWriter};
pub use pattern::{BackgroundModel, PatternLibrary, PatternTemplate};
pub use resolver::{pick_existing, ResolverStats};
pub use scheduler::{GenerationSummary, Phase, Scheduler, StreamSummary};
pub use state::{PendingQueue, SimulationState};
pub use types::*;

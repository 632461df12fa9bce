//! Core data types for generated vertices, edges, and occurrences.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Globally unique vertex id, assigned sequentially from 1.
pub type VertexId = u64;

/// Globally unique edge id, assigned sequentially from 1.
pub type EdgeId = u64;

/// One discrete unit of simulated time.
pub type Tick = u64;

/// 1-based output stream index.
pub type StreamIndex = usize;

/// Attribute map carried by templates and instances. Keys are ordered so
/// serialized output is deterministic.
pub type Attributes = BTreeMap<String, String>;

/// A vertex bound during one occurrence.
///
/// `stream_times` holds one scheduled emission time per stream the vertex must
/// appear on. It is empty when the vertex is a reference to an already emitted
/// vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInstance {
    pub id: VertexId,
    pub attributes: Attributes,
    pub stream_times: BTreeMap<StreamIndex, Tick>,
}

impl VertexInstance {
    /// Whether this instance creates a new vertex (as opposed to referencing history).
    pub fn is_new(&self) -> bool {
        !self.stream_times.is_empty()
    }
}

/// A concrete edge bound to global vertex ids and an absolute creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeInstance {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    pub directed: bool,
    pub attributes: Attributes,
    pub stream: StreamIndex,
    pub creation_time: Tick,
}

/// A vertex waiting to be written to one particular stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexEmission {
    pub id: VertexId,
    pub attributes: Attributes,
    pub time: Tick,
}

/// Anything that can sit in a stream's pending queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Vertex(VertexEmission),
    Edge(EdgeInstance),
}

impl Emission {
    /// Tick at which this item is due on its stream.
    pub fn scheduled_time(&self) -> Tick {
        match self {
            Emission::Vertex(v) => v.time,
            Emission::Edge(e) => e.creation_time,
        }
    }
}

/// A successfully instantiated pattern occurrence.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub pattern_id: String,
    pub trigger_tick: Tick,
    /// Bound vertices, in the order they were first bound.
    pub vertices: Vec<VertexInstance>,
    pub edges: Vec<EdgeInstance>,
}

/// One entry of the occurrence log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRecord {
    pub pattern_id: String,
    pub vertex_ids: Vec<String>,
    pub edge_ids: Vec<String>,
}

impl From<&Occurrence> for OccurrenceRecord {
    fn from(occurrence: &Occurrence) -> Self {
        Self {
            pattern_id: occurrence.pattern_id.clone(),
            vertex_ids: occurrence.vertices.iter().map(|v| v.id.to_string()).collect(),
            edge_ids: occurrence.edges.iter().map(|e| e.id.to_string()).collect(),
        }
    }
}

/// Errors that can occur while loading templates or generating streams.
#[derive(thiserror::Error, Debug)]
pub enum GenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Probability {probability} out of range for pattern {pattern}")]
    ProbabilityOutOfRange { pattern: String, probability: f64 },

    #[error("Incorrect offsets in edge {edge} of pattern {pattern}: min {min}, max {max}")]
    InvalidOffsets {
        pattern: String,
        edge: String,
        min: i64,
        max: i64,
    },

    #[error("{role} vertex {vertex} in edge {edge} of pattern {pattern} not defined")]
    UndefinedVertex {
        pattern: String,
        edge: String,
        role: &'static str,
        vertex: String,
    },

    #[error("Duplicate vertex id {vertex} in pattern {pattern}")]
    DuplicateVertex { pattern: String, vertex: String },

    #[error("streamNum {stream} out of range in edge {edge} of pattern {pattern} (streams: {num_streams})")]
    StreamOutOfRange {
        pattern: String,
        edge: String,
        stream: i64,
        num_streams: usize,
    },

    #[error("Invalid pattern {pattern}: edges to existing vertex {vertex} use different streams ({first} and {second})")]
    InconsistentExistingVertex {
        pattern: String,
        vertex: String,
        first: StreamIndex,
        second: StreamIndex,
    },

    #[error("Export error: {0}")]
    Export(String),
}

/// Convenience result type.
pub type GenResult<T> = Result<T, GenError>;

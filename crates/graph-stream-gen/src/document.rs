//! Decoding of input documents into parameters and a validated pattern library.
//!
//! Numeric and boolean fields accept native JSON values as well as their string
//! forms (`"3"`, `"true"`), since hand-written pattern libraries use both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::config::GenerationParams;
use crate::pattern::{
    BackgroundModel, EdgeDescription, PatternDescription, PatternLibrary, PatternTemplate,
    VertexDescription,
};
use crate::types::{Attributes, GenError, GenResult, StreamIndex};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    num_streams: Value,
    seconds_per_unit_time: Value,
    start_time: String,
    duration: Value,
    output_time_format: String,
    output_file_prefix: String,
    #[serde(default)]
    output_format: Option<String>,
    #[serde(default)]
    sampling_policy: Option<String>,
    #[serde(default)]
    random_seed: Option<Value>,
    #[serde(default)]
    patterns: Vec<RawPattern>,
    #[serde(default)]
    seed_patterns: Vec<RawPattern>,
    #[serde(default)]
    background_models: Vec<RawBackground>,
}

#[derive(Debug, Deserialize)]
struct RawLibrary {
    patterns: Vec<RawPattern>,
}

#[derive(Debug, Deserialize)]
struct RawBackground {
    stream: Value,
    file: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    id: Value,
    #[serde(default)]
    track: Option<Value>,
    probability: Value,
    #[serde(default)]
    vertices: Vec<RawVertex>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawVertex {
    id: Value,
    new: Value,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEdge {
    id: Value,
    source: Value,
    target: Value,
    #[serde(default)]
    directed: Option<Value>,
    min_offset: Value,
    max_offset: Value,
    stream_num: Value,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

/// A fully decoded and validated input document.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub params: GenerationParams,
    pub library: PatternLibrary,
}

impl InputDocument {
    /// Read and validate a document from disk. Background files resolve
    /// relative to the document's directory.
    pub fn load(path: &Path) -> GenResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&text, &base)
    }

    /// Decode a document from a string.
    pub fn parse(text: &str, base_dir: &Path) -> GenResult<Self> {
        let raw: RawDocument = serde_json::from_str(text)?;

        let num_streams = as_u64(&raw.num_streams, "numStreams")? as usize;
        let mut params = GenerationParams::new(num_streams, as_u64(&raw.duration, "duration")?);
        params.seconds_per_unit_time = as_u64(&raw.seconds_per_unit_time, "secondsPerUnitTime")?;
        params.start_time = GenerationParams::parse_start_time(&raw.start_time)?;
        params.time_format = raw.output_time_format.parse()?;
        params.output_file_prefix = raw.output_file_prefix;
        if let Some(format) = &raw.output_format {
            params.output_format = format.parse()?;
        }
        if let Some(policy) = &raw.sampling_policy {
            params.sampling_policy = policy.parse()?;
        }
        if let Some(seed) = &raw.random_seed {
            params.random_seed = Some(as_u64(seed, "randomSeed")?);
        }
        params.validate()?;

        let patterns = build_patterns(raw.patterns, num_streams, None)?;
        let seeds = build_patterns(raw.seed_patterns, num_streams, None)?;

        let mut background = Vec::with_capacity(raw.background_models.len());
        for model in raw.background_models {
            let stream = as_u64(&model.stream, "backgroundModels.stream")? as StreamIndex;
            if stream < 1 || stream > num_streams {
                return Err(GenError::InvalidParameter(format!(
                    "background model {} pinned to stream {stream}, but there are {num_streams} streams",
                    model.file
                )));
            }
            let path: PathBuf = base_dir.join(&model.file);
            let text = std::fs::read_to_string(&path).map_err(|e| {
                GenError::InvalidParameter(format!(
                    "cannot read background model {}: {e}",
                    path.display()
                ))
            })?;
            let lib: RawLibrary = serde_json::from_str(&text)?;
            let patterns = build_patterns(lib.patterns, num_streams, Some(stream))?;
            tracing::debug!(
                "Loaded background model {} ({} patterns) for stream {stream}",
                path.display(),
                patterns.len()
            );
            background.push(BackgroundModel {
                name: model.name.unwrap_or(model.file),
                stream,
                patterns,
            });
        }

        Ok(Self {
            params,
            library: PatternLibrary {
                patterns,
                seeds,
                background,
            },
        })
    }
}

fn build_patterns(
    raw: Vec<RawPattern>,
    num_streams: usize,
    pinned_stream: Option<StreamIndex>,
) -> GenResult<Vec<PatternTemplate>> {
    raw.into_iter()
        .map(|p| {
            let desc = describe_pattern(p)?;
            PatternTemplate::from_description(desc, num_streams, pinned_stream)
        })
        .collect()
}

fn describe_pattern(raw: RawPattern) -> GenResult<PatternDescription> {
    let id = as_text(&raw.id);
    let track = match &raw.track {
        Some(v) => as_bool(v, "track")?,
        None => false,
    };
    let probability = as_f64(&raw.probability, "probability")?;

    let vertices = raw
        .vertices
        .into_iter()
        .map(|v| {
            Ok(VertexDescription {
                id: as_text(&v.id),
                is_new: as_bool(&v.new, "new")?,
                attributes: to_attributes(v.attributes),
            })
        })
        .collect::<GenResult<Vec<_>>>()?;

    let edges = raw
        .edges
        .into_iter()
        .map(|e| {
            Ok(EdgeDescription {
                id: as_text(&e.id),
                source: as_text(&e.source),
                target: as_text(&e.target),
                directed: match &e.directed {
                    Some(v) => as_bool(v, "directed")?,
                    None => false,
                },
                min_offset: as_i64(&e.min_offset, "minOffset")?,
                max_offset: as_i64(&e.max_offset, "maxOffset")?,
                stream: as_i64(&e.stream_num, "streamNum")?,
                attributes: to_attributes(e.attributes),
            })
        })
        .collect::<GenResult<Vec<_>>>()?;

    Ok(PatternDescription {
        id,
        track,
        probability,
        vertices,
        edges,
    })
}

/// String form of a scalar: strings verbatim, everything else as JSON text.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_attributes(raw: BTreeMap<String, Value>) -> Attributes {
    raw.into_iter().map(|(k, v)| (k, as_text(&v))).collect()
}

fn as_i64(value: &Value, field: &str) -> GenResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| GenError::InvalidParameter(format!("{field} must be an integer, got {value}")))
}

fn as_u64(value: &Value, field: &str) -> GenResult<u64> {
    let n = as_i64(value, field)?;
    u64::try_from(n)
        .map_err(|_| GenError::InvalidParameter(format!("{field} must not be negative, got {n}")))
}

fn as_f64(value: &Value, field: &str) -> GenResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| GenError::InvalidParameter(format!("{field} must be a number, got {value}")))
}

fn as_bool(value: &Value, field: &str) -> GenResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        other => Err(GenError::InvalidParameter(format!(
            "{field} must be true or false, got {other}"
        ))),
    }
}

//! Stream artifact writers and the occurrence log.
//!
//! Every stream gets one [`StreamWriter`]. Two layouts exist: compact edge lines
//! and a JSON array of vertex/edge records. Both write as items are flushed;
//! nothing is buffered as a whole document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{GenerationParams, OutputFormat};
use crate::types::{Attributes, EdgeInstance, GenResult, OccurrenceRecord, VertexEmission};

/// Sink for one stream's emissions.
pub trait StreamWriter {
    /// Called for each vertex as it is emitted. Writers may ignore vertices.
    fn write_vertex(&mut self, vertex: &VertexEmission, time: &str) -> GenResult<()>;

    /// Called for each edge as it is emitted.
    fn write_edge(&mut self, edge: &EdgeInstance, time: &str) -> GenResult<()>;

    /// Terminate the artifact and flush it.
    fn finish(&mut self) -> GenResult<()>;
}

/// `<source> <attributes> <target> <time>`, one line per edge.
pub struct EdgeLineWriter<W: Write> {
    out: W,
}

impl<W: Write> EdgeLineWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StreamWriter for EdgeLineWriter<W> {
    fn write_vertex(&mut self, _vertex: &VertexEmission, _time: &str) -> GenResult<()> {
        Ok(())
    }

    fn write_edge(&mut self, edge: &EdgeInstance, time: &str) -> GenResult<()> {
        let attributes = serde_json::to_string(&edge.attributes)?;
        writeln!(self.out, "{} {attributes} {} {time}", edge.source, edge.target)?;
        Ok(())
    }

    fn finish(&mut self) -> GenResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Vertex entry of a JSON stream artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: String,
    pub attributes: Attributes,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
}

/// Edge entry of a JSON stream artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
    pub attributes: Attributes,
    pub directed: bool,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
}

/// One element of a JSON stream artifact: `{"vertex": ..}` or `{"edge": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamRecord {
    #[serde(rename = "vertex")]
    Vertex(VertexRecord),
    #[serde(rename = "edge")]
    Edge(EdgeRecord),
}

/// Writes a JSON array one element per line, opening and closing the brackets itself.
struct JsonArrayWriter<W: Write> {
    out: W,
    started: bool,
    wrote_any: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            started: false,
            wrote_any: false,
        }
    }

    fn open(&mut self) -> GenResult<()> {
        if !self.started {
            self.out.write_all(b"[\n")?;
            self.started = true;
        }
        Ok(())
    }

    fn push<T: Serialize>(&mut self, item: &T) -> GenResult<()> {
        self.open()?;
        if self.wrote_any {
            self.out.write_all(b",\n")?;
        }
        self.out.write_all(b"  ")?;
        serde_json::to_writer(&mut self.out, item)?;
        self.wrote_any = true;
        Ok(())
    }

    fn close(&mut self) -> GenResult<()> {
        self.open()?;
        if self.wrote_any {
            self.out.write_all(b"\n")?;
        }
        self.out.write_all(b"]\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// JSON array of [`StreamRecord`]s, vertices included.
pub struct JsonStreamWriter<W: Write> {
    array: JsonArrayWriter<W>,
}

impl<W: Write> JsonStreamWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            array: JsonArrayWriter::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.array.out
    }
}

impl<W: Write> StreamWriter for JsonStreamWriter<W> {
    fn write_vertex(&mut self, vertex: &VertexEmission, time: &str) -> GenResult<()> {
        self.array.push(&StreamRecord::Vertex(VertexRecord {
            id: vertex.id.to_string(),
            attributes: vertex.attributes.clone(),
            time_stamp: time.to_string(),
        }))
    }

    fn write_edge(&mut self, edge: &EdgeInstance, time: &str) -> GenResult<()> {
        self.array.push(&StreamRecord::Edge(EdgeRecord {
            id: edge.id.to_string(),
            source: edge.source.to_string(),
            target: edge.target.to_string(),
            attributes: edge.attributes.clone(),
            directed: edge.directed,
            time_stamp: time.to_string(),
        }))
    }

    fn finish(&mut self) -> GenResult<()> {
        self.array.close()
    }
}

/// Builds the writer for an output format.
pub fn stream_writer<W: Write + 'static>(format: OutputFormat, out: W) -> Box<dyn StreamWriter> {
    match format {
        OutputFormat::Edges => Box::new(EdgeLineWriter::new(out)),
        OutputFormat::Json => Box::new(JsonStreamWriter::new(out)),
    }
}

/// JSON array of occurrence records for tracked patterns.
pub struct OccurrenceLog<W: Write> {
    array: JsonArrayWriter<W>,
}

impl<W: Write> OccurrenceLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            array: JsonArrayWriter::new(out),
        }
    }

    pub fn record(&mut self, record: &OccurrenceRecord) -> GenResult<()> {
        self.array.push(record)
    }

    pub fn finish(&mut self) -> GenResult<()> {
        self.array.close()
    }

    pub fn into_inner(self) -> W {
        self.array.out
    }
}

/// The full set of files produced by one run.
pub struct Artifacts {
    pub streams: Vec<Box<dyn StreamWriter>>,
    pub occurrences: OccurrenceLog<Box<dyn Write>>,
    pub paths: Vec<PathBuf>,
}

impl Artifacts {
    /// Create `<prefix>-s1..N` and `<prefix>-insts` under `dir`.
    pub fn create(params: &GenerationParams, dir: &Path) -> GenResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut streams = Vec::with_capacity(params.num_streams);
        let mut paths = Vec::with_capacity(params.num_streams + 1);
        for stream in 1..=params.num_streams {
            let path = dir.join(params.stream_file_name(stream));
            let file = BufWriter::new(File::create(&path)?);
            tracing::info!("Created stream artifact: {}", path.display());
            streams.push(stream_writer(params.output_format, file));
            paths.push(path);
        }

        let path = dir.join(params.occurrence_file_name());
        let file: Box<dyn Write> = Box::new(BufWriter::new(File::create(&path)?));
        tracing::info!("Created occurrence log: {}", path.display());
        paths.push(path);

        Ok(Self {
            streams,
            occurrences: OccurrenceLog::new(file),
            paths,
        })
    }

    /// Close every artifact.
    pub fn finish(&mut self) -> GenResult<()> {
        for stream in &mut self.streams {
            stream.finish()?;
        }
        self.occurrences.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> EdgeInstance {
        EdgeInstance {
            id: 4,
            source: 1,
            target: 2,
            directed: true,
            attributes: Attributes::from([("label".to_string(), "e1".to_string())]),
            stream: 1,
            creation_time: 3,
        }
    }

    fn vertex() -> VertexEmission {
        VertexEmission {
            id: 1,
            attributes: Attributes::from([("label".to_string(), "v1".to_string())]),
            time: 0,
        }
    }

    #[test]
    fn test_edge_line_format() {
        let mut w = EdgeLineWriter::new(Vec::new());
        w.write_vertex(&vertex(), "0").unwrap();
        w.write_edge(&edge(), "2017-01-01 00:00:03").unwrap();
        w.finish().unwrap();
        let text = String::from_utf8(w.into_inner()).unwrap();
        assert_eq!(text, "1 {\"label\":\"e1\"} 2 2017-01-01 00:00:03\n");
    }

    #[test]
    fn test_json_stream_is_valid_array() {
        let mut w = JsonStreamWriter::new(Vec::new());
        w.write_vertex(&vertex(), "0").unwrap();
        w.write_edge(&edge(), "3").unwrap();
        w.finish().unwrap();
        let text = String::from_utf8(w.into_inner()).unwrap();
        assert!(text.starts_with("[\n  {\"vertex\":"));

        let records: Vec<StreamRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(records.len(), 2);
        match &records[1] {
            StreamRecord::Edge(e) => {
                assert_eq!(e.id, "4");
                assert_eq!(e.source, "1");
                assert!(e.directed);
                assert_eq!(e.time_stamp, "3");
            }
            other => panic!("expected edge, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_occurrence_log() {
        let mut log = OccurrenceLog::new(Vec::new());
        log.finish().unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(text, "[\n]\n");
        let parsed: Vec<OccurrenceRecord> = serde_json::from_str(&text).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_occurrence_log_records() {
        let mut log = OccurrenceLog::new(Vec::new());
        for id in ["a", "b"] {
            log.record(&OccurrenceRecord {
                pattern_id: id.to_string(),
                vertex_ids: vec!["1".to_string()],
                edge_ids: vec![],
            })
            .unwrap();
        }
        log.finish().unwrap();
        let parsed: Vec<OccurrenceRecord> =
            serde_json::from_slice(&log.into_inner()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].pattern_id, "b");
    }

    #[test]
    fn test_artifacts_create_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = GenerationParams::new(2, 1);
        params.output_file_prefix = "run".to_string();
        let mut artifacts = Artifacts::create(&params, dir.path()).unwrap();
        artifacts.finish().unwrap();
        assert_eq!(artifacts.paths.len(), 3);
        assert!(dir.path().join("run-s1").exists());
        assert!(dir.path().join("run-s2").exists());
        assert!(dir.path().join("run-insts").exists());
    }
}

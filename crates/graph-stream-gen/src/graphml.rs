//! GraphML export for JSON-format stream artifacts.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::output::StreamRecord;
use crate::types::{GenError, GenResult};

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd";
const GRAPH_ID: &str = "GSG_V1";

/// Counts of what an export wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub nodes: usize,
    pub edges: usize,
}

fn xml_err(e: impl Display) -> GenError {
    GenError::Export(format!("GraphML write failed: {e}"))
}

/// Default output path: the input path with `.graphml` appended.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".graphml");
    PathBuf::from(name)
}

/// Parse a JSON-format stream artifact.
pub fn read_stream_records(text: &str) -> GenResult<Vec<StreamRecord>> {
    if !text.trim_start().starts_with('[') {
        return Err(GenError::Export(
            "input is not a JSON stream artifact (edge-line artifacts carry no vertex records); \
             regenerate with outputFormat \"json\""
                .to_string(),
        ));
    }
    Ok(serde_json::from_str(text)?)
}

/// Convert the stream artifact at `input` into a GraphML file at `output`.
pub fn export_file(input: &Path, output: &Path) -> GenResult<ExportSummary> {
    let text = std::fs::read_to_string(input)?;
    let records = read_stream_records(&text)?;
    let file = std::io::BufWriter::new(std::fs::File::create(output)?);
    let summary = write_graphml(&records, file)?;
    tracing::info!(
        "Exported {} to {} ({} nodes, {} edges)",
        input.display(),
        output.display(),
        summary.nodes,
        summary.edges
    );
    Ok(summary)
}

/// Write records as one GraphML document.
pub fn write_graphml<W: Write>(records: &[StreamRecord], out: W) -> GenResult<ExportSummary> {
    let mut node_keys = BTreeSet::new();
    let mut edge_keys = BTreeSet::new();
    for record in records {
        match record {
            StreamRecord::Vertex(v) => node_keys.extend(v.attributes.keys().cloned()),
            StreamRecord::Edge(e) => edge_keys.extend(e.attributes.keys().cloned()),
        }
    }

    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new("graphml");
    root.push_attribute(("xmlns", GRAPHML_NS));
    root.push_attribute(("xmlns:xsi", XSI_NS));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    for name in &node_keys {
        write_key(&mut writer, &format!("v:{name}"), "node", name)?;
    }
    write_key(&mut writer, "v.timestamp", "node", "timestamp")?;
    for name in &edge_keys {
        write_key(&mut writer, &format!("e:{name}"), "edge", name)?;
    }
    write_key(&mut writer, "e.timestamp", "edge", "timestamp")?;
    write_key(&mut writer, "e.directed", "edge", "directed")?;

    let mut graph = BytesStart::new("graph");
    graph.push_attribute(("id", GRAPH_ID));
    graph.push_attribute(("edgedefault", "directed"));
    writer.write_event(Event::Start(graph)).map_err(xml_err)?;

    let mut summary = ExportSummary::default();
    for record in records {
        match record {
            StreamRecord::Vertex(v) => {
                let mut node = BytesStart::new("node");
                node.push_attribute(("id", v.id.as_str()));
                writer.write_event(Event::Start(node)).map_err(xml_err)?;
                for (name, value) in &v.attributes {
                    write_data(&mut writer, &format!("v:{name}"), value)?;
                }
                write_data(&mut writer, "v.timestamp", &v.time_stamp)?;
                writer
                    .write_event(Event::End(BytesEnd::new("node")))
                    .map_err(xml_err)?;
                summary.nodes += 1;
            }
            StreamRecord::Edge(e) => {
                let mut edge = BytesStart::new("edge");
                edge.push_attribute(("id", e.id.as_str()));
                edge.push_attribute(("source", e.source.as_str()));
                edge.push_attribute(("target", e.target.as_str()));
                writer.write_event(Event::Start(edge)).map_err(xml_err)?;
                for (name, value) in &e.attributes {
                    write_data(&mut writer, &format!("e:{name}"), value)?;
                }
                write_data(&mut writer, "e.directed", if e.directed { "true" } else { "false" })?;
                write_data(&mut writer, "e.timestamp", &e.time_stamp)?;
                writer
                    .write_event(Event::End(BytesEnd::new("edge")))
                    .map_err(xml_err)?;
                summary.edges += 1;
            }
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("graph")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("graphml")))
        .map_err(xml_err)?;

    let mut out = writer.into_inner();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(summary)
}

fn write_key<W: Write>(writer: &mut Writer<W>, id: &str, domain: &str, name: &str) -> GenResult<()> {
    let mut key = BytesStart::new("key");
    key.push_attribute(("id", id));
    key.push_attribute(("for", domain));
    key.push_attribute(("attr.name", name));
    key.push_attribute(("attr.type", "string"));
    writer.write_event(Event::Empty(key)).map_err(xml_err)
}

fn write_data<W: Write>(writer: &mut Writer<W>, key: &str, value: &str) -> GenResult<()> {
    writer
        .create_element("data")
        .with_attribute(("key", key))
        .write_text_content(BytesText::new(value))
        .map_err(xml_err)?;
    Ok(())
}

//! Pattern templates and the validated pattern library.
//!
//! A [`PatternDescription`] is what the decoder produces from an input document;
//! [`PatternTemplate::from_description`] checks it and resolves edge endpoints to
//! vertex slots. Nothing downstream of this module sees an invalid template.

use std::collections::HashMap;
use std::fmt;

use crate::types::{Attributes, GenError, GenResult, StreamIndex, Tick};

/// Unvalidated vertex entry of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexDescription {
    pub id: String,
    pub is_new: bool,
    pub attributes: Attributes,
}

/// Unvalidated edge entry of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDescription {
    pub id: String,
    pub source: String,
    pub target: String,
    pub directed: bool,
    pub min_offset: i64,
    pub max_offset: i64,
    pub stream: i64,
    pub attributes: Attributes,
}

/// Unvalidated pattern as decoded from an input document.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDescription {
    pub id: String,
    pub track: bool,
    pub probability: f64,
    pub vertices: Vec<VertexDescription>,
    pub edges: Vec<EdgeDescription>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexTemplate {
    pub id: String,
    pub is_new: bool,
    /// Always empty for existing vertices; they keep the attributes they were emitted with.
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTemplate {
    pub id: String,
    /// Index into the owning pattern's `vertices`.
    pub source: usize,
    /// Index into the owning pattern's `vertices`.
    pub target: usize,
    pub directed: bool,
    pub min_offset: Tick,
    pub max_offset: Tick,
    pub stream: StreamIndex,
    pub attributes: Attributes,
}

/// A validated, immutable pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTemplate {
    pub id: String,
    pub track: bool,
    pub probability: f64,
    pub vertices: Vec<VertexTemplate>,
    pub edges: Vec<EdgeTemplate>,
}

impl PatternTemplate {
    /// Validate a description against the configured stream count.
    ///
    /// With `pinned_stream`, every edge is forced onto that stream and the declared
    /// stream index is ignored.
    pub fn from_description(
        desc: PatternDescription,
        num_streams: usize,
        pinned_stream: Option<StreamIndex>,
    ) -> GenResult<Self> {
        if !(0.0..=1.0).contains(&desc.probability) {
            return Err(GenError::ProbabilityOutOfRange {
                pattern: desc.id,
                probability: desc.probability,
            });
        }

        let mut slots: HashMap<&str, usize> = HashMap::with_capacity(desc.vertices.len());
        for (idx, vertex) in desc.vertices.iter().enumerate() {
            if slots.insert(vertex.id.as_str(), idx).is_some() {
                return Err(GenError::DuplicateVertex {
                    pattern: desc.id.clone(),
                    vertex: vertex.id.clone(),
                });
            }
        }

        let mut edges = Vec::with_capacity(desc.edges.len());
        for edge in &desc.edges {
            let lookup = |role: &'static str, vertex: &str| {
                slots
                    .get(vertex)
                    .copied()
                    .ok_or_else(|| GenError::UndefinedVertex {
                        pattern: desc.id.clone(),
                        edge: edge.id.clone(),
                        role,
                        vertex: vertex.to_string(),
                    })
            };
            let source = lookup("Source", &edge.source)?;
            let target = lookup("Target", &edge.target)?;

            if edge.min_offset < 0 || edge.min_offset > edge.max_offset {
                return Err(GenError::InvalidOffsets {
                    pattern: desc.id.clone(),
                    edge: edge.id.clone(),
                    min: edge.min_offset,
                    max: edge.max_offset,
                });
            }

            let stream = match pinned_stream {
                Some(s) => s as i64,
                None => edge.stream,
            };
            if stream < 1 || stream > num_streams as i64 {
                return Err(GenError::StreamOutOfRange {
                    pattern: desc.id.clone(),
                    edge: edge.id.clone(),
                    stream,
                    num_streams,
                });
            }

            edges.push(EdgeTemplate {
                id: edge.id.clone(),
                source,
                target,
                directed: edge.directed,
                min_offset: edge.min_offset as Tick,
                max_offset: edge.max_offset as Tick,
                stream: stream as StreamIndex,
                attributes: edge.attributes.clone(),
            });
        }

        let vertices = desc
            .vertices
            .into_iter()
            .map(|v| VertexTemplate {
                attributes: if v.is_new { v.attributes } else { Attributes::new() },
                id: v.id,
                is_new: v.is_new,
            })
            .collect();

        let pattern = PatternTemplate {
            id: desc.id,
            track: desc.track,
            probability: desc.probability,
            vertices,
            edges,
        };
        pattern.check_existing_vertex_streams()?;
        Ok(pattern)
    }

    /// An existing vertex is resolved once per occurrence, so every edge touching
    /// it must land on the same stream.
    fn check_existing_vertex_streams(&self) -> GenResult<()> {
        for (slot, vertex) in self.vertices.iter().enumerate() {
            if vertex.is_new {
                continue;
            }
            let mut first: Option<StreamIndex> = None;
            for edge in self.edges.iter().filter(|e| e.source == slot || e.target == slot) {
                match first {
                    None => first = Some(edge.stream),
                    Some(s) if s != edge.stream => {
                        return Err(GenError::InconsistentExistingVertex {
                            pattern: self.id.clone(),
                            vertex: vertex.id.clone(),
                            first: s,
                            second: edge.stream,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for PatternTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pattern:")?;
        writeln!(f, "  id = {}", self.id)?;
        writeln!(f, "  track = {}", self.track)?;
        writeln!(f, "  probability = {}", self.probability)?;
        writeln!(f, "  vertices = [")?;
        for v in &self.vertices {
            writeln!(f, "    Vertex:")?;
            writeln!(f, "      id = {}", v.id)?;
            writeln!(f, "      new = {}", v.is_new)?;
            writeln!(f, "      attributes = {}", AttrDisplay(&v.attributes))?;
        }
        writeln!(f, "  ]")?;
        writeln!(f, "  edges = [")?;
        for e in &self.edges {
            writeln!(f, "    Edge:")?;
            writeln!(f, "      id = {}", e.id)?;
            writeln!(f, "      source = {}", self.vertices[e.source].id)?;
            writeln!(f, "      target = {}", self.vertices[e.target].id)?;
            writeln!(f, "      directed = {}", e.directed)?;
            writeln!(f, "      minOffset = {}", e.min_offset)?;
            writeln!(f, "      maxOffset = {}", e.max_offset)?;
            writeln!(f, "      streamNum = {}", e.stream)?;
            writeln!(f, "      attributes = {}", AttrDisplay(&e.attributes))?;
        }
        write!(f, "  ]")
    }
}

struct AttrDisplay<'a>(&'a Attributes);

impl fmt::Display for AttrDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

/// A background library whose edges are all pinned to one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundModel {
    pub name: String,
    pub stream: StreamIndex,
    pub patterns: Vec<PatternTemplate>,
}

/// Every template feeding one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternLibrary {
    /// Evaluated every tick.
    pub patterns: Vec<PatternTemplate>,
    /// Forced once at tick 0, ignoring probability.
    pub seeds: Vec<PatternTemplate>,
    pub background: Vec<BackgroundModel>,
}

impl PatternLibrary {
    /// Patterns eligible to fire on every running tick: ordinary first, then background.
    pub fn firing_pool(&self) -> impl Iterator<Item = &PatternTemplate> {
        self.patterns
            .iter()
            .chain(self.background.iter().flat_map(|b| b.patterns.iter()))
    }

    /// Total number of templates across all sources.
    pub fn len(&self) -> usize {
        self.patterns.len()
            + self.seeds.len()
            + self.background.iter().map(|b| b.patterns.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(id: &str, is_new: bool) -> VertexDescription {
        VertexDescription {
            id: id.to_string(),
            is_new,
            attributes: Attributes::from([("label".to_string(), id.to_string())]),
        }
    }

    fn edge(id: &str, source: &str, target: &str, stream: i64) -> EdgeDescription {
        EdgeDescription {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            directed: true,
            min_offset: 0,
            max_offset: 2,
            stream,
            attributes: Attributes::new(),
        }
    }

    fn pattern(vertices: Vec<VertexDescription>, edges: Vec<EdgeDescription>) -> PatternDescription {
        PatternDescription {
            id: "p1".to_string(),
            track: true,
            probability: 0.5,
            vertices,
            edges,
        }
    }

    #[test]
    fn test_valid_pattern_resolves_slots() {
        let desc = pattern(
            vec![vertex("a", true), vertex("b", false)],
            vec![edge("e1", "b", "a", 2)],
        );
        let p = PatternTemplate::from_description(desc, 2, None).unwrap();
        assert_eq!(p.edges[0].source, 1);
        assert_eq!(p.edges[0].target, 0);
        assert_eq!(p.edges[0].stream, 2);
        // existing vertices drop their attributes
        assert!(p.vertices[1].attributes.is_empty());
        assert_eq!(p.vertices[0].attributes["label"], "a");
    }

    #[test]
    fn test_probability_out_of_range() {
        let mut desc = pattern(vec![vertex("a", true)], vec![]);
        desc.probability = 1.5;
        let err = PatternTemplate::from_description(desc, 1, None).unwrap_err();
        assert!(matches!(err, GenError::ProbabilityOutOfRange { .. }));
    }

    #[test]
    fn test_undefined_target() {
        let desc = pattern(vec![vertex("a", true)], vec![edge("e1", "a", "zz", 1)]);
        let err = PatternTemplate::from_description(desc, 1, None).unwrap_err();
        match err {
            GenError::UndefinedVertex { role, vertex, .. } => {
                assert_eq!(role, "Target");
                assert_eq!(vertex, "zz");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_bad_offsets() {
        let mut e = edge("e1", "a", "a", 1);
        e.min_offset = 3;
        e.max_offset = 1;
        let desc = pattern(vec![vertex("a", true)], vec![e]);
        let err = PatternTemplate::from_description(desc, 1, None).unwrap_err();
        assert!(matches!(err, GenError::InvalidOffsets { min: 3, max: 1, .. }));

        let mut e = edge("e1", "a", "a", 1);
        e.min_offset = -1;
        let desc = pattern(vec![vertex("a", true)], vec![e]);
        assert!(PatternTemplate::from_description(desc, 1, None).is_err());
    }

    #[test]
    fn test_stream_out_of_range() {
        let desc = pattern(vec![vertex("a", true)], vec![edge("e1", "a", "a", 3)]);
        let err = PatternTemplate::from_description(desc, 2, None).unwrap_err();
        assert!(matches!(err, GenError::StreamOutOfRange { stream: 3, .. }));
    }

    #[test]
    fn test_existing_vertex_across_streams_rejected() {
        let desc = pattern(
            vec![vertex("a", true), vertex("old", false)],
            vec![edge("e1", "a", "old", 1), edge("e2", "old", "a", 2)],
        );
        let err = PatternTemplate::from_description(desc, 2, None).unwrap_err();
        assert!(matches!(
            err,
            GenError::InconsistentExistingVertex { first: 1, second: 2, .. }
        ));
    }

    #[test]
    fn test_new_vertex_may_span_streams() {
        let desc = pattern(
            vec![vertex("a", true), vertex("b", true)],
            vec![edge("e1", "a", "b", 1), edge("e2", "b", "a", 2)],
        );
        assert!(PatternTemplate::from_description(desc, 2, None).is_ok());
    }

    #[test]
    fn test_pinned_stream_overrides_declared() {
        let desc = pattern(
            vec![vertex("a", true), vertex("old", false)],
            vec![edge("e1", "a", "old", 9), edge("e2", "old", "a", 1)],
        );
        let p = PatternTemplate::from_description(desc, 3, Some(3)).unwrap();
        assert!(p.edges.iter().all(|e| e.stream == 3));
    }

    #[test]
    fn test_duplicate_vertex_rejected() {
        let desc = pattern(vec![vertex("a", true), vertex("a", false)], vec![]);
        let err = PatternTemplate::from_description(desc, 1, None).unwrap_err();
        assert!(matches!(err, GenError::DuplicateVertex { .. }));
    }

    #[test]
    fn test_display_lists_edges() {
        let desc = pattern(vec![vertex("a", true)], vec![edge("e1", "a", "a", 1)]);
        let p = PatternTemplate::from_description(desc, 1, None).unwrap();
        let text = p.to_string();
        assert!(text.contains("id = p1"));
        assert!(text.contains("attributes = {label=a}"));
        assert!(text.contains("streamNum = 1"));
    }
}

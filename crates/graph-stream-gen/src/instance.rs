//! Binding one pattern occurrence to concrete vertex and edge instances.

use std::collections::BTreeMap;

use rand::Rng;

use crate::config::SamplingPolicy;
use crate::pattern::PatternTemplate;
use crate::resolver::pick_existing;
use crate::state::SimulationState;
use crate::types::{
    Attributes, EdgeInstance, Occurrence, StreamIndex, Tick, VertexId, VertexInstance,
};

/// Occurrence-scoped vertex bindings, indexed by the pattern's vertex slots.
struct Bindings<'p> {
    pattern: &'p PatternTemplate,
    slots: Vec<Option<VertexInstance>>,
    order: Vec<usize>,
}

impl<'p> Bindings<'p> {
    fn new(pattern: &'p PatternTemplate) -> Self {
        Self {
            pattern,
            slots: vec![None; pattern.vertices.len()],
            order: Vec::with_capacity(pattern.vertices.len()),
        }
    }

    /// Resolve a vertex slot for an edge landing on `stream` at `edge_time`.
    fn resolve<R: Rng + ?Sized>(
        &mut self,
        slot: usize,
        edge_time: Tick,
        stream: StreamIndex,
        state: &mut SimulationState,
        policy: SamplingPolicy,
        rng: &mut R,
    ) -> Option<VertexId> {
        let template = &self.pattern.vertices[slot];

        if let Some(bound) = self.slots[slot].as_mut() {
            if template.is_new {
                // a new vertex must be out before every edge that uses it
                bound
                    .stream_times
                    .entry(stream)
                    .and_modify(|t| *t = (*t).min(edge_time))
                    .or_insert(edge_time);
            }
            return Some(bound.id);
        }

        let instance = if template.is_new {
            VertexInstance {
                id: state.allocate_vertex_id(),
                attributes: template.attributes.clone(),
                stream_times: BTreeMap::from([(stream, edge_time)]),
            }
        } else {
            let excluded: Vec<VertexId> = self.slots.iter().flatten().map(|v| v.id).collect();
            let id = pick_existing(
                &state.histories[stream - 1],
                &excluded,
                policy,
                rng,
                &mut state.resolver_stats,
            )?;
            VertexInstance {
                id,
                attributes: Attributes::new(),
                stream_times: BTreeMap::new(),
            }
        };

        let id = instance.id;
        self.slots[slot] = Some(instance);
        self.order.push(slot);
        Some(id)
    }

    fn into_vertices(mut self) -> Vec<VertexInstance> {
        self.order
            .iter()
            .filter_map(|&slot| self.slots[slot].take())
            .collect()
    }
}

/// Try to instantiate `pattern` at `trigger_tick`.
///
/// Returns `None` when some existing vertex cannot be resolved. Nothing from an
/// abandoned attempt is scheduled, but ids it drew stay consumed.
pub fn attempt_instantiate<R: Rng + ?Sized>(
    pattern: &PatternTemplate,
    trigger_tick: Tick,
    state: &mut SimulationState,
    policy: SamplingPolicy,
    rng: &mut R,
) -> Option<Occurrence> {
    let mut bindings = Bindings::new(pattern);
    let mut edges = Vec::with_capacity(pattern.edges.len());

    for edge in &pattern.edges {
        let creation_time = trigger_tick + rng.gen_range(edge.min_offset..=edge.max_offset);
        let source = bindings.resolve(edge.source, creation_time, edge.stream, state, policy, rng)?;
        let target = bindings.resolve(edge.target, creation_time, edge.stream, state, policy, rng)?;

        edges.push(EdgeInstance {
            id: state.allocate_edge_id(),
            source,
            target,
            directed: edge.directed,
            attributes: edge.attributes.clone(),
            stream: edge.stream,
            creation_time,
        });
    }

    Some(Occurrence {
        pattern_id: pattern.id.clone(),
        trigger_tick,
        vertices: bindings.into_vertices(),
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{EdgeDescription, PatternDescription, VertexDescription};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn vertex(id: &str, is_new: bool) -> VertexDescription {
        VertexDescription {
            id: id.to_string(),
            is_new,
            attributes: Attributes::from([("label".to_string(), id.to_string())]),
        }
    }

    fn edge(id: &str, source: &str, target: &str, offset: i64, stream: i64) -> EdgeDescription {
        EdgeDescription {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            directed: true,
            min_offset: offset,
            max_offset: offset,
            stream,
            attributes: Attributes::new(),
        }
    }

    fn template(
        vertices: Vec<VertexDescription>,
        edges: Vec<EdgeDescription>,
        num_streams: usize,
    ) -> PatternTemplate {
        let desc = PatternDescription {
            id: "p".to_string(),
            track: false,
            probability: 1.0,
            vertices,
            edges,
        };
        PatternTemplate::from_description(desc, num_streams, None).unwrap()
    }

    #[test]
    fn test_new_vertex_time_clamped_to_earliest_edge() {
        let p = template(
            vec![vertex("a", true), vertex("b", true)],
            vec![
                edge("e1", "a", "b", 5, 1),
                edge("e2", "a", "b", 2, 1),
                edge("e3", "b", "a", 7, 2),
            ],
            2,
        );
        let mut state = SimulationState::new(2);
        let occ = attempt_instantiate(&p, 10, &mut state, SamplingPolicy::Uniform, &mut seeded_rng())
            .unwrap();

        assert_eq!(occ.vertices.len(), 2);
        for v in &occ.vertices {
            assert_eq!(v.stream_times, BTreeMap::from([(1, 12), (2, 17)]));
        }
        assert_eq!(occ.vertices[0].attributes["label"], "a");
        let edge_ids: Vec<_> = occ.edges.iter().map(|e| e.id).collect();
        assert_eq!(edge_ids, vec![1, 2, 3]);
        let times: Vec<_> = occ.edges.iter().map(|e| e.creation_time).collect();
        assert_eq!(times, vec![15, 12, 17]);
    }

    #[test]
    fn test_offset_range_respected() {
        let mut e = edge("e1", "a", "a", 0, 1);
        e.min_offset = 2;
        e.max_offset = 4;
        let p = template(vec![vertex("a", true)], vec![e], 1);
        let mut state = SimulationState::new(1);
        let mut rng = seeded_rng();
        for _ in 0..100 {
            let occ = attempt_instantiate(&p, 3, &mut state, SamplingPolicy::Uniform, &mut rng)
                .unwrap();
            let t = occ.edges[0].creation_time;
            assert!((5..=7).contains(&t));
            assert_eq!(occ.vertices[0].stream_times[&1], t);
        }
    }

    #[test]
    fn test_missing_existing_vertex_abandons_but_consumes_ids() {
        let p = template(
            vec![vertex("a", true), vertex("b", false)],
            vec![edge("e1", "a", "b", 0, 1)],
            1,
        );
        let mut state = SimulationState::new(1);
        let mut rng = seeded_rng();
        assert!(attempt_instantiate(&p, 0, &mut state, SamplingPolicy::Uniform, &mut rng).is_none());
        assert_eq!(state.vertex_ids_assigned(), 1);
        assert_eq!(state.edge_ids_assigned(), 0);
        assert_eq!(state.resolver_stats.misses, 1);

        state.history_mut(1).record_vertex(1);
        let occ = attempt_instantiate(&p, 1, &mut state, SamplingPolicy::Uniform, &mut rng).unwrap();
        assert_eq!(occ.vertices[0].id, 2);
        assert_eq!(occ.vertices[1].id, 1);
        assert!(!occ.vertices[1].is_new());
        assert_eq!(occ.edges[0].source, 2);
        assert_eq!(occ.edges[0].target, 1);
    }

    #[test]
    fn test_existing_slots_never_share_a_vertex() {
        let p = template(
            vec![vertex("x", false), vertex("y", false)],
            vec![edge("e1", "x", "y", 0, 1)],
            1,
        );
        let mut state = SimulationState::new(1);
        let mut rng = seeded_rng();
        state.history_mut(1).record_vertex(1);
        assert!(attempt_instantiate(&p, 0, &mut state, SamplingPolicy::Uniform, &mut rng).is_none());

        state.history_mut(1).record_vertex(2);
        for policy in [SamplingPolicy::Uniform, SamplingPolicy::Degree] {
            for _ in 0..50 {
                let occ = attempt_instantiate(&p, 0, &mut state, policy, &mut rng).unwrap();
                assert_ne!(occ.edges[0].source, occ.edges[0].target);
            }
        }
    }

    #[test]
    fn test_existing_vertex_resolved_once_per_occurrence() {
        let p = template(
            vec![vertex("a", true), vertex("hub", false)],
            vec![edge("e1", "a", "hub", 0, 1), edge("e2", "hub", "a", 1, 1)],
            1,
        );
        let mut state = SimulationState::new(1);
        for id in [100, 200, 300] {
            state.history_mut(1).record_vertex(id);
        }
        let mut rng = seeded_rng();
        for _ in 0..20 {
            let occ = attempt_instantiate(&p, 0, &mut state, SamplingPolicy::Uniform, &mut rng)
                .unwrap();
            assert_eq!(occ.edges[0].target, occ.edges[1].source);
            assert_eq!(occ.vertices.len(), 2);
        }
    }
}

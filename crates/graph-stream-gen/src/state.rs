//! Mutable run state: id counters, stream histories, and pending queues.

use std::collections::BTreeMap;

use crate::history::StreamHistory;
use crate::resolver::ResolverStats;
use crate::types::{EdgeId, Emission, Occurrence, StreamIndex, Tick, VertexEmission, VertexId};

/// Emissions waiting for their tick on one stream.
///
/// Items due at the same tick keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    by_tick: BTreeMap<Tick, Vec<Emission>>,
    len: usize,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, emission: Emission) {
        self.by_tick
            .entry(emission.scheduled_time())
            .or_default()
            .push(emission);
        self.len += 1;
    }

    /// Remove and return every item due at or before `tick`, oldest tick first.
    pub fn take_due(&mut self, tick: Tick) -> Vec<Emission> {
        let later = match tick.checked_add(1) {
            Some(next) => self.by_tick.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.by_tick, later);
        let items: Vec<Emission> = due.into_values().flatten().collect();
        self.len -= items.len();
        items
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Everything the scheduler mutates during a run.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Index `s - 1` holds stream `s`.
    pub histories: Vec<StreamHistory>,
    /// Index `s - 1` holds stream `s`.
    pub queues: Vec<PendingQueue>,
    pub resolver_stats: ResolverStats,
    last_vertex_id: VertexId,
    last_edge_id: EdgeId,
}

impl SimulationState {
    pub fn new(num_streams: usize) -> Self {
        Self {
            histories: vec![StreamHistory::new(); num_streams],
            queues: vec![PendingQueue::new(); num_streams],
            resolver_stats: ResolverStats::default(),
            last_vertex_id: 0,
            last_edge_id: 0,
        }
    }

    pub fn num_streams(&self) -> usize {
        self.histories.len()
    }

    pub fn history(&self, stream: StreamIndex) -> &StreamHistory {
        &self.histories[stream - 1]
    }

    pub fn history_mut(&mut self, stream: StreamIndex) -> &mut StreamHistory {
        &mut self.histories[stream - 1]
    }

    /// Next global vertex id. Ids are never handed out twice, even if the
    /// occurrence that drew one is later abandoned.
    pub fn allocate_vertex_id(&mut self) -> VertexId {
        self.last_vertex_id += 1;
        self.last_vertex_id
    }

    /// Next global edge id.
    pub fn allocate_edge_id(&mut self) -> EdgeId {
        self.last_edge_id += 1;
        self.last_edge_id
    }

    pub fn vertex_ids_assigned(&self) -> u64 {
        self.last_vertex_id
    }

    pub fn edge_ids_assigned(&self) -> u64 {
        self.last_edge_id
    }

    /// Queue an occurrence's vertices, then its edges, on their streams.
    pub fn enqueue(&mut self, occurrence: Occurrence) {
        for vertex in occurrence.vertices {
            for (&stream, &time) in &vertex.stream_times {
                self.queues[stream - 1].push(Emission::Vertex(VertexEmission {
                    id: vertex.id,
                    attributes: vertex.attributes.clone(),
                    time,
                }));
            }
        }
        for edge in occurrence.edges {
            let stream = edge.stream;
            self.queues[stream - 1].push(Emission::Edge(edge));
        }
    }

    pub fn pending_is_empty(&self) -> bool {
        self.queues.iter().all(PendingQueue::is_empty)
    }

    pub fn pending_len(&self) -> usize {
        self.queues.iter().map(PendingQueue::len).sum()
    }
}

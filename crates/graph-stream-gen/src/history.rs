//! Per-stream record of emitted vertices and their running degrees.

use std::collections::HashMap;

use crate::types::VertexId;

/// Append-only history of one output stream.
#[derive(Debug, Clone, Default)]
pub struct StreamHistory {
    ids: Vec<VertexId>,
    degrees: Vec<u64>,
    positions: HashMap<VertexId, usize>,
}

impl StreamHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vertex emitted on this stream, with degree 0.
    ///
    /// Returns `false` if the vertex was already recorded.
    pub fn record_vertex(&mut self, id: VertexId) -> bool {
        if self.positions.contains_key(&id) {
            return false;
        }
        self.positions.insert(id, self.ids.len());
        self.ids.push(id);
        self.degrees.push(0);
        true
    }

    /// Bump the degree of an emitted vertex. Returns `false` if the vertex is unknown.
    pub fn increment_degree(&mut self, id: VertexId) -> bool {
        match self.positions.get(&id) {
            Some(&pos) => {
                self.degrees[pos] += 1;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn degree(&self, id: VertexId) -> Option<u64> {
        self.positions.get(&id).map(|&pos| self.degrees[pos])
    }

    /// Emitted vertex ids in emission order.
    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    /// Degrees parallel to [`ids`](Self::ids).
    pub fn degrees(&self) -> &[u64] {
        &self.degrees
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

//! The multi-stream scheduler: drives the timeline from seeding to drain.
//!
//! A run walks `Init → Seeding → Running → Draining → Done`. Occurrences fire
//! while running; their vertices and edges wait in per-stream pending queues and
//! are flushed to the artifacts at their tick. Draining keeps ticking without
//! firing until the queues are empty, since edge offsets can land past the
//! nominal duration.

use std::fmt;
use std::path::Path;

use rand::distributions::OpenClosed01;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{GenerationParams, SamplingPolicy};
use crate::instance::attempt_instantiate;
use crate::output::{Artifacts, OccurrenceLog};
use crate::pattern::{PatternLibrary, PatternTemplate};
use crate::resolver::ResolverStats;
use crate::state::SimulationState;
use crate::types::{Emission, GenError, GenResult, OccurrenceRecord, Tick};

/// Lifecycle of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Init,
    Seeding,
    Running,
    Draining,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "INIT",
            Phase::Seeding => "SEEDING",
            Phase::Running => "RUNNING",
            Phase::Draining => "DRAINING",
            Phase::Done => "DONE",
        })
    }
}

/// Emission counts for one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub stream: usize,
    pub vertices: u64,
    pub edges: u64,
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub seed: u64,
    /// Tick counter value when the run reached `Done`.
    pub ticks_elapsed: Tick,
    pub attempts: u64,
    pub occurrences: u64,
    pub abandoned: u64,
    pub vertex_ids_assigned: u64,
    pub edge_ids_assigned: u64,
    pub streams: Vec<StreamSummary>,
    pub resolver: ResolverStats,
}

/// Mutable machinery shared by seeding and running.
struct Engine {
    state: SimulationState,
    rng: StdRng,
    policy: SamplingPolicy,
    attempts: u64,
    occurrences: u64,
    abandoned: u64,
}

impl Engine {
    fn instantiate<W: std::io::Write>(
        &mut self,
        pattern: &PatternTemplate,
        tick: Tick,
        log: &mut OccurrenceLog<W>,
    ) -> GenResult<bool> {
        self.attempts += 1;
        match attempt_instantiate(pattern, tick, &mut self.state, self.policy, &mut self.rng) {
            Some(occurrence) => {
                tracing::debug!(
                    "Added instance of pattern {} at time {} ({} vertices, {} edges)",
                    pattern.id,
                    tick,
                    occurrence.vertices.len(),
                    occurrence.edges.len()
                );
                if pattern.track {
                    log.record(&OccurrenceRecord::from(&occurrence))?;
                }
                self.state.enqueue(occurrence);
                self.occurrences += 1;
                Ok(true)
            }
            None => {
                tracing::info!(
                    "Instance of pattern {} at time {} not added: not enough existing vertices available in stream",
                    pattern.id,
                    tick
                );
                self.abandoned += 1;
                Ok(false)
            }
        }
    }
}

/// Drives one generation run.
pub struct Scheduler {
    params: GenerationParams,
    library: PatternLibrary,
    engine: Engine,
    seed: u64,
    phase: Phase,
    tick: Tick,
    streams: Vec<StreamSummary>,
}

impl Scheduler {
    /// Build a scheduler. Uses `params.random_seed`, or a fresh seed when unset.
    pub fn new(params: GenerationParams, library: PatternLibrary) -> GenResult<Self> {
        params.validate()?;
        check_library_streams(&library, params.num_streams)?;

        let seed = params.random_seed.unwrap_or_else(rand::random);
        tracing::info!("Random seed: {seed}");

        let streams = (1..=params.num_streams)
            .map(|stream| StreamSummary {
                stream,
                ..StreamSummary::default()
            })
            .collect();

        Ok(Self {
            engine: Engine {
                state: SimulationState::new(params.num_streams),
                rng: StdRng::seed_from_u64(seed),
                policy: params.sampling_policy,
                attempts: 0,
                occurrences: 0,
                abandoned: 0,
            },
            params,
            library,
            seed,
            phase: Phase::Init,
            tick: 0,
            streams,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn state(&self) -> &SimulationState {
        &self.engine.state
    }

    /// Run to completion, writing artifacts under `out_dir`.
    pub fn run(&mut self, out_dir: &Path) -> GenResult<GenerationSummary> {
        if self.phase != Phase::Init {
            return Err(GenError::InvalidParameter(format!(
                "scheduler already ran (phase {})",
                self.phase
            )));
        }
        let mut artifacts = Artifacts::create(&self.params, out_dir)?;
        self.run_with(&mut artifacts)
    }

    /// Run to completion against already opened artifacts.
    pub fn run_with(&mut self, artifacts: &mut Artifacts) -> GenResult<GenerationSummary> {
        self.enter(Phase::Seeding);
        self.tick = 0;
        for pattern in &self.library.seeds {
            self.engine
                .instantiate(pattern, 0, &mut artifacts.occurrences)?;
        }

        self.enter(Phase::Running);
        while self.tick < self.params.duration {
            for pattern in self.library.firing_pool() {
                let draw: f64 = self.engine.rng.sample(OpenClosed01);
                if draw <= pattern.probability {
                    self.engine
                        .instantiate(pattern, self.tick, &mut artifacts.occurrences)?;
                }
            }
            self.flush(artifacts)?;
            self.tick += 1;
        }

        self.enter(Phase::Draining);
        while !self.engine.state.pending_is_empty() {
            self.flush(artifacts)?;
            self.tick += 1;
        }

        artifacts.finish()?;
        self.enter(Phase::Done);
        Ok(self.summary())
    }

    fn enter(&mut self, phase: Phase) {
        tracing::info!(
            "{} -> {} at tick {} ({} pending)",
            self.phase,
            phase,
            self.tick,
            self.engine.state.pending_len()
        );
        self.phase = phase;
    }

    /// Write every item due at the current tick, stream by stream.
    fn flush(&mut self, artifacts: &mut Artifacts) -> GenResult<()> {
        for stream in 1..=self.params.num_streams {
            let due = self.engine.state.queues[stream - 1].take_due(self.tick);
            if due.is_empty() {
                continue;
            }
            let writer = &mut artifacts.streams[stream - 1];
            let history = &mut self.engine.state.histories[stream - 1];
            let counts = &mut self.streams[stream - 1];

            for item in due {
                let time = self.params.format_time(item.scheduled_time());
                match item {
                    Emission::Vertex(vertex) => {
                        writer.write_vertex(&vertex, &time)?;
                        history.record_vertex(vertex.id);
                        counts.vertices += 1;
                    }
                    Emission::Edge(edge) => {
                        for endpoint in [edge.source, edge.target] {
                            if !history.increment_degree(endpoint) {
                                tracing::warn!(
                                    "Edge {} on stream {stream} references vertex {endpoint} missing from stream history",
                                    edge.id
                                );
                            }
                        }
                        writer.write_edge(&edge, &time)?;
                        counts.edges += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn summary(&self) -> GenerationSummary {
        GenerationSummary {
            seed: self.seed,
            ticks_elapsed: self.tick,
            attempts: self.engine.attempts,
            occurrences: self.engine.occurrences,
            abandoned: self.engine.abandoned,
            vertex_ids_assigned: self.engine.state.vertex_ids_assigned(),
            edge_ids_assigned: self.engine.state.edge_ids_assigned(),
            streams: self.streams.clone(),
            resolver: self.engine.state.resolver_stats,
        }
    }
}

fn check_library_streams(library: &PatternLibrary, num_streams: usize) -> GenResult<()> {
    let all = library
        .patterns
        .iter()
        .chain(&library.seeds)
        .chain(library.background.iter().flat_map(|b| b.patterns.iter()));
    for pattern in all {
        if let Some(edge) = pattern.edges.iter().find(|e| e.stream > num_streams) {
            return Err(GenError::StreamOutOfRange {
                pattern: pattern.id.clone(),
                edge: edge.id.clone(),
                stream: edge.stream as i64,
                num_streams,
            });
        }
    }
    Ok(())
}

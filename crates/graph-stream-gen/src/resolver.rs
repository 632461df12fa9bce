//! Sampling of already-emitted vertices from a stream's history.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SamplingPolicy;
use crate::history::StreamHistory;
use crate::types::VertexId;

/// Counters describing how existing vertices were picked during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverStats {
    /// Picks made by the uniform policy.
    pub uniform_picks: u64,
    /// Uniform picks whose start index was excluded, so the probe order decided the result.
    pub probed_picks: u64,
    /// Picks made by the degree-weighted policy. Every one of these is degree-influenced.
    pub weighted_picks: u64,
    /// Requests that found no eligible vertex.
    pub misses: u64,
}

/// Pick an emitted vertex from `history` that is not in `excluded`.
///
/// Returns `None` only when the history is empty or every entry is excluded.
pub fn pick_existing<R: Rng + ?Sized>(
    history: &StreamHistory,
    excluded: &[VertexId],
    policy: SamplingPolicy,
    rng: &mut R,
    stats: &mut ResolverStats,
) -> Option<VertexId> {
    let picked = match policy {
        SamplingPolicy::Uniform => pick_uniform(history, excluded, rng, stats),
        SamplingPolicy::Degree => pick_degree_weighted(history, excluded, rng),
    };
    match picked {
        Some(_) if policy == SamplingPolicy::Uniform => stats.uniform_picks += 1,
        Some(_) => stats.weighted_picks += 1,
        None => stats.misses += 1,
    }
    picked
}

/// Uniform start index, then probe forward with wrap-around.
fn pick_uniform<R: Rng + ?Sized>(
    history: &StreamHistory,
    excluded: &[VertexId],
    rng: &mut R,
    stats: &mut ResolverStats,
) -> Option<VertexId> {
    let ids = history.ids();
    if ids.is_empty() {
        return None;
    }
    let start = rng.gen_range(0..ids.len());
    for step in 0..ids.len() {
        let id = ids[(start + step) % ids.len()];
        if !excluded.contains(&id) {
            if step > 0 {
                stats.probed_picks += 1;
            }
            return Some(id);
        }
    }
    None
}

/// Inverse-CDF draw over eligible vertices with weight `degree + 1`.
///
/// Excluded vertices get no weight, so the draw always lands on an eligible id.
fn pick_degree_weighted<R: Rng + ?Sized>(
    history: &StreamHistory,
    excluded: &[VertexId],
    rng: &mut R,
) -> Option<VertexId> {
    let mut eligible = Vec::with_capacity(history.len());
    let mut cumulative = Vec::with_capacity(history.len());
    let mut total = 0u64;
    for (&id, &degree) in history.ids().iter().zip(history.degrees()) {
        if excluded.contains(&id) {
            continue;
        }
        total += degree + 1;
        eligible.push(id);
        cumulative.push(total);
    }
    if total == 0 {
        return None;
    }
    let draw = rng.gen_range(0..total);
    let idx = cumulative.partition_point(|&c| c <= draw);
    eligible.get(idx).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn history(ids: &[VertexId]) -> StreamHistory {
        let mut h = StreamHistory::new();
        for &id in ids {
            h.record_vertex(id);
        }
        h
    }

    #[test]
    fn test_empty_history_returns_none() {
        let mut rng = seeded_rng();
        let mut stats = ResolverStats::default();
        for policy in [SamplingPolicy::Uniform, SamplingPolicy::Degree] {
            let h = StreamHistory::new();
            assert_eq!(pick_existing(&h, &[], policy, &mut rng, &mut stats), None);
        }
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_all_excluded_returns_none() {
        let mut rng = seeded_rng();
        let mut stats = ResolverStats::default();
        let h = history(&[1, 2, 3]);
        for policy in [SamplingPolicy::Uniform, SamplingPolicy::Degree] {
            assert_eq!(
                pick_existing(&h, &[1, 2, 3], policy, &mut rng, &mut stats),
                None
            );
        }
    }

    #[test]
    fn test_single_eligible_always_found() {
        let mut rng = seeded_rng();
        let mut stats = ResolverStats::default();
        let h = history(&[1, 2, 3, 4]);
        for _ in 0..50 {
            for policy in [SamplingPolicy::Uniform, SamplingPolicy::Degree] {
                assert_eq!(
                    pick_existing(&h, &[1, 2, 4], policy, &mut rng, &mut stats),
                    Some(3)
                );
            }
        }
        assert_eq!(stats.uniform_picks, 50);
        assert_eq!(stats.weighted_picks, 50);
        // the start index hits 3 only a quarter of the time
        assert!(stats.probed_picks > 0);
    }

    #[test]
    fn test_uniform_covers_history() {
        let mut rng = seeded_rng();
        let mut stats = ResolverStats::default();
        let h = history(&[10, 20, 30]);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(pick_existing(&h, &[], SamplingPolicy::Uniform, &mut rng, &mut stats).unwrap());
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(stats.probed_picks, 0);
    }

    #[test]
    fn test_degree_weighting_prefers_hubs() {
        let mut rng = seeded_rng();
        let mut stats = ResolverStats::default();
        let mut h = history(&[1, 2]);
        for _ in 0..99 {
            h.increment_degree(2);
        }
        // weights are 1 and 100
        let hub_hits = (0..1000)
            .filter(|_| {
                pick_existing(&h, &[], SamplingPolicy::Degree, &mut rng, &mut stats) == Some(2)
            })
            .count();
        assert!(hub_hits > 950, "hub picked {hub_hits} times");
        assert!(hub_hits < 1000);
    }
}

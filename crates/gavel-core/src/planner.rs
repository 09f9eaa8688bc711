//! Priority-track load planning.
//!
//! Alternate balancing strategy to the track rebalancer: every member has a
//! single declared priority track, per-track paper targets are split equally
//! among the members prioritizing that track, and remaining imbalance is
//! worked off by soliciting volunteers — members whose secondary declared
//! tracks include an over-loaded track. Small tracks never recruit
//! volunteers. Mutually exclusive with `rebalance` per run.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

const MAX_ITERATIONS: u32 = 10_000;

// ---------------------------------------------------------------------------
// PlannerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    /// Absolute floor below which a track counts as small.
    pub small_track_min_papers: u32,
    /// Fraction of the median track size a small track may still reach.
    pub small_track_percent_of_median: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            small_track_min_papers: 10,
            small_track_percent_of_median: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// LoadPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoImprovement,
    NoCandidates,
    MaxIterations,
}

#[derive(Debug, Clone)]
pub struct LoadPlan {
    /// member → track → paper target.
    pub per_member_track_targets: HashMap<String, HashMap<String, u32>>,
    pub per_member_totals: HashMap<String, u32>,
    /// Tracks each member volunteered into beyond their priority track.
    pub volunteered_tracks: HashMap<String, BTreeSet<String>>,
    pub iterations: u32,
    pub stopped: StopReason,
}

fn load_range(totals: &HashMap<String, u32>) -> u32 {
    let max = totals.values().copied().max().unwrap_or(0);
    let min = totals.values().copied().min().unwrap_or(0);
    max - min
}

fn median(values: &HashMap<String, usize>) -> f64 {
    let mut sorted: Vec<usize> = values.values().copied().collect();
    sorted.sort_unstable();
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    }
}

/// Split `total` papers equally across `participants`, assigning the
/// remainder deterministically to the first ids in sorted order.
fn equal_split(total: usize, participants: &[String]) -> HashMap<String, u32> {
    let n = participants.len().max(1);
    let base = (total / n) as u32;
    let rem = total % n;
    participants
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), base + u32::from(i < rem)))
        .collect()
}

// ---------------------------------------------------------------------------
// compute_load_plan
// ---------------------------------------------------------------------------

/// Compute per-member paper targets from priority tracks, then iteratively
/// shrink the load range by volunteering light members into their allowed
/// non-small tracks. Each accepted move re-splits one whole track across its
/// current participants plus the volunteer.
pub fn compute_load_plan(
    member_ids: &[String],
    papers_by_track: &HashMap<String, usize>,
    priority_tracks: &HashMap<String, String>,
    allowed_tracks: &HashMap<String, Vec<String>>,
    config: &PlannerConfig,
) -> LoadPlan {
    debug!(
        members = member_ids.len(),
        tracks = papers_by_track.len(),
        "computing priority track load plan"
    );

    let mut track_names: Vec<&String> = papers_by_track.keys().collect();
    track_names.sort();

    // Seed: each track split equally among the members prioritizing it.
    let mut shares: HashMap<String, HashMap<String, u32>> = member_ids
        .iter()
        .map(|m| (m.clone(), HashMap::new()))
        .collect();
    for track in &track_names {
        let mut seeded: Vec<String> = member_ids
            .iter()
            .filter(|m| priority_tracks.get(*m) == Some(*track))
            .cloned()
            .collect();
        seeded.sort();
        if seeded.is_empty() {
            debug!(track = %track, "track has no priority members, skipped during seeding");
            continue;
        }
        for (member, target) in equal_split(papers_by_track[*track], &seeded) {
            shares.entry(member).or_default().insert((*track).clone(), target);
        }
    }

    let mut totals: HashMap<String, u32> = member_ids
        .iter()
        .map(|m| (m.clone(), shares.get(m).map(|s| s.values().sum()).unwrap_or(0)))
        .collect();

    let median_papers = median(papers_by_track);
    let threshold = (config.small_track_min_papers as usize)
        .max((config.small_track_percent_of_median * median_papers).ceil() as usize);
    debug!(threshold, median = median_papers, "small-track threshold");

    let mut volunteered: HashMap<String, BTreeSet<String>> = member_ids
        .iter()
        .map(|m| (m.clone(), BTreeSet::new()))
        .collect();

    let mut iterations = 0;
    let mut stopped = StopReason::MaxIterations;

    while iterations < MAX_ITERATIONS {
        iterations += 1;

        // Only members with a secondary declared track can volunteer.
        let mut candidates: Vec<&String> = member_ids
            .iter()
            .filter(|m| allowed_tracks.get(*m).map(Vec::len).unwrap_or(0) >= 2)
            .collect();
        if candidates.is_empty() {
            stopped = StopReason::NoCandidates;
            break;
        }
        candidates.sort_by_key(|m| (totals.get(*m).copied().unwrap_or(0), (*m).clone()));

        let mut improved_in_iteration = false;
        for volunteer in candidates {
            let current_range = load_range(&totals);
            let mut best: Option<(u32, String, HashMap<String, u32>, HashMap<String, HashMap<String, u32>>)> =
                None;

            for track in &track_names {
                let allowed = allowed_tracks
                    .get(volunteer)
                    .map(|ts| ts.contains(track))
                    .unwrap_or(false);
                if !allowed || papers_by_track[*track] < threshold {
                    continue;
                }
                let mut donors: Vec<String> = member_ids
                    .iter()
                    .filter(|d| shares.get(*d).and_then(|s| s.get(*track)).copied().unwrap_or(0) > 0)
                    .cloned()
                    .collect();
                if donors.is_empty() || donors.contains(volunteer) {
                    continue;
                }

                // Re-split the whole track across donors plus the volunteer.
                donors.push(volunteer.clone());
                donors.sort();
                let new_shares = equal_split(papers_by_track[*track], &donors);

                let mut sim_shares = shares.clone();
                let mut sim_totals = totals.clone();
                for (member, target) in &new_shares {
                    let old = sim_shares
                        .get(member)
                        .and_then(|s| s.get(*track))
                        .copied()
                        .unwrap_or(0);
                    sim_shares
                        .entry(member.clone())
                        .or_default()
                        .insert((*track).clone(), *target);
                    let total = sim_totals.entry(member.clone()).or_default();
                    *total = *total - old + *target;
                }

                let new_range = load_range(&sim_totals);
                let delta = current_range.saturating_sub(new_range);
                if delta > 0 && best.as_ref().map(|(d, _, _, _)| delta > *d).unwrap_or(true) {
                    best = Some((delta, (*track).clone(), sim_totals, sim_shares));
                }
            }

            if let Some((_, track, new_totals, new_shares)) = best {
                info!(member = %volunteer, %track, "volunteering into track");
                totals = new_totals;
                shares = new_shares;
                volunteered.entry(volunteer.clone()).or_default().insert(track);
                improved_in_iteration = true;
            }
        }

        if !improved_in_iteration {
            stopped = StopReason::NoImprovement;
            break;
        }
    }

    debug!(iterations, final_range = load_range(&totals), "load plan finished");
    LoadPlan {
        per_member_track_targets: shares,
        per_member_totals: totals,
        volunteered_tracks: volunteered,
        iterations,
        stopped,
    }
}

/// Extend each member's declared track list with their volunteered tracks,
/// skipping duplicates. Re-applying the same volunteer set is a no-op.
pub fn merge_tracks_with_volunteers(
    base_tracks: &HashMap<String, Vec<String>>,
    volunteered: &HashMap<String, BTreeSet<String>>,
) -> HashMap<String, Vec<String>> {
    let mut merged = base_tracks.clone();
    for (member, tracks) in volunteered {
        let entry = merged.entry(member.clone()).or_default();
        for track in tracks {
            if !entry.contains(track) {
                entry.push(track.clone());
            }
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

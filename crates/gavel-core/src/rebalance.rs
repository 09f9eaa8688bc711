//! Track rebalancing for multi-track committee members.
//!
//! Two steps: collapse every member onto the single track that needs them
//! most, then merge fallback-adjacent tracks into shared components until the
//! per-member load spread falls under the caller's threshold. The merge
//! adjacency is returned as a track graph so second-tier assignment can tell
//! a member's literal track from one it merely covers via fallback.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// UnionFind
// ---------------------------------------------------------------------------

#[derive(Default)]
struct UnionFind {
    parent: HashMap<String, String>,
}

impl UnionFind {
    fn find(&mut self, x: &str) -> String {
        let parent = self
            .parent
            .entry(x.to_string())
            .or_insert_with(|| x.to_string())
            .clone();
        if parent == x {
            return parent;
        }
        let root = self.find(&parent);
        self.parent.insert(x.to_string(), root.clone());
        root
    }

    fn union(&mut self, a: &str, b: &str) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(rb, ra);
        }
    }
}

// ---------------------------------------------------------------------------
// Single-track collapse
// ---------------------------------------------------------------------------

/// Greedy scarcity-first assignment of one primary track per member.
///
/// Members declaring exactly one track keep it (identity mapping when every
/// member does). Otherwise the scarcest track, measured as submissions per
/// eligible member, repeatedly claims the free member with the fewest
/// remaining options.
pub fn collapse_to_single_track(
    declared: &HashMap<String, Vec<String>>,
    track_counts: &HashMap<String, usize>,
) -> HashMap<String, String> {
    let mut track_to_members: HashMap<&str, Vec<&str>> = HashMap::new();
    for (member, tracks) in declared {
        for track in tracks {
            track_to_members.entry(track).or_default().push(member);
        }
    }

    let mut assigned: HashMap<String, String> = HashMap::new();
    let mut remaining: HashSet<&str> = declared.keys().map(String::as_str).collect();
    let degree: HashMap<&str, usize> =
        declared.iter().map(|(m, ts)| (m.as_str(), ts.len())).collect();

    // Forced assignments first: degree-1 members have no choice.
    let mut forced: Vec<&str> = declared
        .iter()
        .filter(|(_, ts)| ts.len() == 1)
        .map(|(m, _)| m.as_str())
        .collect();
    forced.sort();
    for member in forced {
        if let Some(track) = declared[member].first() {
            assigned.insert(member.to_string(), track.clone());
            remaining.remove(member);
        }
    }

    while !remaining.is_empty() {
        // Scarcest track still holding a free candidate; ties break by name.
        let mut best: Option<(f64, &str)> = None;
        let mut tracks: Vec<&str> = track_counts.keys().map(String::as_str).collect();
        tracks.sort();
        for track in tracks {
            let eligible: Vec<&str> = track_to_members
                .get(track)
                .map(|members| {
                    members
                        .iter()
                        .copied()
                        .filter(|m| remaining.contains(m))
                        .collect()
                })
                .unwrap_or_default();
            if eligible.is_empty() {
                continue;
            }
            let scarcity = track_counts[track] as f64 / eligible.len().max(1) as f64;
            if best.map(|(s, _)| scarcity > s).unwrap_or(true) {
                best = Some((scarcity, track));
            }
        }
        let Some((_, track)) = best else {
            // Members whose declared tracks carry no submissions: settle for
            // their first declared track.
            let mut leftovers: Vec<&str> = remaining.iter().copied().collect();
            leftovers.sort();
            for member in leftovers {
                if let Some(first) = declared[member].first() {
                    assigned.insert(member.to_string(), first.clone());
                }
            }
            break;
        };

        let mut candidates: Vec<&str> = track_to_members[track]
            .iter()
            .copied()
            .filter(|m| remaining.contains(m))
            .collect();
        candidates.sort();
        if let Some(&member) = candidates
            .iter()
            .min_by_key(|m| (degree[*m], declared[**m].len().saturating_sub(1), *m))
        {
            assigned.insert(member.to_string(), track.to_string());
            remaining.remove(member);
        }
    }

    assigned
}

// ---------------------------------------------------------------------------
// Component rebalancing
// ---------------------------------------------------------------------------

/// Minimum score a candidate merge must reach before it is applied.
const MERGE_SCORE_FLOOR: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct Rebalance {
    /// Finalized member → track-set mapping ("many tracks" form).
    pub member_to_tracks: HashMap<String, Vec<String>>,
    pub member_loads: HashMap<String, u32>,
    /// Donor adjacency: `track → tracks merged into it via fallback`.
    pub track_graph: HashMap<String, Vec<String>>,
}

fn component_state(
    uf: &mut UnionFind,
    single: &HashMap<String, String>,
    track_counts: &HashMap<String, usize>,
) -> (HashMap<String, HashSet<String>>, HashMap<String, HashSet<String>>) {
    let mut comp_tracks: HashMap<String, HashSet<String>> = HashMap::new();
    let mut comp_members: HashMap<String, HashSet<String>> = HashMap::new();
    for track in track_counts.keys() {
        let root = uf.find(track);
        comp_tracks.entry(root).or_default().insert(track.clone());
    }
    for (member, track) in single {
        let root = uf.find(track);
        comp_members.entry(root).or_default().insert(member.clone());
    }
    (comp_tracks, comp_members)
}

fn component_load(
    tracks: &HashSet<String>,
    members: usize,
    track_counts: &HashMap<String, usize>,
) -> f64 {
    let submissions: usize = tracks
        .iter()
        .map(|t| track_counts.get(t).copied().unwrap_or(0))
        .sum();
    submissions as f64 / members.max(1) as f64
}

fn disparity_of(loads: &[f64]) -> f64 {
    let max = loads.iter().copied().fold(f64::MIN, f64::max);
    let min = loads.iter().copied().fold(f64::MAX, f64::min);
    if loads.is_empty() {
        return 0.0;
    }
    (max - min) / max.max(1.0)
}

fn disparity_after_merge(
    comp_a: &str,
    comp_b: &str,
    comp_tracks: &HashMap<String, HashSet<String>>,
    comp_members: &HashMap<String, HashSet<String>>,
    track_counts: &HashMap<String, usize>,
) -> f64 {
    let empty = HashSet::new();
    let members_a = comp_members.get(comp_a).unwrap_or(&empty);
    let members_b = comp_members.get(comp_b).unwrap_or(&empty);
    let merged_members = members_a.union(members_b).count();
    let merged_tracks: HashSet<String> = comp_tracks
        .get(comp_a)
        .unwrap_or(&empty)
        .union(comp_tracks.get(comp_b).unwrap_or(&empty))
        .cloned()
        .collect();
    let merged_load = component_load(&merged_tracks, merged_members, track_counts);

    let mut loads = Vec::new();
    for (comp, tracks) in comp_tracks {
        if comp == comp_a || comp == comp_b {
            continue;
        }
        let members = comp_members.get(comp).map(HashSet::len).unwrap_or(0);
        loads.push(component_load(tracks, members, track_counts));
    }
    loads.push(merged_load);
    disparity_of(&loads)
}

fn merge_score(
    current_disparity: f64,
    new_disparity: f64,
    track: &str,
    neighbor: &str,
    track_fallback: &HashMap<String, Vec<String>>,
) -> f64 {
    let improvement = (current_disparity - new_disparity).max(0.0) / current_disparity.max(1.0);
    let fallback = track_fallback.get(track);
    let semantic_distance = match fallback.and_then(|list| list.iter().position(|t| t == neighbor)) {
        Some(position) => {
            let len = fallback.map(Vec::len).unwrap_or(1);
            position as f64 / (len.saturating_sub(1)).max(1) as f64
        }
        None => 1.0,
    };
    0.5 * improvement + 0.5 * (1.0 - semantic_distance)
}

/// Merge tracks into shared components until the per-member load disparity
/// drops to `threshold`, then guarantee every track with submissions sits in
/// a component that has at least one member (coverage via fallback).
pub fn rebalance_across_tracks(
    single: &HashMap<String, String>,
    track_counts: &HashMap<String, usize>,
    track_fallback: &HashMap<String, Vec<String>>,
    threshold: f64,
) -> Rebalance {
    let mut uf = UnionFind::default();
    let mut track_graph: HashMap<String, Vec<String>> = HashMap::new();

    loop {
        let (comp_tracks, comp_members) = component_state(&mut uf, single, track_counts);

        let mut member_loads: HashMap<&String, f64> = HashMap::new();
        for (comp, tracks) in &comp_tracks {
            let members = comp_members.get(comp);
            let load = component_load(
                tracks,
                members.map(HashSet::len).unwrap_or(0),
                track_counts,
            );
            for member in members.into_iter().flatten() {
                member_loads.insert(member, load);
            }
        }
        if member_loads.is_empty() {
            debug!("no members to rebalance");
            break;
        }

        let loads: Vec<f64> = member_loads.values().copied().collect();
        let disparity = disparity_of(&loads);
        debug!(disparity, threshold, "rebalancing pass");
        if disparity <= threshold {
            break;
        }

        // Best fallback-adjacent merge by (disparity improvement, proximity).
        let mut best: Option<(f64, String, String)> = None;
        let mut comps: Vec<&String> = comp_tracks.keys().collect();
        comps.sort();
        for comp_a in comps {
            let mut tracks_a: Vec<&String> = comp_tracks[comp_a].iter().collect();
            tracks_a.sort();
            for track_a in tracks_a {
                for neighbor in track_fallback.get(track_a).into_iter().flatten() {
                    let comp_b = uf.find(neighbor);
                    if *comp_a == comp_b {
                        continue;
                    }
                    let new_disparity = disparity_after_merge(
                        comp_a,
                        &comp_b,
                        &comp_tracks,
                        &comp_members,
                        track_counts,
                    );
                    let score =
                        merge_score(disparity, new_disparity, track_a, neighbor, track_fallback);
                    if best.as_ref().map(|(s, _, _)| score > *s).unwrap_or(true) {
                        best = Some((score, track_a.clone(), neighbor.clone()));
                    }
                }
            }
        }

        match best {
            Some((score, track, neighbor)) if score > MERGE_SCORE_FLOOR => {
                info!(%track, %neighbor, score, "merging tracks");
                track_graph.entry(track.clone()).or_default().push(neighbor.clone());
                uf.union(&track, &neighbor);
            }
            _ => {
                debug!("no beneficial merge found");
                break;
            }
        }
    }

    // Coverage pass: a track whose component has no members borrows its
    // declared fallback track's members rather than going uncovered.
    let mut tracks: Vec<&String> = track_counts.keys().collect();
    tracks.sort();
    for track in tracks {
        if track_counts[track] == 0 {
            continue;
        }
        let (_, comp_members) = component_state(&mut uf, single, track_counts);
        let root = uf.find(track);
        if comp_members.get(&root).map(HashSet::len).unwrap_or(0) > 0 {
            continue;
        }
        for neighbor in track_fallback.get(track).into_iter().flatten() {
            let neighbor_root = uf.find(neighbor);
            if comp_members
                .get(&neighbor_root)
                .map(HashSet::len)
                .unwrap_or(0)
                > 0
            {
                info!(%track, %neighbor, "uncovered track borrows fallback members");
                track_graph.entry(track.clone()).or_default().push(neighbor.clone());
                uf.union(track, neighbor);
                break;
            }
        }
    }

    // Final outputs from the settled components.
    let (comp_tracks, comp_members) = component_state(&mut uf, single, track_counts);
    let mut member_to_tracks = HashMap::new();
    let mut member_loads = HashMap::new();
    for (member, primary) in single {
        let root = uf.find(primary);
        let mut tracks: Vec<String> = comp_tracks
            .get(&root)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        tracks.sort();
        let load = component_load(
            comp_tracks.get(&root).unwrap_or(&HashSet::new()),
            comp_members.get(&root).map(HashSet::len).unwrap_or(0),
            track_counts,
        );
        member_to_tracks.insert(member.clone(), tracks);
        member_loads.insert(member.clone(), load.round() as u32);
    }

    Rebalance {
        member_to_tracks,
        member_loads,
        track_graph,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Conflict-minimizing assignment of area chairs to senior area chairs.
//!
//! Runs after the per-round solver passes: every AC carries the set of
//! submissions the solver gave them, and each AC is handed to one SAC on the
//! same track. The chosen SAC minimizes, in order, the overlap between the
//! AC's submissions and the SAC's conflicts, then the SAC's running
//! submission load. ACs that cannot be placed by track are distributed
//! globally at the end, heaviest first.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Optional per-SAC submission caps. A SAC with no entry is uncapped.
pub type SacLoadCaps = HashMap<String, u32>;

fn has_capacity(caps: &SacLoadCaps, loads: &HashMap<String, u32>, sac: &str, increment: u32) -> bool {
    match caps.get(sac) {
        Some(cap) => loads.get(sac).copied().unwrap_or(0) + increment <= *cap,
        None => true,
    }
}

/// Assign every AC with solver output to exactly one SAC.
///
/// `track_graph` marks tracks that were merged during rebalancing: for those,
/// only SACs who declared the track *before* rebalancing may take its ACs,
/// so borrowed members never absorb a track they were only backfilling.
/// Tracks are processed smallest first so scarce tracks claim their SACs
/// before load accumulates elsewhere.
#[allow(clippy::too_many_arguments)]
pub fn assign_acs_to_sacs(
    ac_tracks: &HashMap<String, Vec<String>>,
    sac_tracks: &HashMap<String, Vec<String>>,
    original_sac_tracks: &HashMap<String, Vec<String>>,
    track_graph: &HashMap<String, Vec<String>>,
    track_counts: &HashMap<String, usize>,
    ac_assignments: &HashMap<String, Vec<String>>,
    sac_conflicts: &HashMap<String, Vec<String>>,
    sac_max_loads: &SacLoadCaps,
) -> HashMap<String, Vec<String>> {
    // ACs keyed by their single effective track; ACs the solver touched but
    // that carry no usable track go straight to the deferred pool.
    let mut track_to_acs: HashMap<&str, Vec<&String>> = HashMap::new();
    let mut deferred: Vec<&String> = Vec::new();
    let mut placed_by_track: HashSet<&String> = HashSet::new();

    let mut ac_names: Vec<&String> = ac_tracks.keys().collect();
    ac_names.sort();
    for ac in ac_names {
        if !ac_assignments.contains_key(ac) {
            debug!(ac = %ac, "no solver assignments, skipping");
            continue;
        }
        match ac_tracks[ac].first() {
            Some(track) => {
                placed_by_track.insert(ac);
                track_to_acs.entry(track).or_default().push(ac);
            }
            None => {
                warn!(ac = %ac, "assigned papers but no track, deferring");
                deferred.push(ac);
            }
        }
    }
    let mut assigned_without_tracks: Vec<&String> = ac_assignments
        .keys()
        .filter(|ac| !placed_by_track.contains(ac) && !ac_tracks.contains_key(*ac))
        .collect();
    assigned_without_tracks.sort();
    for ac in assigned_without_tracks {
        warn!(ac = %ac, "assigned papers but absent from track data, deferring");
        deferred.push(ac);
    }

    let mut track_to_sacs: HashMap<&str, Vec<&String>> = HashMap::new();
    let mut sac_names: Vec<&String> = sac_tracks.keys().collect();
    sac_names.sort();
    for sac in &sac_names {
        for track in &sac_tracks[*sac] {
            track_to_sacs.entry(track).or_default().push(sac);
        }
    }

    let mut sac_to_acs: HashMap<String, Vec<String>> = HashMap::new();
    let mut sac_load: HashMap<String, u32> = HashMap::new();
    let mut sac_ac_count: HashMap<String, u32> = HashMap::new();

    let conflict_overlap = |ac: &str, sac: &str| -> usize {
        let papers: HashSet<&String> = ac_assignments
            .get(ac)
            .map(|ps| ps.iter().collect())
            .unwrap_or_default();
        sac_conflicts
            .get(sac)
            .map(|cs| cs.iter().filter(|c| papers.contains(c)).count())
            .unwrap_or(0)
    };

    // Smallest track first, name as tie-break.
    let mut ordered_tracks: Vec<&String> = track_counts.keys().collect();
    ordered_tracks.sort_by_key(|t| (track_counts[*t], (*t).clone()));

    for track in ordered_tracks {
        let mut sacs_here: Vec<&String> = track_to_sacs
            .get(track.as_str())
            .cloned()
            .unwrap_or_default();
        if sacs_here.is_empty() {
            if let Some(acs) = track_to_acs.get(track.as_str()) {
                warn!(track = %track, acs = acs.len(), "track has no SACs, deferring its ACs");
                deferred.extend(acs.iter().copied());
            }
            continue;
        }

        if track_graph.contains_key(track) {
            debug!(track = %track, "merged track, restricting to original declarers");
            sacs_here.retain(|sac| {
                original_sac_tracks
                    .get(*sac)
                    .map(|ts| ts.contains(track))
                    .unwrap_or(false)
            });
            if sacs_here.is_empty() {
                if let Some(acs) = track_to_acs.get(track.as_str()) {
                    deferred.extend(acs.iter().copied());
                }
                continue;
            }
        }

        for ac in track_to_acs.get(track.as_str()).cloned().unwrap_or_default() {
            let load_increment = ac_assignments.get(ac).map(Vec::len).unwrap_or(0) as u32;
            let eligible: Vec<&&String> = sacs_here
                .iter()
                .filter(|sac| has_capacity(sac_max_loads, &sac_load, sac, load_increment))
                .collect();
            if eligible.is_empty() {
                warn!(ac = %ac, track = %track, "no SAC capacity on track, deferring");
                deferred.push(ac);
                continue;
            }
            let best = eligible
                .into_iter()
                .min_by_key(|sac| {
                    (
                        conflict_overlap(ac, sac),
                        sac_load.get(**sac).copied().unwrap_or(0),
                        (**sac).clone(),
                    )
                })
                .cloned();
            if let Some(sac) = best {
                sac_to_acs.entry(sac.clone()).or_default().push(ac.clone());
                *sac_load.entry(sac.clone()).or_default() += load_increment;
                *sac_ac_count.entry(sac.clone()).or_default() += 1;
            }
        }
    }

    // Deferred ACs go to whichever SAC conflicts least, heaviest AC first so
    // the big loads land while everyone is still light.
    if !deferred.is_empty() {
        debug!(count = deferred.len(), "distributing deferred ACs globally");
        deferred.sort_by_key(|ac| {
            (
                std::cmp::Reverse(ac_assignments.get(*ac).map(Vec::len).unwrap_or(0)),
                (*ac).clone(),
            )
        });

        for ac in deferred {
            let load_increment = ac_assignments.get(ac).map(Vec::len).unwrap_or(0) as u32;
            let min_conflicts = sac_names
                .iter()
                .map(|sac| conflict_overlap(ac, sac))
                .min()
                .unwrap_or(0);
            let min_conflict_sacs: Vec<&&String> = sac_names
                .iter()
                .filter(|sac| conflict_overlap(ac, sac) == min_conflicts)
                .collect();
            let mut eligible: Vec<&&String> = min_conflict_sacs
                .iter()
                .filter(|sac| has_capacity(sac_max_loads, &sac_load, sac, load_increment))
                .copied()
                .collect();
            if eligible.is_empty() {
                warn!(ac = %ac, "all SACs at capacity, assigning past the cap");
                eligible = min_conflict_sacs;
            }
            let best = eligible.into_iter().min_by_key(|sac| {
                (
                    sac_load.get(**sac).copied().unwrap_or(0),
                    sac_ac_count.get(**sac).copied().unwrap_or(0),
                    (**sac).clone(),
                )
            });
            if let Some(sac) = best {
                sac_to_acs.entry((*sac).clone()).or_default().push(ac.clone());
                *sac_load.entry((*sac).clone()).or_default() += load_increment;
                *sac_ac_count.entry((*sac).clone()).or_default() += 1;
            }
        }
    }

    if let (Some(max), Some(min)) = (sac_load.values().max(), sac_load.values().min()) {
        let disparity = (max - min) as f64 / (*max).max(1) as f64;
        debug!(max, min, disparity, "final SAC loads");
    }

    sac_to_acs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Consistent in-memory snapshot of one venue's matching inputs.
//!
//! A snapshot is built in one pass by [`Snapshot::load`] and is fully
//! populated before it is returned — no field is readable mid-construction.
//! It is read for exactly one orchestration run and then discarded.

use crate::error::{GavelError, Result};
use crate::platform::Platform;
use crate::types::Role;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub venue_id: String,
    /// Fixed topical catalog for this venue: fallback keys, fallback targets,
    /// and every track a submission declares.
    pub tracks: Vec<String>,
    pub submissions_by_track: HashMap<String, Vec<String>>,
    pub submission_to_track: HashMap<String, String>,
    pub submission_numbers: HashMap<String, u32>,

    pub sac_roster: Vec<String>,
    pub ac_roster: Vec<String>,

    pub sac_to_tracks: HashMap<String, Vec<String>>,
    /// Single priority track per SAC; falls back to the first declared track.
    pub sac_priority_tracks: HashMap<String, String>,
    pub ac_to_tracks: HashMap<String, Vec<String>>,

    pub sac_conflicts: HashMap<String, Vec<String>>,
    pub ac_conflicts: HashMap<String, Vec<String>>,
    pub ac_max_papers: HashMap<String, u32>,
    /// SAC → submission → raw affinity score.
    pub sac_affinities: HashMap<String, HashMap<String, f64>>,

    pub track_fallback: HashMap<String, Vec<String>>,
}

impl Snapshot {
    /// Pull a consistent snapshot for `venue_id`, optionally excluding SACs.
    ///
    /// Fails with a configuration error when the venue has no track-fallback
    /// data: rebalancing cannot run without it.
    pub fn load(
        platform: &dyn Platform,
        venue_id: &str,
        exclude_sacs: &HashSet<String>,
    ) -> Result<Self> {
        debug!(venue_id, "loading matching snapshot");

        let track_fallback = platform.track_fallback()?.ok_or_else(|| {
            GavelError::Configuration(format!("no track fallback data configured for {venue_id}"))
        })?;

        let submissions = platform.submissions()?;
        let mut tracks: HashSet<String> = track_fallback.keys().cloned().collect();
        for targets in track_fallback.values() {
            tracks.extend(targets.iter().cloned());
        }
        for submission in &submissions {
            tracks.insert(submission.track.clone());
        }
        let mut tracks: Vec<String> = tracks.into_iter().collect();
        tracks.sort();

        let mut submissions_by_track: HashMap<String, Vec<String>> =
            tracks.iter().map(|t| (t.clone(), Vec::new())).collect();
        let mut submission_to_track = HashMap::new();
        let mut submission_numbers = HashMap::new();
        for submission in &submissions {
            submissions_by_track
                .entry(submission.track.clone())
                .or_default()
                .push(submission.id.clone());
            submission_to_track.insert(submission.id.clone(), submission.track.clone());
            submission_numbers.insert(submission.id.clone(), submission.number);
        }

        let sac_roster = platform.group_members(Role::SeniorAreaChairs)?;
        let ac_roster = platform.group_members(Role::AreaChairs)?;
        if sac_roster.is_empty() {
            warn!(venue_id, "no committee: senior area chair group is empty");
        }
        if ac_roster.is_empty() {
            warn!(venue_id, "no committee: area chair group is empty");
        }

        let sac_to_tracks = platform.declared_tracks(Role::SeniorAreaChairs)?;
        let ac_to_tracks = platform.declared_tracks(Role::AreaChairs)?;
        let declared_priority = platform.priority_tracks(Role::SeniorAreaChairs)?;

        // Priority track defaults to the first declared track when absent.
        let mut sac_priority_tracks = HashMap::new();
        for (sac, declared) in &sac_to_tracks {
            if let Some(priority) = declared_priority.get(sac) {
                sac_priority_tracks.insert(sac.clone(), priority.clone());
            } else if let Some(first) = declared.first() {
                sac_priority_tracks.insert(sac.clone(), first.clone());
            }
        }

        let mut snapshot = Self {
            venue_id: venue_id.to_string(),
            tracks,
            submissions_by_track,
            submission_to_track,
            submission_numbers,
            sac_roster,
            ac_roster,
            sac_to_tracks,
            sac_priority_tracks,
            ac_to_tracks,
            sac_conflicts: platform.conflicts(Role::SeniorAreaChairs)?,
            ac_conflicts: platform.conflicts(Role::AreaChairs)?,
            ac_max_papers: platform.custom_max_papers(Role::AreaChairs)?,
            sac_affinities: platform.affinity_scores(Role::SeniorAreaChairs)?,
            track_fallback,
        };

        snapshot.enforce_membership();
        snapshot.apply_sac_exclusions(exclude_sacs);
        debug!(
            sacs = snapshot.sac_roster.len(),
            acs = snapshot.ac_roster.len(),
            submissions = snapshot.submission_to_track.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Purge every per-role mapping down to current roster members.
    ///
    /// Idempotent and re-runnable: the orchestrator calls this again after it
    /// rewrites `ac_to_tracks` from round-one output.
    pub fn enforce_membership(&mut self) {
        let sacs: HashSet<&str> = self.sac_roster.iter().map(String::as_str).collect();
        let acs: HashSet<&str> = self.ac_roster.iter().map(String::as_str).collect();

        self.sac_to_tracks.retain(|k, _| sacs.contains(k.as_str()));
        self.sac_priority_tracks.retain(|k, _| sacs.contains(k.as_str()));
        self.sac_conflicts.retain(|k, _| sacs.contains(k.as_str()));
        self.sac_affinities.retain(|k, _| sacs.contains(k.as_str()));

        self.ac_to_tracks.retain(|k, _| acs.contains(k.as_str()));
        self.ac_conflicts.retain(|k, _| acs.contains(k.as_str()));
        self.ac_max_papers.retain(|k, _| acs.contains(k.as_str()));
    }

    fn apply_sac_exclusions(&mut self, exclude: &HashSet<String>) {
        if exclude.is_empty() {
            return;
        }
        debug!(excluded = exclude.len(), "applying SAC exclusions");
        self.sac_roster.retain(|sac| !exclude.contains(sac));
        self.enforce_membership();
    }

    /// Replace the AC → tracks mapping (round-one inference) and re-apply the
    /// membership purge so departed ACs never survive.
    pub fn set_ac_tracks(&mut self, ac_to_tracks: HashMap<String, Vec<String>>) {
        self.ac_to_tracks = ac_to_tracks;
        self.enforce_membership();
    }

    /// ACs whose proposed assignment count exceeds their declared custom
    /// paper cap. ACs without a cap are never flagged.
    pub fn overloaded_acs(&self, assignments: &HashMap<String, Vec<String>>) -> Vec<String> {
        let mut overloaded: Vec<String> = assignments
            .iter()
            .filter(|(ac, papers)| {
                self.ac_max_papers
                    .get(*ac)
                    .is_some_and(|cap| papers.len() as u32 > *cap)
            })
            .map(|(ac, _)| ac.clone())
            .collect();
        overloaded.sort();
        overloaded
    }

    /// Per-track submission counts over the full catalog.
    pub fn track_counts(&self) -> HashMap<String, usize> {
        self.tracks
            .iter()
            .map(|t| {
                let count = self
                    .submissions_by_track
                    .get(t)
                    .map(Vec::len)
                    .unwrap_or(0);
                (t.clone(), count)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

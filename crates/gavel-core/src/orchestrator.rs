//! The three-round matching pipeline.
//!
//! One `run` drives the whole sequence: track setup, an unconstrained AC
//! round, AC track inference, a track-constrained round, SAC↔AC inference
//! with conflict transfer, a final constrained round, SAC assignment
//! inference, and aggregate-score publication. Every stage records its
//! outcome in the checkpoint so an interrupted run resumes where it stopped;
//! solver rounds whose recorded configuration already reads `Complete` are
//! skipped with their original titles reused.

use crate::assign::assign_acs_to_sacs;
use crate::checkpoint::{Checkpoint, Stage, StageResult};
use crate::config::{ac_matching_config, sac_matching_config};
use crate::error::{GavelError, Result};
use crate::matcher::MatcherClient;
use crate::planner::{compute_load_plan, merge_tracks_with_volunteers, PlannerConfig};
use crate::platform::Platform;
use crate::rebalance::{collapse_to_single_track, rebalance_across_tracks};
use crate::snapshot::Snapshot;
use crate::sync::EdgeSync;
use crate::types::{
    Edge, EdgeFilter, MatchStatus, Role, AGGREGATE_SCORE, CONFLICT, PROPOSED_ASSIGNMENT,
    RESEARCH_AREA,
};
use crate::wait::Waiter;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_SAC_TITLE: &str = "sac-matching";
const DEFAULT_AC_TITLE: &str = "ac-matching";

/// How a run ended: all stages done, or stopped early by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Cancelled,
}

enum RoundOutcome {
    Ran { title: String, config_id: String },
    Cancelled,
}

pub struct Orchestrator<'a> {
    platform: &'a dyn Platform,
    matcher: MatcherClient<'a>,
    sync: EdgeSync<'a>,
    checkpoint: &'a mut Checkpoint,
    waiter: Waiter,
    venue_id: String,

    solver_poll: Duration,
    solver_max_polls: u32,
    /// Grace period before reading back freshly posted edges.
    settle: Duration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        matcher: MatcherClient<'a>,
        checkpoint: &'a mut Checkpoint,
        venue_id: impl Into<String>,
        waiter: Waiter,
    ) -> Self {
        let sync = EdgeSync::new(platform, waiter.clone());
        Self {
            platform,
            matcher,
            sync,
            checkpoint,
            waiter,
            venue_id: venue_id.into(),
            solver_poll: Duration::from_secs(60),
            solver_max_polls: 1440,
            settle: Duration::from_secs(10),
        }
    }

    pub fn with_timing(
        mut self,
        solver_poll: Duration,
        solver_max_polls: u32,
        settle: Duration,
    ) -> Self {
        self.solver_poll = solver_poll;
        self.solver_max_polls = solver_max_polls;
        self.sync =
            EdgeSync::new(self.platform, self.waiter.clone()).with_polling(solver_poll, solver_max_polls);
        self.settle = settle;
        self
    }

    // -----------------------------------------------------------------------
    // run
    // -----------------------------------------------------------------------

    pub fn run(
        &mut self,
        threshold: f64,
        sac_title: Option<&str>,
        ac_title: Option<&str>,
    ) -> Result<RunOutcome> {
        let sac_title = sac_title.unwrap_or(DEFAULT_SAC_TITLE).to_string();
        let ac_title = ac_title.unwrap_or(DEFAULT_AC_TITLE).to_string();

        let exclude: HashSet<String> = self.checkpoint.exclude_sacs.iter().cloned().collect();
        let mut snapshot = Snapshot::load(self.platform, &self.venue_id, &exclude)?;
        let track_counts = snapshot.track_counts();

        // Optional resets replay the declared track edges before anything else.
        if self.checkpoint.reset_sac_tracks {
            self.publish_track_edges(&snapshot, Role::SeniorAreaChairs, &snapshot.sac_to_tracks)?;
        }
        if self.checkpoint.reset_ac_tracks {
            self.publish_track_edges(&snapshot, Role::AreaChairs, &snapshot.ac_to_tracks)?;
        }

        // Track setup: rebalancer or planner, never both. The collapse and
        // merge computations are pure and deterministic, so a resumed run
        // recomputes them; only the edge publication is skipped.
        let priority_enabled = self.checkpoint.priority_track_loads.enabled;
        let (sac_to_many_tracks, computed_graph, setup_title) = if priority_enabled {
            let planner_config = PlannerConfig {
                small_track_min_papers: self.checkpoint.priority_track_loads.small_track_min_papers,
                small_track_percent_of_median: self
                    .checkpoint
                    .priority_track_loads
                    .small_track_percent_of_median,
            };
            let mut sac_ids = snapshot.sac_roster.clone();
            sac_ids.sort();
            let plan = compute_load_plan(
                &sac_ids,
                &track_counts,
                &snapshot.sac_priority_tracks,
                &snapshot.sac_to_tracks,
                &planner_config,
            );
            info!(iterations = plan.iterations, stopped = ?plan.stopped, "priority track plan");
            let merged =
                merge_tracks_with_volunteers(&snapshot.sac_to_tracks, &plan.volunteered_tracks);
            (merged, HashMap::new(), "priority-plan")
        } else {
            let single = collapse_to_single_track(&snapshot.sac_to_tracks, &track_counts);
            let rebalance = rebalance_across_tracks(
                &single,
                &track_counts,
                &snapshot.track_fallback,
                threshold,
            );
            (rebalance.member_to_tracks, rebalance.track_graph, "rebalance")
        };

        let track_graph = if self.checkpoint.is_completed(Stage::TrackSetup) {
            info!("track setup already complete, reusing recorded track graph");
            self.checkpoint.track_graph.clone().unwrap_or(computed_graph)
        } else {
            self.checkpoint.track_graph = Some(computed_graph.clone());
            self.checkpoint.record(
                Stage::TrackSetup,
                StageResult::Completed { title: setup_title.into() },
            );
            if !self.checkpoint.skip_sac_setup && !priority_enabled {
                self.publish_track_edges(&snapshot, Role::SeniorAreaChairs, &sac_to_many_tracks)
                    .map_err(|e| self.fail(Stage::TrackSetup, e))?;
            }
            computed_graph
        };

        // Round one: unconstrained AC matching.
        let title_one = match self.solver_round(Stage::RoundOne, None)? {
            Some(title) => title,
            None => return Ok(RunOutcome::Cancelled),
        };

        // AC track inference from round-one output.
        let ac_to_tracks = self
            .infer_ac_tracks(&snapshot, &title_one)
            .map_err(|e| self.fail(Stage::AcTrackInference, e))?;
        snapshot.set_ac_tracks(ac_to_tracks);
        if !self.checkpoint.is_completed(Stage::AcTrackInference) {
            self.checkpoint.record(
                Stage::AcTrackInference,
                StageResult::Completed { title: title_one.clone() },
            );
        }

        if self.checkpoint.is_completed(Stage::AcTrackUpdate) {
            debug!("AC track update already complete, skipping");
        } else if self.checkpoint.skip_ac_track_update {
            self.checkpoint.record(
                Stage::AcTrackUpdate,
                StageResult::Skipped { reason: "disabled by checkpoint".into() },
            );
        } else {
            self.publish_track_edges(&snapshot, Role::AreaChairs, &snapshot.ac_to_tracks)
                .map_err(|e| self.fail(Stage::AcTrackUpdate, e))?;
            self.checkpoint.record(
                Stage::AcTrackUpdate,
                StageResult::Completed { title: "ac-track-edges".into() },
            );
        }

        // Round two: track-constrained AC matching.
        let title_two = match self.solver_round(Stage::RoundTwo, None)? {
            Some(title) => title,
            None => return Ok(RunOutcome::Cancelled),
        };

        // SAC ↔ AC inference.
        let ac_assignments = self
            .proposed_heads(Role::AreaChairs, &title_two)
            .map_err(|e| self.fail(Stage::SacAcInference, e))?;
        for ac in snapshot.overloaded_acs(&ac_assignments) {
            warn!(ac = %ac, "proposed load exceeds declared custom max papers");
        }
        let sac_conflicts = snapshot.sac_conflicts.clone();
        let sac_max_loads = self.checkpoint.sac_max_loads.clone().unwrap_or_default();
        let sac_to_acs = assign_acs_to_sacs(
            &snapshot.ac_to_tracks,
            &sac_to_many_tracks,
            &snapshot.sac_to_tracks,
            &track_graph,
            &track_counts,
            &ac_assignments,
            &sac_conflicts,
            &sac_max_loads,
        );
        if !self.checkpoint.is_completed(Stage::SacAcInference) {
            self.checkpoint.record(
                Stage::SacAcInference,
                StageResult::Completed { title: title_two.clone() },
            );
        }

        if self.checkpoint.is_completed(Stage::ConflictTransfer) {
            debug!("conflict transfer already complete, skipping");
        } else if self.checkpoint.skip_conflict_transfer {
            self.checkpoint.record(
                Stage::ConflictTransfer,
                StageResult::Skipped { reason: "disabled by checkpoint".into() },
            );
        } else {
            self.transfer_conflicts(&snapshot, &sac_to_acs)
                .map_err(|e| self.fail(Stage::ConflictTransfer, e))?;
            self.checkpoint.record(
                Stage::ConflictTransfer,
                StageResult::Completed { title: "conflicts-transferred".into() },
            );
        }

        // Round three: SAC-constrained AC matching, run under a stable title.
        let title_three = match self.solver_round(Stage::RoundThree, Some(&ac_title))? {
            Some(title) => title,
            None => return Ok(RunOutcome::Cancelled),
        };

        if self.checkpoint.is_completed(Stage::SacAssignmentInference) {
            debug!("SAC assignments already inferred, skipping");
        } else if self.checkpoint.skip_sac_assignments {
            self.checkpoint.record(
                Stage::SacAssignmentInference,
                StageResult::Skipped { reason: "disabled by checkpoint".into() },
            );
        } else {
            self.infer_sac_assignments(&title_three, &sac_to_acs, &sac_title)
                .map_err(|e| self.fail(Stage::SacAssignmentInference, e))?;
            self.checkpoint.record(
                Stage::SacAssignmentInference,
                StageResult::Completed { title: sac_title.clone() },
            );
        }

        if self.checkpoint.is_completed(Stage::AggregateScorePublish) {
            debug!("aggregate scores already published, skipping");
            return Ok(RunOutcome::Finished);
        }
        if self.checkpoint.skip_aggregate_scores {
            self.checkpoint.record(
                Stage::AggregateScorePublish,
                StageResult::Skipped { reason: "disabled by checkpoint".into() },
            );
            return Ok(RunOutcome::Finished);
        }
        if !self.waiter.wait(self.settle) {
            return Ok(RunOutcome::Cancelled);
        }
        self.publish_aggregate_scores(&snapshot, &sac_title)
            .map_err(|e| self.fail(Stage::AggregateScorePublish, e))?;
        self.checkpoint.record(
            Stage::AggregateScorePublish,
            StageResult::Completed { title: sac_title },
        );
        Ok(RunOutcome::Finished)
    }

    fn fail(&mut self, stage: Stage, err: GavelError) -> GavelError {
        self.checkpoint
            .record(stage, StageResult::Failed { error: err.to_string() });
        err
    }

    // -----------------------------------------------------------------------
    // solver rounds
    // -----------------------------------------------------------------------

    /// Run one AC solver round, or reuse the checkpointed run when its
    /// configuration already completed. `None` means the run was cancelled.
    fn solver_round(&mut self, stage: Stage, title: Option<&str>) -> Result<Option<String>> {
        let recorded = match stage {
            Stage::RoundOne => &self.checkpoint.matching_one,
            Stage::RoundTwo => &self.checkpoint.matching_two,
            _ => &self.checkpoint.matching_three,
        };
        if let Some(config_id) = recorded.clone() {
            if let Some(config) = self.platform.get_config(&config_id)? {
                if config.status == MatchStatus::Complete {
                    info!(?stage, %config_id, title = %config.title, "round already complete, reusing");
                    self.checkpoint.record(
                        stage,
                        StageResult::Skipped {
                            reason: format!("already complete as {}", config.title),
                        },
                    );
                    return Ok(Some(config.title));
                }
            }
        }

        let outcome = self
            .submit_and_wait(Role::AreaChairs, title)
            .map_err(|e| self.fail(stage, e))?;
        match outcome {
            RoundOutcome::Cancelled => Ok(None),
            RoundOutcome::Ran { title, config_id } => {
                match stage {
                    Stage::RoundOne => self.checkpoint.matching_one = Some(config_id),
                    Stage::RoundTwo => self.checkpoint.matching_two = Some(config_id),
                    _ => self.checkpoint.matching_three = Some(config_id),
                }
                self.checkpoint
                    .record(stage, StageResult::Completed { title: title.clone() });
                Ok(Some(title))
            }
        }
    }

    fn submit_and_wait(&self, role: Role, title: Option<&str>) -> Result<RoundOutcome> {
        let config = match role {
            Role::AreaChairs => ac_matching_config(&self.venue_id),
            Role::SeniorAreaChairs => sac_matching_config(&self.venue_id),
        };
        let job = self.matcher.submit(&config, role, title)?;
        match self
            .matcher
            .await_terminal(&job, self.solver_poll, self.solver_max_polls)?
        {
            MatchStatus::Cancelled => Ok(RoundOutcome::Cancelled),
            _ => Ok(RoundOutcome::Ran {
                title: job.title,
                config_id: job.config_id,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // track edges
    // -----------------------------------------------------------------------

    /// Replace a role's track-preference edges: one edge per (member, track,
    /// submission-in-track), labeled with the track.
    fn publish_track_edges(
        &self,
        snapshot: &Snapshot,
        role: Role,
        member_to_tracks: &HashMap<String, Vec<String>>,
    ) -> Result<()> {
        let invitation = role.invitation(&self.venue_id, RESEARCH_AREA);
        let base_readers = match role {
            Role::SeniorAreaChairs => vec![self.venue_id.clone()],
            Role::AreaChairs => vec![
                self.venue_id.clone(),
                Role::SeniorAreaChairs.group_id(&self.venue_id),
            ],
        };

        let mut members: Vec<&String> = member_to_tracks.keys().collect();
        members.sort();
        let mut edges = Vec::new();
        for member in members {
            for track in &member_to_tracks[member] {
                for submission in snapshot
                    .submissions_by_track
                    .get(track)
                    .into_iter()
                    .flatten()
                {
                    let mut readers = base_readers.clone();
                    readers.push(member.clone());
                    edges.push(Edge {
                        invitation: invitation.clone(),
                        head: submission.clone(),
                        tail: member.clone(),
                        weight: 1.0,
                        label: Some(track.clone()),
                        readers,
                        writers: vec![self.venue_id.clone()],
                        signatures: vec![self.venue_id.clone()],
                        nonreaders: vec![],
                    });
                }
            }
        }
        info!(role = role.group_name(), count = edges.len(), "publishing track edges");
        self.sync.replace(&EdgeFilter::invitation(invitation), &edges)
    }

    // -----------------------------------------------------------------------
    // inference
    // -----------------------------------------------------------------------

    /// Vote each AC into the single track holding the plurality of their
    /// round-one papers. Papers missing from the snapshot are a data
    /// integrity problem: logged and skipped, never fatal.
    fn infer_ac_tracks(
        &self,
        snapshot: &Snapshot,
        round_title: &str,
    ) -> Result<HashMap<String, Vec<String>>> {
        let invitation = Role::AreaChairs.invitation(&self.venue_id, PROPOSED_ASSIGNMENT);
        let grouped = self
            .platform
            .grouped_edges_by_tail(&invitation, Some(round_title))?;

        let mut ac_to_tracks = HashMap::new();
        let mut acs: Vec<&String> = grouped.keys().collect();
        acs.sort();
        for ac in acs {
            let mut votes: HashMap<&str, usize> = HashMap::new();
            for edge in &grouped[ac] {
                match snapshot.submission_to_track.get(&edge.head) {
                    Some(track) => *votes.entry(track).or_default() += 1,
                    None => {
                        let err = GavelError::DataIntegrity(format!(
                            "proposed assignment for {ac} references unknown submission {}",
                            edge.head
                        ));
                        warn!(%err, "skipping edge");
                    }
                }
            }
            let winner = votes
                .iter()
                .min_by_key(|(track, count)| (std::cmp::Reverse(**count), **track))
                .map(|(track, _)| *track);
            match winner {
                Some(track) => {
                    ac_to_tracks.insert(ac.clone(), vec![track.to_string()]);
                }
                None => warn!(ac = %ac, "no usable proposed assignments, skipping"),
            }
        }
        debug!(acs = ac_to_tracks.len(), "inferred AC tracks");
        Ok(ac_to_tracks)
    }

    /// Proposed-assignment heads per member for one run label.
    fn proposed_heads(&self, role: Role, label: &str) -> Result<HashMap<String, Vec<String>>> {
        let invitation = role.invitation(&self.venue_id, PROPOSED_ASSIGNMENT);
        let grouped = self.platform.grouped_edges_by_tail(&invitation, Some(label))?;
        Ok(grouped
            .into_iter()
            .map(|(tail, edges)| (tail, edges.into_iter().map(|e| e.head).collect()))
            .collect())
    }

    /// Copy each SAC's conflicts onto its mapped ACs, minus duplicates. ACs
    /// with no pre-existing conflict records are left untouched.
    fn transfer_conflicts(
        &self,
        snapshot: &Snapshot,
        sac_to_acs: &HashMap<String, Vec<String>>,
    ) -> Result<()> {
        let invitation = Role::AreaChairs.invitation(&self.venue_id, CONFLICT);
        let mut new_conflicts = Vec::new();

        let mut sacs: Vec<&String> = sac_to_acs.keys().collect();
        sacs.sort();
        for sac in sacs {
            let sac_cois = snapshot.sac_conflicts.get(sac).cloned().unwrap_or_default();
            for ac in &sac_to_acs[sac] {
                let Some(ac_cois) = snapshot.ac_conflicts.get(ac) else {
                    warn!(ac = %ac, "no conflict records, skipping transfer");
                    continue;
                };
                for coi in &sac_cois {
                    if ac_cois.contains(coi) {
                        continue;
                    }
                    new_conflicts.push(Edge {
                        invitation: invitation.clone(),
                        head: coi.clone(),
                        tail: ac.clone(),
                        weight: -1.0,
                        label: Some("Conflict".to_string()),
                        readers: vec![
                            self.venue_id.clone(),
                            Role::SeniorAreaChairs.group_id(&self.venue_id),
                            ac.clone(),
                        ],
                        writers: vec![self.venue_id.clone()],
                        signatures: vec![self.venue_id.clone()],
                        nonreaders: vec![],
                    });
                }
            }
        }
        info!(count = new_conflicts.len(), "transferring conflicts to ACs");
        if new_conflicts.is_empty() {
            return Ok(());
        }
        self.platform.post_edges(&new_conflicts)
    }

    /// Publish SAC→paper assignments implied by the SAC↔AC mapping and the
    /// final AC round, and post the SAC configuration record as `Complete`
    /// without ever invoking the solver for it.
    fn infer_sac_assignments(
        &mut self,
        ac_round_title: &str,
        sac_to_acs: &HashMap<String, Vec<String>>,
        sac_title: &str,
    ) -> Result<()> {
        let post_config = match &self.checkpoint.sac_matching {
            Some(id) => self
                .platform
                .get_config(id)?
                .map(|c| c.status != MatchStatus::Complete)
                .unwrap_or(true),
            None => true,
        };
        if post_config {
            let mut config = sac_matching_config(&self.venue_id);
            config.title = sac_title.to_string();
            let config_id = self.platform.post_config(&config, Role::SeniorAreaChairs)?;
            self.platform.mark_config_complete(&config_id)?;
            self.checkpoint.sac_matching = Some(config_id);
        }

        let ac_assignments = self.proposed_heads(Role::AreaChairs, ac_round_title)?;
        let invitation = Role::SeniorAreaChairs.invitation(&self.venue_id, PROPOSED_ASSIGNMENT);

        let mut edges = Vec::new();
        let mut sacs: Vec<&String> = sac_to_acs.keys().collect();
        sacs.sort();
        for sac in sacs {
            for ac in &sac_to_acs[sac] {
                for paper in ac_assignments.get(ac).into_iter().flatten() {
                    edges.push(Edge {
                        invitation: invitation.clone(),
                        head: paper.clone(),
                        tail: sac.clone(),
                        weight: 1.0,
                        label: Some(sac_title.to_string()),
                        readers: vec![self.venue_id.clone(), sac.clone()],
                        writers: vec![self.venue_id.clone()],
                        signatures: vec![self.venue_id.clone()],
                        nonreaders: vec![],
                    });
                }
            }
        }
        info!(count = edges.len(), "publishing inferred SAC assignments");
        let scope = EdgeFilter::invitation(invitation).with_label(sac_title);
        self.sync.replace(&scope, &edges)
    }

    /// Publish per-SAC aggregate scores (affinity plus a track-match bonus)
    /// and re-publish the assignment edges with the same scoring. The bonus
    /// lands before the top-N cut so on-track papers are never truncated
    /// away in favor of higher raw affinities.
    fn publish_aggregate_scores(&self, snapshot: &Snapshot, sac_title: &str) -> Result<()> {
        let track_invitation = Role::SeniorAreaChairs.invitation(&self.venue_id, RESEARCH_AREA);
        let track_edges = self.platform.grouped_edges_by_tail(&track_invitation, None)?;
        let track_heads: HashMap<&String, HashSet<&String>> = track_edges
            .iter()
            .map(|(sac, edges)| (sac, edges.iter().map(|e| &e.head).collect()))
            .collect();

        let assignments = self.proposed_heads(Role::SeniorAreaChairs, sac_title)?;
        let score_invitation = Role::SeniorAreaChairs.invitation(&self.venue_id, AGGREGATE_SCORE);
        let assignment_invitation =
            Role::SeniorAreaChairs.invitation(&self.venue_id, PROPOSED_ASSIGNMENT);

        let on_track = |sac: &String, paper: &String| {
            track_heads.get(sac).map(|hs| hs.contains(paper)).unwrap_or(false)
        };

        let mut score_edges = Vec::new();
        let mut sacs: Vec<&String> = snapshot.sac_affinities.keys().collect();
        sacs.sort();
        for sac in sacs {
            let mut scored: Vec<(String, f64)> = snapshot.sac_affinities[sac]
                .iter()
                .map(|(paper, affinity)| {
                    let bonus = if on_track(sac, paper) { 1.0 } else { 0.0 };
                    (paper.clone(), affinity + bonus)
                })
                .collect();
            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            scored.truncate(self.checkpoint.top_n);
            for (paper, score) in scored {
                score_edges.push(Edge {
                    invitation: score_invitation.clone(),
                    head: paper,
                    tail: sac.clone(),
                    weight: score,
                    label: Some(sac_title.to_string()),
                    readers: vec![self.venue_id.clone(), sac.clone()],
                    writers: vec![self.venue_id.clone()],
                    signatures: vec![self.venue_id.clone()],
                    nonreaders: vec![],
                });
            }
        }

        let mut assignment_edges = Vec::new();
        let mut assigned_sacs: Vec<&String> = assignments.keys().collect();
        assigned_sacs.sort();
        for sac in assigned_sacs {
            for paper in &assignments[sac] {
                let affinity = snapshot
                    .sac_affinities
                    .get(sac)
                    .and_then(|scores| scores.get(paper))
                    .copied()
                    .unwrap_or(0.0);
                let bonus = if on_track(sac, paper) { 1.0 } else { 0.0 };
                let nonreaders = match snapshot.submission_numbers.get(paper) {
                    Some(number) => vec![format!("{}/Submission{number}/Authors", self.venue_id)],
                    None => vec![],
                };
                assignment_edges.push(Edge {
                    invitation: assignment_invitation.clone(),
                    head: paper.clone(),
                    tail: sac.clone(),
                    weight: affinity + bonus,
                    label: Some(sac_title.to_string()),
                    readers: vec![self.venue_id.clone(), sac.clone()],
                    writers: vec![self.venue_id.clone()],
                    signatures: vec![self.venue_id.clone()],
                    nonreaders,
                });
            }
        }

        info!(
            scores = score_edges.len(),
            assignments = assignment_edges.len(),
            "publishing aggregate scores"
        );
        self.sync.replace(
            &EdgeFilter::invitation(score_invitation).with_label(sac_title),
            &score_edges,
        )?;
        self.sync.replace(
            &EdgeFilter::invitation(assignment_invitation).with_label(sac_title),
            &assignment_edges,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Boundary to the hosting platform's edge/note store.
//!
//! The orchestration core never talks to the platform directly; everything
//! goes through the [`Platform`] trait so the core can be exercised against
//! [`MemoryPlatform`] in tests and dry runs. Deletions are asynchronous on
//! the real platform: `delete_edges` returns once the delete is *triggered*,
//! and callers must poll `count_edges` until the scope is empty.

use crate::config::MatchingConfig;
use crate::error::{GavelError, Result};
use crate::types::{Edge, EdgeFilter, MatchStatus, Role, Submission, CONFLICT, PROPOSED_ASSIGNMENT};
use std::collections::HashMap;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

pub trait Platform {
    // --- edge store -------------------------------------------------------
    fn count_edges(&self, filter: &EdgeFilter) -> Result<usize>;
    /// Trigger an asynchronous bulk delete of all edges in scope.
    fn delete_edges(&self, filter: &EdgeFilter) -> Result<()>;
    fn post_edges(&self, edges: &[Edge]) -> Result<()>;
    fn grouped_edges_by_tail(
        &self,
        invitation: &str,
        label: Option<&str>,
    ) -> Result<HashMap<String, Vec<Edge>>>;

    // --- matching configurations -----------------------------------------
    /// Persist a configuration record for `committee`, returning its id.
    fn post_config(&self, config: &MatchingConfig, committee: Role) -> Result<String>;
    fn get_config(&self, config_id: &str) -> Result<Option<MatchingConfig>>;
    fn config_status(&self, config_id: &str) -> Result<(MatchStatus, String)>;
    fn mark_config_complete(&self, config_id: &str) -> Result<()>;

    // --- snapshot feed ----------------------------------------------------
    fn submissions(&self) -> Result<Vec<Submission>>;
    fn group_members(&self, role: Role) -> Result<Vec<String>>;
    fn declared_tracks(&self, role: Role) -> Result<HashMap<String, Vec<String>>>;
    fn priority_tracks(&self, role: Role) -> Result<HashMap<String, String>>;
    /// Conflict-of-interest submission ids, keyed by member.
    fn conflicts(&self, role: Role) -> Result<HashMap<String, Vec<String>>>;
    fn custom_max_papers(&self, role: Role) -> Result<HashMap<String, u32>>;
    /// member → submission → raw affinity score.
    fn affinity_scores(&self, role: Role) -> Result<HashMap<String, HashMap<String, f64>>>;
    /// Track fallback adjacency, `None` when the venue never configured it.
    fn track_fallback(&self) -> Result<Option<HashMap<String, Vec<String>>>>;
}

// ---------------------------------------------------------------------------
// MemoryPlatform
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    edges: Vec<Edge>,
    configs: HashMap<String, MatchingConfig>,
    config_roles: HashMap<String, Role>,
    next_config: u64,

    submissions: Vec<Submission>,
    members: HashMap<Role, Vec<String>>,
    declared: HashMap<Role, HashMap<String, Vec<String>>>,
    priority: HashMap<Role, HashMap<String, String>>,
    conflicts: HashMap<Role, HashMap<String, Vec<String>>>,
    max_papers: HashMap<Role, HashMap<String, u32>>,
    affinities: HashMap<Role, HashMap<String, HashMap<String, f64>>>,
    fallback: Option<HashMap<String, Vec<String>>>,

    /// Deletes complete only after this many count polls against their scope.
    delete_lag_polls: u32,
    pending_deletes: Vec<(EdgeFilter, u32)>,
    insert_during_pending_delete: bool,

    /// When set, posting a configuration immediately records it Complete and
    /// materializes these (tail, head) pairs as proposed-assignment edges
    /// labeled with the run title — a stand-in for the external solver.
    auto_solve: bool,
    solver_results: HashMap<Role, Vec<(String, String)>>,
    venue_id: String,
}

/// In-memory [`Platform`] used by the test-suite and for host-side dry runs.
#[derive(Default)]
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new(venue_id: impl Into<String>) -> Self {
        let platform = Self::default();
        platform.lock().venue_id = venue_id.into();
        platform
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- seeding ----------------------------------------------------------

    pub fn add_submission(&self, id: &str, number: u32, track: &str) {
        self.lock().submissions.push(Submission {
            id: id.to_string(),
            number,
            track: track.to_string(),
        });
    }

    pub fn set_members(&self, role: Role, members: Vec<String>) {
        self.lock().members.insert(role, members);
    }

    pub fn set_declared_tracks(&self, role: Role, tracks: HashMap<String, Vec<String>>) {
        self.lock().declared.insert(role, tracks);
    }

    pub fn set_priority_tracks(&self, role: Role, tracks: HashMap<String, String>) {
        self.lock().priority.insert(role, tracks);
    }

    pub fn set_conflicts(&self, role: Role, conflicts: HashMap<String, Vec<String>>) {
        self.lock().conflicts.insert(role, conflicts);
    }

    pub fn set_custom_max_papers(&self, role: Role, loads: HashMap<String, u32>) {
        self.lock().max_papers.insert(role, loads);
    }

    pub fn set_affinity_scores(&self, role: Role, scores: HashMap<String, HashMap<String, f64>>) {
        self.lock().affinities.insert(role, scores);
    }

    pub fn set_track_fallback(&self, fallback: HashMap<String, Vec<String>>) {
        self.lock().fallback = Some(fallback);
    }

    // --- behavior knobs ---------------------------------------------------

    pub fn set_delete_lag(&self, polls: u32) {
        self.lock().delete_lag_polls = polls;
    }

    /// True if any bulk insert landed while a delete over the same scope was
    /// still pending — the ordering violation the synchronizer must prevent.
    pub fn insert_before_delete_violation(&self) -> bool {
        self.lock().insert_during_pending_delete
    }

    pub fn set_auto_solve(&self, on: bool) {
        self.lock().auto_solve = on;
    }

    pub fn set_solver_results(&self, role: Role, assignments: Vec<(String, String)>) {
        self.lock().solver_results.insert(role, assignments);
    }

    /// Seed a configuration record under a known id (e.g. a checkpointed run).
    pub fn seed_config(&self, id: &str, config: MatchingConfig, committee: Role) {
        let mut state = self.lock();
        state.configs.insert(id.to_string(), config);
        state.config_roles.insert(id.to_string(), committee);
    }

    pub fn set_config_status(&self, id: &str, status: MatchStatus, message: &str) {
        let mut state = self.lock();
        if let Some(config) = state.configs.get_mut(id) {
            config.status = status;
            config.error_message = if message.is_empty() {
                None
            } else {
                Some(message.to_string())
            };
        }
    }

    pub fn edges_matching(&self, filter: &EdgeFilter) -> Vec<Edge> {
        self.lock()
            .edges
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }
}

impl MemoryState {
    fn apply_delete(&mut self, filter: &EdgeFilter) {
        self.edges.retain(|e| !filter.matches(e));
    }

    /// Advance pending deletes for this scope by one poll, applying any that
    /// reach zero.
    fn tick_pending_deletes(&mut self, filter: &EdgeFilter) {
        let mut to_apply = Vec::new();
        for (pending, polls_left) in &mut self.pending_deletes {
            if pending == filter {
                *polls_left = polls_left.saturating_sub(1);
                if *polls_left == 0 {
                    to_apply.push(pending.clone());
                }
            }
        }
        self.pending_deletes.retain(|(_, polls)| *polls > 0);
        for filter in to_apply {
            self.apply_delete(&filter);
        }
    }

    fn materialize_solver_result(&mut self, committee: Role, title: &str) {
        let invitation = committee.invitation(&self.venue_id, PROPOSED_ASSIGNMENT);
        let results = self.solver_results.get(&committee).cloned().unwrap_or_default();
        for (tail, head) in results {
            self.edges.push(Edge {
                invitation: invitation.clone(),
                head,
                tail,
                weight: 1.0,
                label: Some(title.to_string()),
                readers: vec![self.venue_id.clone()],
                writers: vec![self.venue_id.clone()],
                signatures: vec![self.venue_id.clone()],
                nonreaders: vec![],
            });
        }
    }
}

impl Platform for MemoryPlatform {
    fn count_edges(&self, filter: &EdgeFilter) -> Result<usize> {
        let mut state = self.lock();
        state.tick_pending_deletes(filter);
        Ok(state.edges.iter().filter(|e| filter.matches(e)).count())
    }

    fn delete_edges(&self, filter: &EdgeFilter) -> Result<()> {
        let mut state = self.lock();
        if state.delete_lag_polls == 0 {
            state.apply_delete(filter);
        } else {
            let lag = state.delete_lag_polls;
            state.pending_deletes.push((filter.clone(), lag));
        }
        Ok(())
    }

    fn post_edges(&self, edges: &[Edge]) -> Result<()> {
        let mut state = self.lock();
        let conflicting = edges
            .iter()
            .any(|e| state.pending_deletes.iter().any(|(f, _)| f.matches(e)));
        if conflicting {
            state.insert_during_pending_delete = true;
        }
        state.edges.extend_from_slice(edges);
        Ok(())
    }

    fn grouped_edges_by_tail(
        &self,
        invitation: &str,
        label: Option<&str>,
    ) -> Result<HashMap<String, Vec<Edge>>> {
        let state = self.lock();
        let mut grouped: HashMap<String, Vec<Edge>> = HashMap::new();
        for edge in &state.edges {
            if edge.invitation != invitation {
                continue;
            }
            if let Some(label) = label {
                if edge.label.as_deref() != Some(label) {
                    continue;
                }
            }
            grouped.entry(edge.tail.clone()).or_default().push(edge.clone());
        }
        Ok(grouped)
    }

    fn post_config(&self, config: &MatchingConfig, committee: Role) -> Result<String> {
        let mut state = self.lock();
        state.next_config += 1;
        let id = format!("config-{}", state.next_config);
        let mut stored = config.clone();
        if state.auto_solve {
            stored.status = MatchStatus::Complete;
            let title = stored.title.clone();
            state.materialize_solver_result(committee, &title);
        }
        state.configs.insert(id.clone(), stored);
        state.config_roles.insert(id.clone(), committee);
        Ok(id)
    }

    fn get_config(&self, config_id: &str) -> Result<Option<MatchingConfig>> {
        Ok(self.lock().configs.get(config_id).cloned())
    }

    fn config_status(&self, config_id: &str) -> Result<(MatchStatus, String)> {
        let state = self.lock();
        let config = state
            .configs
            .get(config_id)
            .ok_or_else(|| GavelError::Platform(format!("unknown configuration: {config_id}")))?;
        Ok((
            config.status,
            config.error_message.clone().unwrap_or_default(),
        ))
    }

    fn mark_config_complete(&self, config_id: &str) -> Result<()> {
        let mut state = self.lock();
        let config = state
            .configs
            .get_mut(config_id)
            .ok_or_else(|| GavelError::Platform(format!("unknown configuration: {config_id}")))?;
        config.status = MatchStatus::Complete;
        Ok(())
    }

    fn submissions(&self) -> Result<Vec<Submission>> {
        Ok(self.lock().submissions.clone())
    }

    fn group_members(&self, role: Role) -> Result<Vec<String>> {
        Ok(self.lock().members.get(&role).cloned().unwrap_or_default())
    }

    fn declared_tracks(&self, role: Role) -> Result<HashMap<String, Vec<String>>> {
        Ok(self.lock().declared.get(&role).cloned().unwrap_or_default())
    }

    fn priority_tracks(&self, role: Role) -> Result<HashMap<String, String>> {
        Ok(self.lock().priority.get(&role).cloned().unwrap_or_default())
    }

    /// Seeded conflicts plus any Conflict edges posted since, so transfers
    /// from a previous run are visible to the next snapshot.
    fn conflicts(&self, role: Role) -> Result<HashMap<String, Vec<String>>> {
        let state = self.lock();
        let mut conflicts = state.conflicts.get(&role).cloned().unwrap_or_default();
        let invitation = role.invitation(&state.venue_id, CONFLICT);
        for edge in &state.edges {
            if edge.invitation != invitation {
                continue;
            }
            let entry = conflicts.entry(edge.tail.clone()).or_default();
            if !entry.contains(&edge.head) {
                entry.push(edge.head.clone());
            }
        }
        Ok(conflicts)
    }

    fn custom_max_papers(&self, role: Role) -> Result<HashMap<String, u32>> {
        Ok(self.lock().max_papers.get(&role).cloned().unwrap_or_default())
    }

    fn affinity_scores(&self, role: Role) -> Result<HashMap<String, HashMap<String, f64>>> {
        Ok(self.lock().affinities.get(&role).cloned().unwrap_or_default())
    }

    fn track_fallback(&self) -> Result<Option<HashMap<String, Vec<String>>>> {
        Ok(self.lock().fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Resumable pipeline state.
//!
//! The orchestrator records each stage's outcome here and skips stages a
//! previous run already completed. The file round-trips as JSON; solver job
//! references use the historical `"N/A"` sentinel for "never ran".

use crate::error::Result;
use crate::io::atomic_write;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TrackSetup,
    RoundOne,
    AcTrackInference,
    AcTrackUpdate,
    RoundTwo,
    SacAcInference,
    ConflictTransfer,
    RoundThree,
    SacAssignmentInference,
    AggregateScorePublish,
}

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageResult {
    Pending,
    Skipped { reason: String },
    Completed { title: String },
    Failed { error: String },
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityTrackLoads {
    pub enabled: bool,
    pub small_track_min_papers: u32,
    pub small_track_percent_of_median: f64,
}

impl Default for PriorityTrackLoads {
    fn default() -> Self {
        Self {
            enabled: false,
            small_track_min_papers: 10,
            small_track_percent_of_median: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    pub stages: BTreeMap<Stage, StageResult>,

    /// Configuration ids of previously submitted solver runs; `"N/A"` on the
    /// wire when a round never ran.
    #[serde(with = "job_ref")]
    pub matching_one: Option<String>,
    #[serde(with = "job_ref")]
    pub matching_two: Option<String>,
    #[serde(with = "job_ref")]
    pub matching_three: Option<String>,
    #[serde(with = "job_ref")]
    pub sac_matching: Option<String>,

    pub skip_sac_setup: bool,
    pub skip_ac_track_update: bool,
    pub skip_conflict_transfer: bool,
    pub skip_sac_assignments: bool,
    pub skip_aggregate_scores: bool,

    pub reset_sac_tracks: bool,
    pub reset_ac_tracks: bool,

    pub top_n: usize,
    pub sac_max_loads: Option<HashMap<String, u32>>,
    pub priority_track_loads: PriorityTrackLoads,
    pub exclude_sacs: Vec<String>,

    /// Merged-track adjacency recorded by the rebalancer on a previous run.
    pub track_graph: Option<HashMap<String, Vec<String>>>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            stages: BTreeMap::new(),
            matching_one: None,
            matching_two: None,
            matching_three: None,
            sac_matching: None,
            skip_sac_setup: false,
            skip_ac_track_update: false,
            skip_conflict_transfer: false,
            skip_sac_assignments: false,
            skip_aggregate_scores: false,
            reset_sac_tracks: false,
            reset_ac_tracks: false,
            top_n: 100,
            sac_max_loads: None,
            priority_track_loads: PriorityTrackLoads::default(),
            exclude_sacs: Vec::new(),
            track_graph: None,
        }
    }
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &data)
    }

    /// Absent stages read as `Pending`.
    pub fn stage(&self, stage: Stage) -> StageResult {
        self.stages.get(&stage).cloned().unwrap_or(StageResult::Pending)
    }

    pub fn record(&mut self, stage: Stage, result: StageResult) {
        self.stages.insert(stage, result);
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        matches!(self.stage(stage), StageResult::Completed { .. })
    }

    /// Title recorded for a completed stage, if any.
    pub fn completed_title(&self, stage: Stage) -> Option<String> {
        match self.stage(stage) {
            StageResult::Completed { title } => Some(title),
            _ => None,
        }
    }
}

mod job_ref {
    use serde::{Deserialize, Deserializer, Serializer};

    const NEVER_RAN: &str = "N/A";

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(id) => serializer.serialize_str(id),
            None => serializer.serialize_str(NEVER_RAN),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|v| v != NEVER_RAN))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_shape() {
        let checkpoint = Checkpoint::default();
        assert_eq!(checkpoint.top_n, 100);
        assert!(!checkpoint.priority_track_loads.enabled);
        assert_eq!(checkpoint.priority_track_loads.small_track_min_papers, 10);
        assert_eq!(checkpoint.stage(Stage::RoundOne), StageResult::Pending);
    }

    #[test]
    fn na_job_refs_deserialize_to_none() {
        let checkpoint: Checkpoint = serde_json::from_str(
            r#"{
                "matching_one": "config-7",
                "matching_two": "N/A",
                "top_n": 2
            }"#,
        )
        .unwrap();
        assert_eq!(checkpoint.matching_one.as_deref(), Some("config-7"));
        assert_eq!(checkpoint.matching_two, None);
        assert_eq!(checkpoint.matching_three, None);
        assert_eq!(checkpoint.top_n, 2);
    }

    #[test]
    fn job_refs_serialize_back_to_na() {
        let checkpoint = Checkpoint {
            matching_one: Some("config-7".to_string()),
            ..Checkpoint::default()
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&checkpoint).unwrap()).unwrap();
        assert_eq!(json["matching_one"], "config-7");
        assert_eq!(json["matching_two"], "N/A");
    }

    #[test]
    fn stage_results_round_trip() {
        let mut checkpoint = Checkpoint::default();
        checkpoint.record(
            Stage::RoundOne,
            StageResult::Completed {
                title: "run-1".to_string(),
            },
        );
        checkpoint.record(
            Stage::ConflictTransfer,
            StageResult::Skipped {
                reason: "disabled".to_string(),
            },
        );

        let json = serde_json::to_string(&checkpoint).unwrap();
        let restored: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.completed_title(Stage::RoundOne).as_deref(), Some("run-1"));
        assert!(matches!(
            restored.stage(Stage::ConflictTransfer),
            StageResult::Skipped { .. }
        ));
        assert!(!restored.is_completed(Stage::RoundTwo));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");

        let mut checkpoint = Checkpoint::default();
        checkpoint.exclude_sacs.push("~sac1".to_string());
        checkpoint.record(
            Stage::TrackSetup,
            StageResult::Completed {
                title: "tracks".to_string(),
            },
        );
        checkpoint.save(&path).unwrap();

        let restored = Checkpoint::load(&path).unwrap();
        assert_eq!(restored.exclude_sacs, vec!["~sac1".to_string()]);
        assert!(restored.is_completed(Stage::TrackSetup));
    }
}

//! Matching-configuration records submitted to the external solver.
//!
//! These are pure builders: each call takes a venue id and returns a fresh,
//! fully-populated value. Nothing here is shared or mutated between runs.

use crate::types::{
    MatchStatus, Role, AFFINITY_SCORE, AGGREGATE_SCORE, CONFLICT, CUSTOM_MAX_PAPERS, RESEARCH_AREA,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// MatchingConfig
// ---------------------------------------------------------------------------

/// Per-invitation score weighting inside `scores_specification`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSpec {
    pub weight: f64,
    pub default: f64,
}

/// A named, versioned set of solver parameters with a status lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub title: String,
    pub status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub user_demand: u32,
    pub max_papers: u32,
    pub min_papers: u32,
    pub alternates: u32,
    pub paper_invitation: String,
    pub match_group: String,
    pub scores_specification: BTreeMap<String, ScoreSpec>,
    pub aggregate_score_invitation: String,
    pub conflicts_invitation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_max_papers_invitation: Option<String>,
    pub solver: String,
}

fn paper_invitation(venue_id: &str) -> String {
    format!("{venue_id}/-/Submission&content.venueid={venue_id}/Submission")
}

fn score_specification(venue_id: &str, role: Role) -> BTreeMap<String, ScoreSpec> {
    let mut scores = BTreeMap::new();
    scores.insert(
        role.invitation(venue_id, AFFINITY_SCORE),
        ScoreSpec {
            weight: 1.0,
            default: 0.0,
        },
    );
    scores.insert(
        role.invitation(venue_id, RESEARCH_AREA),
        ScoreSpec {
            weight: 1.0,
            default: 0.0,
        },
    );
    scores
}

/// Configuration for the three AC↔paper solver rounds.
pub fn ac_matching_config(venue_id: &str) -> MatchingConfig {
    let role = Role::AreaChairs;
    MatchingConfig {
        title: String::new(),
        status: MatchStatus::Initialized,
        error_message: None,
        user_demand: 1,
        max_papers: 0,
        min_papers: 0,
        alternates: 200,
        paper_invitation: paper_invitation(venue_id),
        match_group: role.group_id(venue_id),
        scores_specification: score_specification(venue_id, role),
        aggregate_score_invitation: role.invitation(venue_id, AGGREGATE_SCORE),
        conflicts_invitation: role.invitation(venue_id, CONFLICT),
        custom_max_papers_invitation: Some(role.invitation(venue_id, CUSTOM_MAX_PAPERS)),
        solver: "FairFlow".to_string(),
    }
}

/// Configuration recorded for the inferred SAC↔paper round. The solver never
/// runs against it; the record exists so downstream tooling sees a Complete
/// configuration for the SAC committee.
pub fn sac_matching_config(venue_id: &str) -> MatchingConfig {
    let role = Role::SeniorAreaChairs;
    MatchingConfig {
        title: String::new(),
        status: MatchStatus::Initialized,
        error_message: None,
        user_demand: 1,
        max_papers: 400,
        min_papers: 0,
        alternates: 50,
        paper_invitation: paper_invitation(venue_id),
        match_group: role.group_id(venue_id),
        scores_specification: score_specification(venue_id, role),
        aggregate_score_invitation: role.invitation(venue_id, AGGREGATE_SCORE),
        conflicts_invitation: role.invitation(venue_id, CONFLICT),
        custom_max_papers_invitation: None,
        solver: "FairFlow".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ac_config_targets_area_chairs() {
        let cfg = ac_matching_config("acme.org/ARR");
        assert_eq!(cfg.match_group, "acme.org/ARR/Area_Chairs");
        assert_eq!(cfg.status, MatchStatus::Initialized);
        assert_eq!(cfg.user_demand, 1);
        assert!(cfg
            .scores_specification
            .contains_key("acme.org/ARR/Area_Chairs/-/Affinity_Score"));
        assert!(cfg
            .scores_specification
            .contains_key("acme.org/ARR/Area_Chairs/-/Research_Area"));
        assert_eq!(
            cfg.custom_max_papers_invitation.as_deref(),
            Some("acme.org/ARR/Area_Chairs/-/Custom_Max_Papers")
        );
    }

    #[test]
    fn sac_config_has_no_custom_max_papers() {
        let cfg = sac_matching_config("acme.org/ARR");
        assert_eq!(cfg.match_group, "acme.org/ARR/Senior_Area_Chairs");
        assert_eq!(cfg.max_papers, 400);
        assert_eq!(cfg.alternates, 50);
        assert!(cfg.custom_max_papers_invitation.is_none());
    }

    #[test]
    fn builders_return_fresh_values() {
        let mut first = ac_matching_config("v");
        first.title = "run-1".to_string();
        first.status = MatchStatus::Complete;
        let second = ac_matching_config("v");
        assert!(second.title.is_empty());
        assert_eq!(second.status, MatchStatus::Initialized);
    }
}

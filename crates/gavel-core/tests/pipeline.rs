use gavel_core::checkpoint::{Checkpoint, Stage, StageResult};
use gavel_core::config::ac_matching_config;
use gavel_core::matcher::MatcherClient;
use gavel_core::orchestrator::{Orchestrator, RunOutcome};
use gavel_core::platform::{MemoryPlatform, Platform};
use gavel_core::types::{Edge, EdgeFilter, MatchStatus, Role};
use gavel_core::wait::Waiter;
use std::collections::HashMap;
use std::time::Duration;

const VENUE: &str = "v";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Two tracks, two SACs, two ACs, five submissions. The in-memory solver
/// assigns `~acA` the Track1 papers and `~acB` the Track2 papers.
fn seeded_platform() -> MemoryPlatform {
    let platform = MemoryPlatform::new(VENUE);
    platform.set_track_fallback(HashMap::from([
        ("Track1".to_string(), vec!["Track2".to_string()]),
        ("Track2".to_string(), vec!["Track1".to_string()]),
    ]));
    platform.add_submission("p1", 1, "Track1");
    platform.add_submission("p2", 2, "Track1");
    platform.add_submission("q1", 3, "Track2");
    platform.add_submission("q2", 4, "Track2");
    platform.add_submission("q3", 5, "Track2");

    platform.set_members(
        Role::SeniorAreaChairs,
        vec!["~sac1".to_string(), "~sac2".to_string()],
    );
    platform.set_members(Role::AreaChairs, vec!["~acA".to_string(), "~acB".to_string()]);
    platform.set_declared_tracks(
        Role::SeniorAreaChairs,
        HashMap::from([
            ("~sac1".to_string(), vec!["Track1".to_string()]),
            ("~sac2".to_string(), vec!["Track2".to_string()]),
        ]),
    );
    platform.set_declared_tracks(
        Role::AreaChairs,
        HashMap::from([
            ("~acA".to_string(), vec!["Track1".to_string()]),
            ("~acB".to_string(), vec!["Track2".to_string()]),
        ]),
    );
    platform.set_conflicts(
        Role::SeniorAreaChairs,
        HashMap::from([("~sac1".to_string(), vec!["p2".to_string(), "q3".to_string()])]),
    );
    // ~acA has a pre-existing conflict record; ~acB has none.
    platform.set_conflicts(
        Role::AreaChairs,
        HashMap::from([("~acA".to_string(), vec!["q3".to_string()])]),
    );
    platform.set_affinity_scores(
        Role::SeniorAreaChairs,
        HashMap::from([
            (
                "~sac1".to_string(),
                HashMap::from([
                    ("p1".to_string(), 0.3),
                    ("p2".to_string(), 0.2),
                    ("q1".to_string(), 0.9),
                    ("q2".to_string(), 0.8),
                    ("q3".to_string(), 0.1),
                ]),
            ),
            (
                "~sac2".to_string(),
                HashMap::from([("q1".to_string(), 0.5)]),
            ),
        ]),
    );

    platform.set_auto_solve(true);
    platform.set_solver_results(
        Role::AreaChairs,
        vec![
            ("~acA".to_string(), "p1".to_string()),
            ("~acA".to_string(), "p2".to_string()),
            ("~acB".to_string(), "q1".to_string()),
            ("~acB".to_string(), "q2".to_string()),
            ("~acB".to_string(), "q3".to_string()),
        ],
    );
    platform
}

fn run_pipeline(
    platform: &MemoryPlatform,
    checkpoint: &mut Checkpoint,
    solver_url: &str,
) -> RunOutcome {
    let waiter = Waiter::default();
    let matcher = MatcherClient::new(platform, solver_url, None, waiter.clone()).unwrap();
    let mut orchestrator = Orchestrator::new(platform, matcher, checkpoint, VENUE, waiter)
        .with_timing(Duration::from_millis(1), 10, Duration::from_millis(1));
    orchestrator.run(1.0, None, None).unwrap()
}

fn edges_for(platform: &MemoryPlatform, invitation: &str, label: Option<&str>) -> Vec<Edge> {
    let mut filter = EdgeFilter::invitation(invitation);
    if let Some(label) = label {
        filter = filter.with_label(label);
    }
    platform.edges_matching(&filter)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn full_run_completes_every_stage() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/match").with_status(200).expect(3).create();

    let platform = seeded_platform();
    let mut checkpoint = Checkpoint::default();
    let outcome = run_pipeline(&platform, &mut checkpoint, &server.url());

    assert_eq!(outcome, RunOutcome::Finished);
    mock.assert();
    for stage in [
        Stage::TrackSetup,
        Stage::RoundOne,
        Stage::RoundTwo,
        Stage::RoundThree,
        Stage::SacAssignmentInference,
        Stage::AggregateScorePublish,
    ] {
        assert!(
            matches!(checkpoint.stage(stage), StageResult::Completed { .. }),
            "stage {stage:?} not completed"
        );
    }
    assert!(checkpoint.matching_one.is_some());
    assert!(checkpoint.sac_matching.is_some());

    // The SAC↔AC mapping puts sac1's ACs' papers under sac1.
    let sac_assignments = edges_for(
        &platform,
        "v/Senior_Area_Chairs/-/Proposed_Assignment",
        Some("sac-matching"),
    );
    let sac1_heads: Vec<&str> = sac_assignments
        .iter()
        .filter(|e| e.tail == "~sac1")
        .map(|e| e.head.as_str())
        .collect();
    assert!(sac1_heads.contains(&"p1"));
    assert!(sac1_heads.contains(&"p2"));
}

#[test]
fn small_track_is_not_stranded() {
    // One SAC declares both tracks; scarcity pulls them to the big track and
    // the fallback-driven coverage pass must bring Track1 back.
    let mut server = mockito::Server::new();
    server.mock("POST", "/match").with_status(200).create();

    let platform = MemoryPlatform::new(VENUE);
    platform.set_track_fallback(HashMap::from([(
        "Track1".to_string(),
        vec!["Track2".to_string()],
    )]));
    platform.add_submission("s1", 1, "Track1");
    platform.add_submission("s2", 2, "Track1");
    for i in 0..20 {
        platform.add_submission(&format!("b{i}"), 10 + i, "Track2");
    }
    platform.set_members(Role::SeniorAreaChairs, vec!["~sac1".to_string()]);
    platform.set_members(Role::AreaChairs, vec!["~ac1".to_string()]);
    platform.set_declared_tracks(
        Role::SeniorAreaChairs,
        HashMap::from([(
            "~sac1".to_string(),
            vec!["Track1".to_string(), "Track2".to_string()],
        )]),
    );
    platform.set_declared_tracks(
        Role::AreaChairs,
        HashMap::from([("~ac1".to_string(), vec!["Track2".to_string()])]),
    );
    platform.set_auto_solve(true);
    platform.set_solver_results(
        Role::AreaChairs,
        vec![("~ac1".to_string(), "b0".to_string())],
    );

    let mut checkpoint = Checkpoint::default();
    let outcome = run_pipeline(&platform, &mut checkpoint, &server.url());
    assert_eq!(outcome, RunOutcome::Finished);

    let track_edges = edges_for(&platform, "v/Senior_Area_Chairs/-/Research_Area", None);
    let track1_covered = track_edges
        .iter()
        .any(|e| e.tail == "~sac1" && e.label.as_deref() == Some("Track1"));
    assert!(track1_covered, "Track1 left without any SAC");
    assert!(checkpoint
        .track_graph
        .as_ref()
        .is_some_and(|g| g.contains_key("Track1")));
}

#[test]
fn checkpointed_complete_round_is_skipped_and_title_reused() {
    let mut server = mockito::Server::new();
    // Rounds two and three still run; round one must not trigger the solver.
    let mock = server.mock("POST", "/match").with_status(200).expect(2).create();

    let platform = seeded_platform();
    let mut historic = ac_matching_config(VENUE);
    historic.title = "round-one-historic".to_string();
    historic.status = MatchStatus::Complete;
    platform.seed_config("config-history", historic, Role::AreaChairs);
    // Round-one output under the historic title, as a previous run left it.
    platform
        .post_edges(&[
            Edge {
                invitation: "v/Area_Chairs/-/Proposed_Assignment".to_string(),
                head: "p1".to_string(),
                tail: "~acA".to_string(),
                weight: 1.0,
                label: Some("round-one-historic".to_string()),
                readers: vec![],
                writers: vec![],
                signatures: vec![],
                nonreaders: vec![],
            },
            Edge {
                invitation: "v/Area_Chairs/-/Proposed_Assignment".to_string(),
                head: "q1".to_string(),
                tail: "~acB".to_string(),
                weight: 1.0,
                label: Some("round-one-historic".to_string()),
                readers: vec![],
                writers: vec![],
                signatures: vec![],
                nonreaders: vec![],
            },
        ])
        .unwrap();

    let mut checkpoint = Checkpoint::default();
    checkpoint.matching_one = Some("config-history".to_string());
    let outcome = run_pipeline(&platform, &mut checkpoint, &server.url());

    assert_eq!(outcome, RunOutcome::Finished);
    mock.assert();
    match checkpoint.stage(Stage::RoundOne) {
        StageResult::Skipped { reason } => assert!(reason.contains("round-one-historic")),
        other => panic!("round one not skipped: {other:?}"),
    }
    // The recorded reference survives the re-run untouched.
    assert_eq!(checkpoint.matching_one.as_deref(), Some("config-history"));
}

#[test]
fn rerun_with_shared_checkpoint_adds_nothing() {
    let mut server = mockito::Server::new();
    // Three triggers total: the second run reuses every recorded round.
    let mock = server.mock("POST", "/match").with_status(200).expect(3).create();

    let platform = seeded_platform();
    let mut checkpoint = Checkpoint::default();
    let first = run_pipeline(&platform, &mut checkpoint, &server.url());
    assert_eq!(first, RunOutcome::Finished);
    let conflicts_after_first = edges_for(&platform, "v/Area_Chairs/-/Conflict", None);
    assert_eq!(conflicts_after_first.len(), 1);
    let sac_assignments_after_first = edges_for(
        &platform,
        "v/Senior_Area_Chairs/-/Proposed_Assignment",
        Some("sac-matching"),
    );

    let second = run_pipeline(&platform, &mut checkpoint, &server.url());
    assert_eq!(second, RunOutcome::Finished);
    mock.assert();
    assert_eq!(
        edges_for(&platform, "v/Area_Chairs/-/Conflict", None).len(),
        conflicts_after_first.len(),
        "re-run duplicated conflict edges"
    );
    assert_eq!(
        edges_for(
            &platform,
            "v/Senior_Area_Chairs/-/Proposed_Assignment",
            Some("sac-matching"),
        )
        .len(),
        sac_assignments_after_first.len(),
    );
}

#[test]
fn dangling_proposed_assignment_heads_are_skipped() {
    let mut server = mockito::Server::new();
    server.mock("POST", "/match").with_status(200).expect(3).create();

    let platform = seeded_platform();
    // Solver output referencing a submission the venue no longer has.
    platform.set_solver_results(
        Role::AreaChairs,
        vec![
            ("~acA".to_string(), "p1".to_string()),
            ("~acA".to_string(), "p2".to_string()),
            ("~acA".to_string(), "zz-withdrawn".to_string()),
            ("~acB".to_string(), "q1".to_string()),
            ("~acB".to_string(), "q2".to_string()),
            ("~acB".to_string(), "q3".to_string()),
        ],
    );

    let mut checkpoint = Checkpoint::default();
    let outcome = run_pipeline(&platform, &mut checkpoint, &server.url());
    assert_eq!(outcome, RunOutcome::Finished);

    // ~acA's track comes from the plurality of known submissions only, and
    // the dangling head never reaches the republished track edges.
    let ac_track_edges = edges_for(&platform, "v/Area_Chairs/-/Research_Area", None);
    assert!(ac_track_edges
        .iter()
        .any(|e| e.tail == "~acA" && e.label.as_deref() == Some("Track1")));
    assert!(!ac_track_edges.iter().any(|e| e.head == "zz-withdrawn"));
}

#[test]
fn conflict_transfer_skips_acs_without_records() {
    let mut server = mockito::Server::new();
    server.mock("POST", "/match").with_status(200).create();

    let platform = seeded_platform();
    let mut checkpoint = Checkpoint::default();
    run_pipeline(&platform, &mut checkpoint, &server.url());

    let conflicts = edges_for(&platform, "v/Area_Chairs/-/Conflict", None);
    // ~sac1's conflicts are {p2, q3}; ~acA already records q3, so only p2
    // transfers. ~acB has no conflict records at all and is skipped.
    assert_eq!(conflicts.len(), 1);
    let edge = &conflicts[0];
    assert_eq!(edge.tail, "~acA");
    assert_eq!(edge.head, "p2");
    assert_eq!(edge.weight, -1.0);
    assert_eq!(edge.label.as_deref(), Some("Conflict"));
    assert!(!conflicts.iter().any(|e| e.tail == "~acB"));
}

#[test]
fn aggregate_scores_apply_bonus_before_truncation() {
    let mut server = mockito::Server::new();
    server.mock("POST", "/match").with_status(200).create();

    let platform = seeded_platform();
    let mut checkpoint = Checkpoint {
        top_n: 2,
        ..Checkpoint::default()
    };
    run_pipeline(&platform, &mut checkpoint, &server.url());

    let scores = edges_for(
        &platform,
        "v/Senior_Area_Chairs/-/Aggregate_Score",
        Some("sac-matching"),
    );
    let mut sac1_scores: Vec<(&str, f64)> = scores
        .iter()
        .filter(|e| e.tail == "~sac1")
        .map(|e| (e.head.as_str(), e.weight))
        .collect();
    sac1_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    // Raw affinities favor the off-track q papers (0.9, 0.8), but the +1.0
    // track bonus lands before the top-2 cut, so the on-track p papers win.
    assert_eq!(sac1_scores.len(), 2);
    assert_eq!(sac1_scores[0].0, "p1");
    assert!((sac1_scores[0].1 - 1.3).abs() < 1e-9);
    assert_eq!(sac1_scores[1].0, "p2");
    assert!((sac1_scores[1].1 - 1.2).abs() < 1e-9);
}

#[test]
fn priority_plan_branch_leaves_track_graph_empty() {
    let mut server = mockito::Server::new();
    server.mock("POST", "/match").with_status(200).create();

    let platform = seeded_platform();
    platform.set_priority_tracks(
        Role::SeniorAreaChairs,
        HashMap::from([
            ("~sac1".to_string(), "Track1".to_string()),
            ("~sac2".to_string(), "Track2".to_string()),
        ]),
    );

    let mut checkpoint = Checkpoint::default();
    checkpoint.priority_track_loads.enabled = true;
    let outcome = run_pipeline(&platform, &mut checkpoint, &server.url());

    assert_eq!(outcome, RunOutcome::Finished);
    assert_eq!(
        checkpoint.completed_title(Stage::TrackSetup).as_deref(),
        Some("priority-plan")
    );
    assert!(checkpoint.track_graph.as_ref().is_some_and(|g| g.is_empty()));
    // The planner branch never republishes SAC track edges.
    assert!(edges_for(&platform, "v/Senior_Area_Chairs/-/Research_Area", None).is_empty());
}

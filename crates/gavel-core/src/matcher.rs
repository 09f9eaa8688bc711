//! Client for the external matching solver.
//!
//! A run is submitted in two steps: the assignment configuration is posted to
//! the platform as a note, then the solver service is triggered over HTTP
//! with the note id. Progress is observed by polling the note's status field
//! until it reaches a terminal state.

use crate::config::MatchingConfig;
use crate::error::{GavelError, Result};
use crate::platform::Platform;
use crate::types::{MatchStatus, Role};
use crate::wait::Waiter;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Bounded retry with doubling delay, applied to 5xx responses only.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// MatcherClient
// ---------------------------------------------------------------------------

/// One submitted solver run: the title it was posted under and the id of the
/// configuration note tracking it.
#[derive(Debug, Clone)]
pub struct SubmittedJob {
    pub title: String,
    pub config_id: String,
}

pub struct MatcherClient<'a> {
    platform: &'a dyn Platform,
    http: reqwest::blocking::Client,
    base_url: String,
    auth_token: Option<String>,
    retry: RetryPolicy,
    waiter: Waiter,
    /// Distinguishes generated titles submitted within the same millisecond.
    submit_seq: AtomicU32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default = "default_error_name")]
    name: String,
    #[serde(default)]
    message: String,
}

fn default_error_name() -> String {
    "Error".to_string()
}

impl<'a> MatcherClient<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        base_url: impl Into<String>,
        auth_token: Option<String>,
        waiter: Waiter,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            platform,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
            retry: RetryPolicy::default(),
            waiter,
            submit_seq: AtomicU32::new(0),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Post a configuration note in `Initialized` state and trigger the
    /// solver for it. Untitled runs get a `run-<unix-millis>-<seq>` title;
    /// the sequence keeps two rounds submitted in the same millisecond from
    /// sharing a label.
    pub fn submit(
        &self,
        config: &MatchingConfig,
        role: Role,
        title: Option<&str>,
    ) -> Result<SubmittedJob> {
        let title = match title {
            Some(t) => t.to_string(),
            None => {
                let seq = self.submit_seq.fetch_add(1, Ordering::Relaxed) + 1;
                format!("run-{}-{seq}", chrono::Utc::now().timestamp_millis())
            }
        };

        let mut run = config.clone();
        run.title = title.clone();
        run.status = MatchStatus::Initialized;
        run.error_message = None;

        let config_id = self.platform.post_config(&run, role)?;
        info!(%title, %config_id, role = role.group_name(), "submitting matching run");
        self.trigger(&config_id)?;
        Ok(SubmittedJob { title, config_id })
    }

    /// POST the run to the solver service, retrying server errors.
    fn trigger(&self, config_id: &str) -> Result<()> {
        let url = format!("{}/match", self.base_url);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.http.post(&url).json(&json!({ "configNoteId": config_id }));
            if let Some(token) = &self.auth_token {
                request = request.bearer_auth(token);
            }
            let response = request.send()?;
            let status = response.status();

            if status.is_success() {
                return Ok(());
            }
            if status.is_server_error() && attempt < self.retry.max_attempts {
                let delay = self.retry.base_delay * 2u32.pow(attempt - 1);
                warn!(%status, attempt, ?delay, "solver trigger failed, retrying");
                if !self.waiter.wait(delay) {
                    return Err(GavelError::Timeout {
                        context: format!("cancelled while retrying trigger for {config_id}"),
                    });
                }
                continue;
            }
            return Err(Self::response_error(response));
        }
    }

    /// Normalize a failed response into `{name, message}` regardless of
    /// whether the service answered with JSON, text, or nothing.
    fn response_error(response: reqwest::blocking::Response) -> GavelError {
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        let text = response.text().unwrap_or_default();
        if is_json {
            if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&text) {
                return GavelError::Api {
                    name: body.name,
                    message: body.message,
                };
            }
        }
        if !text.is_empty() {
            return GavelError::Api {
                name: "Error".to_string(),
                message: text,
            };
        }
        GavelError::Api {
            name: "Error".to_string(),
            message: status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        }
    }

    /// Poll the configuration note until the run reaches a terminal state.
    ///
    /// `Complete` and `Cancelled` come back as values; `Error` and
    /// `No Solution` become solver errors carrying the run title and the
    /// note's error message. Exactly `max_polls` status reads happen before
    /// the run is declared timed out. Local cancellation reads as
    /// `Cancelled`.
    pub fn await_terminal(
        &self,
        job: &SubmittedJob,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Result<MatchStatus> {
        for poll in 0..max_polls {
            let (status, message) = self.platform.config_status(&job.config_id)?;
            debug!(title = %job.title, ?status, poll, "solver status");
            if status.is_terminal() {
                return match status {
                    MatchStatus::Error | MatchStatus::NoSolution => Err(GavelError::Solver {
                        title: job.title.clone(),
                        message,
                    }),
                    other => Ok(other),
                };
            }
            if poll + 1 < max_polls && !self.waiter.wait(poll_interval) {
                info!(title = %job.title, "wait cancelled");
                return Ok(MatchStatus::Cancelled);
            }
        }
        Err(GavelError::Timeout {
            context: format!("matching run {}", job.title),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ac_matching_config;
    use crate::platform::MemoryPlatform;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn submit_posts_config_and_triggers_solver() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/match")
            .match_body(mockito::Matcher::PartialJson(json!({
                "configNoteId": "config-1"
            })))
            .with_status(200)
            .with_body("{}")
            .create();

        let platform = MemoryPlatform::new("v");
        let client = MatcherClient::new(&platform, server.url(), None, Waiter::default()).unwrap();
        let job = client
            .submit(&ac_matching_config("v"), Role::AreaChairs, Some("round-one"))
            .unwrap();

        mock.assert();
        assert_eq!(job.title, "round-one");
        assert_eq!(job.config_id, "config-1");
        let (status, _) = platform.config_status("config-1").unwrap();
        assert_eq!(status, MatchStatus::Initialized);
    }

    #[test]
    fn generated_titles_never_collide() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/match").with_status(200).expect(2).create();

        let platform = MemoryPlatform::new("v");
        let client = MatcherClient::new(&platform, server.url(), None, Waiter::default()).unwrap();
        let first = client
            .submit(&ac_matching_config("v"), Role::AreaChairs, None)
            .unwrap();
        // Same millisecond or not, the sequence suffix keeps titles distinct.
        let second = client
            .submit(&ac_matching_config("v"), Role::AreaChairs, None)
            .unwrap();
        assert!(first.title.starts_with("run-"));
        assert_ne!(first.title, second.title);
    }

    #[test]
    fn server_errors_are_retried() {
        let mut server = mockito::Server::new();
        let failing = server.mock("POST", "/match").with_status(503).expect(2).create();
        let ok = server.mock("POST", "/match").with_status(200).create();

        let platform = MemoryPlatform::new("v");
        let client = MatcherClient::new(&platform, server.url(), None, Waiter::default())
            .unwrap()
            .with_retry_policy(fast_retry());
        client
            .submit(&ac_matching_config("v"), Role::AreaChairs, Some("t"))
            .unwrap();
        failing.assert();
        ok.assert();
    }

    #[test]
    fn client_errors_surface_the_json_body() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/match")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"BadRequest","message":"missing scores"}"#)
            .create();

        let platform = MemoryPlatform::new("v");
        let client = MatcherClient::new(&platform, server.url(), None, Waiter::default()).unwrap();
        let err = client
            .submit(&ac_matching_config("v"), Role::AreaChairs, Some("t"))
            .unwrap_err();
        match err {
            GavelError::Api { name, message } => {
                assert_eq!(name, "BadRequest");
                assert_eq!(message, "missing scores");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn await_terminal_maps_solver_failures() {
        let platform = MemoryPlatform::new("v");
        platform.seed_config("config-9", ac_matching_config("v"), Role::AreaChairs);
        platform.set_config_status("config-9", MatchStatus::NoSolution, "infeasible demand");

        let client =
            MatcherClient::new(&platform, "http://localhost:0", None, Waiter::default()).unwrap();
        let job = SubmittedJob {
            title: "t".to_string(),
            config_id: "config-9".to_string(),
        };
        let err = client
            .await_terminal(&job, Duration::from_millis(1), 3)
            .unwrap_err();
        assert!(matches!(err, GavelError::Solver { .. }));
    }

    #[test]
    fn await_terminal_times_out_after_max_polls() {
        let platform = MemoryPlatform::new("v");
        platform.seed_config("config-9", ac_matching_config("v"), Role::AreaChairs);
        platform.set_config_status("config-9", MatchStatus::Running, "");

        let client =
            MatcherClient::new(&platform, "http://localhost:0", None, Waiter::default()).unwrap();
        let job = SubmittedJob {
            title: "t".to_string(),
            config_id: "config-9".to_string(),
        };
        let err = client
            .await_terminal(&job, Duration::from_millis(1), 2)
            .unwrap_err();
        assert!(matches!(err, GavelError::Timeout { .. }));
    }

    #[test]
    fn cancellation_reads_as_cancelled() {
        let platform = MemoryPlatform::new("v");
        platform.seed_config("config-9", ac_matching_config("v"), Role::AreaChairs);
        platform.set_config_status("config-9", MatchStatus::Running, "");

        let waiter = Waiter::default();
        waiter.cancel();
        let client =
            MatcherClient::new(&platform, "http://localhost:0", None, waiter).unwrap();
        let job = SubmittedJob {
            title: "t".to_string(),
            config_id: "config-9".to_string(),
        };
        let status = client
            .await_terminal(&job, Duration::from_secs(60), 5)
            .unwrap();
        assert_eq!(status, MatchStatus::Cancelled);
    }
}

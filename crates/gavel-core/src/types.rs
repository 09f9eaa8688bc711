use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Invitation suffixes
// ---------------------------------------------------------------------------

pub const RESEARCH_AREA: &str = "Research_Area";
pub const PROPOSED_ASSIGNMENT: &str = "Proposed_Assignment";
pub const CONFLICT: &str = "Conflict";
pub const AFFINITY_SCORE: &str = "Affinity_Score";
pub const AGGREGATE_SCORE: &str = "Aggregate_Score";
pub const CUSTOM_MAX_PAPERS: &str = "Custom_Max_Papers";

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    AreaChairs,
    SeniorAreaChairs,
}

impl Role {
    pub fn group_name(self) -> &'static str {
        match self {
            Role::AreaChairs => "Area_Chairs",
            Role::SeniorAreaChairs => "Senior_Area_Chairs",
        }
    }

    pub fn group_id(self, venue_id: &str) -> String {
        format!("{venue_id}/{}", self.group_name())
    }

    /// Full invitation id, e.g. `acme.org/ARR/Area_Chairs/-/Research_Area`.
    pub fn invitation(self, venue_id: &str, suffix: &str) -> String {
        format!("{venue_id}/{}/-/{suffix}", self.group_name())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// A submission's track is assigned at submission time and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub number: u32,
    pub track: String,
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// A directed relation record in the hosting platform's edge store.
///
/// `label` acts as a round discriminator: edges from different matching runs
/// coexist under the same invitation and are queried per label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub invitation: String,
    pub head: String,
    pub tail: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub readers: Vec<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nonreaders: Vec<String>,
}

// ---------------------------------------------------------------------------
// EdgeFilter
// ---------------------------------------------------------------------------

/// Scope filter for bulk edge operations. `invitation` is always required;
/// the remaining fields narrow the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFilter {
    pub invitation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<String>,
}

impl EdgeFilter {
    pub fn invitation(invitation: impl Into<String>) -> Self {
        Self {
            invitation: invitation.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// True if `edge` falls inside this filter's scope.
    pub fn matches(&self, edge: &Edge) -> bool {
        if edge.invitation != self.invitation {
            return false;
        }
        if let Some(label) = &self.label {
            if edge.label.as_deref() != Some(label.as_str()) {
                return false;
            }
        }
        if let Some(head) = &self.head {
            if &edge.head != head {
                return false;
            }
        }
        if let Some(tail) = &self.tail {
            if &edge.tail != tail {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for EdgeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invitation={}", self.invitation)?;
        if let Some(label) = &self.label {
            write!(f, " label={label}")?;
        }
        if let Some(head) = &self.head {
            write!(f, " head={head}")?;
        }
        if let Some(tail) = &self.tail {
            write!(f, " tail={tail}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MatchStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a matching-configuration record.
///
/// Transitions: `Initialized → Running → Complete | Error | NoSolution |
/// Cancelled`. The solver owns the transition out of `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Initialized,
    Running,
    Complete,
    Error,
    #[serde(rename = "No Solution")]
    NoSolution,
    Cancelled,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::Complete
                | MatchStatus::Error
                | MatchStatus::NoSolution
                | MatchStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Initialized => "Initialized",
            MatchStatus::Running => "Running",
            MatchStatus::Complete => "Complete",
            MatchStatus::Error => "Error",
            MatchStatus::NoSolution => "No Solution",
            MatchStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

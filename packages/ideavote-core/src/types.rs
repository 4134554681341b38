use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three fixed stages that partition the idea catalog and the
/// voting budget. Serialized with the display names used by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Planning,
    Action,
    Integration,
}

impl Phase {
    /// All phases in presentation order.
    pub const ALL: [Phase; 3] = [Phase::Planning, Phase::Action, Phase::Integration];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "Planning",
            Phase::Action => "Action",
            Phase::Integration => "Integration",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Phase::Planning => 0,
            Phase::Action => 1,
            Phase::Integration => 2,
        }
    }

    pub fn next(&self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<Phase> {
        self.index().checked_sub(1).map(|i| Phase::ALL[i])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown phase: {0}")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planning" => Ok(Phase::Planning),
            "Action" => Ok(Phase::Action),
            "Integration" => Ok(Phase::Integration),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pre-authored idea card. Loaded once from the static catalog and never
/// mutated. Optional sections are omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: u32,
    pub title: String,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_it_works: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_this_works: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolsets_used: Option<Vec<String>>,
}

impl Idea {
    /// Minimal idea with no optional sections.
    pub fn new(id: u32, title: impl Into<String>, phase: Phase) -> Self {
        Self {
            id,
            title: title.into(),
            phase,
            purpose: None,
            how_it_works: None,
            output: None,
            why_this_works: None,
            journey_phase: None,
            toolsets_used: None,
        }
    }
}

/// Stars given to one idea inside a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub id: u32,
    pub title: String,
    pub phase: Phase,
    pub votes: u32,
}

/// One persisted submission. Appended to the store, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: String,
    pub timestamp: String,
    pub selections: Vec<Selection>,
}

/// Opaque concurrency token handed out by a vote store on read and required
/// on the following write (`sha` in the repository host's terms).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreToken(pub String);

impl StoreToken {
    /// Hex SHA-256 of stored bytes, used by the local back-ends.
    pub fn from_content(content: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The full persisted state as seen by one read.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub records: Vec<VoteRecord>,
    pub token: StoreToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_helpers() {
        assert_eq!(Phase::Planning.next(), Some(Phase::Action));
        assert_eq!(Phase::Integration.next(), None);
        assert_eq!(Phase::Planning.previous(), None);
        assert_eq!(Phase::Integration.previous(), Some(Phase::Action));
        assert_eq!("Action".parse::<Phase>(), Ok(Phase::Action));
        assert_eq!(
            "action".parse::<Phase>(),
            Err(UnknownPhase("action".to_string()))
        );
    }

    #[test]
    fn test_idea_optional_sections_are_omitted() {
        let idea = Idea::new(4, "Daily standup", Phase::Action);
        let json = serde_json::to_value(&idea).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 4, "title": "Daily standup", "phase": "Action" })
        );
    }

    #[test]
    fn test_idea_parses_catalog_shape() {
        let idea: Idea = serde_json::from_str(
            r#"{"id":1,"title":"Map","phase":"Planning","purpose":"Orient","toolsets_used":["miro"]}"#,
        )
        .unwrap();
        assert_eq!(idea.purpose.as_deref(), Some("Orient"));
        assert_eq!(idea.how_it_works, None);
        assert_eq!(idea.toolsets_used, Some(vec!["miro".to_string()]));
    }

    #[test]
    fn test_vote_record_wire_shape() {
        let record = VoteRecord {
            voter: "Alice".to_string(),
            timestamp: "2024-05-01T10:00:00.000Z".to_string(),
            selections: vec![Selection {
                id: 3,
                title: "Retro".to_string(),
                phase: Phase::Integration,
                votes: 2,
            }],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["selections"][0]["phase"], "Integration");
        assert_eq!(json["selections"][0]["votes"], 2);
        let back: VoteRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_token_from_content_deterministic() {
        let a = StoreToken::from_content(b"[]");
        let b = StoreToken::from_content(b"[]");
        let c = StoreToken::from_content(b"[1]");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }
}

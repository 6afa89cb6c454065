use serde::{Deserialize, Serialize};

/// A single lawmaker's decision on an agenda item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Approve,
    Abstain,
    Oppose,
    /// Not recorded, not present, or any label we do not recognise
    Absent,
}

impl VoteChoice {
    /// Scalar encoding used in the vote matrix
    pub fn score(self) -> f64 {
        match self {
            VoteChoice::Approve => 1.0,
            VoteChoice::Abstain => 0.0,
            VoteChoice::Oppose => -1.0,
            VoteChoice::Absent => -2.0,
        }
    }
}

/// One row of the roll-call table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub agenda_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agenda_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agenda_url: Option<String>,
    pub member: String,
    pub party: String,
    pub choice: VoteChoice,
}

/// A lawmaker and the party they are plotted under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub party: String,
    /// Number of recorded (non-absent) votes
    pub votes_cast: usize,
}

/// An agenda item (bill) put to a vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agenda {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Outcome counts for one agenda item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaTally {
    #[serde(flatten)]
    pub agenda: Agenda,
    pub approve: usize,
    pub oppose: usize,
    pub abstain: usize,
    pub absent: usize,
    /// Members who approved, in matrix order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub approved_by: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opposed_by: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub abstained_by: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores() {
        assert_eq!(VoteChoice::Approve.score(), 1.0);
        assert_eq!(VoteChoice::Abstain.score(), 0.0);
        assert_eq!(VoteChoice::Oppose.score(), -1.0);
        assert_eq!(VoteChoice::Absent.score(), -2.0);
    }

    #[test]
    fn test_choice_serializes_lowercase() {
        let json = serde_json::to_string(&VoteChoice::Approve).unwrap();
        assert_eq!(json, "\"approve\"");
    }
}

/// Review state definitions for analyzed leads
use std::fmt;

/// Outcome of the review pass over an analyzed lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReviewStatus {
    /// Analysis finished, review has not run yet
    #[default]
    Pending,

    /// Reviewer judged the lead worth contacting
    Approved,

    /// Reviewer judged the lead not worth contacting
    Rejected,
}

impl ReviewStatus {
    /// Returns true once a review verdict exists
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Converts the status to the string written in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a reviewer verdict, case-insensitively
    ///
    /// Accepts a few synonyms reviewers tend to use. Returns None if the
    /// string doesn't match any known status.
    pub fn from_verdict(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" | "approve" | "accept" | "accepted" => Some(Self::Approved),
            "rejected" | "reject" | "declined" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn all_states() -> [Self; 3] {
        [Self::Pending, Self::Approved, Self::Rejected]
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

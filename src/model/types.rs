use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid reaction type string: '{0}'")]
pub struct ParseReactionTypeError(String);

/// Role of a reaction record within a decoy-generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReactionType {
    /// The source reaction taken from the input dataset.
    Initial,
    /// A generated reaction that matches no known original.
    Decoy,
    /// A generated reaction whose signature matches the source reaction.
    Reconstructed,
}

impl ReactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Initial => "Initial",
            ReactionType::Decoy => "Decoy",
            ReactionType::Reconstructed => "Reconstructed",
        }
    }

    #[inline]
    pub fn is_generated(&self) -> bool {
        !matches!(self, ReactionType::Initial)
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionType {
    type Err = ParseReactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initial" => Ok(ReactionType::Initial),
            "Decoy" => Ok(ReactionType::Decoy),
            "Reconstructed" => Ok(ReactionType::Reconstructed),
            _ => Err(ParseReactionTypeError(s.to_string())),
        }
    }
}



use serde::{Deserialize, Serialize};
use std::str::FromStr;

use strum::{Display, IntoStaticStr};


/// Which evidence branches a context build runs.
///
/// Unknown mode names parse to [`RetrievalMode::Disabled`], which builds an
/// empty context instead of failing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RetrievalMode {

    Vector,

    Graph,

    #[default]
    Hybrid,

    Disabled,
}

impl RetrievalMode {

    #[must_use]
    pub fn parse(s: &str) -> Self {
        s.trim().parse().unwrap_or(Self::Disabled)
    }


    #[must_use]
    pub fn uses_graph(&self) -> bool {
        matches!(self, Self::Graph | Self::Hybrid)
    }


    #[must_use]
    pub fn uses_vector(&self) -> bool {
        matches!(self, Self::Vector | Self::Hybrid)
    }


    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Vector => "Similarity-ranked text chunks only",
            Self::Graph => "Entity relationship paths only",
            Self::Hybrid => "Relationship paths followed by similarity-ranked chunks",
            Self::Disabled => "No retrieval; empty context",
        }
    }
}

impl FromStr for RetrievalMode {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Vector, Self::Graph, Self::Hybrid, Self::Disabled]
            .into_iter()
            .find(|mode| <&'static str>::from(*mode).eq_ignore_ascii_case(s))
            .ok_or(strum::ParseError::VariantNotFound)
    }
}

impl From<&str> for RetrievalMode {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for RetrievalMode {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!(RetrievalMode::parse("vector"), RetrievalMode::Vector);
        assert_eq!(RetrievalMode::parse("GRAPH"), RetrievalMode::Graph);
        assert_eq!(RetrievalMode::parse(" Hybrid "), RetrievalMode::Hybrid);
        assert_eq!(RetrievalMode::parse("local"), RetrievalMode::Disabled);
        assert_eq!(RetrievalMode::from(""), RetrievalMode::Disabled);
    }

    #[test]
    fn test_mode_branches() {
        assert!(RetrievalMode::Hybrid.uses_graph() && RetrievalMode::Hybrid.uses_vector());
        assert!(RetrievalMode::Graph.uses_graph() && !RetrievalMode::Graph.uses_vector());
        assert!(!RetrievalMode::Vector.uses_graph() && RetrievalMode::Vector.uses_vector());
        assert!(!RetrievalMode::Disabled.uses_graph() && !RetrievalMode::Disabled.uses_vector());
        assert!(RetrievalMode::Disabled.description().contains("empty context"));
    }

    #[test]
    fn test_mode_display_round_trips_names() {
        assert_eq!(RetrievalMode::Hybrid.to_string(), "hybrid");
        let name: &'static str = RetrievalMode::Vector.into();
        assert_eq!(name, "vector");
    }
}

//! Stance-label scoring for synthesized answers.
//!
//! A stance row lists papers under `Support`, `Against` and `Neutral` as
//! comma-separated identifiers. Predictions are scored against ground truth
//! over the full paper vocabulary of a question.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanceLabels {
    pub support: BTreeSet<String>,
    pub against: BTreeSet<String>,
    pub neutral: BTreeSet<String>,
}

impl StanceLabels {

    /// Absent columns are empty sets; blank entries are dropped.
    pub fn parse(support: Option<&str>, against: Option<&str>, neutral: Option<&str>) -> Self {
        Self {
            support: parse_list(support),
            against: parse_list(against),
            neutral: parse_list(neutral),
        }
    }

    /// Recomputes `neutral` as every vocabulary paper not labelled support or against.
    #[must_use]
    pub fn complete_neutral(mut self, vocab: &BTreeSet<String>) -> Self {
        let labelled: BTreeSet<&String> = self.support.iter().chain(self.against.iter()).collect();
        self.neutral = vocab.iter().filter(|p| !labelled.contains(p)).cloned().collect();
        self
    }


    pub fn labelled(&self) -> usize {
        self.support.len() + self.against.len() + self.neutral.len()
    }

    /// Sorted `", "`-joined lists in support, against, neutral order.
    pub fn render(&self) -> (String, String, String) {
        (join(&self.support), join(&self.against), join(&self.neutral))
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StanceAccuracy {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}


/// Papers whose predicted stance matches ground truth, over the vocabulary size.
pub fn stance_accuracy(predicted: &StanceLabels, truth: &StanceLabels, vocab: &BTreeSet<String>) -> StanceAccuracy {
    let correct: BTreeSet<&String> = predicted
        .support
        .intersection(&truth.support)
        .chain(predicted.against.intersection(&truth.against))
        .chain(predicted.neutral.intersection(&truth.neutral))
        .collect();

    let total = vocab.len();
    let accuracy = if total > 0 {
        correct.len() as f64 / total as f64
    } else {
        0.0
    };

    StanceAccuracy {
        correct: correct.len(),
        total,
        accuracy,
    }
}


fn parse_list(field: Option<&str>) -> BTreeSet<String> {
    field
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(papers: &[&str]) -> BTreeSet<String> {
        papers.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_parse_handles_absent_and_blank() {
        let labels = StanceLabels::parse(Some("ROSE, ACURASYS,  "), None, Some(""));
        assert_eq!(labels.support, vocab(&["ACURASYS", "ROSE"]));
        assert!(labels.against.is_empty());
        assert!(labels.neutral.is_empty());
        assert_eq!(labels.labelled(), 2);
    }

    #[test]
    fn test_complete_neutral() {
        let all = vocab(&["ACURASYS", "MENDS", "ROSE", "SPICE"]);
        let labels = StanceLabels::parse(Some("ROSE"), Some("SPICE, "), Some("stale")).complete_neutral(&all);

        assert_eq!(labels.neutral, vocab(&["ACURASYS", "MENDS"]));
        assert_eq!(
            labels.render(),
            ("ROSE".to_string(), "SPICE".to_string(), "ACURASYS, MENDS".to_string())
        );
    }

    #[test]
    fn test_accuracy_over_vocabulary() {
        let all = vocab(&["ACURASYS", "MENDS", "ROSE", "SPICE"]);
        let predicted = StanceLabels::parse(Some("ROSE, MENDS"), Some("SPICE"), Some("ACURASYS"));
        let truth = StanceLabels::parse(Some("ROSE"), Some("SPICE, MENDS"), None);

        let score = stance_accuracy(&predicted, &truth, &all);
        assert_eq!(score.correct, 2);
        assert_eq!(score.total, 4);
        assert!((score.accuracy - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_vocabulary_scores_zero() {
        let labels = StanceLabels::parse(Some("ROSE"), None, None);
        let score = stance_accuracy(&labels, &labels, &BTreeSet::new());
        assert_eq!(score.correct, 1);
        assert_eq!(score.accuracy, 0.0);
    }
}

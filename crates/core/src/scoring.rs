//! Rule-based diagnosis scoring.
//!
//! A disease scores one point for every symptom whose reported answer equals the answer its rule
//! expects. Symptoms the patient has not been asked about never score, whatever the rule says.
//!
//! The best match is the highest score. Rules are scanned in ascending disease-name order and the
//! first maximum wins, so ties always resolve to the alphabetically first disease. The result is a
//! single best guess, not a ranking.

use crate::knowledge::KnowledgeBase;
use crate::model::{DiseaseRule, SymptomReport};
use medex_types::DiseaseName;

/// A disease together with the number of matching symptoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMatch {
    pub disease: DiseaseName,
    pub score: usize,
}

/// Number of symptoms where `report` agrees with `rule`.
pub fn score(rule: &DiseaseRule, report: &SymptomReport) -> usize {
    rule.iter()
        .filter(|(key, expected)| report.get(key) == Some(*expected))
        .count()
}

/// The best scoring disease, or `None` when nothing scores above zero.
pub fn best_match(base: &KnowledgeBase, report: &SymptomReport) -> Option<ScoredMatch> {
    let mut best: Option<ScoredMatch> = None;

    for (disease, rule) in base.rules() {
        let score = score(rule, report);
        let improves = match &best {
            Some(current) => score > current.score,
            None => score > 0,
        };
        if improves {
            best = Some(ScoredMatch {
                disease: disease.clone(),
                score,
            });
        }
    }

    tracing::debug!(
        reported = report.len(),
        best = ?best.as_ref().map(|m| (m.disease.as_str(), m.score)),
        "scored report"
    );
    best
}

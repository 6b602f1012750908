//! Next-question recommendation.
//!
//! Unasked symptoms are ranked by how many disease rules mention them, most shared first. Any
//! symptom present in the report counts as asked, whatever the answer was.

use crate::knowledge::KnowledgeBase;
use crate::model::SymptomReport;
use medex_types::SymptomKey;
use std::cmp::Reverse;

/// Unasked catalog symptoms, most frequently used by rules first.
///
/// Ties keep ascending key order.
pub fn rank_unasked(base: &KnowledgeBase, report: &SymptomReport) -> Vec<SymptomKey> {
    let mut ranked: Vec<(SymptomKey, usize)> = base
        .symptom_catalog()
        .into_iter()
        .filter(|key| !report.contains(key))
        .map(|key| {
            let frequency = base.rules().filter(|(_, rule)| rule.contains(&key)).count();
            (key, frequency)
        })
        .collect();

    ranked.sort_by_key(|(_, frequency)| Reverse(*frequency));
    ranked.into_iter().map(|(key, _)| key).collect()
}

/// Question texts for the ranked unasked symptoms. Empty once everything has been asked.
pub fn suggest_questions(base: &KnowledgeBase, report: &SymptomReport) -> Vec<String> {
    rank_unasked(base, report)
        .iter()
        .map(|key| base.question_for(key))
        .collect()
}

//! crates/study_assistant_core/src/metrics.rs
//!
//! Derives the ten-dimension performance profile from the mistake ledger and the
//! quiz history. The derivation is a pure function of its inputs: nothing is
//! cached and nothing random is involved.

use crate::domain::{Difficulty, Metric, MetricCategory, MistakeCategory, MistakeItem, QuizResult};
use serde::Serialize;

const MIN_SCORE: u8 = 1;
const MAX_SCORE: u8 = 5;

const CORE_REQUIRED: u8 = 4;
const OTHER_REQUIRED: u8 = 3;

const HARD_PASS_ACCURACY: f64 = 0.6;
const RECENT_WINDOW: usize = 3;
const MISTAKE_PATTERN_THRESHOLD: usize = 2;
const REFLECTIVE_NOTE_CHARS: usize = 10;

/// Indexes into the fixed dimension table below.
const RECALL: usize = 0;
const CONCEPT: usize = 1;
const PROCEDURAL: usize = 2;
const APPLICATION: usize = 3;
const CRITICAL: usize = 5;
const SPEED: usize = 7;
const ERROR_CORRECTION: usize = 8;

/// (label, baseline score, category)
const DIMENSIONS: [(&str, u8, MetricCategory); 10] = [
    ("Direct Recall", 3, MetricCategory::Core),
    ("Conceptual Understanding", 3, MetricCategory::Core),
    ("Procedural Mastery", 3, MetricCategory::Core),
    ("Application", 2, MetricCategory::Advanced),
    ("Creative Problem Solving", 3, MetricCategory::Advanced),
    ("Critical Thinking", 2, MetricCategory::Advanced),
    ("Synthesis", 2, MetricCategory::Advanced),
    ("Time Efficiency", 4, MetricCategory::Performance),
    ("Error Correction", 3, MetricCategory::Performance),
    ("Knowledge Depth", 4, MetricCategory::Performance),
];

/// The derived profile plus its summary figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub metrics: Vec<Metric>,
    pub overall_score: f64,
}

impl MetricsReport {
    /// Dimensions scoring below their required threshold.
    pub fn blind_spots(&self) -> Vec<&Metric> {
        self.metrics.iter().filter(|m| m.is_blind_spot()).collect()
    }

    /// The overall score as shown to the learner, to one decimal.
    pub fn overall_display(&self) -> String {
        format!("{:.1}", self.overall_score)
    }
}

/// Computes the performance profile.
pub fn derive_metrics(mistakes: &[MistakeItem], quiz_history: &[QuizResult]) -> MetricsReport {
    let mut scores: [u8; 10] = DIMENSIONS.map(|(_, baseline, _)| baseline);

    if let Some(accuracy) = aggregate_accuracy(quiz_history) {
        let bucket = accuracy_bucket(accuracy);
        scores[RECALL] = bucket;
        scores[PROCEDURAL] = bucket;

        let hard_passes = quiz_history
            .iter()
            .filter(|r| r.difficulty == Difficulty::Hard)
            .filter(|r| r.accuracy().is_some_and(|a| a > HARD_PASS_ACCURACY))
            .count();
        for _ in 0..hard_passes {
            raise(&mut scores[APPLICATION], 2);
            raise(&mut scores[CRITICAL], 1);
        }

        let recent_start = quiz_history.len().saturating_sub(RECENT_WINDOW);
        if let Some(recent) = aggregate_accuracy(&quiz_history[recent_start..]) {
            if recent > accuracy {
                raise(&mut scores[SPEED], 1);
            }
        }
    }

    let concept_errors = count_category(mistakes, MistakeCategory::ConceptError);
    if concept_errors > MISTAKE_PATTERN_THRESHOLD {
        lower(&mut scores[CONCEPT], 1);
    } else if concept_errors == 0 && !quiz_history.is_empty() {
        raise(&mut scores[CONCEPT], 1);
    }

    if count_category(mistakes, MistakeCategory::Calculation) > MISTAKE_PATTERN_THRESHOLD {
        lower(&mut scores[PROCEDURAL], 1);
    }

    let reflective_notes = mistakes
        .iter()
        .filter(|m| m.note.chars().count() > REFLECTIVE_NOTE_CHARS)
        .count();
    if reflective_notes > MISTAKE_PATTERN_THRESHOLD {
        raise(&mut scores[ERROR_CORRECTION], 1);
    }

    let metrics: Vec<Metric> = DIMENSIONS
        .iter()
        .zip(scores)
        .map(|(&(label, _, category), score)| Metric {
            label,
            score,
            required: required_for(category),
            category,
        })
        .collect();

    let overall_score =
        metrics.iter().map(|m| f64::from(m.score)).sum::<f64>() / metrics.len() as f64;

    MetricsReport {
        metrics,
        overall_score,
    }
}

/// Σscore / Σtotal over results, ignoring empty sections.
fn aggregate_accuracy(results: &[QuizResult]) -> Option<f64> {
    let (correct, total) = results
        .iter()
        .fold((0u64, 0u64), |(c, t), r| {
            (c + u64::from(r.score), t + u64::from(r.total_questions))
        });
    if total == 0 {
        None
    } else {
        Some(correct as f64 / total as f64)
    }
}

fn accuracy_bucket(accuracy: f64) -> u8 {
    if accuracy > 0.9 {
        5
    } else if accuracy > 0.75 {
        4
    } else if accuracy > 0.5 {
        3
    } else {
        2
    }
}

fn required_for(category: MetricCategory) -> u8 {
    match category {
        MetricCategory::Core => CORE_REQUIRED,
        MetricCategory::Advanced | MetricCategory::Performance => OTHER_REQUIRED,
    }
}

fn count_category(mistakes: &[MistakeItem], category: MistakeCategory) -> usize {
    mistakes.iter().filter(|m| m.category == category).count()
}

fn raise(score: &mut u8, by: u8) {
    *score = score.saturating_add(by).min(MAX_SCORE);
}

fn lower(score: &mut u8, by: u8) {
    *score = score.saturating_sub(by).max(MIN_SCORE);
}

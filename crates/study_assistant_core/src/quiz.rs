//! crates/study_assistant_core/src/quiz.rs
//!
//! The quiz engine. A learner configures a quiz, the engine requests it from the
//! AI, then walks the learner through one section at a time, grading every
//! answer and capturing a mistake note for each wrong one.
//!
//! Phases: `setup -> generating -> active -> (reviewing_mistake)* -> completed -> setup`.

use crate::domain::{
    AnswerQuestion, ChooseQuestion, Difficulty, FillBlankQuestion, MatchQuestion,
    MistakeCategory, MistakeItem, QuestionType, QuizData, QuizResult,
};
use crate::error::{StudyError, StudyResult};
use crate::ports::PortResult;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_QUESTION_COUNT: u32 = 50;
const DEFAULT_QUESTION_COUNT: u32 = 5;

//=========================================================================================
// Grading Rules
//=========================================================================================

/// Multiple choice: exact, case-sensitive equality with the correct option.
pub fn grade_choose(question: &ChooseQuestion, selected: &str) -> bool {
    selected == question.correct_answer
}

/// Fill in the blank: equality after trimming and ignoring case.
pub fn grade_fill_blank(question: &FillBlankQuestion, input: &str) -> bool {
    input.trim().to_lowercase() == question.correct_answer.trim().to_lowercase()
}

/// Matching: correct only if every pair was matched to its expected right-hand side.
pub fn grade_match(question: &MatchQuestion, selections: &BTreeMap<String, String>) -> bool {
    question
        .pairs
        .iter()
        .all(|pair| selections.get(&pair.left) == Some(&pair.right))
}

/// Short answer: free text is not graded automatically. The sample answer is only
/// shown for self-assessment, so every submission counts as correct.
pub fn grade_answer(_question: &AnswerQuestion, _input: &str) -> bool {
    true
}

//=========================================================================================
// Engine State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    Setup,
    Generating,
    Active,
    ReviewingMistake,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
    pub question_count: u32,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            difficulty: Difficulty::Medium,
            question_count: DEFAULT_QUESTION_COUNT,
        }
    }
}

/// The learner's in-progress answer for the current question.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDraft {
    pub selected_option: Option<String>,
    pub text: String,
    pub matches: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub correct: bool,
    pub user_answer: String,
    pub correct_answer: String,
}

/// A wrong answer waiting for the learner to categorize it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMistake {
    pub question_id: String,
    pub question_text: String,
    pub user_answer: String,
    pub correct_answer: String,
}

/// What the AI service must be asked for to produce the quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizRequest {
    pub ticket: QuizTicket,
    pub text: String,
    pub difficulty: Difficulty,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizTicket(u64);

enum QuestionRef<'a> {
    Choose(&'a ChooseQuestion),
    FillBlank(&'a FillBlankQuestion),
    Match(&'a MatchQuestion),
    Answer(&'a AnswerQuestion),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEngine {
    settings: QuizSettings,
    phase: QuizPhase,
    quiz: Option<QuizData>,
    active_type: QuestionType,
    current_index: usize,
    draft: AnswerDraft,
    verdict: Option<Verdict>,
    pending_mistake: Option<PendingMistake>,
    pass_score: u32,
    last_result: Option<QuizResult>,
    last_error: Option<String>,
    #[serde(skip)]
    generation: u64,
}

impl QuizEngine {
    pub fn new() -> Self {
        Self {
            settings: QuizSettings::default(),
            phase: QuizPhase::Setup,
            quiz: None,
            active_type: QuestionType::Choose,
            current_index: 0,
            draft: AnswerDraft::default(),
            verdict: None,
            pending_mistake: None,
            pass_score: 0,
            last_result: None,
            last_error: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn quiz(&self) -> Option<&QuizData> {
        self.quiz.as_ref()
    }

    pub fn active_type(&self) -> QuestionType {
        self.active_type
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn draft(&self) -> &AnswerDraft {
        &self.draft
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn pending_mistake(&self) -> Option<&PendingMistake> {
        self.pending_mistake.as_ref()
    }

    pub fn pass_score(&self) -> u32 {
        self.pass_score
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // --- Setup ---

    pub fn set_topics(&mut self, topics: Vec<String>) -> StudyResult<()> {
        self.require(&[QuizPhase::Setup])?;
        self.settings.topics = Vec::new();
        for topic in topics {
            self.push_topic(topic);
        }
        Ok(())
    }

    pub fn add_topic(&mut self, topic: impl Into<String>) -> StudyResult<()> {
        self.require(&[QuizPhase::Setup])?;
        self.push_topic(topic.into());
        Ok(())
    }

    pub fn remove_topic(&mut self, topic: &str) -> StudyResult<()> {
        self.require(&[QuizPhase::Setup])?;
        self.settings.topics.retain(|t| t != topic);
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> StudyResult<()> {
        self.require(&[QuizPhase::Setup])?;
        self.settings.difficulty = difficulty;
        Ok(())
    }

    pub fn set_question_count(&mut self, count: u32) -> StudyResult<()> {
        self.require(&[QuizPhase::Setup])?;
        if count == 0 || count > MAX_QUESTION_COUNT {
            return Err(StudyError::Validation(format!(
                "question count must be between 1 and {}",
                MAX_QUESTION_COUNT
            )));
        }
        self.settings.question_count = count;
        Ok(())
    }

    /// Applies any subset of the settings together: if one is rejected, none change.
    pub fn configure(
        &mut self,
        topics: Option<Vec<String>>,
        difficulty: Option<Difficulty>,
        count: Option<u32>,
    ) -> StudyResult<()> {
        let saved = self.settings.clone();
        let applied = self.apply_settings(topics, difficulty, count);
        if applied.is_err() {
            self.settings = saved;
        }
        applied
    }

    fn apply_settings(
        &mut self,
        topics: Option<Vec<String>>,
        difficulty: Option<Difficulty>,
        count: Option<u32>,
    ) -> StudyResult<()> {
        if let Some(topics) = topics {
            self.set_topics(topics)?;
        }
        if let Some(difficulty) = difficulty {
            self.set_difficulty(difficulty)?;
        }
        if let Some(count) = count {
            self.set_question_count(count)?;
        }
        Ok(())
    }

    fn push_topic(&mut self, topic: String) {
        let topic = topic.trim().to_string();
        if !topic.is_empty() && !self.settings.topics.contains(&topic) {
            self.settings.topics.push(topic);
        }
    }

    // --- Generation ---

    /// Moves to `generating` and describes the request to send. Selected topics
    /// lead the text; with none, the ambient context alone is used.
    pub fn begin_generation(&mut self, ambient_context: &str) -> StudyResult<QuizRequest> {
        self.require(&[QuizPhase::Setup])?;

        let ambient = ambient_context.trim();
        let text = if self.settings.topics.is_empty() {
            ambient.to_string()
        } else {
            let topics = format!("TOPICS: {}", self.settings.topics.join(", "));
            if ambient.is_empty() {
                topics
            } else {
                format!("{}\n\n{}", topics, ambient)
            }
        };
        if text.is_empty() {
            let message = "There is no material to build a quiz from. Add a source, a topic or a question first.";
            self.last_error = Some(message.to_string());
            return Err(StudyError::Validation(message.to_string()));
        }

        self.generation += 1;
        self.phase = QuizPhase::Generating;
        self.last_error = None;
        Ok(QuizRequest {
            ticket: QuizTicket(self.generation),
            text,
            difficulty: self.settings.difficulty,
            count: self.settings.question_count,
        })
    }

    /// Applies the generation result. `Ok(false)` means the ticket was stale and
    /// nothing changed. Failures return the engine to `setup` with `last_error` set.
    pub fn finish_generation(
        &mut self,
        ticket: QuizTicket,
        result: PortResult<QuizData>,
    ) -> StudyResult<bool> {
        if ticket.0 != self.generation || self.phase != QuizPhase::Generating {
            return Ok(false);
        }

        let failure = match result {
            Ok(quiz) => match quiz.first_section() {
                Some(first) => {
                    info!(
                        "Quiz '{}' ready with {} questions",
                        quiz.topic,
                        quiz.total_questions()
                    );
                    self.quiz = Some(quiz);
                    self.phase = QuizPhase::Active;
                    self.last_result = None;
                    self.start_section(first);
                    return Ok(true);
                }
                None => "The generated quiz contained no questions.".to_string(),
            },
            Err(e) => {
                warn!("Quiz generation failed: {}", e);
                "Failed to generate the quiz. Please try again.".to_string()
            }
        };

        self.phase = QuizPhase::Setup;
        self.last_error = Some(failure.clone());
        Err(StudyError::Generation(failure))
    }

    // --- Answering ---

    /// Switches section. The index, the draft and the pass score start over.
    pub fn select_type(&mut self, kind: QuestionType) -> StudyResult<()> {
        self.require(&[QuizPhase::Active, QuizPhase::Completed])?;
        self.phase = QuizPhase::Active;
        self.start_section(kind);
        Ok(())
    }

    pub fn choose_option(&mut self, option: impl Into<String>) -> StudyResult<()> {
        self.require_drafting()?;
        self.draft.selected_option = Some(option.into());
        Ok(())
    }

    pub fn fill_blank(&mut self, text: impl Into<String>) -> StudyResult<()> {
        self.require_drafting()?;
        self.draft.text = text.into();
        Ok(())
    }

    pub fn write_answer(&mut self, text: impl Into<String>) -> StudyResult<()> {
        self.fill_blank(text)
    }

    pub fn select_match(
        &mut self,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> StudyResult<()> {
        self.require_drafting()?;
        self.draft.matches.insert(left.into(), right.into());
        Ok(())
    }

    /// Grades the current draft. Submitting an already graded question returns the
    /// same verdict and does not count it twice.
    pub fn submit(&mut self) -> StudyResult<Verdict> {
        if let Some(verdict) = &self.verdict {
            return Ok(verdict.clone());
        }
        self.require(&[QuizPhase::Active])?;

        let question = self.current_question().ok_or_else(|| {
            StudyError::InvalidState("the current section has no questions".to_string())
        })?;

        let (question_id, question_text, verdict) = match question {
            QuestionRef::Choose(q) => {
                let selected = self.draft.selected_option.clone().ok_or_else(|| {
                    StudyError::Validation("select an option first".to_string())
                })?;
                let verdict = Verdict {
                    correct: grade_choose(q, &selected),
                    user_answer: selected,
                    correct_answer: q.correct_answer.clone(),
                };
                (q.id.clone(), q.question.clone(), verdict)
            }
            QuestionRef::FillBlank(q) => {
                let verdict = Verdict {
                    correct: grade_fill_blank(q, &self.draft.text),
                    user_answer: self.draft.text.trim().to_string(),
                    correct_answer: q.correct_answer.clone(),
                };
                (q.id.clone(), q.question.clone(), verdict)
            }
            QuestionRef::Match(q) => {
                let verdict = Verdict {
                    correct: grade_match(q, &self.draft.matches),
                    user_answer: describe_matches(q, |left| {
                        self.draft.matches.get(left).map(String::as_str)
                    }),
                    correct_answer: describe_matches(q, |left| {
                        q.pairs
                            .iter()
                            .find(|p| p.left == left)
                            .map(|p| p.right.as_str())
                    }),
                };
                (q.id.clone(), q.question.clone(), verdict)
            }
            QuestionRef::Answer(q) => {
                let verdict = Verdict {
                    correct: grade_answer(q, &self.draft.text),
                    user_answer: self.draft.text.trim().to_string(),
                    correct_answer: q.sample_answer.clone(),
                };
                (q.id.clone(), q.question.clone(), verdict)
            }
        };

        if verdict.correct {
            self.pass_score += 1;
        } else {
            self.pending_mistake = Some(PendingMistake {
                question_id,
                question_text,
                user_answer: verdict.user_answer.clone(),
                correct_answer: verdict.correct_answer.clone(),
            });
            self.phase = QuizPhase::ReviewingMistake;
        }
        self.verdict = Some(verdict.clone());
        Ok(verdict)
    }

    /// Turns the pending wrong answer into a ledger entry and resumes the quiz.
    pub fn save_mistake(
        &mut self,
        category: MistakeCategory,
        note: impl Into<String>,
    ) -> StudyResult<MistakeItem> {
        self.require(&[QuizPhase::ReviewingMistake])?;
        let pending = self.pending_mistake.take().ok_or_else(|| {
            StudyError::InvalidState("no mistake is waiting to be recorded".to_string())
        })?;

        self.phase = QuizPhase::Active;
        Ok(MistakeItem {
            id: Uuid::new_v4(),
            question_id: pending.question_id,
            question_text: pending.question_text,
            user_answer: pending.user_answer,
            correct_answer: pending.correct_answer,
            category,
            note: note.into().trim().to_string(),
            topic: self.topic(),
            timestamp: Utc::now(),
        })
    }

    /// Moves to the next question. Past the last one the section's result is
    /// returned and the engine is `completed`.
    pub fn advance(&mut self) -> StudyResult<Option<QuizResult>> {
        self.require(&[QuizPhase::Active])?;
        if self.verdict.is_none() {
            return Err(StudyError::InvalidState(
                "answer the current question before moving on".to_string(),
            ));
        }

        let section_len = self.section_len();
        if self.current_index + 1 < section_len {
            self.current_index += 1;
            self.reset_question();
            return Ok(None);
        }

        let result = QuizResult {
            id: Uuid::new_v4(),
            topic: self.topic(),
            difficulty: self.settings.difficulty,
            score: self.pass_score,
            total_questions: u32::try_from(section_len).unwrap_or(u32::MAX),
            timestamp: Utc::now(),
        };
        info!(
            "Quiz section {:?} completed: {}/{}",
            self.active_type, result.score, result.total_questions
        );
        self.phase = QuizPhase::Completed;
        self.last_result = Some(result.clone());
        Ok(Some(result))
    }

    /// Leaves the quiz and goes back to configuration, keeping the settings.
    /// A generation still in flight becomes stale.
    pub fn return_to_setup(&mut self) {
        self.generation += 1;
        self.phase = QuizPhase::Setup;
        self.quiz = None;
        self.current_index = 0;
        self.pass_score = 0;
        self.reset_question();
    }

    // --- Helpers ---

    fn require(&self, allowed: &[QuizPhase]) -> StudyResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(StudyError::InvalidState(format!(
                "not allowed while the quiz is {:?}",
                self.phase
            )))
        }
    }

    fn require_drafting(&self) -> StudyResult<()> {
        self.require(&[QuizPhase::Active])?;
        if self.verdict.is_some() {
            return Err(StudyError::InvalidState(
                "this question has already been graded".to_string(),
            ));
        }
        Ok(())
    }

    fn start_section(&mut self, kind: QuestionType) {
        self.active_type = kind;
        self.current_index = 0;
        self.pass_score = 0;
        self.reset_question();
    }

    fn reset_question(&mut self) {
        self.draft = AnswerDraft::default();
        self.verdict = None;
        self.pending_mistake = None;
    }

    fn section_len(&self) -> usize {
        self.quiz
            .as_ref()
            .map(|q| q.section_len(self.active_type))
            .unwrap_or(0)
    }

    fn topic(&self) -> String {
        self.quiz
            .as_ref()
            .map(|q| q.topic.clone())
            .unwrap_or_default()
    }

    fn current_question(&self) -> Option<QuestionRef<'_>> {
        let quiz = self.quiz.as_ref()?;
        let i = self.current_index;
        match self.active_type {
            QuestionType::Choose => quiz.choose.get(i).map(QuestionRef::Choose),
            QuestionType::FillBlank => quiz.fill_blank.get(i).map(QuestionRef::FillBlank),
            QuestionType::Match => quiz.matching.get(i).map(QuestionRef::Match),
            QuestionType::Answer => quiz.answer.get(i).map(QuestionRef::Answer),
        }
    }
}

impl Default for QuizEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// "left → right" for every pair in question order, `?` where nothing was chosen.
fn describe_matches<'a>(
    question: &'a MatchQuestion,
    right_of: impl Fn(&str) -> Option<&'a str>,
) -> String {
    question
        .pairs
        .iter()
        .map(|p| format!("{} → {}", p.left, right_of(&p.left).unwrap_or("?")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchPair;
    use crate::ports::PortError;

    fn sample_quiz() -> QuizData {
        QuizData {
            topic: "Geography".to_string(),
            choose: vec![
                ChooseQuestion {
                    id: "c1".to_string(),
                    question: "Capital of France?".to_string(),
                    options: vec!["Paris".into(), "Lyon".into()],
                    correct_answer: "Paris".to_string(),
                    explanation: None,
                },
                ChooseQuestion {
                    id: "c2".to_string(),
                    question: "Capital of Italy?".to_string(),
                    options: vec!["Rome".into(), "Milan".into()],
                    correct_answer: "Rome".to_string(),
                    explanation: None,
                },
            ],
            fill_blank: vec![FillBlankQuestion {
                id: "f1".to_string(),
                question: "The capital of France is ___.".to_string(),
                correct_answer: "Paris".to_string(),
            }],
            matching: vec![MatchQuestion {
                id: "m1".to_string(),
                question: "Match the letters".to_string(),
                pairs: vec![
                    MatchPair {
                        left: "A".into(),
                        right: "1".into(),
                    },
                    MatchPair {
                        left: "B".into(),
                        right: "2".into(),
                    },
                ],
            }],
            answer: vec![AnswerQuestion {
                id: "a1".to_string(),
                question: "Why are capitals often on rivers?".to_string(),
                sample_answer: "Trade and water supply.".to_string(),
            }],
        }
    }

    fn active_engine() -> QuizEngine {
        let mut engine = QuizEngine::new();
        let request = engine.begin_generation("European capitals").unwrap();
        assert!(engine
            .finish_generation(request.ticket, Ok(sample_quiz()))
            .unwrap());
        engine
    }

    #[test]
    fn a_rejected_setting_leaves_the_others_untouched() {
        let mut engine = QuizEngine::new();
        engine.configure(Some(vec!["Rivers".into()]), None, Some(5)).unwrap();

        let err = engine
            .configure(Some(vec!["Mountains".into()]), Some(Difficulty::Hard), Some(0))
            .unwrap_err();
        assert!(matches!(err, StudyError::Validation(_)));
        assert_eq!(engine.settings().topics, vec!["Rivers".to_string()]);
        assert_eq!(engine.settings().difficulty, QuizSettings::default().difficulty);
        assert_eq!(engine.settings().question_count, 5);
    }

    #[test]
    fn choose_grading_is_exact() {
        let q = &sample_quiz().choose[0];
        assert!(grade_choose(q, "Paris"));
        assert!(!grade_choose(q, "paris"));
        assert!(!grade_choose(q, " Paris"));
    }

    #[test]
    fn fill_blank_grading_ignores_case_and_surrounding_space() {
        let q = &sample_quiz().fill_blank[0];
        assert!(grade_fill_blank(q, " paris "));
        assert!(!grade_fill_blank(q, "par is"));
    }

    #[test]
    fn match_grading_awards_no_partial_credit() {
        let q = &sample_quiz().matching[0];
        let mut selections = BTreeMap::new();
        selections.insert("A".to_string(), "1".to_string());
        selections.insert("B".to_string(), "3".to_string());
        assert!(!grade_match(q, &selections));

        selections.insert("B".to_string(), "2".to_string());
        assert!(grade_match(q, &selections));
    }

    #[test]
    fn short_answers_are_always_correct() {
        let q = &sample_quiz().answer[0];
        assert!(grade_answer(q, ""));
        assert!(grade_answer(q, "no idea"));
    }

    #[test]
    fn empty_context_is_rejected_before_generation() {
        let mut engine = QuizEngine::new();
        assert!(matches!(
            engine.begin_generation("   "),
            Err(StudyError::Validation(_))
        ));
        assert_eq!(engine.phase(), QuizPhase::Setup);
        assert!(engine.last_error().is_some());
    }

    #[test]
    fn topics_lead_the_request_and_ambient_context_is_the_fallback() {
        let mut engine = QuizEngine::new();
        engine.add_topic("Rivers").unwrap();
        engine.add_topic("Rivers").unwrap();
        engine.set_difficulty(Difficulty::Hard).unwrap();
        let request = engine.begin_generation("").unwrap();
        assert_eq!(request.text, "TOPICS: Rivers");
        assert_eq!(request.difficulty, Difficulty::Hard);

        let mut plain = QuizEngine::new();
        let request = plain.begin_generation("Chapter 3 notes").unwrap();
        assert_eq!(request.text, "Chapter 3 notes");
    }

    #[test]
    fn failed_generation_returns_to_setup() {
        let mut engine = QuizEngine::new();
        let request = engine.begin_generation("notes").unwrap();
        let outcome =
            engine.finish_generation(request.ticket, Err(PortError::Unexpected("boom".into())));
        assert!(matches!(outcome, Err(StudyError::Generation(_))));
        assert_eq!(engine.phase(), QuizPhase::Setup);
        assert!(engine.quiz().is_none());
    }

    #[test]
    fn stale_generation_results_are_ignored() {
        let mut engine = QuizEngine::new();
        let request = engine.begin_generation("notes").unwrap();
        engine.return_to_setup();
        assert!(!engine
            .finish_generation(request.ticket, Ok(sample_quiz()))
            .unwrap());
        assert_eq!(engine.phase(), QuizPhase::Setup);
    }

    #[test]
    fn a_full_section_pass_produces_a_result() {
        let mut engine = active_engine();
        assert_eq!(engine.active_type(), QuestionType::Choose);

        engine.choose_option("Paris").unwrap();
        assert!(engine.submit().unwrap().correct);
        assert_eq!(engine.advance().unwrap(), None);
        assert_eq!(engine.current_index(), 1);

        engine.choose_option("Milan").unwrap();
        let verdict = engine.submit().unwrap();
        assert!(!verdict.correct);
        assert_eq!(engine.phase(), QuizPhase::ReviewingMistake);
        assert!(engine.advance().is_err());

        let mistake = engine
            .save_mistake(MistakeCategory::Guessing, " rushed it ")
            .unwrap();
        assert_eq!(mistake.question_id, "c2");
        assert_eq!(mistake.user_answer, "Milan");
        assert_eq!(mistake.correct_answer, "Rome");
        assert_eq!(mistake.note, "rushed it");
        assert_eq!(mistake.topic, "Geography");
        assert_eq!(engine.phase(), QuizPhase::Active);

        let result = engine.advance().unwrap().unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 2);
        assert_eq!(engine.phase(), QuizPhase::Completed);

        engine.return_to_setup();
        assert_eq!(engine.phase(), QuizPhase::Setup);
    }

    #[test]
    fn resubmitting_returns_the_same_verdict_without_recounting() {
        let mut engine = active_engine();
        engine.choose_option("Paris").unwrap();
        let first = engine.submit().unwrap();
        let second = engine.submit().unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.pass_score(), 1);
        assert!(engine.choose_option("Lyon").is_err());
    }

    #[test]
    fn switching_sections_resets_progress() {
        let mut engine = active_engine();
        engine.choose_option("Paris").unwrap();
        engine.submit().unwrap();
        engine.advance().unwrap();

        engine.select_type(QuestionType::Match).unwrap();
        assert_eq!(engine.current_index(), 0);
        assert_eq!(engine.pass_score(), 0);
        assert_eq!(engine.draft(), &AnswerDraft::default());

        engine.select_match("A", "1").unwrap();
        engine.select_match("B", "3").unwrap();
        let verdict = engine.submit().unwrap();
        assert!(!verdict.correct);
        assert_eq!(verdict.user_answer, "A → 1; B → 3");
        assert_eq!(verdict.correct_answer, "A → 1; B → 2");
    }

    #[test]
    fn advancing_requires_a_graded_question() {
        let mut engine = active_engine();
        assert!(matches!(
            engine.advance(),
            Err(StudyError::InvalidState(_))
        ));
    }

    #[test]
    fn settings_are_locked_outside_setup() {
        let mut engine = active_engine();
        assert!(engine.set_difficulty(Difficulty::Easy).is_err());
        let mut fresh = QuizEngine::new();
        assert!(fresh.set_question_count(0).is_err());
        assert!(fresh.set_question_count(MAX_QUESTION_COUNT + 1).is_err());
        assert!(fresh.set_question_count(10).is_ok());
    }
}

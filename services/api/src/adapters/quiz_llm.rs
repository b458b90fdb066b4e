//! services/api/src/adapters/quiz_llm.rs
//!
//! The quiz generation adapter. The model answers with JSON, which is parsed
//! into loosely typed DTOs and then normalized into the core's `QuizData`:
//! ids are assigned, malformed questions are dropped and every section is
//! capped at the requested count.

use crate::adapters::chat;
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use serde::Deserialize;
use study_assistant_core::domain::{
    AnswerQuestion, ChooseQuestion, Difficulty, FillBlankQuestion, MatchPair, MatchQuestion,
    QuizData,
};
use study_assistant_core::ports::{PortError, PortResult, QuizGenerationService};
use tracing::{info, warn};

const SYSTEM_INSTRUCTIONS: &str = r#"You write practice quizzes for students.

Respond with a single JSON object and nothing else, using exactly this shape:
{
  "topic": "short topic title",
  "choose":    [{"question": "...", "options": ["...", "...", "...", "..."], "correctAnswer": "one of the options", "explanation": "why"}],
  "fillBlank": [{"question": "sentence with ___ for the blank", "correctAnswer": "missing word"}],
  "match":     [{"question": "instruction", "pairs": [{"left": "term", "right": "definition"}]}],
  "answer":    [{"question": "open question", "sampleAnswer": "a model answer"}]
}

Rules:
- correctAnswer of a choose question must be copied exactly from its options.
- Fill-in-the-blank answers are a single word or a short phrase.
- Every match question has 3 to 5 pairs with unique left and right values."#;

const USER_INPUT_TEMPLATE: &str = r#"MATERIAL:
---
{material}
---

Write {count} questions of EACH type (choose, fillBlank, match, answer) at {difficulty} difficulty."#;

//=========================================================================================
// Wire DTOs
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizDto {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    choose: Vec<ChooseDto>,
    #[serde(default)]
    fill_blank: Vec<FillBlankDto>,
    #[serde(default, rename = "match")]
    matching: Vec<MatchDto>,
    #[serde(default)]
    answer: Vec<AnswerDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChooseDto {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FillBlankDto {
    question: String,
    correct_answer: String,
}

#[derive(Debug, Deserialize)]
struct MatchDto {
    question: String,
    pairs: Vec<MatchPair>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerDto {
    question: String,
    #[serde(default)]
    sample_answer: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OpenAiQuizAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuizAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Parses the model's JSON answer into a quiz of at most `count` questions per section.
fn parse_quiz(raw: &str, count: usize, fallback_topic: &str) -> PortResult<QuizData> {
    let json = chat::strip_code_fence(raw)?;
    let dto: QuizDto = serde_json::from_str(&json)
        .map_err(|e| PortError::Unexpected(format!("Malformed quiz JSON: {}", e)))?;

    let choose = dto
        .choose
        .into_iter()
        .filter(|q| q.options.iter().any(|o| o == &q.correct_answer))
        .take(count)
        .enumerate()
        .map(|(i, q)| ChooseQuestion {
            id: format!("choose-{}", i + 1),
            question: q.question,
            options: q.options,
            correct_answer: q.correct_answer,
            explanation: q.explanation.filter(|e| !e.trim().is_empty()),
        })
        .collect();

    let fill_blank = dto
        .fill_blank
        .into_iter()
        .filter(|q| !q.correct_answer.trim().is_empty())
        .take(count)
        .enumerate()
        .map(|(i, q)| FillBlankQuestion {
            id: format!("fill-{}", i + 1),
            question: q.question,
            correct_answer: q.correct_answer,
        })
        .collect();

    let matching = dto
        .matching
        .into_iter()
        .filter(|q| !q.pairs.is_empty())
        .take(count)
        .enumerate()
        .map(|(i, q)| MatchQuestion {
            id: format!("match-{}", i + 1),
            question: q.question,
            pairs: q.pairs,
        })
        .collect();

    let answer = dto
        .answer
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(i, q)| AnswerQuestion {
            id: format!("answer-{}", i + 1),
            question: q.question,
            sample_answer: q.sample_answer,
        })
        .collect();

    let topic = if dto.topic.trim().is_empty() {
        fallback_topic.to_string()
    } else {
        dto.topic.trim().to_string()
    };

    Ok(QuizData {
        topic,
        choose,
        fill_blank,
        matching,
        answer,
    })
}

//=========================================================================================
// `QuizGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizGenerationService for OpenAiQuizAdapter {
    async fn generate_quiz(
        &self,
        text: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> PortResult<QuizData> {
        let user_input = USER_INPUT_TEMPLATE
            .replace("{material}", text)
            .replace("{count}", &count.to_string())
            .replace("{difficulty}", &difficulty.to_string());

        let raw = chat::ask(&self.client, &self.model, SYSTEM_INSTRUCTIONS, user_input, 4000).await?;

        let fallback_topic: String = text.lines().next().unwrap_or_default().chars().take(60).collect();
        let quiz = parse_quiz(&raw, count as usize, &fallback_topic)?;
        if quiz.total_questions() == 0 {
            warn!("The model returned a quiz without usable questions");
        }
        info!(
            "Parsed quiz '{}' with {} questions",
            quiz.topic,
            quiz.total_questions()
        );
        Ok(quiz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = r#"```json
{
  "topic": "Photosynthesis",
  "choose": [
    {"question": "Where does it happen?", "options": ["Chloroplast", "Nucleus"], "correctAnswer": "Chloroplast"},
    {"question": "Broken", "options": ["A", "B"], "correctAnswer": "C"},
    {"question": "Gas released?", "options": ["O2", "CO2"], "correctAnswer": "O2", "explanation": ""}
  ],
  "fillBlank": [{"question": "Plants absorb ___ light.", "correctAnswer": "sun"}],
  "match": [{"question": "Match", "pairs": [{"left": "Input", "right": "CO2"}]}]
}
```"#;

    #[test]
    fn quiz_json_is_normalized() {
        let quiz = parse_quiz(ANSWER, 5, "fallback").unwrap();
        assert_eq!(quiz.topic, "Photosynthesis");
        assert_eq!(quiz.choose.len(), 2);
        assert_eq!(quiz.choose[1].id, "choose-2");
        assert_eq!(quiz.choose[1].explanation, None);
        assert_eq!(quiz.fill_blank[0].id, "fill-1");
        assert_eq!(quiz.matching[0].pairs.len(), 1);
        assert!(quiz.answer.is_empty());
    }

    #[test]
    fn sections_are_capped_at_the_requested_count() {
        let quiz = parse_quiz(ANSWER, 1, "fallback").unwrap();
        assert_eq!(quiz.choose.len(), 1);
        assert_eq!(quiz.total_questions(), 3);
    }

    #[test]
    fn malformed_json_is_a_port_error() {
        assert!(parse_quiz("Sorry, I can't.", 5, "x").is_err());
    }
}

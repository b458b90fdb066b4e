//! crates/study_assistant_core/src/roleplay.rs
//!
//! The teach-back classroom: the learner plays the teacher in front of a few
//! simulated students. Each student is a separate AI agent with its own persona
//! and private history; this module only tracks who has a hand up, who is
//! speaking and the shared transcript.

use crate::domain::{AgentHandle, Persona};
use crate::error::{StudyError, StudyResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

/// Chance that a student of this persona raises a hand after the teacher speaks.
/// Only the ordering matters: argumentative students raise hands most often.
pub fn hand_raise_probability(persona: Persona) -> f64 {
    match persona {
        Persona::Curious => 0.45,
        Persona::Confused => 0.35,
        Persona::Skeptical => 0.55,
        Persona::Argumentative => 0.75,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAgent {
    pub id: Uuid,
    pub name: String,
    pub persona: Persona,
    pub is_hand_raised: bool,
    pub is_speaking: bool,
    #[serde(skip)]
    pub handle: AgentHandle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Speaker {
    Teacher,
    Student { agent_id: Uuid, name: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// What the teacher said last; students answer to this when called on.
#[derive(Debug, Clone, Default)]
pub struct TeacherUtterance {
    pub text: Option<String>,
    pub audio: Option<Vec<u8>>,
}

/// A student turn handed out by [`Classroom::call_on`].
#[derive(Debug, Clone)]
pub struct StudentTurn {
    pub agent_id: Uuid,
    pub handle: AgentHandle,
    pub utterance: TeacherUtterance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub topic: String,
    pub students: Vec<StudentAgent>,
    pub transcript: Vec<TranscriptEntry>,
    #[serde(skip)]
    last_utterance: Option<TeacherUtterance>,
}

impl Classroom {
    pub fn new(topic: impl Into<String>, handles: Vec<AgentHandle>) -> Self {
        let students = handles
            .into_iter()
            .map(|handle| StudentAgent {
                id: handle.id,
                name: handle.persona.display_name().to_string(),
                persona: handle.persona,
                is_hand_raised: false,
                is_speaking: false,
                handle,
            })
            .collect();
        Self {
            topic: topic.into(),
            students,
            transcript: Vec::new(),
            last_utterance: None,
        }
    }

    pub fn student(&self, id: Uuid) -> Option<&StudentAgent> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Records what the teacher said and lets every idle student decide whether
    /// to raise a hand.
    pub fn teacher_says<R: Rng + ?Sized>(&mut self, utterance: TeacherUtterance, rng: &mut R) {
        let text = utterance
            .text
            .clone()
            .unwrap_or_else(|| "(spoken)".to_string());
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Teacher,
            text,
            timestamp: Utc::now(),
        });
        self.last_utterance = Some(utterance);

        for student in self.students.iter_mut().filter(|s| !s.is_speaking) {
            if rng.gen_bool(hand_raise_probability(student.persona)) {
                student.is_hand_raised = true;
            }
        }
    }

    /// Gives the floor to a student with a raised hand. All hands go down and the
    /// student is marked speaking until [`Classroom::speech_finished`].
    pub fn call_on(&mut self, agent_id: Uuid) -> StudyResult<StudentTurn> {
        let utterance = self.last_utterance.clone().ok_or_else(|| {
            StudyError::InvalidState("the teacher has not said anything yet".to_string())
        })?;
        let student = self
            .students
            .iter()
            .find(|s| s.id == agent_id)
            .ok_or_else(|| StudyError::NotFound(format!("student {}", agent_id)))?;
        if student.is_speaking {
            return Err(StudyError::InvalidState(format!(
                "{} is still speaking",
                student.name
            )));
        }
        if !student.is_hand_raised {
            return Err(StudyError::InvalidState(format!(
                "{} has not raised a hand",
                student.name
            )));
        }
        let handle = student.handle.clone();

        for s in &mut self.students {
            s.is_hand_raised = false;
            s.is_speaking = s.id == agent_id;
        }
        Ok(StudentTurn {
            agent_id,
            handle,
            utterance,
        })
    }

    /// Appends a student's reply to the shared transcript.
    pub fn record_reply(&mut self, agent_id: Uuid, text: impl Into<String>) -> StudyResult<()> {
        let name = self
            .student(agent_id)
            .map(|s| s.name.clone())
            .ok_or_else(|| StudyError::NotFound(format!("student {}", agent_id)))?;
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Student { agent_id, name },
            text: text.into(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Clears the speaking flag once playback of the student's reply ended.
    pub fn speech_finished(&mut self, agent_id: Uuid) -> bool {
        match self.students.iter_mut().find(|s| s.id == agent_id) {
            Some(student) => {
                student.is_speaking = false;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn handle(persona: Persona) -> AgentHandle {
        AgentHandle {
            id: Uuid::new_v4(),
            persona,
        }
    }

    fn spoken(text: &str) -> TeacherUtterance {
        TeacherUtterance {
            text: Some(text.to_string()),
            audio: None,
        }
    }

    #[test]
    fn argumentative_students_raise_hands_more_often() {
        let mut rng = StdRng::seed_from_u64(7);
        let argumentative = handle(Persona::Argumentative);
        let confused = handle(Persona::Confused);
        let (arg_id, conf_id) = (argumentative.id, confused.id);
        let mut classroom = Classroom::new("Gravity", vec![argumentative, confused]);

        let (mut arg_raises, mut conf_raises) = (0, 0);
        for _ in 0..500 {
            classroom.teacher_says(spoken("Mass bends spacetime."), &mut rng);
            if classroom.student(arg_id).unwrap().is_hand_raised {
                arg_raises += 1;
            }
            if classroom.student(conf_id).unwrap().is_hand_raised {
                conf_raises += 1;
            }
            for s in &mut classroom.students {
                s.is_hand_raised = false;
            }
        }
        assert!(arg_raises > conf_raises);
    }

    #[test]
    fn calling_on_a_student_clears_every_hand() {
        let a = handle(Persona::Curious);
        let b = handle(Persona::Skeptical);
        let (a_id, b_id) = (a.id, b.id);
        let mut classroom = Classroom::new("Gravity", vec![a, b]);
        classroom.last_utterance = Some(spoken("Any questions?"));
        for s in &mut classroom.students {
            s.is_hand_raised = true;
        }

        let turn = classroom.call_on(a_id).unwrap();
        assert_eq!(turn.agent_id, a_id);
        assert_eq!(turn.utterance.text.as_deref(), Some("Any questions?"));
        assert!(classroom.students.iter().all(|s| !s.is_hand_raised));
        assert!(classroom.student(a_id).unwrap().is_speaking);
        assert!(!classroom.student(b_id).unwrap().is_speaking);

        classroom.record_reply(a_id, "Why does light bend?").unwrap();
        assert!(matches!(
            classroom.transcript.last().unwrap().speaker,
            Speaker::Student { agent_id, .. } if agent_id == a_id
        ));

        assert!(classroom.speech_finished(a_id));
        assert!(!classroom.student(a_id).unwrap().is_speaking);
    }

    #[test]
    fn students_without_raised_hands_cannot_be_called() {
        let a = handle(Persona::Curious);
        let a_id = a.id;
        let mut classroom = Classroom::new("Gravity", vec![a]);
        classroom.last_utterance = Some(spoken("Hello"));
        assert!(matches!(
            classroom.call_on(a_id),
            Err(StudyError::InvalidState(_))
        ));
        assert!(matches!(
            classroom.call_on(Uuid::new_v4()),
            Err(StudyError::NotFound(_))
        ));
    }

    #[test]
    fn speaking_students_keep_their_hands_down() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = handle(Persona::Argumentative);
        let a_id = a.id;
        let mut classroom = Classroom::new("Gravity", vec![a]);
        classroom.students[0].is_speaking = true;
        for _ in 0..50 {
            classroom.teacher_says(spoken("Next point."), &mut rng);
        }
        assert!(!classroom.student(a_id).unwrap().is_hand_raised);
        assert_eq!(classroom.transcript.len(), 50);
    }
}

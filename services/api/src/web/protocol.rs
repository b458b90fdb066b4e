//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server.

use serde::{Deserialize, Serialize};
use study_assistant_core::StudyEvent;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// NOTE: Spoken teacher turns are sent as raw Binary PCM frames between
// `teaching_started` and `teaching_ended`, not as part of this enum.
//=========================================================================================

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The learner started speaking to the classroom; audio frames follow.
    TeachingStarted,

    /// The learner stopped speaking. The buffered audio becomes a teacher turn.
    TeachingEnded,

    /// Playback of a student's reply has finished on the client.
    SpeechFinished { agent_id: Uuid },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// NOTE: A student's synthesized voice is sent as a raw Binary frame right after
// the matching `student_speech` message.
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the upgrade.
    Connected,

    /// A state change in the study assistant.
    Event { event: StudyEvent },

    /// The next Binary frame holds this student's spoken reply.
    StudentSpeech { agent_id: Uuid },

    /// Reports an error to the client, which should display it.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"speech_finished","agent_id":"{}"}}"#, id);
        assert_eq!(
            serde_json::from_str::<ClientMessage>(&json).unwrap(),
            ClientMessage::SpeechFinished { agent_id: id }
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"teaching_started"}"#).unwrap(),
            ClientMessage::TeachingStarted
        );
    }

    #[test]
    fn events_are_nested_under_the_envelope() {
        let msg = ServerMessage::Event {
            event: StudyEvent::HandsChanged { raised: vec![] },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "event");
        assert!(value["event"].is_object());
    }
}

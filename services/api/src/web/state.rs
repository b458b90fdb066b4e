//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use std::collections::HashSet;
use std::sync::Arc;
use study_assistant_core::ports::TextToSpeechService;
use study_assistant_core::StudyAssistant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Upper bound for one spoken teacher turn. Matches the transcription upload limit.
pub const MAX_TURN_AUDIO_BYTES: usize = 24 * 1024 * 1024;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<StudyAssistant>,
    pub tts_adapter: Arc<dyn TextToSpeechService>,
}

//=========================================================================================
// ConnectionState (Specific to One WebSocket Connection)
//=========================================================================================

/// Whether the connection is currently capturing a spoken teacher turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Idle,
    Teaching,
}

/// What happened to a binary frame handed to [`ConnectionState::push_audio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPush {
    Buffered,
    /// No spoken turn is open.
    Ignored,
    /// The turn grew past the limit and was dropped.
    Overflow,
}

/// The state for a single, active WebSocket connection.
pub struct ConnectionState {
    pub mode: ConnectionMode,
    pub audio_buffer: Vec<u8>,
    max_turn_bytes: usize,
    /// Stops the task that forwards study events to this connection.
    pub cancellation_token: CancellationToken,
    /// Students whose voice was sent here and whose playback has not ended yet.
    pub playing: Arc<Mutex<HashSet<Uuid>>>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::with_audio_limit(MAX_TURN_AUDIO_BYTES)
    }

    pub fn with_audio_limit(max_turn_bytes: usize) -> Self {
        Self {
            mode: ConnectionMode::Idle,
            audio_buffer: Vec::new(),
            max_turn_bytes,
            cancellation_token: CancellationToken::new(),
            playing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Starts buffering a new spoken turn, dropping any unfinished one.
    pub fn start_teaching(&mut self) {
        self.mode = ConnectionMode::Teaching;
        self.audio_buffer.clear();
    }

    /// Buffers a binary PCM frame. Frames outside a spoken turn are ignored; a
    /// frame that would take the turn past the limit ends it without a transcript.
    pub fn push_audio(&mut self, frame: &[u8]) -> AudioPush {
        if self.mode != ConnectionMode::Teaching {
            return AudioPush::Ignored;
        }
        if self.audio_buffer.len() + frame.len() > self.max_turn_bytes {
            self.mode = ConnectionMode::Idle;
            self.audio_buffer = Vec::new();
            return AudioPush::Overflow;
        }
        self.audio_buffer.extend_from_slice(frame);
        AudioPush::Buffered
    }

    /// Ends the spoken turn and hands over the buffered audio.
    pub fn finish_teaching(&mut self) -> Vec<u8> {
        self.mode = ConnectionMode::Idle;
        std::mem::take(&mut self.audio_buffer)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_is_buffered_only_while_teaching() {
        let mut connection = ConnectionState::new();
        assert_eq!(connection.push_audio(&[1, 2]), AudioPush::Ignored);

        connection.start_teaching();
        assert_eq!(connection.push_audio(&[1, 2]), AudioPush::Buffered);
        assert_eq!(connection.push_audio(&[3, 4]), AudioPush::Buffered);
        assert_eq!(connection.finish_teaching(), vec![1, 2, 3, 4]);

        assert_eq!(connection.mode, ConnectionMode::Idle);
        assert!(connection.audio_buffer.is_empty());
    }

    #[test]
    fn an_oversized_turn_is_dropped() {
        let mut connection = ConnectionState::with_audio_limit(4);
        connection.start_teaching();
        assert_eq!(connection.push_audio(&[1, 2, 3]), AudioPush::Buffered);
        assert_eq!(connection.push_audio(&[4, 5]), AudioPush::Overflow);

        assert_eq!(connection.mode, ConnectionMode::Idle);
        assert!(connection.audio_buffer.is_empty());
        assert_eq!(connection.push_audio(&[6]), AudioPush::Ignored);
        assert!(connection.finish_teaching().is_empty());
    }
}

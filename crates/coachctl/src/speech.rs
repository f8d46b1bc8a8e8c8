//! Speech capability seam.
//!
//! `ConsoleSpeech` is the text fallback: it prints what would be spoken and
//! reads the reply from the terminal. Audio TTS/STT engines plug in behind
//! the same trait.

use async_trait::async_trait;
use coach_common::SessionError;
use owo_colors::OwoColorize;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Speak one utterance; returns when playback has finished.
    async fn speak(&self, text: &str) -> Result<(), SessionError>;

    /// Listen for one utterance within a fixed window and return a
    /// best-effort transcript, possibly empty.
    async fn listen(&self, duration_secs: f64) -> Result<String, SessionError>;
}

/// Terminal stand-in for the speech engines: speaking prints, listening
/// reads a typed line. The listening window does not apply to typed input.
pub struct ConsoleSpeech;

#[async_trait]
impl SpeechService for ConsoleSpeech {
    async fn speak(&self, text: &str) -> Result<(), SessionError> {
        println!("{}  {}", "coach".bright_cyan().bold(), text);
        Ok(())
    }

    async fn listen(&self, _duration_secs: f64) -> Result<String, SessionError> {
        print!("{}  ", "you".bright_magenta().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// Scripted speech for tests: replays transcripts and records everything
/// spoken.
pub struct ScriptedSpeech {
    transcripts: Mutex<VecDeque<String>>,
    spoken: Mutex<Vec<String>>,
}

impl ScriptedSpeech {
    pub fn new<I, S>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transcripts: Mutex::new(transcripts.into_iter().map(Into::into).collect()),
            spoken: Mutex::new(Vec::new()),
        }
    }

    /// Everything spoken so far, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechService for ScriptedSpeech {
    async fn speak(&self, text: &str) -> Result<(), SessionError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn listen(&self, _duration_secs: f64) -> Result<String, SessionError> {
        // An exhausted script behaves like silence
        Ok(self
            .transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}

//! Bounded-retry voice-to-value extraction.
//!
//! Solicits a spoken rating, has the completion service interpret the
//! transcript, and validates the result. The attempt budget keeps ambiguous
//! audio from looping forever.

use coach_common::SessionError;
use tracing::debug;

use crate::completion::CompletionService;
use crate::speech::SpeechService;

pub struct SpeechGate<'a> {
    speech: &'a dyn SpeechService,
    completion: &'a dyn CompletionService,
    listen_secs: f64,
    max_attempts: usize,
}

impl<'a> SpeechGate<'a> {
    pub fn new(
        speech: &'a dyn SpeechService,
        completion: &'a dyn CompletionService,
        listen_secs: f64,
        max_attempts: usize,
    ) -> Self {
        Self {
            speech,
            completion,
            listen_secs,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Collect a validated integer rating in `[min, max]`.
    ///
    /// Every attempt performs exactly one audio-output and one audio-input
    /// call. An interpretation of "unclear" gets `retry_prompt`; any other
    /// rejection gets a generic correction. Exhausting the attempt budget
    /// yields `InputAmbiguous`; capability failures propagate as-is.
    pub async fn collect_rated_value(
        &self,
        prompt: &str,
        min: i64,
        max: i64,
        retry_prompt: &str,
    ) -> Result<i64, SessionError> {
        self.speech.speak(prompt).await?;

        for attempt in 1..=self.max_attempts {
            let transcript = self.speech.listen(self.listen_secs).await?;
            let interpreted = self
                .completion
                .complete(&extraction_prompt(&transcript, min, max))
                .await?;
            let interpreted = interpreted.trim();

            if let Ok(value) = interpreted.parse::<i64>() {
                if (min..=max).contains(&value) {
                    debug!(attempt, value, "rating accepted");
                    return Ok(value);
                }
            }

            debug!(attempt, transcript = %transcript, interpreted = %interpreted, "rating rejected");
            if attempt < self.max_attempts {
                if interpreted.eq_ignore_ascii_case("unclear") {
                    self.speech.speak(retry_prompt).await?;
                } else {
                    self.speech
                        .speak(&format!(
                            "I'm sorry, I need a number between {min} and {max}. Could you try again?"
                        ))
                        .await?;
                }
            }
        }

        Err(SessionError::InputAmbiguous {
            attempts: self.max_attempts,
        })
    }
}

fn extraction_prompt(transcript: &str, min: i64, max: i64) -> String {
    format!(
        "The user responded with \"{transcript}\" when asked to rate their performance \
         on a scale of {min} to {max}.\n\
         Extract the numerical rating from this response. If the response is unclear, \
         ambiguous, or doesn't contain a number between {min} and {max}, return \"unclear\".\n\
         Your response should be either a number between {min} and {max}, or the word \"unclear\"."
    )
}

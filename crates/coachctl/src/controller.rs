//! Top-level session loop.
//!
//! Ties the speech gate, the protocol client, the analyzer and the renderer
//! together, and decides which failures abort the session and which only
//! cost the current iteration.

use coach_common::config::CoachConfig;
use coach_common::types::{SessionReport, SurveyResponse};
use coach_common::SessionError;
use tracing::{error, info, warn};

use crate::analyzer::ProgressAnalyzer;
use crate::client::InferenceClient;
use crate::completion::CompletionService;
use crate::gate::SpeechGate;
use crate::render::Renderer;
use crate::speech::SpeechService;

const RETRY_PROMPT: &str =
    "I didn't quite catch that. Could you please give me a number between 1 and 10?";
const CONTINUE_PROMPT: &str = "Would you like to add another session? Say 'yes' or 'no'.";
const ANALYSIS_LEAD_IN: &str = "Based on your input, here's an analysis of your progress.";

pub struct SessionController<'a> {
    client: InferenceClient,
    speech: &'a dyn SpeechService,
    completion: &'a dyn CompletionService,
    renderer: &'a dyn Renderer,
    config: &'a CoachConfig,
}

impl<'a> SessionController<'a> {
    pub fn new(
        client: InferenceClient,
        speech: &'a dyn SpeechService,
        completion: &'a dyn CompletionService,
        renderer: &'a dyn Renderer,
        config: &'a CoachConfig,
    ) -> Self {
        Self {
            client,
            speech,
            completion,
            renderer,
            config,
        }
    }

    /// Run sessions until the user declines to continue or a fatal error
    /// occurs. The connection is closed before returning either way.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let result = self.session_loop().await;
        self.client.shutdown().await;
        info!("connection closed");
        result
    }

    async fn session_loop(&mut self) -> Result<(), SessionError> {
        let gate = SpeechGate::new(
            self.speech,
            self.completion,
            self.config.speech.listen_secs,
            self.config.session.max_rating_attempts,
        );
        let greeting = format!(
            "Hey {}! On a scale of 1 to 10, how would you rate your performance in this \
             session compared to previous sessions?",
            self.config.session.user_name
        );

        loop {
            // CollectingInput
            let performance = match gate.collect_rated_value(&greeting, 1, 10, RETRY_PROMPT).await
            {
                Ok(value) => Some(value),
                Err(SessionError::InputAmbiguous { attempts }) => {
                    warn!(attempts, "rating extraction exhausted its attempts");
                    self.speech
                        .speak("I couldn't work out a rating this time, so let's skip this session.")
                        .await?;
                    None
                }
                Err(e) => return Err(e),
            };

            if let Some(performance) = performance {
                // Sending
                match self.client.send(&SurveyResponse { performance }).await {
                    Ok(mut report) => {
                        normalize_date(&mut report);
                        self.present_analysis(&report).await?;
                    }
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        // A single bad round trip is not fatal; say so and
                        // collect a fresh rating.
                        warn!(error = %e, "server round trip failed");
                        self.speech
                            .speak(&format!(
                                "I'm sorry, there was an error communicating with the server. {e}"
                            ))
                            .await?;
                        continue;
                    }
                }
            }

            // AskContinue
            if !self.ask_continue().await? {
                info!("user ended the session");
                return Ok(());
            }
        }
    }

    /// Analyzing + Presenting. Analysis failures cost only this iteration.
    async fn present_analysis(&mut self, report: &SessionReport) -> Result<(), SessionError> {
        let analyzer = ProgressAnalyzer::new(self.completion);
        match analyzer.analyze(report).await {
            Ok((plot_series, recommendation)) => {
                for series in plot_series.values() {
                    if let Err(e) = self.renderer.render(series) {
                        warn!(variable = %series.variable_name, error = %e, "plot rendering failed");
                    }
                }
                self.speech.speak(ANALYSIS_LEAD_IN).await?;
                self.speech.speak(&recommendation).await?;
            }
            Err(e) => {
                error!(error = %e, "analysis failed");
                self.speech
                    .speak("I'm sorry, there was an error analyzing your progress. Please check the logs for more information.")
                    .await?;
            }
        }
        Ok(())
    }

    async fn ask_continue(&mut self) -> Result<bool, SessionError> {
        self.speech.speak(CONTINUE_PROMPT).await?;
        let choice = self.speech.listen(self.config.speech.listen_secs).await?;
        Ok(!is_negative(&choice))
    }
}

/// Case-insensitive substring match on the negative token.
fn is_negative(transcript: &str) -> bool {
    transcript.to_lowercase().contains("no")
}

/// Reformat a `%Y-%m-%d` report date for display as `%d/%m/%Y`. Cosmetic
/// only: unparseable dates are logged and left unchanged.
fn normalize_date(report: &mut SessionReport) {
    if let Some(date) = report.date.clone() {
        match chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
            Ok(parsed) => report.date = Some(parsed.format("%d/%m/%Y").to_string()),
            Err(_) => warn!(date = %date, "report date not in expected format, leaving unchanged"),
        }
    }
}

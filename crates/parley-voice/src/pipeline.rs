//! The speech → dialogue → speech coordinator.
//!
//! A run is strictly sequential: each stage consumes the previous stage's
//! output. Transcript mutations made before a failing stage are kept unless
//! rollback is enabled.

use crate::config::VoiceConfig;
use crate::dialogue::{DialogueModel, GroqDialogue};
use crate::error::{PipelineError, VoiceError};
use crate::stt::{AudioUpload, DeepgramTranscriber, Transcriber};
use crate::transcript::TranscriptStore;
use crate::tts::{MurfSynthesizer, SpeechSynthesizer};
use parley_types::{AudioFormat, LatencyReport, LatestExchange, Turn};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    Dialogue,
    Synthesis,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcription => "stt",
            Self::Dialogue => "llm",
            Self::Synthesis => "tts",
        }
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Synthesized reply, encoded as `format`.
    pub audio: Vec<u8>,
    pub format: AudioFormat,
    pub latency: LatencyReport,
    pub user_text: String,
    pub assistant_text: String,
}

/// Drives one pipeline run per submitted utterance.
///
/// The transcript is injected so the HTTP layer and the coordinator share
/// one conversation. `exchange_gate` is held for the whole of a run and of a
/// reset: concurrent runs queue behind each other, which keeps every
/// user/assistant pair contiguous. Status reads go straight to the store
/// and never wait on the gate.
pub struct PipelineCoordinator {
    transcriber: Arc<dyn Transcriber>,
    dialogue: Arc<dyn DialogueModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transcript: Arc<TranscriptStore>,
    exchange_gate: Arc<Mutex<()>>,
    rollback_on_failure: bool,
}

impl fmt::Debug for PipelineCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineCoordinator")
            .field("transcript", &self.transcript)
            .field("rollback_on_failure", &self.rollback_on_failure)
            .finish_non_exhaustive()
    }
}

impl PipelineCoordinator {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        dialogue: Arc<dyn DialogueModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        transcript: Arc<TranscriptStore>,
    ) -> Self {
        Self {
            transcriber,
            dialogue,
            synthesizer,
            transcript,
            exchange_gate: Arc::new(Mutex::new(())),
            rollback_on_failure: false,
        }
    }

    /// Drop the turns a failed run appended instead of keeping them.
    pub fn with_rollback_on_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }

    /// Builds the HTTP clients and a fresh transcript from configuration.
    pub fn from_config(config: &VoiceConfig) -> Result<Self, VoiceError> {
        config.validate()?;

        let transcriber = DeepgramTranscriber::new(config.transcription.clone())?;
        let dialogue = GroqDialogue::new(config.dialogue.clone())?;
        let synthesizer = MurfSynthesizer::new(config.synthesis.clone())?;
        let transcript = TranscriptStore::new(config.conversation.system_prompt.clone());

        Ok(Self::new(
            Arc::new(transcriber),
            Arc::new(dialogue),
            Arc::new(synthesizer),
            Arc::new(transcript),
        )
        .with_rollback_on_failure(config.conversation.rollback_on_failure))
    }

    pub fn transcript(&self) -> &Arc<TranscriptStore> {
        &self.transcript
    }

    pub fn latest_exchange(&self) -> LatestExchange {
        self.transcript.latest_exchange()
    }

    /// Starts a new conversation. Waits for an in-flight run to finish.
    pub async fn reset_conversation(&self) {
        let _gate = self.exchange_gate.lock().await;
        self.transcript.reset();
        info!("conversation reset");
    }

    /// Transcribes `audio`, asks the dialogue model for a reply, and
    /// synthesizes it.
    ///
    /// The stages run on their own task. Dropping the returned future does
    /// not abort a started run: it still finishes, or rolls back, and
    /// releases the exchange gate.
    pub async fn run_pipeline(&self, audio: AudioUpload) -> Result<PipelineResult, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id, audio_bytes = audio.len());
        let run = PipelineRun {
            transcriber: Arc::clone(&self.transcriber),
            dialogue: Arc::clone(&self.dialogue),
            synthesizer: Arc::clone(&self.synthesizer),
            transcript: Arc::clone(&self.transcript),
            exchange_gate: Arc::clone(&self.exchange_gate),
            rollback_on_failure: self.rollback_on_failure,
        };

        match tokio::spawn(run.execute(audio).instrument(span)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!(%run_id, error = %e, "pipeline task did not complete");
                Err(PipelineError::Interrupted)
            }
        }
    }
}

/// One run's handles on the shared clients, transcript and gate.
struct PipelineRun {
    transcriber: Arc<dyn Transcriber>,
    dialogue: Arc<dyn DialogueModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transcript: Arc<TranscriptStore>,
    exchange_gate: Arc<Mutex<()>>,
    rollback_on_failure: bool,
}

impl PipelineRun {
    async fn execute(self, audio: AudioUpload) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        let _gate = self.exchange_gate.lock().await;
        debug!(
            queued_ms = started.elapsed().as_millis() as u64,
            "acquired exchange gate"
        );

        info!(
            audio_kb = %format!("{:.2}", audio.len() as f64 / 1024.0),
            "received audio"
        );
        let turns_before = self.transcript.turn_count();

        // 1. Speech to text
        let stage_started = Instant::now();
        info!(stage = Stage::Transcription.as_str(), "transcribing");
        let user_text = match self.transcriber.transcribe(&audio).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "transcription failed, treating as empty");
                String::new()
            }
        };
        let stt_latency = stage_started.elapsed();

        if user_text.trim().is_empty() {
            info!(stt_ms = stt_latency.as_millis() as u64, "no speech detected");
            return Err(PipelineError::NoSpeechDetected);
        }

        info!(user = %user_text, stt_ms = stt_latency.as_millis() as u64, "transcribed");
        self.transcript.append(Turn::user(user_text.clone()));

        // 2. Dialogue
        let stage_started = Instant::now();
        info!(stage = Stage::Dialogue.as_str(), "thinking");
        let history = self.transcript.snapshot();
        let assistant_text = match self.dialogue.complete(&history).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "dialogue stage failed");
                self.roll_back(turns_before);
                return Err(PipelineError::Dialogue(e.cause().to_string()));
            }
        };
        let llm_latency = stage_started.elapsed();

        info!(ai = %assistant_text, llm_ms = llm_latency.as_millis() as u64, "reply generated");
        self.transcript.append(Turn::assistant(assistant_text.clone()));

        // 3. Text to speech
        let stage_started = Instant::now();
        info!(stage = Stage::Synthesis.as_str(), "speaking");
        let audio = match self.synthesizer.synthesize(&assistant_text).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "synthesis stage failed");
                self.roll_back(turns_before);
                return Err(PipelineError::Synthesis(e.cause().to_string()));
            }
        };
        let tts_latency = stage_started.elapsed();

        let latency =
            LatencyReport::from_durations(stt_latency, llm_latency, tts_latency, started.elapsed());
        info!(
            stt_ms = latency.stt_ms,
            llm_ms = latency.llm_ms,
            tts_ms = latency.tts_ms,
            total_ms = latency.total_ms,
            "pipeline complete"
        );

        Ok(PipelineResult {
            audio,
            format: self.synthesizer.output_format(),
            latency,
            user_text,
            assistant_text,
        })
    }

    fn roll_back(&self, turns_before: usize) {
        if self.rollback_on_failure {
            self.transcript.truncate(turns_before);
            debug!(turns = turns_before, "rolled back transcript after failure");
        }
    }
}

use async_trait::async_trait;
use parley_types::{AudioFormat, Role, Turn};
use parley_voice::{
    AudioUpload, DialogueModel, PipelineCoordinator, PipelineError, SpeechSynthesizer,
    Transcriber, TranscriptStore, VoiceError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PROMPT: &str = "You are 'CareerGenius', an expert Life and Career Strategist.";

struct StubTranscriber {
    reply: Result<String, VoiceError>,
    delay: Duration,
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio: &AudioUpload) -> Result<String, VoiceError> {
        tokio::time::sleep(self.delay).await;
        self.reply.clone()
    }
}

/// Echoes the utterance it sees, so concurrent runs are distinguishable.
struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    async fn transcribe(&self, audio: &AudioUpload) -> Result<String, VoiceError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(String::from_utf8_lossy(&audio.data).into_owned())
    }
}

#[derive(Default)]
struct RecordingDialogue {
    reply: Option<Result<String, VoiceError>>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

#[async_trait]
impl DialogueModel for RecordingDialogue {
    async fn complete(&self, transcript: &[Turn]) -> Result<String, VoiceError> {
        self.seen.lock().unwrap().push(transcript.to_vec());
        tokio::time::sleep(Duration::from_millis(10)).await;
        match &self.reply {
            Some(reply) => reply.clone(),
            None => {
                let last = transcript.last().map(|t| t.content()).unwrap_or_default();
                Ok(format!("reply to {last}"))
            }
        }
    }
}

struct StubSynthesizer {
    reply: Result<Vec<u8>, VoiceError>,
    calls: AtomicUsize,
}

impl StubSynthesizer {
    fn ok(bytes: &[u8]) -> Self {
        Self {
            reply: Ok(bytes.to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(msg: &str) -> Self {
        Self {
            reply: Err(VoiceError::Tts(msg.to_string())),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

fn transcriber(reply: Result<&str, VoiceError>) -> Arc<StubTranscriber> {
    Arc::new(StubTranscriber {
        reply: reply.map(str::to_string),
        delay: Duration::ZERO,
    })
}

fn dialogue(reply: Result<&str, VoiceError>) -> Arc<RecordingDialogue> {
    Arc::new(RecordingDialogue {
        reply: Some(reply.map(str::to_string)),
        ..Default::default()
    })
}

fn coordinator(
    transcriber: Arc<dyn Transcriber>,
    dialogue: Arc<dyn DialogueModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
) -> PipelineCoordinator {
    PipelineCoordinator::new(
        transcriber,
        dialogue,
        synthesizer,
        Arc::new(TranscriptStore::new(PROMPT)),
    )
}

fn upload() -> AudioUpload {
    AudioUpload::new(b"webm-bytes".to_vec()).with_mime_type("audio/webm")
}

#[tokio::test]
async fn successful_run_returns_audio_and_appends_exchange() {
    let dialogue = dialogue(Ok("Great! What grade are you in?"));
    let pipeline = coordinator(
        transcriber(Ok("I want to be an engineer")),
        dialogue.clone(),
        Arc::new(StubSynthesizer::ok(b"FAKEAUDIO")),
    );

    let result = pipeline.run_pipeline(upload()).await.expect("run should succeed");

    assert_eq!(result.audio, b"FAKEAUDIO");
    assert_eq!(result.format, AudioFormat::Mp3);
    assert!(result.latency.total_ms >= result.latency.stt_ms);
    assert!(result.latency.total_ms >= result.latency.llm_ms);
    assert!(result.latency.total_ms >= result.latency.tts_ms);

    let turns = pipeline.transcript().snapshot();
    assert_eq!(
        turns,
        vec![
            Turn::system(PROMPT),
            Turn::user("I want to be an engineer"),
            Turn::assistant("Great! What grade are you in?"),
        ]
    );

    let latest = pipeline.latest_exchange();
    assert_eq!(latest.user, "I want to be an engineer");
    assert_eq!(latest.ai, "Great! What grade are you in?");
}

#[tokio::test]
async fn dialogue_receives_full_transcript() {
    let dialogue = dialogue(Ok("Nice to meet you."));
    let pipeline = coordinator(
        transcriber(Ok("Hi, I'm Asha")),
        dialogue.clone(),
        Arc::new(StubSynthesizer::ok(b"audio")),
    );

    pipeline.run_pipeline(upload()).await.unwrap();
    pipeline.run_pipeline(upload()).await.unwrap();

    let seen = dialogue.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], vec![Turn::system(PROMPT), Turn::user("Hi, I'm Asha")]);
    assert_eq!(seen[1].len(), 4);
    assert_eq!(seen[1][0].role(), Role::System);
    assert_eq!(seen[1][3], Turn::user("Hi, I'm Asha"));
}

#[tokio::test]
async fn empty_transcription_is_no_speech_and_leaves_transcript_alone() {
    let dialogue = dialogue(Ok("unused"));
    let synth = Arc::new(StubSynthesizer::ok(b"unused"));
    let pipeline = coordinator(transcriber(Ok("")), dialogue.clone(), synth.clone());

    let err = pipeline.run_pipeline(upload()).await.unwrap_err();

    assert_eq!(err, PipelineError::NoSpeechDetected);
    assert!(err.is_client_error());
    assert_eq!(pipeline.transcript().turn_count(), 1);
    assert!(dialogue.seen.lock().unwrap().is_empty());
    assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn whitespace_only_transcription_is_no_speech() {
    let pipeline = coordinator(
        transcriber(Ok("   \n")),
        dialogue(Ok("unused")),
        Arc::new(StubSynthesizer::ok(b"unused")),
    );

    let err = pipeline.run_pipeline(upload()).await.unwrap_err();
    assert_eq!(err, PipelineError::NoSpeechDetected);
    assert_eq!(pipeline.transcript().turn_count(), 1);
}

#[tokio::test]
async fn transcription_failure_is_treated_as_no_speech() {
    let pipeline = coordinator(
        transcriber(Err(VoiceError::Stt("Deepgram API Error 401".into()))),
        dialogue(Ok("unused")),
        Arc::new(StubSynthesizer::ok(b"unused")),
    );

    let err = pipeline.run_pipeline(upload()).await.unwrap_err();
    assert_eq!(err, PipelineError::NoSpeechDetected);
    assert_eq!(pipeline.transcript().turn_count(), 1);
}

#[tokio::test]
async fn dialogue_failure_keeps_user_turn() {
    let synth = Arc::new(StubSynthesizer::ok(b"unused"));
    let pipeline = coordinator(
        transcriber(Ok("I want to be an engineer")),
        dialogue(Err(VoiceError::Dialogue("Error code: 503 - overloaded".into()))),
        synth.clone(),
    );

    let err = pipeline.run_pipeline(upload()).await.unwrap_err();

    assert_eq!(
        err,
        PipelineError::Dialogue("Error code: 503 - overloaded".to_string())
    );
    assert!(!err.is_client_error());
    assert_eq!(
        pipeline.transcript().snapshot(),
        vec![Turn::system(PROMPT), Turn::user("I want to be an engineer")]
    );
    assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn synthesis_failure_keeps_both_turns() {
    let pipeline = coordinator(
        transcriber(Ok("I want to be an engineer")),
        dialogue(Ok("Great! What grade are you in?")),
        Arc::new(StubSynthesizer::failing("Murf Error: invalid voiceId")),
    );

    let err = pipeline.run_pipeline(upload()).await.unwrap_err();

    assert_eq!(
        err,
        PipelineError::Synthesis("Murf Error: invalid voiceId".to_string())
    );
    assert_eq!(pipeline.transcript().turn_count(), 3);
    assert_eq!(pipeline.latest_exchange().ai, "Great! What grade are you in?");
}

#[tokio::test]
async fn rollback_removes_turns_of_failed_run() {
    let pipeline = coordinator(
        transcriber(Ok("I want to be an engineer")),
        dialogue(Ok("Great!")),
        Arc::new(StubSynthesizer::failing("Murf Error: quota")),
    )
    .with_rollback_on_failure(true);

    pipeline.run_pipeline(upload()).await.unwrap_err();
    assert_eq!(pipeline.transcript().snapshot(), vec![Turn::system(PROMPT)]);

    let pipeline = coordinator(
        transcriber(Ok("hello")),
        dialogue(Err(VoiceError::Dialogue("down".into()))),
        Arc::new(StubSynthesizer::ok(b"unused")),
    )
    .with_rollback_on_failure(true);

    pipeline.run_pipeline(upload()).await.unwrap_err();
    assert_eq!(pipeline.transcript().turn_count(), 1);
}

#[tokio::test]
async fn system_turn_survives_any_sequence_of_runs() {
    let pipeline = coordinator(
        Arc::new(EchoTranscriber),
        Arc::new(RecordingDialogue::default()),
        Arc::new(StubSynthesizer::ok(b"audio")),
    );

    for i in 0..4 {
        pipeline
            .run_pipeline(AudioUpload::new(format!("utterance {i}").into_bytes()))
            .await
            .unwrap();
        assert_eq!(pipeline.transcript().system_turn(), Turn::system(PROMPT));
    }
    assert_eq!(pipeline.transcript().turn_count(), 9);

    pipeline.reset_conversation().await;
    assert_eq!(pipeline.transcript().snapshot(), vec![Turn::system(PROMPT)]);
    assert!(pipeline.latest_exchange().is_empty());
}

fn assert_strictly_alternating(turns: &[Turn]) {
    assert_eq!(turns[0], Turn::system(PROMPT));
    let rest = &turns[1..];
    assert_eq!(rest.len() % 2, 0, "turns must come in pairs: {rest:?}");
    for pair in rest.chunks(2) {
        assert_eq!(pair[0].role(), Role::User);
        assert_eq!(pair[1].role(), Role::Assistant);
        assert_eq!(pair[1].content(), format!("reply to {}", pair[0].content()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_do_not_interleave() {
    let pipeline = Arc::new(coordinator(
        Arc::new(EchoTranscriber),
        Arc::new(RecordingDialogue::default()),
        Arc::new(StubSynthesizer::ok(b"audio")),
    ));

    for conversation in 0..2 {
        pipeline.reset_conversation().await;

        let a = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .run_pipeline(AudioUpload::new(format!("alpha {conversation}").into_bytes()))
                    .await
            })
        };
        let b = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .run_pipeline(AudioUpload::new(format!("beta {conversation}").into_bytes()))
                    .await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let turns = pipeline.transcript().snapshot();
        assert_eq!(turns.len(), 5);
        assert_strictly_alternating(&turns);

        let users: Vec<&str> = turns
            .iter()
            .filter(|t| t.role() == Role::User)
            .map(|t| t.content())
            .collect();
        assert!(users.contains(&format!("alpha {conversation}").as_str()));
        assert!(users.contains(&format!("beta {conversation}").as_str()));
    }
}

#[tokio::test]
async fn status_reads_do_not_wait_for_in_flight_run() {
    let pipeline = Arc::new(coordinator(
        Arc::new(StubTranscriber {
            reply: Ok("slow speech".to_string()),
            delay: Duration::from_millis(200),
        }),
        Arc::new(RecordingDialogue::default()),
        Arc::new(StubSynthesizer::ok(b"audio")),
    ));

    let run = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.run_pipeline(upload()).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    let latest = tokio::time::timeout(Duration::from_millis(50), async {
        pipeline.latest_exchange()
    })
    .await
    .expect("status read should not block");
    assert!(latest.is_empty());

    run.await.unwrap().unwrap();
    assert_eq!(pipeline.latest_exchange().user, "slow speech");
}

struct SlowDialogue {
    reply: String,
    delay: Duration,
}

#[async_trait]
impl DialogueModel for SlowDialogue {
    async fn complete(&self, _transcript: &[Turn]) -> Result<String, VoiceError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// Polls the transcript until `done` holds, failing after two seconds.
async fn wait_for_transcript(pipeline: &PipelineCoordinator, done: impl Fn(&[Turn]) -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if done(&pipeline.transcript().snapshot()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("transcript settled as {:?}", pipeline.transcript().snapshot()));
}

#[tokio::test]
async fn abandoned_run_still_completes() {
    let synth = Arc::new(StubSynthesizer::ok(b"audio"));
    let pipeline = coordinator(
        transcriber(Ok("hello")),
        Arc::new(SlowDialogue {
            reply: "Hi! What's your name?".to_string(),
            delay: Duration::from_millis(200),
        }),
        synth.clone(),
    );

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), pipeline.run_pipeline(upload())).await;
    assert!(abandoned.is_err(), "caller should give up mid-dialogue");

    wait_for_transcript(&pipeline, |turns| turns.len() == 3).await;
    assert_eq!(
        pipeline.transcript().snapshot(),
        vec![
            Turn::system(PROMPT),
            Turn::user("hello"),
            Turn::assistant("Hi! What's your name?"),
        ]
    );
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);

    // The gate was released, so the next run goes through.
    let next = tokio::time::timeout(Duration::from_secs(2), pipeline.run_pipeline(upload()))
        .await
        .expect("gate should be free")
        .unwrap();
    assert_eq!(next.user_text, "hello");
    assert_eq!(pipeline.transcript().turn_count(), 5);
}

#[tokio::test]
async fn abandoned_run_rolls_back_on_failure() {
    let synth = Arc::new(StubSynthesizer::failing("Murf Error: quota"));
    let pipeline = coordinator(
        transcriber(Ok("hello")),
        Arc::new(SlowDialogue {
            reply: "Hi!".to_string(),
            delay: Duration::from_millis(200),
        }),
        synth.clone(),
    )
    .with_rollback_on_failure(true);

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), pipeline.run_pipeline(upload())).await;
    assert!(abandoned.is_err(), "caller should give up mid-dialogue");
    assert_eq!(pipeline.transcript().turn_count(), 2);

    let synth_seen = synth.clone();
    wait_for_transcript(&pipeline, move |turns| {
        synth_seen.calls.load(Ordering::SeqCst) == 1 && turns.len() == 1
    })
    .await;
    assert_eq!(pipeline.transcript().snapshot(), vec![Turn::system(PROMPT)]);
}

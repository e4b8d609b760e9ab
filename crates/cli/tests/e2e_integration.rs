//! End-to-end tests for a RideDesk call.
//!
//! These drive a full session from passenger utterance to spoken reply:
//! scripted transcription and completion, the real booking actions, and
//! replies written to disk through the file sink.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ridedesk_actions::{Reservation, ReservationDesk, registry_with};
use ridedesk_agent::{
    ActionExecutor, CompletionClient, DialogueLoop, DialogueOutcome, DisengagementPolicy,
    FALLBACK_ANSWER, Session,
};
use ridedesk_config::DialogueConfig;
use ridedesk_core::action::{ActionRegistry, ActionRequest};
use ridedesk_core::error::{Error, ProviderError, VoiceError};
use ridedesk_core::event::{DomainEvent, EventBus};
use ridedesk_core::identity::Identity;
use ridedesk_core::message::{Conversation, TurnContent, TurnRole};
use ridedesk_core::provider::{CompletionOutcome, CompletionRequest, GenerationParams, Provider};
use ridedesk_core::voice::{AudioClip, SpokenAudio, Synthesizer, Transcriber, Transcript};
use ridedesk_voice::FileSink;

// ── Scripted collaborators ──────────────────────────────────────────────

/// Returns scripted outcomes in sequence and records every request.
struct ScriptedProvider {
    script: Mutex<VecDeque<CompletionOutcome>>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<CompletionOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, ProviderError> {
        self.seen.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        next.ok_or_else(|| ProviderError::InvalidResponse("script exhausted".into()))
    }
}

struct ScriptedTranscriber {
    lines: Mutex<VecDeque<&'static str>>,
}

impl ScriptedTranscriber {
    fn new(lines: Vec<&'static str>) -> Self {
        Self {
            lines: Mutex::new(lines.into()),
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for ScriptedTranscriber {
    fn name(&self) -> &str {
        "e2e_stt"
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, VoiceError> {
        clip.read().await?;
        let text = self.lines.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Transcript { text: text.into() })
    }
}

struct TextAsAudio;

#[async_trait::async_trait]
impl Synthesizer for TextAsAudio {
    fn name(&self) -> &str {
        "e2e_tts"
    }

    async fn synthesize(&self, text: &str) -> Result<SpokenAudio, VoiceError> {
        Ok(SpokenAudio {
            data: text.as_bytes().to_vec(),
            extension: "mp3",
        })
    }
}

#[derive(Default)]
struct BookingLedger {
    booked: Mutex<Vec<Reservation>>,
}

#[async_trait::async_trait]
impl ReservationDesk for BookingLedger {
    async fn book(
        &self,
        reservation: &Reservation,
    ) -> Result<ridedesk_actions::Confirmation, ridedesk_actions::BackendError> {
        self.booked.lock().unwrap().push(reservation.clone());
        Ok(ridedesk_actions::Confirmation {
            number: "RD-E2E00001".into(),
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn request(call_id: &str, action: &str, args: serde_json::Value) -> ActionRequest {
    ActionRequest::new(call_id, action, args.to_string())
}

fn answer(text: &str) -> CompletionOutcome {
    CompletionOutcome::FinalAnswer(text.into())
}

fn actions(requests: Vec<ActionRequest>) -> CompletionOutcome {
    CompletionOutcome::ActionRequested(requests)
}

struct Harness {
    session: Session,
    provider: Arc<ScriptedProvider>,
    ledger: Arc<BookingLedger>,
    bus: Arc<EventBus>,
    replies: tempfile::TempDir,
    clips: tempfile::TempDir,
}

impl Harness {
    fn new(script: Vec<CompletionOutcome>, heard: Vec<&'static str>) -> Self {
        Self::with_dialogue(script, heard, DialogueConfig::default())
    }

    fn with_dialogue(
        script: Vec<CompletionOutcome>,
        heard: Vec<&'static str>,
        dialogue_config: DialogueConfig,
    ) -> Self {
        let provider = Arc::new(ScriptedProvider::new(script));
        let ledger = Arc::new(BookingLedger::default());
        let registry: ActionRegistry =
            registry_with(Arc::new(ridedesk_actions::PlaceholderGeocoder), ledger.clone());
        let bus = Arc::new(EventBus::default());
        let replies = tempfile::tempdir().unwrap();

        let dialogue = DialogueLoop::new(
            CompletionClient::new(provider.clone(), GenerationParams::default()),
            ActionExecutor::new(Arc::new(registry), bus.clone()),
            dialogue_config,
            bus.clone(),
        );
        let session = Session::new(&Identity::default(), dialogue, DisengagementPolicy::default())
            .with_transcriber(Arc::new(ScriptedTranscriber::new(heard)))
            .with_voice(Arc::new(TextAsAudio), Arc::new(FileSink::new(replies.path())));

        Self {
            session,
            provider,
            ledger,
            bus,
            replies,
            clips: tempfile::tempdir().unwrap(),
        }
    }

    /// A recorded clip on disk, as the capture front end would leave it.
    fn clip(&self, n: usize) -> AudioClip {
        let path = self.clips.path().join(format!("utterance-{n}.wav"));
        std::fs::write(&path, b"RIFF....WAVEfmt ").unwrap();
        AudioClip::from_path(path)
    }

    fn reply_file(&self, n: usize) -> String {
        let path = self.replies.path().join(format!("reply-{n:03}.mp3"));
        String::from_utf8(std::fs::read(path).unwrap()).unwrap()
    }
}

fn roles(conversation: &Conversation) -> Vec<TurnRole> {
    conversation.turns().iter().map(|t| t.role).collect()
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_full_booking_call() {
    let trip = serde_json::json!({
        "pickupDateTime": "2024-01-01T09:00:00",
        "pickupLocation": {"latitude": "40.7128", "longitude": "-74.0060"},
        "dropoffLocation": {"latitude": "40.6413", "longitude": "-73.7781"}
    });
    let mut h = Harness::new(
        vec![
            answer("Happy to help. Where should we pick you up, and where are you going?"),
            actions(vec![
                request("call_1", "geocode", serde_json::json!({"streetAddress": "1 Main St"})),
                request("call_2", "geocode", serde_json::json!({"streetAddress": "JFK Terminal 4"})),
            ]),
            answer("Got it. What day and time should we pick you up?"),
            actions(vec![request("call_3", "create_new_reservation", trip)]),
            answer("You're booked for January 1st at 9 AM. Confirmation RD-E2E00001."),
        ],
        vec![
            "Hi, I need a ride with a wheelchair van.",
            "From 1 Main St to JFK Terminal 4.",
            "January first at 9 in the morning.",
        ],
    );

    let clip = h.clip(1);
    let first = h.session.handle_utterance(&clip).await.unwrap();
    assert_eq!(first.heard, "Hi, I need a ride with a wheelchair van.");
    assert!(first.text().unwrap().contains("Where should we pick you up"));

    let clip = h.clip(2);
    let second = h.session.handle_utterance(&clip).await.unwrap();
    assert!(second.text().unwrap().contains("What day and time"));

    let clip = h.clip(3);
    let third = h.session.handle_utterance(&clip).await.unwrap();
    assert!(third.text().unwrap().contains("RD-E2E00001"));

    // 5 completions across 3 utterances.
    assert_eq!(h.provider.calls(), 5);

    // Exactly one reservation, with the spoken time.
    let booked = h.ledger.booked.lock().unwrap();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].pickup_date_time.to_string(), "2024-01-01T09:00:00");

    // Every reply was spoken, in order.
    assert!(h.reply_file(1).contains("Where should we pick you up"));
    assert!(h.reply_file(3).contains("Confirmation"));

    assert_eq!(
        roles(h.session.conversation()),
        vec![
            TurnRole::System,
            TurnRole::User,
            TurnRole::Assistant,
            TurnRole::User,
            TurnRole::ActionRequest,
            TurnRole::ActionResult,
            TurnRole::ActionRequest,
            TurnRole::ActionResult,
            TurnRole::Assistant,
            TurnRole::User,
            TurnRole::ActionRequest,
            TurnRole::ActionResult,
            TurnRole::Assistant,
        ]
    );
}

#[tokio::test]
async fn e2e_every_result_follows_its_request() {
    let mut h = Harness::new(
        vec![
            actions(vec![
                request("a", "geocode", serde_json::json!({"streetAddress": "1 Main St"})),
                request("b", "get_time", serde_json::json!({})),
                request("c", "geocode", serde_json::json!({"street": "oops"})),
            ]),
            answer("Thanks, I have your pickup address."),
        ],
        vec!["Pick me up at 1 Main St"],
    );

    let clip = h.clip(1);
    h.session.handle_utterance(&clip).await.unwrap();

    let turns = h.session.conversation().turns();
    for (i, turn) in turns.iter().enumerate() {
        if let TurnContent::ActionResult(result) = &turn.content {
            let TurnContent::ActionRequest(req) = &turns[i - 1].content else {
                panic!("result at {i} is not preceded by its request");
            };
            assert_eq!(req.call_id, result.call_id);
        }
    }

    let results: Vec<bool> = turns
        .iter()
        .filter_map(|t| match &t.content {
            TurnContent::ActionResult(r) => Some(r.is_success()),
            _ => None,
        })
        .collect();
    assert_eq!(results, vec![true, false, false]);
}

#[tokio::test]
async fn e2e_missing_pickup_time_is_recovered_by_dialogue() {
    let mut h = Harness::new(
        vec![
            actions(vec![request(
                "call_1",
                "create_new_reservation",
                serde_json::json!({
                    "pickupLocation": {"latitude": "40.7128", "longitude": "-74.0060"},
                    "dropoffLocation": {"latitude": "40.6413", "longitude": "-73.7781"}
                }),
            )]),
            answer("What time would you like to be picked up?"),
        ],
        vec!["Book my ride to the airport"],
    );

    let clip = h.clip(1);
    let reply = h.session.handle_utterance(&clip).await.unwrap();

    assert_eq!(reply.text(), Some("What time would you like to be picked up?"));
    assert!(h.ledger.booked.lock().unwrap().is_empty());

    // The model saw why the booking was refused.
    let second_call = &h.provider.seen.lock().unwrap()[1];
    let fed_back = second_call.turns.last().unwrap().rendered();
    assert!(fed_back.contains("create_new_reservation"), "{fed_back}");
}

#[tokio::test]
async fn e2e_runaway_actions_end_with_fallback() {
    let geocode = || {
        actions(vec![request(
            "loop",
            "geocode",
            serde_json::json!({"streetAddress": "1 Main St"}),
        )])
    };
    let mut h = Harness::with_dialogue(
        vec![geocode(), geocode(), geocode()],
        vec!["Where am I?"],
        DialogueConfig {
            max_round_trips: 2,
            ..DialogueConfig::default()
        },
    );

    let clip = h.clip(1);
    let reply = h.session.handle_utterance(&clip).await.unwrap();

    assert_eq!(reply.outcome, DialogueOutcome::BoundExceeded(FALLBACK_ANSWER.into()));
    assert_eq!(h.provider.calls(), 3);
    assert_eq!(h.reply_file(1), FALLBACK_ANSWER);
}

#[tokio::test]
async fn e2e_window_keeps_system_prompt() {
    let script = (0..12).map(|i| answer(&format!("Reply {i}"))).collect();
    let heard: Vec<&'static str> = (0..12).map(|_| "Still here, go on").collect();
    let mut h = Harness::new(script, heard);

    for n in 0..12 {
        let clip = h.clip(n);
        h.session.handle_utterance(&clip).await.unwrap();
    }

    let seen = h.provider.seen.lock().unwrap();
    let last = seen.last().unwrap();
    assert_eq!(last.turns[0].role, TurnRole::System);
    assert_eq!(last.turns.len(), 1 + GenerationParams::default().max_context_turns);
    // Full history is still in the session.
    assert_eq!(h.session.conversation().len(), 1 + 12 * 2);
}

#[tokio::test]
async fn e2e_completion_outage_surfaces_and_call_continues() {
    let mut h = Harness::new(vec![], vec!["Hello?", "Hello, are you there?"]);

    let clip = h.clip(1);
    let err = h.session.handle_utterance(&clip).await.unwrap_err();
    assert!(matches!(err, Error::CompletionUnavailable(_)));
    assert_eq!(roles(h.session.conversation()), vec![TurnRole::System, TurnRole::User]);
    assert!(!h.session.is_ended());
}

#[tokio::test]
async fn e2e_silent_caller_is_disengaged() {
    let mut h = Harness::new(
        vec![answer("Hello? How can I help?"), answer("Are you still there?")],
        vec!["", "", ""],
    );
    let mut events = h.bus.subscribe();

    let clip = h.clip(1);
    h.session.handle_utterance(&clip).await.unwrap();
    let clip = h.clip(2);
    h.session.handle_utterance(&clip).await.unwrap();
    let clip = h.clip(3);
    let last = h.session.handle_utterance(&clip).await.unwrap();

    assert!(matches!(last.outcome, DialogueOutcome::Disengaged(_)));
    assert!(h.session.is_ended());
    assert!(h.reply_file(3).contains("Goodbye"));

    let mut ended = false;
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::SessionEnded { reason, .. } = event.as_ref() {
            assert_eq!(reason, "disengaged");
            ended = true;
        }
    }
    assert!(ended);
}

#[tokio::test]
async fn e2e_transcript_serializes_every_turn() {
    let mut h = Harness::new(
        vec![
            actions(vec![request(
                "call_1",
                "geocode",
                serde_json::json!({"streetAddress": "1 Main St"}),
            )]),
            answer("Found it."),
        ],
        vec!["1 Main St please"],
    );
    let clip = h.clip(1);
    h.session.handle_utterance(&clip).await.unwrap();

    let json = serde_json::to_value(h.session.conversation()).unwrap();
    let turns = json["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 5);
    assert_eq!(turns[2]["role"], "action_request");
    assert_eq!(turns[3]["role"], "action_result");

    let restored: Conversation = serde_json::from_value(json).unwrap();
    assert_eq!(restored.turns(), h.session.conversation().turns());
}

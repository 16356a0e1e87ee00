//! Turn orchestration

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::LorekeeperConfig;
use crate::conversation::{ConversationLog, Speaker, Transcript};
use crate::error::{LorekeeperError, Result};
use crate::llm::GenerationBackend;
use crate::prompt::{Persona, PromptBuilder};
use crate::retrieval::{Corpus, LexicalScorer, SimilarityScorer, retrieve_context};
use crate::speech::{SilentSynthesizer, SpeechSynthesizer};

use super::events::{EventEmitter, EventSender};
use super::state::{
    DialogueState, FALLBACK_MESSAGE, IgnoredReason, SubmitOutcome, TurnFailure, TurnReport,
};

/// Role name for the player in the prompt history
pub const PLAYER_ROLE: &str = "User";

/// Role name for the NPC in the prompt history
pub const NPC_ROLE: &str = "NPC";

/// Drives one NPC conversation.
///
/// Each [`submit`](Self::submit) runs a full turn: retrieve lore, build the
/// prompt, call the backend, record the exchange, and hand the answer to the
/// synthesizer. At most one turn runs at a time; submissions arriving while
/// a turn is in flight are dropped.
///
/// The orchestrator is `Send + Sync`; share it behind an `Arc`.
pub struct DialogueOrchestrator {
    persona: Persona,
    corpus: Corpus,
    scorer: Arc<dyn SimilarityScorer>,
    backend: Arc<dyn GenerationBackend>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    threshold: f32,
    timeout: Duration,
    conversation: RwLock<ConversationLog>,
    transcript: RwLock<Transcript>,
    busy: Mutex<()>,
    state: watch::Sender<DialogueState>,
    cancel: CancellationToken,
    events: EventEmitter,
}

impl DialogueOrchestrator {
    pub fn builder() -> DialogueOrchestratorBuilder {
        DialogueOrchestratorBuilder::new()
    }

    /// Run one player turn.
    ///
    /// Never fails outright: backend, retrieval, and timeout errors end the
    /// turn on [`FALLBACK_MESSAGE`] and are reported in
    /// [`SubmitOutcome::Failed`].
    pub async fn submit(&self, query: &str) -> SubmitOutcome {
        if self.cancel.is_cancelled() {
            return SubmitOutcome::Ignored(IgnoredReason::ShutDown);
        }
        let question = query.trim();
        if question.is_empty() {
            return SubmitOutcome::Ignored(IgnoredReason::Empty);
        }
        let Ok(permit) = self.busy.try_lock() else {
            tracing::debug!("Turn in flight, dropping submission");
            return SubmitOutcome::Ignored(IgnoredReason::Busy);
        };
        let _guard = BusyGuard::enter(permit, &self.state, &self.events);

        let turn_id = Uuid::new_v4();
        let turn_key = turn_id.to_string();
        let started_at = Utc::now();
        let start = Instant::now();

        self.transcript.write().await.push(Speaker::Player, query);
        self.events.player_said(&turn_key, query);
        tracing::info!(turn_id = %turn_id, query = %question, "Turn started");

        match self.run_turn(question).await {
            Ok((context, prompt, response)) => {
                self.transcript
                    .write()
                    .await
                    .push(Speaker::Npc, response.as_str());
                self.events.npc_said(&turn_key, &response);
                self.speak(turn_key, response.clone());

                {
                    let mut log = self.conversation.write().await;
                    log.add_entry(PLAYER_ROLE, question);
                    log.add_entry(NPC_ROLE, response.as_str());
                }

                let elapsed = start.elapsed();
                tracing::info!(
                    turn_id = %turn_id,
                    context_lines = context.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Turn completed"
                );

                SubmitOutcome::Answered(TurnReport {
                    turn_id,
                    query: question.to_string(),
                    context,
                    prompt,
                    response,
                    started_at,
                    elapsed,
                })
            }
            Err(error) => {
                self.transcript
                    .write()
                    .await
                    .push(Speaker::Npc, FALLBACK_MESSAGE);
                tracing::error!(turn_id = %turn_id, error = %error, "Turn failed");
                self.events.turn_failed(&turn_key, &error.to_string());

                SubmitOutcome::Failed(TurnFailure {
                    turn_id,
                    query: question.to_string(),
                    error,
                    started_at,
                    elapsed: start.elapsed(),
                })
            }
        }
    }

    async fn run_turn(&self, question: &str) -> Result<(Vec<String>, String, String)> {
        let mut builder = PromptBuilder::from_persona(&self.persona);
        builder.set_question(PLAYER_ROLE, question);

        let context = retrieve_context(
            self.scorer.as_ref(),
            question,
            self.corpus.lines(),
            self.threshold,
        )
        .await?;
        for line in &context {
            builder.add_context_document(line.as_str());
        }

        let prompt = builder.build(&*self.conversation.read().await);
        tracing::debug!(prompt = %prompt, "Rendered prompt");

        let response = self.generate(&prompt).await?;
        Ok((context, prompt, response))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(LorekeeperError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.backend.generate(prompt)) => {
                result.map_err(|_| LorekeeperError::Timeout(self.timeout))?
            }
        }
    }

    fn speak(&self, turn_id: String, text: String) {
        let synthesizer = Arc::clone(&self.synthesizer);
        let events = self.events.clone();
        tokio::spawn(async move {
            match synthesizer.synthesize(&text).await {
                Ok(clip) => events.speech_ready(&turn_id, clip),
                Err(e) => {
                    tracing::error!(turn_id = %turn_id, error = %e, "Speech synthesis failed");
                    events.speech_failed(&turn_id, &e.to_string());
                }
            }
        });
    }

    /// Stop accepting turns and cancel any in-flight generation
    pub fn shutdown(&self) {
        tracing::info!("Shutting down dialogue orchestrator");
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> DialogueState {
        *self.state.borrow()
    }

    /// Watch Idle/Busy transitions
    pub fn subscribe_state(&self) -> watch::Receiver<DialogueState> {
        self.state.subscribe()
    }

    /// Snapshot of the display transcript
    pub async fn transcript(&self) -> Transcript {
        self.transcript.read().await.clone()
    }

    /// Snapshot of the prompt history
    pub async fn conversation(&self) -> ConversationLog {
        self.conversation.read().await.clone()
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Holds the busy lock for a turn and flips the state back to Idle when
/// dropped, on every exit path.
struct BusyGuard<'a> {
    _permit: MutexGuard<'a, ()>,
    state: &'a watch::Sender<DialogueState>,
    events: &'a EventEmitter,
}

impl<'a> BusyGuard<'a> {
    fn enter(
        permit: MutexGuard<'a, ()>,
        state: &'a watch::Sender<DialogueState>,
        events: &'a EventEmitter,
    ) -> Self {
        state.send_replace(DialogueState::Busy);
        events.state_changed(DialogueState::Busy);
        Self {
            _permit: permit,
            state,
            events,
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(DialogueState::Idle);
        self.events.state_changed(DialogueState::Idle);
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`DialogueOrchestrator`]
pub struct DialogueOrchestratorBuilder {
    persona: Option<Persona>,
    corpus: Corpus,
    scorer: Option<Arc<dyn SimilarityScorer>>,
    backend: Option<Arc<dyn GenerationBackend>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    config: LorekeeperConfig,
    event_sender: Option<EventSender>,
}

impl DialogueOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            persona: None,
            corpus: Corpus::default(),
            scorer: None,
            backend: None,
            synthesizer: None,
            config: LorekeeperConfig::default(),
            event_sender: None,
        }
    }

    /// Set the persona. Defaults to the one resolved from config.
    pub fn persona(mut self, persona: Persona) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn corpus(mut self, corpus: Corpus) -> Self {
        self.corpus = corpus;
        self
    }

    /// Set the similarity scorer. Defaults to [`LexicalScorer`].
    pub fn scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Set the generation backend (required)
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the speech synthesizer. Defaults to [`SilentSynthesizer`].
    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Threshold, timeout and history cap are taken from here
    pub fn config(mut self, config: LorekeeperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    pub fn build(self) -> Result<DialogueOrchestrator> {
        self.config.validate()?;

        let backend = self.backend.ok_or_else(|| {
            LorekeeperError::Configuration("Generation backend is required".to_string())
        })?;
        let persona = match self.persona {
            Some(persona) => persona,
            None => self.config.persona.resolve()?,
        };
        let scorer = self
            .scorer
            .unwrap_or_else(|| Arc::new(LexicalScorer::new()));
        let synthesizer = self
            .synthesizer
            .unwrap_or_else(|| Arc::new(SilentSynthesizer::new()));

        let (state, _) = watch::channel(DialogueState::Idle);

        Ok(DialogueOrchestrator {
            persona,
            corpus: self.corpus,
            scorer,
            backend,
            synthesizer,
            threshold: self.config.retrieval.threshold,
            timeout: self.config.backend.timeout,
            conversation: RwLock::new(ConversationLog::with_max_entries(
                self.config.history.max_entries,
            )),
            transcript: RwLock::new(Transcript::new()),
            busy: Mutex::new(()),
            state,
            cancel: CancellationToken::new(),
            events: EventEmitter::new(self.event_sender),
        })
    }
}

impl Default for DialogueOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{DialogueEvent, event_channel};
    use crate::speech::AudioClip;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct ScriptedBackend {
        reply: Result<String>,
        calls: AtomicUsize,
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Default::default(),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(LorekeeperError::Network("connection refused".to_string())),
                calls: AtomicUsize::new(0),
                prompts: Default::default(),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(LorekeeperError::Network(e.to_string())),
            }
        }
    }

    /// Blocks until released
    struct GatedBackend {
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl GenerationBackend for GatedBackend {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok("Done waiting.".to_string())
        }
    }

    struct HangingBackend;

    #[async_trait]
    impl GenerationBackend for HangingBackend {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            std::future::pending().await
        }
    }

    struct BrokenSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for BrokenSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<AudioClip> {
            Err(LorekeeperError::Adapter("no voice model".to_string()))
        }
    }

    fn orchestrator(backend: Arc<dyn GenerationBackend>) -> DialogueOrchestrator {
        DialogueOrchestrator::builder()
            .persona(Persona::new("Be brief.", "Blacksmith"))
            .corpus(Corpus::from_text(
                "The shop opens at 9am.\nDragons live in the north.",
            ))
            .backend(backend)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_answered_turn_updates_log_and_transcript() {
        let backend = ScriptedBackend::ok("At nine.");
        let npc = orchestrator(backend.clone());

        let outcome = npc.submit("  when does the shop open  ").await;
        let SubmitOutcome::Answered(report) = outcome else {
            panic!("expected an answer, got {:?}", outcome);
        };

        assert_eq!(report.query, "when does the shop open");
        assert_eq!(report.context, vec!["The shop opens at 9am."]);
        assert_eq!(report.response, "At nine.");
        assert!(report.prompt.contains("### Context ###\nThe shop opens at 9am.\n"));
        assert!(report.prompt.ends_with("### Question ###\nUser: when does the shop open\n"));

        let log = npc.conversation().await;
        let entries: Vec<_> = log.entries().map(|e| (e.role(), e.content())).collect();
        assert_eq!(
            entries,
            vec![("User", "when does the shop open"), ("NPC", "At nine.")]
        );

        let transcript = npc.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.lines()[0].text, "  when does the shop open  ");
        assert_eq!(transcript.lines()[1].speaker, Speaker::Npc);
        assert_eq!(npc.state(), DialogueState::Idle);
    }

    #[tokio::test]
    async fn test_history_feeds_next_prompt() {
        let backend = ScriptedBackend::ok("Aye.");
        let npc = orchestrator(backend.clone());

        npc.submit("hello").await;
        npc.submit("again").await;

        let prompts = backend.prompts.lock().unwrap();
        assert!(!prompts[0].contains("### Conversation History ###"));
        assert!(prompts[1].contains("### Conversation History ###\nUser: hello\nNPC: Aye.\n\n"));
    }

    #[tokio::test]
    async fn test_empty_query_ignored() {
        let backend = ScriptedBackend::ok("unused");
        let npc = orchestrator(backend.clone());

        let outcome = npc.submit("   \n").await;
        assert!(matches!(outcome, SubmitOutcome::Ignored(IgnoredReason::Empty)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(npc.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_shows_fallback_and_keeps_log() {
        let npc = orchestrator(ScriptedBackend::failing());

        let outcome = npc.submit("hello").await;
        let SubmitOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert!(matches!(failure.error, LorekeeperError::Network(_)));

        assert!(npc.conversation().await.is_empty());
        let transcript = npc.transcript().await;
        assert_eq!(transcript.last().unwrap().text, FALLBACK_MESSAGE);
        assert_eq!(npc.state(), DialogueState::Idle);
    }

    #[tokio::test]
    async fn test_concurrent_submission_dropped() {
        let backend = Arc::new(GatedBackend {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let npc = Arc::new(orchestrator(backend.clone()));

        let first = {
            let npc = npc.clone();
            tokio::spawn(async move { npc.submit("first").await })
        };
        backend.entered.notified().await;
        assert_eq!(npc.state(), DialogueState::Busy);

        let second = npc.submit("second").await;
        assert!(matches!(second, SubmitOutcome::Ignored(IgnoredReason::Busy)));
        let transcript = npc.transcript().await;
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.last().unwrap().text, "first");

        backend.release.notify_one();
        assert!(first.await.unwrap().is_answered());
        assert_eq!(npc.state(), DialogueState::Idle);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let log = npc.conversation().await;
        let contents: Vec<_> = log.entries().map(|e| e.content()).collect();
        assert_eq!(contents, vec!["first", "Done waiting."]);
        assert_eq!(npc.transcript().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_turn() {
        let mut config = LorekeeperConfig::default();
        config.backend.timeout = Duration::from_secs(5);
        let npc = DialogueOrchestrator::builder()
            .backend(Arc::new(HangingBackend))
            .config(config)
            .build()
            .unwrap();

        let outcome = npc.submit("hello").await;
        let SubmitOutcome::Failed(failure) = outcome else {
            panic!("expected timeout");
        };
        assert!(matches!(failure.error, LorekeeperError::Timeout(_)));
        assert_eq!(npc.state(), DialogueState::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_and_rejects() {
        let npc = Arc::new(orchestrator(Arc::new(HangingBackend)));
        let mut states = npc.subscribe_state();

        let turn = {
            let npc = npc.clone();
            tokio::spawn(async move { npc.submit("hello").await })
        };
        states.wait_for(|s| *s == DialogueState::Busy).await.unwrap();

        npc.shutdown();
        let outcome = turn.await.unwrap();
        let SubmitOutcome::Failed(failure) = outcome else {
            panic!("expected cancellation");
        };
        assert!(matches!(failure.error, LorekeeperError::Cancelled));

        assert!(matches!(
            npc.submit("again").await,
            SubmitOutcome::Ignored(IgnoredReason::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_dropped_submit_returns_to_idle() {
        let npc = Arc::new(orchestrator(Arc::new(HangingBackend)));
        let mut states = npc.subscribe_state();

        let turn = {
            let npc = npc.clone();
            tokio::spawn(async move { npc.submit("hello").await })
        };
        states.wait_for(|s| *s == DialogueState::Busy).await.unwrap();

        turn.abort();
        states.wait_for(|s| *s == DialogueState::Idle).await.unwrap();
        assert!(npc.submit("").await.is_ignored());
    }

    #[tokio::test]
    async fn test_events_and_speech_failure() {
        let (tx, mut rx) = event_channel(32);
        let npc = DialogueOrchestrator::builder()
            .backend(ScriptedBackend::ok("Welcome."))
            .synthesizer(Arc::new(BrokenSynthesizer))
            .event_sender(tx)
            .build()
            .unwrap();

        let outcome = npc.submit("hi").await;
        assert!(outcome.is_answered());

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.event_type());
            if matches!(event, DialogueEvent::SpeechFailed { .. }) {
                break;
            }
        }
        assert_eq!(kinds[..3], ["state_changed", "player_said", "npc_said"]);
        assert!(kinds.contains(&"speech_failed"));
        assert_eq!(npc.conversation().await.len(), 2);
    }

    #[test]
    fn test_build_requires_backend() {
        let result = DialogueOrchestrator::builder().build();
        assert!(matches!(result, Err(LorekeeperError::Configuration(_))));
    }
}

//! End-to-end dialogue turns against a local HTTP server

mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{FakeOllama, Reply, closed_base_url};
use lorekeeper_core::prelude::*;
use lorekeeper_core::dialogue::FALLBACK_MESSAGE;

fn config_for(base_url: String) -> LorekeeperConfig {
    let mut config = LorekeeperConfig::default();
    config.backend.base_url = base_url;
    config.backend.timeout = Duration::from_secs(5);
    config
}

fn build(config: LorekeeperConfig) -> DialogueOrchestrator {
    DialogueOrchestrator::builder()
        .persona(Persona::new("Answer briefly.", "You are Mara, the blacksmith."))
        .corpus(Corpus::from_text(
            "The shop opens at 9am.\nDragons live in the north.\n",
        ))
        .backend(Arc::new(OllamaBackend::from_config(&config.backend)))
        .config(config)
        .build()
        .expect("orchestrator should build")
}

#[tokio::test]
async fn test_full_turn_through_http() {
    let server = FakeOllama::start(Reply::Chunks(vec![
        "{\"response\":\"We open \"}\n".to_string(),
        "{\"response\":\"at nine.\"}\n".to_string(),
    ]))
    .await;
    let npc = build(config_for(server.base_url()));

    let outcome = npc.submit("When does the shop open?").await;
    let SubmitOutcome::Answered(report) = outcome else {
        panic!("expected an answer, got {:?}", outcome);
    };
    assert_eq!(report.response, "We open at nine.");
    assert_eq!(report.context, vec!["The shop opens at 9am."]);

    let requests = server.requests();
    let prompt = requests[0]["prompt"].as_str().unwrap();
    assert_eq!(
        prompt,
        "### System ###\nAnswer briefly.\n\n\
         ### Assistant Role ###\nYou are Mara, the blacksmith.\n\n\
         ### Context ###\nThe shop opens at 9am.\n\n\
         ### Question ###\nUser: When does the shop open?\n"
    );
    assert_eq!(requests[0]["model"], "llama3:8b");
}

#[tokio::test]
async fn test_second_turn_carries_history() {
    let server = FakeOllama::start(Reply::body("{\"response\":\"Aye.\"}\n")).await;
    let npc = build(config_for(server.base_url()));

    npc.submit("Hello").await;
    npc.submit("Where do dragons live").await;

    let requests = server.requests();
    let second = requests[1]["prompt"].as_str().unwrap();
    assert!(second.contains("### Conversation History ###\nUser: Hello\nNPC: Aye.\n\n"));
    assert!(second.contains("### Context ###\nDragons live in the north.\n"));
}

#[tokio::test]
async fn test_unreachable_backend_falls_back() {
    let npc = build(config_for(closed_base_url().await));

    let outcome = npc.submit("hello").await;
    assert!(matches!(outcome, SubmitOutcome::Failed(ref f) if f.error.is_network()));
    assert_eq!(outcome.reply(), Some(FALLBACK_MESSAGE));

    assert!(npc.conversation().await.is_empty());
    let transcript = npc.transcript().await;
    let texts: Vec<_> = transcript.lines().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["hello", FALLBACK_MESSAGE]);
    assert_eq!(npc.state(), DialogueState::Idle);
}

#[tokio::test]
async fn test_history_cap_evicts_oldest() {
    let server = FakeOllama::start(Reply::body("{\"response\":\"ok\"}\n")).await;
    let mut config = config_for(server.base_url());
    config.history.max_entries = Some(4);
    let npc = build(config);

    for question in ["one", "two", "three"] {
        assert!(npc.submit(question).await.is_answered());
    }

    let log = npc.conversation().await;
    let contents: Vec<_> = log.entries().map(|e| e.content()).collect();
    assert_eq!(contents, vec!["two", "ok", "three", "ok"]);
}

#[tokio::test]
async fn test_config_and_corpus_from_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let corpus_path = dir.path().join("lore.txt");
    std::fs::write(&corpus_path, "The mill burned down last winter.\r\n\r\nWolves roam the pass.\r\n")
        .unwrap();

    let server = FakeOllama::start(Reply::body("{\"response\":\"Sad times.\"}\n")).await;
    let config_path = dir.path().join("lorekeeper.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(
        file,
        "[backend]\nbase_url = \"{}\"\nmodel = \"mistral\"\ntimeout = \"5s\"\n\n\
         [retrieval]\nthreshold = 0.3\ncorpus_path = \"{}\"\n\n\
         [persona]\nassistant_role = \"You are the miller.\"\n",
        server.base_url(),
        corpus_path.display()
    )
    .unwrap();

    let config = LorekeeperConfig::from_file(&config_path).unwrap();
    let corpus = Corpus::load(config.retrieval.corpus_path.as_ref().unwrap()).unwrap();
    assert_eq!(corpus.len(), 2);

    let npc = DialogueOrchestrator::builder()
        .corpus(corpus)
        .backend(Arc::new(OllamaBackend::from_config(&config.backend)))
        .config(config)
        .build()
        .unwrap();
    assert_eq!(npc.persona().assistant_role(), "You are the miller.");

    let outcome = npc.submit("What happened to the mill?").await;
    let SubmitOutcome::Answered(report) = outcome else {
        panic!("expected an answer");
    };
    assert_eq!(report.context, vec!["The mill burned down last winter."]);
    assert_eq!(server.requests()[0]["model"], "mistral");
}

struct OneClip(Option<AudioClip>);

impl AudioCapture for OneClip {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<AudioClip>> {
        Ok(self.0.take())
    }
}

struct FixedTranscriber(&'static str);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<String> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn test_voice_input_submits_transcription() {
    let server = FakeOllama::start(Reply::body("{\"response\":\"Nine sharp.\"}\n")).await;
    let npc = build(config_for(server.base_url()));

    let clip = AudioClip::new(vec![0.0; 16_000], 16_000);
    let mut voice = VoiceInput::new(
        Box::new(OneClip(Some(clip))),
        Arc::new(FixedTranscriber(" when does the shop open ")),
    );

    voice.begin().unwrap();
    let outcome = voice.finish_and_submit(&npc).await.unwrap().unwrap();
    assert_eq!(outcome.reply(), Some("Nine sharp."));

    let transcript = npc.transcript().await;
    assert_eq!(transcript.lines()[0].text, " when does the shop open ");
    let log = npc.conversation().await;
    assert_eq!(log.entries().next().unwrap().content(), "when does the shop open");
}

#[tokio::test]
async fn test_voice_input_without_audio_submits_nothing() {
    let server = FakeOllama::start(Reply::body("{\"response\":\"unused\"}\n")).await;
    let npc = build(config_for(server.base_url()));

    let mut voice = VoiceInput::new(Box::new(OneClip(None)), Arc::new(FixedTranscriber("x")));
    voice.begin().unwrap();
    assert!(voice.finish_and_submit(&npc).await.unwrap().is_none());
    assert!(server.requests().is_empty());
}

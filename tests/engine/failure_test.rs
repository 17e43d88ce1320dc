//! Failure recovery tests: every failure becomes an apology.

use kindred::engine::{EngineSettings, TurnError, TurnOutcome, TurnState};
use kindred::profile::UserProfile;
use kindred::providers::ProviderError;
use kindred::tools::{ToolAnswers, ToolError};
use kindred::types::MoodLabel;
use tokio::sync::mpsc;

use crate::support::{engine_with, engine_with_settings, settings, Script, ScriptedBackend};

fn last_reply(engine: &kindred::engine::ConversationEngine) -> (String, MoodLabel) {
    let transcript = engine.transcript();
    let last = transcript.last().expect("reply appended");
    (last.text.clone(), last.mood)
}

#[tokio::test]
async fn missing_backend_yields_configuration_apology() {
    let (engine, store) = engine_with(None);

    let outcome = engine.submit("I feel sad").await.expect("accepted");
    assert!(matches!(outcome, TurnOutcome::Failed(TurnError::Configuration)));

    let (text, mood) = last_reply(&engine);
    assert_eq!(text, TurnError::Configuration.user_message());
    assert!(text.contains("not properly configured"));
    assert_eq!(mood, MoodLabel::Apologetic);
    assert_eq!(engine.profile(), UserProfile::default());
    assert_eq!(
        kindred::store::KeyValueStore::get(
            store.as_ref(),
            kindred::profile::PROFILE_KEY,
            serde_json::Value::Null
        ),
        serde_json::Value::Null
    );
}

#[tokio::test]
async fn rate_limit_and_server_errors_get_distinct_copy() {
    let backend = ScriptedBackend::new(vec![
        Script::Status(429, "Rate limit reached"),
        Script::Status(503, "overloaded"),
        Script::Status(400, "bad request"),
    ]);
    let (engine, _store) = engine_with(Some(backend));

    let mut copies = Vec::new();
    for _ in 0..3 {
        match engine.submit("hello").await.expect("accepted") {
            TurnOutcome::Failed(err @ TurnError::Api { .. }) => {
                let (text, mood) = last_reply(&engine);
                assert_eq!(text, err.user_message());
                assert_eq!(mood, MoodLabel::Apologetic);
                copies.push(text);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_ne!(copies[0], copies[1]);
    assert_ne!(copies[0], copies[2]);
    assert_ne!(copies[1], copies[2]);
    assert!(copies[2].starts_with("I'm so sorry, I seem to be having trouble right now."));
}

#[tokio::test]
async fn empty_stream_is_a_failure() {
    let backend = ScriptedBackend::new(vec![Script::Fragments(vec![])]);
    let (engine, _store) = engine_with(Some(backend));

    let outcome = engine.submit("I am happy today").await.expect("accepted");
    assert!(matches!(outcome, TurnOutcome::Failed(TurnError::Streaming(_))));
    assert_eq!(last_reply(&engine).1, MoodLabel::Apologetic);
    assert_eq!(engine.profile(), UserProfile::default());
    assert_eq!(engine.status().state, TurnState::Idle);
}

#[tokio::test]
async fn whitespace_reply_still_completes() {
    let backend = ScriptedBackend::new(vec![Script::Fragments(vec!["  "])]);
    let (engine, _store) = engine_with(Some(backend));

    let outcome = engine.submit("I am happy today").await.expect("accepted");
    assert!(matches!(outcome, TurnOutcome::Answered { .. }));
    assert_eq!(last_reply(&engine), ("  ".to_owned(), MoodLabel::Happy));
}

#[tokio::test]
async fn mid_stream_error_discards_partial_text() {
    let (tx, rx) = mpsc::channel(8);
    let backend = ScriptedBackend::new(vec![Script::Channel(rx)]);
    let (engine, _store) = engine_with(Some(backend));

    tx.send(Ok("partial ".to_owned())).await.expect("buffered");
    tx.send(Err(ProviderError::Parse("connection reset".to_owned())))
        .await
        .expect("buffered");
    drop(tx);

    let outcome = engine.submit("hello").await.expect("accepted");
    assert!(matches!(outcome, TurnOutcome::Failed(TurnError::Streaming(_))));
    let (text, _) = last_reply(&engine);
    assert!(!text.contains("partial"));
    assert_eq!(engine.transcript().len(), 2);
}

#[tokio::test]
async fn tool_failure_becomes_an_apology() {
    let settings = EngineSettings {
        tool_answers: ToolAnswers {
            exercises: &[],
            sleep_tips: &[],
        },
        ..settings()
    };
    let (engine, store) = engine_with_settings(settings, None);

    let outcome = engine
        .submit("any mindfulness ideas? I feel anxious")
        .await
        .expect("accepted");
    let err = match outcome {
        TurnOutcome::Failed(err @ TurnError::ToolExecution(ToolError::NoAnswers(_))) => err,
        other => panic!("unexpected outcome: {other:?}"),
    };

    let (text, mood) = last_reply(&engine);
    assert_eq!(text, err.user_message());
    assert!(text.starts_with("I'm so sorry, I seem to be having trouble right now."));
    assert_eq!(mood, MoodLabel::Apologetic);
    assert_eq!(engine.transcript().len(), 2);
    assert_eq!(engine.profile(), UserProfile::default());
    assert_eq!(
        kindred::store::KeyValueStore::get(
            store.as_ref(),
            kindred::profile::PROFILE_KEY,
            serde_json::Value::Null
        ),
        serde_json::Value::Null
    );
    assert_eq!(engine.status().state, TurnState::Idle);
}

#[tokio::test]
async fn overflowing_measurement_fails_the_bmi_tool() {
    let (engine, _store) = engine_with(None);
    let message = format!("weight {}kg height 1.75m", "9".repeat(400));

    let outcome = engine.submit(&message).await.expect("accepted");
    assert!(matches!(
        outcome,
        TurnOutcome::Failed(TurnError::ToolExecution(_))
    ));
    assert_eq!(last_reply(&engine).1, MoodLabel::Apologetic);
    assert_eq!(engine.profile(), UserProfile::default());
    assert!(!engine.status().loading);
}

use serde_json::json;
use werewolf_server::{
    models::{event_log::EventLog, role::Faction},
    services::{collaborators::SummaryGenerator, summary::HttpSummaryGenerator},
};
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn sample_log() -> EventLog {
    let mut log = EventLog::new();
    log.public("Night 1");
    log.wolf("🐺 1. Alice votes to kill 4. Dave");
    log.public("📊 3. Carol was exiled by the village");
    log
}

#[tokio::test]
async fn test_summary_wraps_the_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer secret"))
        .and(body_string_contains("exiled by the village"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  The wolves played it safe.  " } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let generator = HttpSummaryGenerator::new(
        format!("{}/v1/chat/completions", mock_server.uri()),
        "test-model",
    )
    .with_api_key(Some("secret".into()));

    let review = generator
        .summarize(&sample_log(), Faction::Werewolves)
        .await
        .unwrap();
    assert!(review.contains("🤖 Game review"));
    assert!(review.contains("The wolves played it safe."));
    assert!(!review.contains("  The wolves"));
}

#[tokio::test]
async fn test_custom_prompt_placeholders_are_filled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("Winner side: Werewolves"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "ok" } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let generator = HttpSummaryGenerator::new(mock_server.uri(), "test-model")
        .with_prompt(Some("Winner side: {winning_faction}\n{game_data}".into()));

    let review = generator
        .summarize(&sample_log(), Faction::Werewolves)
        .await
        .unwrap();
    assert!(review.contains("ok"));
}

#[tokio::test]
async fn test_empty_completion_yields_empty_review() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&mock_server)
        .await;

    let generator = HttpSummaryGenerator::new(mock_server.uri(), "test-model");
    let review = generator
        .summarize(&sample_log(), Faction::Villagers)
        .await
        .unwrap();
    assert_eq!(review, "");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let generator = HttpSummaryGenerator::new(mock_server.uri(), "test-model");
    assert!(generator
        .summarize(&sample_log(), Faction::Villagers)
        .await
        .is_err());
}

mod common;

use common::*;
use futures::StreamExt;
use mockito::Matcher;
use sf_health_analyzer::ai::stream::EventStreamParser;
use sf_health_analyzer::ai::{
    AgentRequest, AgentTool, ChatRequest, FailureKind, HttpInferenceClient, InferenceTransport,
    InsightsOrchestrator, Message,
};
use sf_health_analyzer::config::InferenceConfig;
use sf_health_analyzer::models::TimeRange;
use std::sync::Arc;

fn chat_request() -> ChatRequest {
    ChatRequest {
        model: "claude-4-sonnet".to_string(),
        messages: vec![Message::user("categorize this")],
        response_format: None,
    }
}

fn agent_request() -> AgentRequest {
    AgentRequest {
        model: "claude-4-sonnet".to_string(),
        messages: vec![Message::user("analyze")],
        tools: vec![AgentTool::query_tool(
            "sf-health-dashboard".to_string(),
            "HEROKU_POSTGRESQL_COBALT".to_string(),
            "standard-1x".to_string(),
            3,
        )],
    }
}

async fn collect(client: &HttpInferenceClient) -> Vec<u8> {
    let mut stream = client.open_stream("inf-key", &agent_request()).await.unwrap();
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend(chunk.unwrap());
    }
    body
}

#[tokio::test]
async fn test_complete_sends_bearer_and_model() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer inf-key")
        .match_body(Matcher::PartialJsonString(
            r#"{"model":"claude-4-sonnet"}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_completion("{}"))
        .create_async()
        .await;

    let client = HttpInferenceClient::new(server.url()).unwrap();
    let body = client.complete("inf-key", &chat_request()).await.unwrap();

    assert!(body.contains("chat.completion"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_transport_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(503)
        .with_body("service unavailable")
        .create_async()
        .await;

    let client = HttpInferenceClient::new(server.url()).unwrap();
    let err = client.complete("inf-key", &chat_request()).await.unwrap_err();
    assert_eq!(err.classification(), FailureKind::TransportFailure);
}

#[tokio::test]
async fn test_replica_rejection_is_configuration_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/agents/heroku")
        .with_status(400)
        .with_body(r#"{"error":"database HEROKU_POSTGRESQL_COBALT is not a replica"}"#)
        .create_async()
        .await;

    let client = HttpInferenceClient::new(server.url()).unwrap();
    let err = match client.open_stream("inf-key", &agent_request()).await {
        Ok(_) => panic!("expected rejection"),
        Err(err) => err,
    };
    assert_eq!(err.classification(), FailureKind::ConfigurationError);
}

#[tokio::test]
async fn test_replica_rejection_deep_in_long_body() {
    let body = format!(
        r#"{{"detail":"{}","error":"Attachment Is Not A Replica"}}"#,
        "x".repeat(800)
    );
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/agents/heroku")
        .with_status(422)
        .with_body(body)
        .create_async()
        .await;

    let client = HttpInferenceClient::new(server.url()).unwrap();
    let err = match client.open_stream("inf-key", &agent_request()).await {
        Ok(_) => panic!("expected rejection"),
        Err(err) => err,
    };
    assert_eq!(err.classification(), FailureKind::ConfigurationError);
}

#[tokio::test]
async fn test_open_stream_passes_event_stream_through() {
    let body = [final_event("{}"), DONE_EVENT.to_string()].concat();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/agents/heroku")
        .match_header("accept", "text/event-stream")
        .match_body(Matcher::Regex(r#""name":"postgres_run_query""#.to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body.clone())
        .create_async()
        .await;

    let client = HttpInferenceClient::new(server.url()).unwrap();
    assert_eq!(collect(&client).await, body.into_bytes());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_plain_json_agent_answer_is_framed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/agents/heroku")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_completion("{\"ok\":true}"))
        .create_async()
        .await;

    let client = HttpInferenceClient::new(server.url()).unwrap();
    let body = collect(&client).await;

    let mut parser = EventStreamParser::new();
    let mut events: Vec<_> = parser.feed(&body).into_iter().map(Result::unwrap).collect();
    events.extend(parser.finish().into_iter().map(Result::unwrap));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "message");
    assert!(events[1].is_terminal());
}

#[tokio::test]
async fn test_connection_refused() {
    let client = HttpInferenceClient::new("http://127.0.0.1:1").unwrap();
    let err = client.complete("inf-key", &chat_request()).await.unwrap_err();
    assert_eq!(err.classification(), FailureKind::TransportFailure);
}

#[tokio::test]
async fn test_insights_over_http() {
    let body = [
        tool_call_event("call_1"),
        tool_result_event("[{\"count\":30}]"),
        final_event(&insight_json()),
        DONE_EVENT.to_string(),
    ]
    .concat();

    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/agents/heroku")
        .match_header("authorization", "Bearer inf-test-key")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let config = InferenceConfig {
        base_url: server.url(),
        ..ready_config()
    };
    let transport: Arc<dyn InferenceTransport> =
        Arc::new(HttpInferenceClient::new(config.base_url.clone()).unwrap());
    let result = InsightsOrchestrator::new(transport, Arc::new(config))
        .get_insights(TimeRange::Week)
        .await;

    assert!(!result.is_fallback);
    assert_eq!(result.potential_issue.title, "Profile permission drift");
}

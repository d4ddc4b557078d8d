#![allow(dead_code)]

use serde_json::{json, Value};
use tutor_pipeline::{GatewayConfig, GeminiService, Language, Session};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const MODEL: &str = "gemini-test";
pub const API_KEY: &str = "test-key";

pub fn gateway(server: &MockServer) -> GeminiService {
    GeminiService::new(
        GatewayConfig::new(API_KEY)
            .with_base_url(server.uri())
            .with_model(MODEL),
    )
}

pub fn session(server: &MockServer, language: Language) -> Session {
    Session::new(gateway(server), language)
}

pub fn generate_content() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .and(query_param("key", API_KEY))
}

pub fn text_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
}

pub fn analysis_json(categories: &[&str]) -> String {
    let localized = |lang: &str| {
        json!({
            "questionSummary": format!("summary {lang}"),
            "keyIndicator": "isolate x",
            "solutionSteps": ["subtract 2 from both sides", "x = 3"],
            "tips": "check by substitution",
            "practiceQuestion": {
                "question": "x + 4 = 9",
                "answer": "x = 5",
                "explanation": "subtract 4"
            }
        })
    };
    let questions: Vec<Value> = categories
        .iter()
        .enumerate()
        .map(|(i, category)| {
            json!({
                "questionText": format!("Question {}", i + 1),
                "category": category,
                "difficulty": "Easy",
                "ar": localized("ar"),
                "en": localized("en")
            })
        })
        .collect();

    json!({
        "overallSummaryAr": "ملخص المحاضرة",
        "overallSummaryEn": "Lecture summary",
        "questions": questions
    })
    .to_string()
}

/// Mounts a successful analysis and runs it, leaving the session `Complete`.
pub async fn completed_session(server: &MockServer, language: Language) -> Session {
    let session = session(server, language);
    generate_content()
        .respond_with(text_response(&analysis_json(&["Algebra", "Algebra"])))
        .up_to_n_times(1)
        .mount(server)
        .await;
    session.set_notes("x + 2 = 5").await;
    session.analyze().await.expect("analysis should succeed");
    session
}

pub async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("request body is json"))
        .collect()
}

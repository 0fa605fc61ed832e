use mockito::{Matcher, Server};
use serde_json::json;

use profesoria_lib::config::AppConfig;
use profesoria_lib::gemini_adapter::{GeminiClient, GenerationRequest, GenerativeModel, ImagePart};
use profesoria_lib::AppErrorType;

const PATH: &str = "/v1beta/models/gemini-test:generateContent";

fn config(base_url: &str) -> AppConfig {
    AppConfig {
        api_key: Some("secret".to_string()),
        base_url: base_url.to_string(),
        model: "gemini-test".to_string(),
        ..Default::default()
    }
}

#[test]
fn missing_key_is_a_configuration_error() {
    let cfg = AppConfig {
        api_key: None,
        ..Default::default()
    };
    let err = GeminiClient::new(&cfg).unwrap_err();
    assert_eq!(err.error_type, AppErrorType::Configuration);
}

#[tokio::test]
async fn request_carries_prompt_images_and_schema() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
        .match_body(Matcher::PartialJson(json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": "Genera el temario" },
                    { "inline_data": { "mime_type": "image/png", "data": "aGVsbG8=" } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": { "type": "OBJECT" }
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"units\":" }, { "text": " []}" }] }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = GeminiClient::new(&config(&server.url())).unwrap();
    let request = GenerationRequest::text("Genera el temario")
        .with_images(vec![ImagePart::from_data_url("data:image/png;base64,aGVsbG8=").unwrap()])
        .with_schema(json!({ "type": "OBJECT" }));
    let text = client.generate(request).await.unwrap();

    assert_eq!(text, "{\"units\": []}");
    mock.assert_async().await;
}

#[tokio::test]
async fn http_errors_surface_as_llm_errors() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("quota exceeded")
        .create_async()
        .await;

    let client = GeminiClient::new(&config(&server.url())).unwrap();
    let err = client.generate(GenerationRequest::text("hola")).await.unwrap_err();

    assert_eq!(err.error_type, AppErrorType::LLM);
    assert!(err.message.contains("429"));
    let details = err.details.unwrap();
    assert_eq!(details["status"], 429);
    assert_eq!(details["body"], "quota exceeded");
    mock.assert_async().await;
}

#[tokio::test]
async fn blocked_and_empty_answers_are_errors() {
    let mut server = Server::new_async().await;
    let _blocked = server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({ "contents": [{ "parts": [{ "text": "bloqueado" }] }] })))
        .with_status(200)
        .with_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string())
        .create_async()
        .await;
    let _empty = server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({ "contents": [{ "parts": [{ "text": "vacío" }] }] })))
        .with_status(200)
        .with_body(json!({ "candidates": [{ "content": { "parts": [] } }] }).to_string())
        .create_async()
        .await;

    let client = GeminiClient::new(&config(&server.url())).unwrap();
    let blocked = client.generate(GenerationRequest::text("bloqueado")).await.unwrap_err();
    assert_eq!(blocked.error_type, AppErrorType::LLM);
    let empty = client.generate(GenerationRequest::text("vacío")).await.unwrap_err();
    assert_eq!(empty.error_type, AppErrorType::MalformedResponse);
}

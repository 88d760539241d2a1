//! In-process stand-in for the chat-completion API.

use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

use crate::config::UpstreamConfig;
use crate::inference::CompletionClient;

/// 10 bytes of a JPEG/JFIF header.
pub const JPEG_BASE64: &str = "/9j/4AAQSkZJRg==";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct FakeUpstream {
    base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeUpstream {
    /// Answers every `POST /v1/chat/completions` with `status` and `body`.
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        let status = StatusCode::from_u16(status).expect("valid status code");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let server = HttpServer::new(move || {
            let body = body.clone();
            let recorded = recorded.clone();
            App::new().route(
                "/v1/chat/completions",
                web::post().to(move |req: HttpRequest, payload: web::Json<Value>| {
                    let body = body.clone();
                    let recorded = recorded.clone();
                    async move {
                        let authorization = req
                            .headers()
                            .get("authorization")
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_owned);
                        recorded.lock().unwrap().push(RecordedCall {
                            authorization,
                            body: payload.into_inner(),
                        });
                        HttpResponse::build(status)
                            .content_type("application/json")
                            .body(body)
                    }
                }),
            )
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind fake upstream");

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        Self {
            base_url: format!("http://{}/v1", addr),
            calls,
        }
    }

    pub fn config(&self) -> UpstreamConfig {
        UpstreamConfig::new("sk-test", &self.base_url, "qwen-vl-test").expect("valid base url")
    }

    pub fn client(&self) -> CompletionClient {
        CompletionClient::new(&self.config()).expect("valid endpoint")
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// A successful chat-completion body whose single choice says `content`.
pub fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "qwen-vl-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

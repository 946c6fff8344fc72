//! Fixtures shared by the unit tests: a stand-in Gemini server and tiny images.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose;
use serde_json::{Value, json};

use crate::constants::X_GOOG_API_KEY;

pub(crate) struct StubGemini {
    pub(crate) base_url: String,
    hits: Arc<AtomicUsize>,
    api_key: Arc<Mutex<Option<String>>>,
}

impl StubGemini {
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn last_api_key(&self) -> Option<String> {
        self.api_key.lock().expect("api key lock").clone()
    }
}

/// Serves `body` with `status` for every generateContent call.
pub(crate) async fn stub_gemini(status: StatusCode, body: Value) -> StubGemini {
    let hits = Arc::new(AtomicUsize::new(0));
    let api_key = Arc::new(Mutex::new(None));

    let counter = hits.clone();
    let seen_key = api_key.clone();
    let app = Router::new().route(
        "/v1beta/models/{model}",
        post(move |headers: HeaderMap| {
            let counter = counter.clone();
            let seen_key = seen_key.clone();
            let body = body.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let key = headers
                    .get(X_GOOG_API_KEY)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                *seen_key.lock().expect("api key lock") = key;
                (status, Json(body))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    StubGemini {
        base_url: format!("http://{addr}"),
        hits,
        api_key,
    }
}

/// A solid-colour PNG of the given size.
pub(crate) fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([250, 210, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// A successful generateContent reply carrying `png`.
pub(crate) fn gemini_image_reply(png: &[u8]) -> Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    {"text": "Here is your image"},
                    {"inlineData": {
                        "mimeType": "image/png",
                        "data": general_purpose::STANDARD.encode(png)
                    }}
                ],
                "role": "model"
            },
            "finishReason": "STOP"
        }]
    })
}

use askama::Template;
use askama_web::WebTemplate;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use crate::constants::SAMPLE_PROMPTS;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) sample_prompts: &'static [&'static str],
}

/// handles the / GET
pub(crate) async fn index_handler() -> IndexTemplate {
    IndexTemplate {
        sample_prompts: SAMPLE_PROMPTS,
    }
}

pub(crate) async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

pub(crate) async fn script_handler() -> impl IntoResponse {
    const SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/app.js"));
    ([(CONTENT_TYPE, "text/javascript")], SCRIPT)
}

//! Integration tests for the AI content notices service
//!
//! These tests drive the HTTP router end to end over the in-memory store:
//! language management, settings and style submissions, the widget payload
//! and the block render filter.

use ai_content_notices::{
    config::Config,
    defaults::ConfigStore,
    lifecycle,
    model::SETTINGS_DOCUMENT,
    server::{router, AppState},
    store::{DocumentStore, MemoryStore},
};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const API_KEY: &str = "test-admin-key";

// ==================== Test Helpers ====================

fn create_test_config() -> Config {
    Config {
        admin_api_key: API_KEY.to_string(),
        nonce_ttl_hours: 1,
        port: 8080,
        database_url: None,
        defaults_path: None,
    }
}

async fn create_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let defaults = ConfigStore::embedded().expect("embedded defaults");
    lifecycle::activate(store.as_ref(), &defaults)
        .await
        .expect("activation");

    let state = AppState::new(store.clone(), defaults, create_test_config());
    (router(state), store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn admin_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn issue_nonce(app: &Router, action: &str) -> String {
    let (status, body) = send(
        app,
        admin_request(Method::POST, &format!("/admin/nonce/{}", action), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["nonce"].as_str().expect("nonce").to_string()
}

async fn add_language(app: &Router, code: &str) -> (StatusCode, Value) {
    let nonce = issue_nonce(app, "agcn_add_language").await;
    send(
        app,
        admin_request(
            Method::POST,
            "/admin/languages/add",
            Some(json!({"language": code, "nonce": nonce})),
        ),
    )
    .await
}

async fn remove_language(app: &Router, code: &str) -> (StatusCode, Value) {
    let nonce = issue_nonce(app, "agcn_remove_language").await;
    send(
        app,
        admin_request(
            Method::POST,
            "/admin/languages/remove",
            Some(json!({"language": code, "nonce": nonce})),
        ),
    )
    .await
}

// ==================== Health / Auth Tests ====================

#[tokio::test]
async fn test_health() {
    let (app, _) = create_test_app().await;
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_admin_routes_require_api_key() {
    let (app, _) = create_test_app().await;
    let request = Request::get("/admin/settings")
        .header(header::AUTHORIZATION, "Bearer wrong-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_nonce_for_unknown_action_not_found() {
    let (app, _) = create_test_app().await;
    let (status, _) = send(
        &app,
        admin_request(Method::POST, "/admin/nonce/delete_everything", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ==================== Language Management Tests ====================

#[tokio::test]
async fn test_add_language_flow() {
    let (app, _) = create_test_app().await;

    let (status, body) = add_language(&app, "sv").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, languages) = send(&app, admin_request(Method::GET, "/admin/languages", None)).await;
    let existing: Vec<_> = languages["existing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert_eq!(existing, vec!["en", "sv"]);
    assert_eq!(languages["active"], "en");
    assert_eq!(languages["addable"].as_array().unwrap().len(), 8);

    let (_, notice) = send(&app, admin_request(Method::GET, "/admin/notice", None)).await;
    assert_eq!(notice["kind"], "success");
    assert_eq!(notice["message"], "Language Svenska added successfully!");

    let (_, notice) = send(&app, admin_request(Method::GET, "/admin/notice", None)).await;
    assert_eq!(notice, Value::Null);
}

#[tokio::test]
async fn test_add_language_without_nonce_is_rejected() {
    let (app, _) = create_test_app().await;
    let (status, body) = send(
        &app,
        admin_request(
            Method::POST,
            "/admin/languages/add",
            Some(json!({"language": "sv"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["code"], "SecurityCheckFailed");
    assert_eq!(body["data"]["message"], "Security check failed.");
}

#[tokio::test]
async fn test_add_language_with_valid_nonce_but_no_key_is_denied() {
    let (app, _) = create_test_app().await;
    let nonce = issue_nonce(&app, "agcn_add_language").await;
    let request = Request::post("/admin/languages/add")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"language": "sv", "nonce": nonce}).to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["code"], "PermissionDenied");
}

#[tokio::test]
async fn test_add_language_accepts_form_body() {
    let (app, _) = create_test_app().await;
    let nonce = issue_nonce(&app, "agcn_add_language").await;
    let request = Request::post("/admin/languages/add")
        .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("language=de&nonce={}", nonce)))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_add_duplicate_and_unavailable_languages() {
    let (app, _) = create_test_app().await;

    let (status, body) = add_language(&app, "en").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["code"], "LanguageAlreadyExists");

    let (status, body) = add_language(&app, "xx").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["code"], "LanguageUnavailable");

    let (status, body) = add_language(&app, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "LanguageNotProvided");
}

#[tokio::test]
async fn test_remove_last_language_is_rejected() {
    let (app, store) = create_test_app().await;
    let before = store.read_document(SETTINGS_DOCUMENT).await.unwrap();

    let (status, body) = remove_language(&app, "en").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["code"], "LastLanguageCannotBeRemoved");
    assert_eq!(
        store.read_document(SETTINGS_DOCUMENT).await.unwrap(),
        before
    );
}

#[tokio::test]
async fn test_remove_active_language_moves_active() {
    let (app, _) = create_test_app().await;
    add_language(&app, "fr").await;

    let (status, _) = remove_language(&app, "en").await;
    assert_eq!(status, StatusCode::OK);

    let (_, settings) = send(&app, admin_request(Method::GET, "/admin/settings", None)).await;
    assert_eq!(settings["config"]["language"], "fr");
    assert!(settings["content"].get("en").is_none());
}

// ==================== Settings / Styles Tests ====================

#[tokio::test]
async fn test_settings_submission_is_sanitized() {
    let (app, _) = create_test_app().await;
    let submission = json!({
        "config": {"language": "en", "show_badge": "on", "badge_position": "bottom-right"},
        "content": {
            "en": {
                "header": "<b>AI</b> notice",
                "title": "About AI",
                "body": "<p onclick=\"x()\">Hello</p><script>alert(1)</script>",
                "sections": {
                    "title": ["Written by AI", ""],
                    "slug": ["Section 1", "unused"],
                    "notice_text": ["AI generated", "x"],
                    "body": ["Details", "y"]
                }
            }
        }
    });

    let (status, settings) = send(
        &app,
        admin_request(Method::POST, "/admin/settings", Some(submission)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["config"]["show_badge"], true);
    assert_eq!(settings["config"]["support"], false);
    assert_eq!(settings["config"]["badge_position"], "bottom-right");

    let en = &settings["content"]["en"];
    assert_eq!(en["header"], "AI notice");
    assert_eq!(en["body"], "<p>Hello</p>");
    let sections = en["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["slug"], "section");
}

#[tokio::test]
async fn test_styles_submission_keeps_previous_on_invalid() {
    let (app, _) = create_test_app().await;
    let (_, before) = send(&app, admin_request(Method::GET, "/admin/styles", None)).await;

    let submission = json!({
        "colors": {"main-color": "javascript:alert(1)", "badge-color": "#123"},
        "badge-offset": "2.5rem"
    });
    let (status, styles) = send(
        &app,
        admin_request(Method::POST, "/admin/styles", Some(submission)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(styles["colors"]["main-color"], before["colors"]["main-color"]);
    assert_eq!(styles["colors"]["badge-color"], "#123");
    assert_eq!(styles["badge-offset"], "2.5rem");
}

// ==================== Widget Tests ====================

#[tokio::test]
async fn test_widget_payload_default() {
    let (app, _) = create_test_app().await;
    let request = Request::get("/widget/payload").body(Body::empty()).unwrap();
    let (status, payload) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["config"]["language"], "en");
    assert_eq!(payload["config"]["showBadge"], true);

    let en = &payload["content"]["en"];
    for key in ["header", "title", "body", "sectionsHeader"] {
        assert!(en.get(key).is_some(), "missing {}", key);
    }
    let slugs: Vec<_> = en["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["generated", "recommended"]);
}

#[tokio::test]
async fn test_widget_payload_language_selection() {
    let (app, _) = create_test_app().await;
    add_language(&app, "sv").await;

    let request = Request::get("/widget/payload?language=sv")
        .body(Body::empty())
        .unwrap();
    let (_, payload) = send(&app, request).await;
    assert_eq!(payload["config"]["language"], "sv");
    assert_eq!(payload["content"]["sv"], json!({}));

    let request = Request::get("/widget/payload?language=de")
        .body(Body::empty())
        .unwrap();
    let (_, payload) = send(&app, request).await;
    assert_eq!(payload["config"]["language"], "en");
}

#[tokio::test]
async fn test_widget_script_and_styles() {
    let (app, _) = create_test_app().await;

    let request = Request::get("/widget/script").body(Body::empty()).unwrap();
    let (status, script) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let script = script.as_str().expect("script text");
    assert!(script.contains("new AGCN("));

    let request = Request::get("/widget/styles.css")
        .body(Body::empty())
        .unwrap();
    let (status, css) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let css = css.as_str().expect("css text");
    assert!(css.starts_with(".agcn-variables {"));
    assert!(css.contains("--badge-offset: 8rem !important;"));
}

// ==================== Block Render Tests ====================

#[tokio::test]
async fn test_render_block_annotates_allowed_block() {
    let (app, _) = create_test_app().await;
    let request = Request::post("/blocks/render")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "blockName": "core/paragraph",
                "attrs": {"aiContent": "generated", "agcnPosition": "left"},
                "content": "<p>Text</p>"
            })
            .to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["content"],
        "<p data-ai-content=\"generated\" data-agcn-position=\"left\">Text</p>"
    );
}

#[tokio::test]
async fn test_render_block_leaves_other_blocks() {
    let (app, _) = create_test_app().await;
    let request = Request::post("/blocks/render")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "blockName": "core/quote",
                "attrs": {"aiContent": "generated"},
                "content": "<blockquote>Q</blockquote>"
            })
            .to_string(),
        ))
        .unwrap();
    let (_, body) = send(&app, request).await;
    assert_eq!(body["content"], "<blockquote>Q</blockquote>");
}

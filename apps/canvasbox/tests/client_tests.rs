//! Integration tests for the content client against a mock content server.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use canvasbox::canvasbox_core::{ImportKind, Theme, resolve_tree};
use canvasbox::client::ContentError;
use common::{
    PLAIN_JS, TRIANGLE_CSS, TRIANGLE_HTML, TRIANGLE_JS, TRIANGLE_MD, base_url, client,
    content_server,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// PRELUDE
// =============================================================================

#[tokio::test]
async fn test_prelude_decodes_imports_and_descriptors() {
    let server = content_server().await;
    let prelude = client(&server).prelude().await.unwrap();

    assert_eq!(
        prelude.imports.get("three").map(String::as_str),
        Some("https://cdn.example/three.module.js")
    );
    assert_eq!(prelude.descriptors.len(), 2);
    assert_eq!(prelude.descriptors[0].entry(), "basics");
    assert_eq!(prelude.descriptors[0].count(), 2);
}

#[tokio::test]
async fn test_resolved_tree_builds_local_import_urls() {
    let server = content_server().await;
    let client = client(&server);
    let prelude = client.prelude().await.unwrap();
    let tree = resolve_tree(prelude, client.locator());

    let triangle = tree.find("/basics/triangle").unwrap();
    let instance = triangle.as_instance().unwrap();
    assert_eq!(instance.import_maps.len(), 2);
    assert_eq!(instance.import_maps[0].kind, ImportKind::ThirdParty);
    assert_eq!(instance.import_maps[1].kind, ImportKind::Local);
    assert_eq!(
        instance.import_maps[1].url,
        format!("{}/basics/triangle/shader.js", base_url(&server))
    );
}

#[tokio::test]
async fn test_missing_prelude_fails_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chapters/index.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).prelude().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.to_string(),
        "Request failure with status 404, status text Not Found"
    );
}

#[tokio::test]
async fn test_invalid_prelude_is_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chapters/index.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"descriptors": [{"type": 7, "entry": "x"}]}"#),
        )
        .mount(&server)
        .await;

    let err = client(&server).prelude().await.unwrap_err();
    assert!(matches!(err, ContentError::Json(_)));
    assert_eq!(err.status(), None);
}

// =============================================================================
// INSTANCE ASSETS
// =============================================================================

#[tokio::test]
async fn test_instance_text_assets() {
    let server = content_server().await;
    let client = client(&server);

    assert_eq!(
        client.instance_javascript("/basics/triangle").await.unwrap(),
        TRIANGLE_JS
    );
    assert_eq!(
        client.instance_html("/basics/triangle").await.unwrap(),
        TRIANGLE_HTML
    );
    assert_eq!(
        client.instance_stylesheet("/basics/triangle").await.unwrap(),
        TRIANGLE_CSS
    );
    assert_eq!(
        client.instance_description("/basics/triangle").await.unwrap(),
        TRIANGLE_MD
    );
}

#[tokio::test]
async fn test_missing_asset_propagates_status() {
    let server = content_server().await;
    let err = client(&server).instance_html("/plain").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_preview_image_url() {
    let server = content_server().await;
    let url = client(&server).preview_image_url("/basics/triangle").unwrap();
    assert_eq!(
        url.as_str(),
        format!("{}/basics/triangle/index.png", base_url(&server))
    );
}

#[tokio::test]
async fn test_instance_sources_follow_flags() {
    let server = content_server().await;
    let client = client(&server);
    let tree = resolve_tree(client.prelude().await.unwrap(), client.locator());

    let triangle = tree.find("/basics/triangle").unwrap().as_instance().unwrap();
    let sources = client
        .instance_sources("/basics/triangle", triangle)
        .await
        .unwrap();
    assert_eq!(sources.script, TRIANGLE_JS);
    assert_eq!(sources.html.as_deref(), Some(TRIANGLE_HTML));
    assert_eq!(sources.stylesheet.as_deref(), Some(TRIANGLE_CSS));

    // No html/css mocks exist for /plain, so fetching them would fail.
    let plain = tree.find("/plain").unwrap().as_instance().unwrap();
    let sources = client.instance_sources("/plain", plain).await.unwrap();
    assert_eq!(sources.script, PLAIN_JS);
    assert_eq!(sources.html, None);
    assert_eq!(sources.stylesheet, None);

    let content = sources.content(Theme::dark(), &plain.import_maps);
    assert_eq!(content.script, Some(PLAIN_JS));
    assert!(content.theme.dark);
}

#[tokio::test]
async fn test_text_file_resolves_relative_path_against_origin() {
    let server = content_server().await;
    let locator = canvasbox::canvasbox_core::ContentLocator::new(
        "/chapters",
        url::Url::parse(&server.uri()).unwrap(),
    );
    let client = canvasbox::client::ContentClient::new(locator);

    assert_eq!(
        client.text_file("/chapters/plain/index.js").await.unwrap(),
        PLAIN_JS
    );
    assert_eq!(client.prelude().await.unwrap().descriptors.len(), 2);
}

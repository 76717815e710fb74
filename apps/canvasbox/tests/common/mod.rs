//! Shared fixtures: a mock content server publishing a small chapter tree.

#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use canvasbox::canvasbox_core::ContentLocator;
use canvasbox::client::ContentClient;
use canvasbox::store::ChapterStore;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Prelude with one directory holding a full-featured instance, plus a bare
/// root instance.
pub const PRELUDE: &str = r#"{
    "imports": {"three": "https://cdn.example/three.module.js"},
    "descriptors": [
        {
            "type": 1,
            "entry": "basics",
            "title": "Basics",
            "children": [
                {
                    "type": 0,
                    "entry": "triangle",
                    "title": "Triangle",
                    "intro": "A first triangle",
                    "libs": ["shader.js"],
                    "hasHTML": true,
                    "hasStylesheet": true,
                    "hasDescription": true,
                    "hasPreviewImage": true
                }
            ]
        },
        {"type": 0, "entry": "plain"}
    ]
}"#;

pub const TRIANGLE_JS: &str = "import * as THREE from 'three';\nconsole.log('triangle');";
pub const TRIANGLE_HTML: &str = "<button id=\"spin\">Spin</button>";
pub const TRIANGLE_CSS: &str = "#spin { color: red; }";
pub const TRIANGLE_MD: &str = "# Triangle\n\nDraws one triangle.\n";
pub const PLAIN_JS: &str = "console.log('plain');";

/// Base URL of the chapters on `server`.
pub fn base_url(server: &MockServer) -> String {
    format!("{}/chapters", server.uri())
}

pub fn locator(server: &MockServer) -> ContentLocator {
    ContentLocator::new(base_url(server), Url::parse("http://localhost").unwrap())
}

pub fn client(server: &MockServer) -> ContentClient {
    ContentClient::new(locator(server))
}

pub fn store(server: &MockServer) -> ChapterStore {
    ChapterStore::new(client(server))
}

async fn mount_text(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Start a server publishing [`PRELUDE`] and every asset it references.
pub async fn content_server() -> MockServer {
    let server = MockServer::start().await;
    mount_text(&server, "/chapters/index.json", PRELUDE).await;
    mount_text(&server, "/chapters/basics/triangle/index.js", TRIANGLE_JS).await;
    mount_text(&server, "/chapters/basics/triangle/index.html", TRIANGLE_HTML).await;
    mount_text(&server, "/chapters/basics/triangle/index.css", TRIANGLE_CSS).await;
    mount_text(&server, "/chapters/basics/triangle/index.md", TRIANGLE_MD).await;
    mount_text(&server, "/chapters/plain/index.js", PLAIN_JS).await;
    server
}

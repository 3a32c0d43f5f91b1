//! Integration tests for the dev server.
//!
//! Tests drive the router in-process and the session actor through its
//! handle, the same way socket handlers do.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use blazepack_cli::dev::{
    router, AppState, AssetSource, ContentServer, RegistryProxy, SessionExit, SessionOptions,
    SessionPhase, SessionServer, SESSION_PATH,
};
use blazepack_cli::IgnoreRules;
use blazepack_protocol::{ChangeEvent, ClientMessage, ErrorReport, ServerMessage};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tower::ServiceExt;

struct Fixture {
    project: TempDir,
    _www: TempDir,
    state: AppState,
    session: SessionServer,
}

fn fixture() -> Fixture {
    let project = TempDir::new().unwrap();
    fs::create_dir_all(project.path().join("src")).unwrap();
    fs::write(project.path().join("src/App.js"), "export default 1;").unwrap();
    fs::write(project.path().join("package.json"), r#"{"dependencies":{"react":"17"}}"#)
        .unwrap();

    let www = TempDir::new().unwrap();
    fs::write(www.path().join("index.html"), "<html>bundler</html>").unwrap();

    let rules = Arc::new(IgnoreRules::default());
    let (session, handle) =
        SessionServer::new(SessionOptions::new(project.path().to_path_buf(), rules));
    let content = ContentServer::new(
        project.path().to_path_buf(),
        AssetSource::Local(www.path().to_path_buf()),
        true,
    );
    let registry = RegistryProxy::new(reqwest::Client::new(), Vec::new());

    Fixture {
        project,
        _www: www,
        state: AppState::new(handle, content, registry),
        session,
    }
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn test_root_serves_bundler_shell() {
    let f = fixture();
    let (status, content_type, body) = get(&f.state, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert_eq!(body, "<html>bundler</html>");
}

#[tokio::test]
async fn test_client_script_route() {
    let f = fixture();
    let (status, content_type, body) = get(&f.state, "/index.js").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/javascript"));
    assert!(body.contains(SESSION_PATH));
}

#[tokio::test]
async fn test_project_files_and_public_dir() {
    let f = fixture();
    fs::create_dir_all(f.project.path().join("public")).unwrap();
    fs::write(f.project.path().join("public/robots.txt"), "User-agent: *").unwrap();

    let (status, _, body) = get(&f.state, "/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "User-agent: *");

    let (status, content_type, body) = get(&f.state, "/src/App.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/javascript"));
    assert_eq!(body, "export default 1;");
}

#[tokio::test]
async fn test_client_side_route_falls_back_to_shell() {
    let f = fixture();
    let (status, _, body) = get(&f.state, "/users/42").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html>bundler</html>");
}

#[tokio::test]
async fn test_npm_without_registry_is_not_found() {
    let f = fixture();
    let (status, _, _) = get(&f.state, "/npm/@acme%2fui").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_path_requires_upgrade() {
    let f = fixture();
    let (status, _, _) = get(&f.state, SESSION_PATH).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_session_init_then_patch_then_fatal() {
    let f = fixture();
    let mut handle = f.state.session.clone();
    let (events_tx, events) = mpsc::channel(16);
    let (_stop_tx, stop_rx) = oneshot::channel::<()>();

    f.session.mark_listening();
    let run = tokio::spawn(f.session.run(events, async {
        let _ = stop_rx.await;
    }));
    handle.wait_for(SessionPhase::Serving).await;

    let mut first = handle.connect().await.unwrap();
    let mut second = handle.connect().await.unwrap();

    for connection in [&mut first, &mut second] {
        let frame = connection.outbound.recv().await.unwrap();
        match ServerMessage::from_json(&frame).unwrap() {
            ServerMessage::Init(payload) => {
                assert_eq!(payload.files.len(), 2);
                assert_eq!(
                    payload.files.get("/src/App.js").unwrap().code,
                    "export default 1;"
                );
            }
            other => panic!("expected INIT, got {:?}", other),
        }
    }

    let change = ChangeEvent::Change {
        path: "/src/App.js".to_string(),
        content: "export default 2;".to_string(),
    };
    events_tx.send(change.clone()).await.unwrap();

    for connection in [&mut first, &mut second] {
        let frame = connection.outbound.recv().await.unwrap();
        assert_eq!(
            ServerMessage::from_json(&frame).unwrap(),
            ServerMessage::Patch(change.clone())
        );
    }

    handle
        .report(
            first.id,
            ClientMessage::UnhandledSandpackError(ErrorReport::new(
                "ModuleNotFoundError",
                "Could not find module ./Missing",
            )),
        )
        .await;

    let exit = timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
    assert_eq!(
        exit,
        SessionExit::Fatal(ErrorReport::new(
            "ModuleNotFoundError",
            "Could not find module ./Missing"
        ))
    );
    assert!(first.outbound.recv().await.is_none());
    assert!(second.outbound.recv().await.is_none());
    assert_eq!(handle.phase(), SessionPhase::Terminated);
    assert!(handle.connect().await.is_err());
}

#[tokio::test]
async fn test_session_shutdown_is_clean() {
    let f = fixture();
    let handle = f.state.session.clone();
    let (_events_tx, events) = mpsc::channel(16);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let run = tokio::spawn(f.session.run(events, async {
        let _ = stop_rx.await;
    }));
    let mut connection = handle.connect().await.unwrap();
    assert!(connection.outbound.recv().await.is_some());

    stop_tx.send(()).unwrap();
    let exit = timeout(Duration::from_secs(5), run).await.unwrap().unwrap();

    assert_eq!(exit, SessionExit::Shutdown);
    assert!(exit.into_result().is_ok());
    assert!(connection.outbound.recv().await.is_none());
}

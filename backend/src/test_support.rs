//! In-process fakes for the remote collaborators used in tests.

use axum::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    spawn_with(|_| router).await
}

/// Like [`spawn`], but the router is built knowing its own base URL.
pub async fn spawn_with<F>(build: F) -> String
where
    F: FnOnce(String) -> Router,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test http listener");
    let base = format!("http://{}", listener.local_addr().expect("listener addr"));
    let app = build(base.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });

    base
}

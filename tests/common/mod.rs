//! Shared test utilities
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use genie_tutor::Config;
use genie_tutor::api::{self, ApiState};
use tokio::net::TcpListener;

/// Multipart boundary used by [`multipart_body`]
pub const BOUNDARY: &str = "genie-test-boundary";

/// Requests seen by a fake upstream, in arrival order
pub type Seen<T> = Arc<Mutex<Vec<T>>>;

/// Create an empty request log
#[must_use]
pub fn seen<T>() -> Seen<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Serve a router on an ephemeral local port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test server");
    let addr = listener.local_addr().expect("test server has no address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server failed");
    });

    format!("http://{addr}")
}

/// Load configuration from a fixed set of variables
#[must_use]
pub fn config(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).expect("invalid test config")
}

/// Build handler state from variables
#[must_use]
pub fn state(vars: &[(&str, &str)]) -> Arc<ApiState> {
    Arc::new(ApiState::from_config(config(vars)))
}

/// Build the full application router from variables
#[must_use]
pub fn app(vars: &[(&str, &str)]) -> Router {
    api::router(state(vars))
}

/// Encode a single-part multipart form
#[must_use]
pub fn multipart_body(
    field: &str,
    file_name: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) -> Vec<u8> {
    let mut disposition = format!("Content-Disposition: form-data; name=\"{field}\"");
    if let Some(name) = file_name {
        disposition.push_str(&format!("; filename=\"{name}\""));
    }

    let mut body = format!("--{BOUNDARY}\r\n{disposition}\r\n").into_bytes();
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Content type header matching [`multipart_body`]
#[must_use]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

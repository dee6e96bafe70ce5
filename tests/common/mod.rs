#![allow(dead_code)]

use idm_client::{ClientConfig, IdmApi, Session};
use wiremock::MockServer;

pub async fn start() -> (MockServer, IdmApi, Session) {
    let server = MockServer::start().await;
    let api = api_for(&server.uri());
    (server, api, Session::new())
}

pub fn api_for(base_url: &str) -> IdmApi {
    IdmApi::from_config(ClientConfig::new(base_url).unwrap()).unwrap()
}

pub async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

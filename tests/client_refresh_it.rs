#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
// self
use backoffice_http::{
	auth::Credential,
	client::ReqwestClient,
	config::ClientConfig,
	error::Error,
	http_types::header::{AUTHORIZATION, CONTENT_TYPE},
	request::MultipartPayload,
	session::{SessionEvent, UnauthenticatedReason},
	store::{CredentialStore, MemoryStore},
};

fn build_client(server: &MockServer, token: Option<&str>) -> (ReqwestClient, MemoryStore) {
	let config = ClientConfig::builder(server.base_url())
		.build()
		.expect("Client config should build against the mock server.");
	let store =
		token.map(|value| MemoryStore::with_credential(Credential::new(value))).unwrap_or_default();
	let client = ReqwestClient::new(config, Arc::new(store.clone()));

	(client, store)
}

#[tokio::test]
async fn expired_credential_is_refreshed_and_request_replayed() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some("stale"));
	let mut events = client.subscribe();
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/properties").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh-token")
				.header("authorization", "Bearer stale")
				.json_body(json!({ "token": "stale" }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "token": "fresh" }));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/properties").header("authorization", "Bearer fresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!([{ "id": 7, "title": "Harbour View" }]));
		})
		.await;
	let response = client.get("/properties").await.expect("Replay should succeed after refresh.");
	let listing: serde_json::Value = response.json().expect("Replay body should decode.");

	assert_eq!(response.status, 200);
	assert_eq!(listing[0]["id"], 7);
	assert_eq!(store.load().as_ref().map(Credential::expose), Some("fresh"));
	assert!(matches!(events.try_recv(), Ok(SessionEvent::CredentialRefreshed { .. })));
	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(client.refresh_metrics.successes(), 1);
	assert_eq!(client.refresh_metrics.replays(), 1);
	assert!(!client.is_refreshing());

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_failure_terminates_the_session() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some("stale"));
	let mut events = client.subscribe();
	let _rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/properties");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(500).body("upstream unavailable");
		})
		.await;
	let err = client.get("/properties").await.expect_err("Refresh failure should reach the caller.");

	assert!(matches!(err, Error::RefreshFailed { status: Some(500), .. }));
	assert!(err.is_auth_expired());
	assert!(!store.contains());
	assert!(client.default_headers().get(AUTHORIZATION).is_none());

	match events.try_recv().expect("Termination should emit an event.") {
		SessionEvent::Unauthenticated { reason, url, .. } => {
			assert_eq!(reason, UnauthenticatedReason::RefreshFailed);
			assert_eq!(url.path(), "/properties");
		},
		other => panic!("Unexpected session event: {other:?}."),
	}

	assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_login_never_triggers_a_refresh() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_client(&server, None);
	let mut events = client.subscribe();
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401).body("invalid credentials");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200).json_body(json!({ "token": "unexpected" }));
		})
		.await;
	let err = client
		.login(&json!({ "email": "agent@example.com", "password": "wrong" }))
		.await
		.expect_err("Rejected login should fail.");

	match err {
		Error::Status { status, body, .. } => {
			assert_eq!(status, 401);
			assert_eq!(body.as_deref(), Some("invalid credentials"));
		},
		other => panic!("Unexpected login error: {other:?}."),
	}

	assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

	login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn login_stores_credential_for_later_calls() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, None);
	let mut events = client.subscribe();
	let _login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/login")
				.json_body(json!({ "email": "agent@example.com", "password": "secret" }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "token": "issued" }));
		})
		.await;
	let brokers = server
		.mock_async(|when, then| {
			when.method(GET).path("/brokers").header("authorization", "Bearer issued");
			then.status(200).json_body(json!([]));
		})
		.await;
	let credential = client
		.login(&json!({ "email": "agent@example.com", "password": "secret" }))
		.await
		.expect("Login should succeed.");

	assert_eq!(credential.expose(), "issued");
	assert!(store.contains());
	assert!(matches!(events.try_recv(), Ok(SessionEvent::SignedIn { .. })));

	client.get("/brokers").await.expect("Authenticated call should succeed.");
	brokers.assert_calls_async(1).await;

	client.sign_out();

	assert!(!store.contains());
	assert!(matches!(events.try_recv(), Ok(SessionEvent::SignedOut { .. })));
}

#[tokio::test]
async fn second_rejection_after_refresh_ends_the_session() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some("stale"));
	let mut events = client.subscribe();
	let reports = server
		.mock_async(|when, then| {
			when.method(GET).path("/reports/commissions");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200).json_body(json!({ "token": "fresh" }));
		})
		.await;
	let err = client
		.get("/reports/commissions")
		.await
		.expect_err("A replayed 401 should not be retried again.");

	assert!(matches!(err, Error::AuthExpired { .. }));
	assert!(!store.contains());
	assert!(matches!(events.try_recv(), Ok(SessionEvent::CredentialRefreshed { .. })));
	assert!(matches!(
		events.try_recv(),
		Ok(SessionEvent::Unauthenticated { reason: UnauthenticatedReason::RetryRejected, .. })
	));

	reports.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_auth_failures_pass_through_untouched() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, Some("live"));
	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/properties/404");
			then.status(404).body("property not found");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200).json_body(json!({ "token": "unexpected" }));
		})
		.await;
	let err = client.get("/properties/404").await.expect_err("404 should be surfaced.");

	assert_eq!(err.status(), Some(404));
	assert!(store.contains());

	missing.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn multipart_upload_carries_bearer() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_client(&server, Some("live"));
	let upload = server
		.mock_async(|when, then| {
			when.method(POST).path("/documents").header("authorization", "Bearer live");
			then.status(201).json_body(json!({ "id": "doc-1" }));
		})
		.await;
	let payload = MultipartPayload::new().text("title", "Title deed").file(
		"document",
		"deed.pdf",
		b"%PDF-1.7".to_vec(),
		Some("application/pdf"),
	);
	let response =
		client.post_multipart("/documents", payload).await.expect("Upload should succeed.");

	assert_eq!(response.status, 201);

	upload.assert_calls_async(1).await;
}

#[tokio::test]
async fn json_body_stays_typed_without_default_content_type() {
	let server = MockServer::start_async().await;
	let config = ClientConfig::builder(server.base_url())
		.without_default_header(CONTENT_TYPE)
		.build()
		.expect("Client config should build without a default content type.");
	let store = MemoryStore::with_credential(Credential::new("live"));
	let client = ReqwestClient::new(config, Arc::new(store));
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/brokers")
				.header("content-type", "application/json")
				.json_body(json!({ "name": "Harbour Realty" }));
			then.status(201).json_body(json!({ "id": 12 }));
		})
		.await;
	let response = client
		.post_json("/brokers", &json!({ "name": "Harbour Realty" }))
		.await
		.expect("JSON post should be accepted.");

	assert_eq!(response.status, 201);

	create.assert_calls_async(1).await;
}

#[tokio::test]
async fn auth_lookalike_paths_still_refresh() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_client(&server, Some("stale"));
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/login-history").header("authorization", "Bearer stale");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200).json_body(json!({ "token": "fresh" }));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth/login-history").header("authorization", "Bearer fresh");
			then.status(200).json_body(json!([]));
		})
		.await;

	client
		.get("/auth/login-history")
		.await
		.expect("A route that only shares a prefix with login should be recovered.");

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
}

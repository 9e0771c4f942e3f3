//! Demonstrates a back-office session against a mock admin API: log in, let the credential
//! expire, and watch three concurrent calls share a single refresh before they are replayed.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use backoffice_http::{
	client::ReqwestClient,
	config::ClientConfig,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "token": "issued" }));
		})
		.await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer issued");
			then.status(401);
		})
		.await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "token": "renewed" }));
		})
		.await;
	let _accepted = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer renewed");
			then.status(200).header("content-type", "application/json").json_body(json!([]));
		})
		.await;
	let store = MemoryStore::default();
	let client = ReqwestClient::new(
		ClientConfig::builder(server.base_url()).build()?,
		Arc::new(store.clone()),
	);
	let mut events = client.subscribe();

	client.login(&json!({ "email": "agent@example.com", "password": "demo" })).await?;

	let (properties, brokers, commissions) = tokio::join!(
		client.get("/properties"),
		client.get("/brokers"),
		client.get("/commissions"),
	);

	println!("properties: HTTP {}", properties?.status);
	println!("brokers: HTTP {}", brokers?.status);
	println!("commissions: HTTP {}", commissions?.status);
	println!("credential stored: {}", store.contains());
	println!("refresh attempts: {}", client.refresh_metrics.attempts());

	while let Ok(event) = events.try_recv() {
		println!("session event: {event:?}");
	}

	login.assert_async().await;

	Ok(())
}

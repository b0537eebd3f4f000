// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP transport shared by the chain clients

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use serde_json::{Value, json};
use tracing::debug;

use super::ChainError;

/// How often a failed request is retried before the error surfaces.
/// Only transport failures are retried; an error returned by the node is
/// final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub attempts: u32,
	pub backoff: Duration,
}

impl RetryPolicy {
	/// Deposit scanning: one silent retry, a missed block is picked up on
	/// the next tick anyway
	pub const SCANNER: RetryPolicy = RetryPolicy {
		attempts: 2,
		backoff: Duration::from_millis(250),
	};
	/// Withdrawal dispatch: never resend
	pub const DISPATCH: RetryPolicy = RetryPolicy {
		attempts: 1,
		backoff: Duration::ZERO,
	};
}

pub struct HttpTransport {
	client: ReqwestClient,
	url: String,
	retry: RetryPolicy,
	ids: AtomicU64,
}

impl HttpTransport {
	pub fn new(url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self, ChainError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ChainError::Network(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self {
			client,
			url: url.into().trim_end_matches('/').to_string(),
			retry,
			ids: AtomicU64::new(1),
		})
	}

	/// JSON-RPC 2.0 call; a null result is returned as `Value::Null`
	pub async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
		let body = json!({
			"jsonrpc": "2.0",
			"id": self.ids.fetch_add(1, Ordering::Relaxed),
			"method": method,
			"params": params,
		});
		let mut response = self.send(&self.url, &body).await?;

		if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
			let message = error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("unknown error");
			return Err(ChainError::Rpc(format!("{}: {}", method, message)));
		}
		Ok(response.get_mut("result").map(Value::take).unwrap_or(Value::Null))
	}

	/// POST a JSON body to `path` under the endpoint, e.g. Tron's
	/// `/wallet/...` API
	pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ChainError> {
		let url = format!("{}{}", self.url, path);
		let response = self.send(&url, body).await?;
		if let Some(error) = response.get("Error").and_then(Value::as_str) {
			return Err(ChainError::Rpc(format!("{}: {}", path, error)));
		}
		Ok(response)
	}

	async fn send(&self, url: &str, body: &Value) -> Result<Value, ChainError> {
		let attempts = self.retry.attempts.max(1);
		let mut last = None;
		for attempt in 1..=attempts {
			match self.send_once(url, body).await {
				Ok(value) => return Ok(value),
				Err(ChainError::Network(e)) => {
					debug!(target: "chain", url, attempt, error = %e, "Request failed");
					last = Some(ChainError::Network(e));
					if attempt < attempts && !self.retry.backoff.is_zero() {
						tokio::time::sleep(self.retry.backoff).await;
					}
				}
				Err(other) => return Err(other),
			}
		}
		Err(last.unwrap_or_else(|| ChainError::Network(format!("no attempt made to {}", url))))
	}

	async fn send_once(&self, url: &str, body: &Value) -> Result<Value, ChainError> {
		let response = self
			.client
			.post(url)
			.json(body)
			.send()
			.await
			.map_err(|e| ChainError::Network(format!("Request failed: {}", e)))?;

		if !response.status().is_success() {
			let status = response.status();
			let error_text = response
				.text()
				.await
				.unwrap_or_else(|_| format!("HTTP {}", status));
			return Err(ChainError::Rpc(format!("{}: {}", status, error_text)));
		}

		response
			.json()
			.await
			.map_err(|e| ChainError::InvalidResponse(format!("Failed to parse response: {}", e)))
	}
}

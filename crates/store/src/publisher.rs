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

//! Publisher facade
//!
//! State transitions are fanned out to downstream consumers on named
//! topics. Delivery is best-effort: a failed publish is logged and never
//! fails the operation that produced it. Operations that run inside a
//! database transaction collect their messages in an [`Outbox`] and flush
//! it only after commit.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bourse_sdk::Resolution;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Downstream topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
	DepositOpen,
	DepositStatus,
	WithdrawStatus,
	OrderCreate,
	OrderStatus,
	OrderCancel,
	OrderFilled,
	TradeTicker(Resolution),
	FutureCreate,
	FutureStatus,
	FutureCancel,
	ChainStatus,
	MarketStatus,
	NotifyWithdraw,
}

impl std::fmt::Display for Topic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Topic::DepositOpen => "deposit/open",
			Topic::DepositStatus => "deposit/status",
			Topic::WithdrawStatus => "withdraw/status",
			Topic::OrderCreate => "order/create",
			Topic::OrderStatus => "order/status",
			Topic::OrderCancel => "order/cancel",
			Topic::OrderFilled => "order/filled",
			Topic::TradeTicker(resolution) => {
				return write!(f, "trade/ticker:{}", resolution.as_str());
			}
			Topic::FutureCreate => "future/create",
			Topic::FutureStatus => "future/status",
			Topic::FutureCancel => "future/cancel",
			Topic::ChainStatus => "chain/status",
			Topic::MarketStatus => "market/status",
			Topic::NotifyWithdraw => "notify/withdraw",
		};
		f.write_str(name)
	}
}

/// One published entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
	pub topic: String,
	pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum PublishError {
	#[error("Publisher channel closed")]
	Closed,
	#[error("Publisher backlog full")]
	Full,
	#[error("Transport error: {0}")]
	Transport(String),
}

/// Message bus adapter
#[async_trait]
pub trait Publisher: Send + Sync {
	async fn publish(&self, message: Message) -> Result<(), PublishError>;
}

/// Serializes entities and hands them to the configured [`Publisher`]
#[derive(Clone)]
pub struct Events {
	publisher: Arc<dyn Publisher>,
}

impl Events {
	pub fn new(publisher: Arc<dyn Publisher>) -> Self {
		Self { publisher }
	}

	/// Publish `entity` to every topic, logging failures
	pub async fn emit<T: Serialize + ?Sized>(&self, entity: &T, topics: &[Topic]) {
		let payload = match serde_json::to_value(entity) {
			Ok(payload) => payload,
			Err(e) => {
				warn!(target: "publisher", error = %e, "Failed to serialize event");
				return;
			}
		};
		for topic in topics {
			self.send(Message {
				topic: topic.to_string(),
				payload: payload.clone(),
			})
			.await;
		}
	}

	async fn send(&self, message: Message) {
		let topic = message.topic.clone();
		match self.publisher.publish(message).await {
			Ok(()) => debug!(target: "publisher", topic = %topic, "Published"),
			Err(e) => warn!(target: "publisher", topic = %topic, error = %e, "Publish failed"),
		}
	}

	/// Publish everything collected while a transaction was open
	pub async fn flush(&self, outbox: Outbox) {
		for message in outbox.messages {
			self.send(message).await;
		}
	}
}

/// Messages held back until the surrounding transaction commits
#[derive(Debug, Default)]
pub struct Outbox {
	messages: Vec<Message>,
}

impl Outbox {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push<T: Serialize + ?Sized>(&mut self, entity: &T, topics: &[Topic]) {
		match serde_json::to_value(entity) {
			Ok(payload) => self.messages.extend(topics.iter().map(|topic| Message {
				topic: topic.to_string(),
				payload: payload.clone(),
			})),
			Err(e) => warn!(target: "publisher", error = %e, "Failed to serialize event"),
		}
	}

	pub fn len(&self) -> usize {
		self.messages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}
}

/// Forwards messages into a bounded channel without waiting
pub struct ChannelPublisher {
	sender: mpsc::Sender<Message>,
}

impl ChannelPublisher {
	pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
		let (sender, receiver) = mpsc::channel(capacity.max(1));
		(Self { sender }, receiver)
	}
}

#[async_trait]
impl Publisher for ChannelPublisher {
	async fn publish(&self, message: Message) -> Result<(), PublishError> {
		self.sender.try_send(message).map_err(|e| match e {
			mpsc::error::TrySendError::Full(_) => PublishError::Full,
			mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
		})
	}
}

/// Records every message; used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryPublisher {
	messages: Mutex<Vec<Message>>,
}

impl MemoryPublisher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn messages(&self) -> Vec<Message> {
		self.messages.lock().map(|m| m.clone()).unwrap_or_default()
	}

	pub fn topics(&self) -> Vec<String> {
		self.messages().into_iter().map(|m| m.topic).collect()
	}

	/// Messages published on `topic`, oldest first
	pub fn on(&self, topic: Topic) -> Vec<serde_json::Value> {
		let name = topic.to_string();
		self.messages()
			.into_iter()
			.filter(|m| m.topic == name)
			.map(|m| m.payload)
			.collect()
	}

	pub fn clear(&self) {
		if let Ok(mut messages) = self.messages.lock() {
			messages.clear();
		}
	}
}

#[async_trait]
impl Publisher for MemoryPublisher {
	async fn publish(&self, message: Message) -> Result<(), PublishError> {
		self.messages
			.lock()
			.map_err(|e| PublishError::Transport(e.to_string()))?
			.push(message);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Broken;

	#[async_trait]
	impl Publisher for Broken {
		async fn publish(&self, _message: Message) -> Result<(), PublishError> {
			Err(PublishError::Transport("down".to_string()))
		}
	}

	#[test]
	fn test_topic_names() {
		assert_eq!(Topic::DepositOpen.to_string(), "deposit/open");
		assert_eq!(Topic::TradeTicker(Resolution::FourHours).to_string(), "trade/ticker:4h");
		assert_eq!(Topic::NotifyWithdraw.to_string(), "notify/withdraw");
	}

	#[tokio::test]
	async fn test_outbox_publishes_after_flush() {
		let memory = Arc::new(MemoryPublisher::new());
		let events = Events::new(memory.clone());

		let mut outbox = Outbox::new();
		outbox.push(&serde_json::json!({"id": 1}), &[Topic::OrderCreate, Topic::OrderStatus]);
		assert_eq!(outbox.len(), 2);
		assert!(memory.messages().is_empty());

		events.flush(outbox).await;
		assert_eq!(memory.topics(), vec!["order/create", "order/status"]);
	}

	#[tokio::test]
	async fn test_publish_failure_is_swallowed() {
		let events = Events::new(Arc::new(Broken));
		events.emit(&1u8, &[Topic::ChainStatus]).await;
	}

	#[tokio::test]
	async fn test_channel_publisher_reports_full() {
		let (publisher, mut receiver) = ChannelPublisher::new(1);
		let message = Message {
			topic: "a".to_string(),
			payload: serde_json::Value::Null,
		};
		publisher.publish(message.clone()).await.unwrap();
		assert!(matches!(publisher.publish(message.clone()).await, Err(PublishError::Full)));
		assert_eq!(receiver.recv().await.unwrap(), message);
	}
}

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

use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, Result};
use bourse_store::{
	Events, PriceFeed, PriceOracle, QuoteSource, StaticQuotes, connect, publisher::ChannelPublisher,
};
use tokio::{signal, sync::watch};
use tracing::{debug, info, warn};

use bourse_settlement::{
	Context, chains::HttpConnector, config::SettlementConfig, service,
};

#[tokio::main]
async fn main() -> Result<()> {
	bourse_settlement::logging::init_logging()?;

	let config = match std::env::var("SETTLEMENT_CONFIG") {
		Ok(path) => SettlementConfig::from_file(&path)
			.with_context(|| format!("Failed to load configuration from {}", path))?,
		Err(_) => SettlementConfig::from_env().unwrap_or_else(|e| {
			warn!(target: "server", error = %e, "Using default configuration");
			SettlementConfig::default()
		}),
	};

	info!(target: "server", "Starting Bourse Settlement");
	info!(target: "server", "Database: {}", config.database.url);
	info!(target: "server", "Scanner tick every {}ms", config.scan_interval_ms);
	info!(target: "server", "Withdrawals every {}s", config.withdrawal_interval_secs);

	let pool = connect(&config.database)
		.await
		.context("Failed to open database")?;

	let (publisher, mut messages) = ChannelPublisher::new(config.publisher_capacity);
	let events = Events::new(Arc::new(publisher));
	let drain = tokio::spawn(async move {
		while let Some(message) = messages.recv().await {
			debug!(target: "publisher", topic = %message.topic, payload = %message.payload, "Event");
		}
	});

	let mut quotes = StaticQuotes::new("config");
	for quote in &config.quotes {
		quotes = quotes.with(&quote.base, &quote.quote, quote.price);
	}
	let sources: Vec<Arc<dyn QuoteSource>> = vec![Arc::new(quotes)];
	let feed: Arc<dyn PriceFeed> = Arc::new(
		PriceOracle::new(sources).with_pause(Duration::from_millis(config.oracle_pause_ms)),
	);
	let connector = Arc::new(HttpConnector::new(Duration::from_secs(config.rpc_timeout_secs.max(1))));

	let ctx = Context::new(pool.clone(), events, connector, feed);
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	let loops = service::spawn(ctx, &config, shutdown_rx);

	signal::ctrl_c()
		.await
		.context("Failed to listen for shutdown signal")?;
	info!(target: "server", "Shutting down...");

	shutdown_tx.send(true).ok();
	for handle in loops {
		if let Err(e) = handle.await {
			warn!(target: "server", error = %e, "Loop ended abnormally");
		}
	}
	drain.abort();
	pool.close().await;

	info!(target: "server", "Shutdown complete");
	Ok(())
}

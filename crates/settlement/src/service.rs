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

//! Background loops of the settlement service

use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle, time};
use tracing::{debug, info, warn};

use crate::config::SettlementConfig;
use crate::context::Context;
use crate::scanner::Scanner;
use crate::withdrawal::WithdrawalEngine;
use crate::{Result, prober, reward};

/// Spawn the scanner, withdrawal, reward and prober loops
pub fn spawn(ctx: Context, config: &SettlementConfig, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
	let scanner = tokio::spawn(
		Scanner::new(ctx.clone()).run(Duration::from_millis(config.scan_interval_ms.max(1)), shutdown.clone()),
	);

	let withdrawals = {
		let engine = std::sync::Arc::new(WithdrawalEngine::new(ctx.clone()));
		tokio::spawn(run_every(
			"withdrawal",
			Duration::from_secs(config.withdrawal_interval_secs.max(1)),
			shutdown.clone(),
			move || {
				let engine = engine.clone();
				async move { engine.tick().await }
			},
		))
	};

	let rewards = {
		let ctx = ctx.clone();
		tokio::spawn(run_every(
			"reward",
			Duration::from_secs(config.reward_interval_secs.max(1)),
			shutdown.clone(),
			move || {
				let ctx = ctx.clone();
				async move { reward::sweep(&ctx).await }
			},
		))
	};

	let probes = tokio::spawn(run_every(
		"prober",
		Duration::from_secs(config.probe_interval_secs.max(1)),
		shutdown,
		move || {
			let ctx = ctx.clone();
			async move { prober::probe(&ctx).await }
		},
	));

	vec![scanner, withdrawals, rewards, probes]
}

async fn run_every<F, Fut>(
	name: &'static str,
	period: Duration,
	mut shutdown: watch::Receiver<bool>,
	mut tick: F,
) where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<usize>>,
{
	info!(target: "settlement", task = name, period = ?period, "Loop started");
	let mut interval = time::interval(period);
	interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
	loop {
		tokio::select! {
			_ = interval.tick() => match tick().await {
				Ok(count) => debug!(target: "settlement", task = name, count, "Tick done"),
				Err(e) => warn!(target: "settlement", task = name, error = %e, "Tick failed"),
			},
			changed = shutdown.changed() => {
				if changed.is_err() || *shutdown.borrow() {
					break;
				}
			}
		}
	}
	info!(target: "settlement", task = name, "Loop stopped");
}

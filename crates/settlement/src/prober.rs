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

//! Chain liveness prober

use bourse_store::{Topic, registry};
use tracing::{info, warn};

use crate::Result;
use crate::chains::RetryPolicy;
use crate::context::Context;

/// Probe every active chain once and record whether its node answers.
/// Returns how many chains changed state.
pub async fn probe(ctx: &Context) -> Result<usize> {
	let chains = {
		let mut conn = ctx.pool.acquire().await?;
		registry::active_chains(&mut conn).await?
	};

	let mut changed = 0;
	for mut chain in chains {
		let alive = match ctx.connector.connect(&chain, RetryPolicy::SCANNER).await {
			Ok(_) => true,
			Err(e) => {
				if chain.alive {
					warn!(target: "prober", chain = chain.id, name = %chain.name, error = %e, "Chain unreachable");
				}
				false
			}
		};

		let flipped = {
			let mut conn = ctx.pool.acquire().await?;
			registry::set_chain_alive(&mut conn, chain.id, alive).await?
		};
		if flipped {
			info!(target: "prober", chain = chain.id, name = %chain.name, alive, "Chain liveness changed");
			chain.alive = alive;
			ctx.events.emit(&chain.redacted(), &[Topic::ChainStatus]).await;
			changed += 1;
		}
	}
	Ok(changed)
}

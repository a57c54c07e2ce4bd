//! Transaction confirmation poller.
//!
//! Polls signature status until the cluster reports the finalized tier or a
//! deadline elapses. Status-query errors are tolerated and counted as
//! not-yet-confirmed; only the deadline or a finalized report ends the loop.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use solana_sdk::signature::Signature;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::chain::{ChainGateway, ConfirmationTier};
use crate::error::SwapError;

pub struct TxConfirmer {
    chain: Arc<dyn ChainGateway>,
    timeout: Duration,
    poll_interval: Duration,
    in_flight: Arc<DashMap<Signature, ()>>,
}

/// Releases the in-flight entry on every exit path of the poll loop.
struct InFlightGuard {
    map: Arc<DashMap<Signature, ()>>,
    signature: Signature,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.signature);
    }
}

impl TxConfirmer {
    pub fn new(chain: Arc<dyn ChainGateway>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            chain,
            timeout,
            poll_interval,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Poll until `signature` is finalized (`true`) or the deadline elapses
    /// (`false`).
    ///
    /// At most one poll loop runs per signature; a concurrent call for the
    /// same signature reports [`SwapError::AlreadyInProgress`] immediately
    /// instead of queueing. The insert below is the atomic test-and-set that
    /// makes the guard race-free.
    pub async fn confirm(&self, signature: &Signature) -> Result<bool, SwapError> {
        if self.in_flight.insert(*signature, ()).is_some() {
            return Err(SwapError::AlreadyInProgress(signature.to_string()));
        }
        let _guard = InFlightGuard {
            map: Arc::clone(&self.in_flight),
            signature: *signature,
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            if Instant::now() >= deadline {
                warn!("confirmation deadline elapsed for {}", signature);
                return Ok(false);
            }

            match self.chain.signature_status(signature).await {
                Ok(Some(ConfirmationTier::Finalized)) => {
                    debug!("transaction {} finalized", signature);
                    return Ok(true);
                }
                Ok(tier) => {
                    debug!("transaction {} not finalized yet ({:?})", signature, tier);
                }
                Err(err) => {
                    warn!("status query for {} failed: {:#}", signature, err);
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

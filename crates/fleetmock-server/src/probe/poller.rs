// ============================================
// File: crates/fleetmock-server/src/probe/poller.rs
// ============================================
//! # Read Poller
//!
//! Background loop that polls `/read` like an agent does and answers each
//! handed-out query with an empty result on `/write`.
//!
//! ⚠️ Important Note for Next Developer:
//!   - A poll may be held by the server for the configured delay; shutdown
//!     interrupts it
//!   - A rejected node key ends the loop; other failures are retried
//!
//! Last Modified: v0.1.0 - Initial read poller
// ============================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::client::ProbeClient;
use crate::error::{Result, ServerError};

/// Polls for distributed queries until enough arrived or shutdown.
pub struct ReadPoller {
    client: Arc<ProbeClient>,
    interval: Duration,
    limit: usize,
}

impl ReadPoller {
    /// Creates a new poller.
    ///
    /// # Arguments
    /// * `client` - Enrolled probe client
    /// * `interval` - Pause between polls
    /// * `limit` - Stop after this many queries; 0 runs until shutdown
    #[must_use]
    pub fn new(client: Arc<ProbeClient>, interval: Duration, limit: usize) -> Self {
        Self {
            client,
            interval,
            limit,
        }
    }

    /// Runs the poll loop.
    ///
    /// Returns the `(key, query)` pairs received, in order.
    ///
    /// # Errors
    /// Returns `Unauthorized` if the server rejects the node key.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<Vec<(String, String)>> {
        info!(
            "Read poller started ({}ms, limit {})",
            self.interval.as_millis(),
            self.limit
        );
        let mut received = Vec::new();
        let mut failures = 0u32;

        while self.limit == 0 || received.len() < self.limit {
            tokio::select! {
                _ = shutdown.recv() => { info!("Read poller stopping"); break; }
                result = self.client.read() => match result {
                    Ok(response) => {
                        failures = 0;
                        for (key, query) in response.queries {
                            info!(key = %key, query = %query, "Distributed query received");
                            if let Err(e) = self.client.write(&key, Vec::new(), 0).await {
                                warn!("Write failed: {}", e);
                            }
                            received.push((key, query));
                        }
                    }
                    Err(ServerError::Unauthorized) => {
                        error!("Node key rejected, stopping read poller");
                        return Err(ServerError::Unauthorized);
                    }
                    Err(e) => {
                        failures += 1;
                        if failures >= 3 { error!("Read failed: {}", e); }
                        else { warn!("Read failed: {}", e); }
                    }
                }
            }

            if self.limit != 0 && received.len() >= self.limit {
                break;
            }

            tokio::select! {
                _ = shutdown.recv() => { info!("Read poller stopping"); break; }
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        Ok(received)
    }
}

impl std::fmt::Debug for ReadPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadPoller")
            .field("client", &self.client)
            .field("interval", &self.interval)
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_stops_poller() {
        let client =
            Arc::new(ProbeClient::new("http://127.0.0.1:9", false, Duration::from_millis(200)).unwrap());
        let (tx, rx) = broadcast::channel(1);
        let poller = ReadPoller::new(client, Duration::from_millis(50), 1);

        let task = tokio::spawn(poller.run(rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(()).unwrap();

        let received = task.await.unwrap().unwrap();
        assert!(received.is_empty());
    }
}

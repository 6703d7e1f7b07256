use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Re-fetches the selected tournament so results and other participants'
/// bets show up without user input.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    every: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>, every: Duration) -> Self {
        Self { network_requests, every }
    }

    pub async fn run(self) {
        let mut snapshot_interval = interval(self.every);
        // First tick fires immediately; startup already loads the snapshot.
        snapshot_interval.tick().await;

        loop {
            snapshot_interval.tick().await;
            if self
                .network_requests
                .send(NetworkRequest::RefreshSnapshot)
                .await
                .is_err()
            {
                break;
            }
        }
    }
}

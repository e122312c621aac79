use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::error::DataError;
use crate::generator;
use crate::model::Stock;
use crate::server::ShutdownSignal;

/// Stand-in for a real market-data backend: resolves to a generated
/// universe after an artificial delay. The delay races a shutdown signal so
/// component teardown can never leave a fetch dangling.
#[derive(Debug, Clone)]
pub struct MockProvider {
    pub latency: Duration,
    pub seed: u64,
    pub universe_size: usize,
}

impl MockProvider {
    pub fn new(latency: Duration, seed: u64, universe_size: usize) -> Self {
        Self {
            latency,
            seed,
            universe_size,
        }
    }

    pub async fn fetch_universe(
        &self,
        mut shutdown: watch::Receiver<ShutdownSignal>,
    ) -> Result<Vec<Stock>, DataError> {
        let sleep = time::sleep(self.latency);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => break,
                changed = shutdown.changed() => {
                    match changed {
                        Ok(()) => {
                            if !matches!(*shutdown.borrow(), ShutdownSignal::None) {
                                return Err(DataError::Unavailable(
                                    "fetch cancelled by shutdown".to_string(),
                                ));
                            }
                        }
                        // Sender dropped: treat as teardown.
                        Err(_) => {
                            return Err(DataError::Unavailable(
                                "fetch cancelled by shutdown".to_string(),
                            ));
                        }
                    }
                }
            }
        }

        Ok(generator::generate_universe(self.seed, self.universe_size))
    }
}

use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use serde_json::{json, Map, Value};
use tokio::{
    sync::{mpsc, watch},
    time::{interval, MissedTickBehavior},
};

use crate::logging;

use super::ShutdownSignal;

#[derive(Debug)]
pub enum MetricsEvent {
    RefreshBatch { quotes: usize },
    AlertsTriggered { count: usize },
    ClientLag { skipped: usize, component: &'static str },
}

#[derive(Clone, Default)]
pub struct MetricsTx(Option<mpsc::UnboundedSender<MetricsEvent>>);

impl MetricsTx {
    pub fn report(&self, event: MetricsEvent) {
        if let Some(sender) = &self.0 {
            let _ = sender.send(event);
        }
    }

    pub fn noop() -> Self {
        Self(None)
    }
}

pub fn reporter(
    shutdown: watch::Receiver<ShutdownSignal>,
) -> (MetricsTx, impl std::future::Future<Output = Result<()>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MetricsTx(Some(tx)), process_events(rx, shutdown))
}

async fn process_events(
    mut rx: mpsc::UnboundedReceiver<MetricsEvent>,
    mut shutdown: watch::Receiver<ShutdownSignal>,
) -> Result<()> {
    let mut refreshes: usize = 0;
    let mut total_quotes: usize = 0;
    let mut alerts_triggered: usize = 0;
    let mut client_lag: HashMap<&'static str, (usize, usize)> = HashMap::new();

    let mut reporter = interval(Duration::from_secs(10));
    reporter.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(MetricsEvent::RefreshBatch { quotes }) => {
                        refreshes = refreshes.saturating_add(1);
                        total_quotes = total_quotes.saturating_add(quotes);
                    }
                    Some(MetricsEvent::AlertsTriggered { count }) => {
                        alerts_triggered = alerts_triggered.saturating_add(count);
                    }
                    Some(MetricsEvent::ClientLag { skipped, component }) => {
                        let entry = client_lag.entry(component).or_insert((0, 0));
                        entry.0 = entry.0.saturating_add(1);
                        entry.1 = entry.1.saturating_add(skipped);
                    }
                    None => break,
                }
            }
            _ = reporter.tick() => {
                if refreshes > 0 || alerts_triggered > 0 || !client_lag.is_empty() {
                    let lag_snapshot = if client_lag.is_empty() {
                        Value::Null
                    } else {
                        let mut map = Map::new();
                        for (component, (events, skipped)) in &client_lag {
                            map.insert(
                                component.to_string(),
                                json!({
                                    "events": events,
                                    "skipped": skipped
                                }),
                            );
                        }
                        Value::Object(map)
                    };

                    logging::info(
                        "metrics.refresh",
                        "refresh throughput summary",
                        json!({
                            "refreshes": refreshes,
                            "total_quotes": total_quotes,
                            "avg_quotes_per_refresh": if refreshes > 0 { total_quotes as f64 / refreshes as f64 } else { 0.0 },
                            "alerts_triggered": alerts_triggered,
                            "client_lag": lag_snapshot,
                        })
                    );
                }

                refreshes = 0;
                total_quotes = 0;
                alerts_triggered = 0;
                client_lag.clear();
            }
            changed = shutdown.changed() => {
                if changed.is_ok() && !matches!(*shutdown.borrow(), ShutdownSignal::None) {
                    break;
                }
            }
        }
    }

    logging::info_simple("metrics.stop", "Metrics reporter stopped");
    Ok(())
}

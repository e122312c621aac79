use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{Recommendation, Stock};

/// Condition an alert waits on. Volume spikes compare against the volume
/// recorded at the previous refresh, price levels against the live quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AlertCondition {
    PriceAbove(f64),
    PriceBelow(f64),
    /// Multiple of the previous refresh volume, e.g. 2.5 = +150%.
    VolumeSpike(f64),
    SignalReaches(Recommendation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Triggered,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub symbol: String,
    #[serde(flatten)]
    pub condition: AlertCondition,
    pub message: String,
    pub enabled: bool,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Quote fields captured before a refresh, needed to detect transitions.
#[derive(Debug, Clone, Copy)]
pub struct PriorQuote {
    pub volume: u64,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertBook {
    alerts: Vec<Alert>,
    next_id: u64,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        symbol: impl Into<String>,
        condition: AlertCondition,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u64 {
        self.next_id += 1;
        self.alerts.push(Alert {
            id: self.next_id,
            symbol: symbol.into(),
            condition,
            message: message.into(),
            enabled: true,
            status: AlertStatus::Active,
            created_at: now,
            triggered_at: None,
        });
        self.next_id
    }

    /// Returns false when no alert with that id exists.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|alert| alert.id != id);
        self.alerts.len() != before
    }

    pub fn set_enabled(&mut self, id: u64, enabled: bool) -> bool {
        match self.alerts.iter_mut().find(|alert| alert.id == id) {
            Some(alert) => {
                alert.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u64) -> Option<&Alert> {
        self.alerts.iter().find(|alert| alert.id == id)
    }

    pub fn list(&self, status: Option<AlertStatus>) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|alert| status.map_or(true, |wanted| alert.status == wanted))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Sweep all enabled active alerts against the refreshed quotes. Returns
    /// the ids that fired this round. Disabled alerts and alerts for symbols
    /// no longer in the universe are left untouched.
    pub fn evaluate(
        &mut self,
        prior: &HashMap<String, PriorQuote>,
        stocks: &IndexMap<String, Stock>,
        now: DateTime<Utc>,
    ) -> Vec<u64> {
        let mut fired = Vec::new();
        for alert in self.alerts.iter_mut() {
            if !alert.enabled || alert.status != AlertStatus::Active {
                continue;
            }
            let Some(stock) = stocks.get(&alert.symbol) else {
                continue;
            };

            let hit = match alert.condition {
                AlertCondition::PriceAbove(level) => stock.price >= level,
                AlertCondition::PriceBelow(level) => stock.price <= level,
                AlertCondition::VolumeSpike(multiple) => prior
                    .get(&alert.symbol)
                    .map(|prev| {
                        prev.volume > 0 && stock.volume as f64 >= prev.volume as f64 * multiple
                    })
                    .unwrap_or(false),
                AlertCondition::SignalReaches(target) => {
                    let reached = stock.recommendation.rank() >= target.rank();
                    let was_below = prior
                        .get(&alert.symbol)
                        .map(|prev| prev.recommendation.rank() < target.rank())
                        .unwrap_or(true);
                    reached && was_below
                }
            };

            if hit {
                alert.status = AlertStatus::Triggered;
                alert.triggered_at = Some(now);
                fired.push(alert.id);
            }
        }
        fired
    }
}

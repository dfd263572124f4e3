use serde_json::Value;
use std::fmt;

use crate::query::TimeWindow;

/// One order to look up, with its first window already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub order_id: String,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Found,
    NotFound,
    Error(String),
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Found => write!(f, "1 result"),
            OrderStatus::NotFound => write!(f, "not found"),
            OrderStatus::Error(e) => write!(f, "Error: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    NotAttempted,
    Delivered,
    /// Rejected for a reason the operator has to fix in the configuration.
    Misconfigured { reason: String, hint: &'static str },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderOutcome {
    pub order_id: String,
    pub status: OrderStatus,
    pub result: Option<Value>,
    pub delivery: Delivery,
    /// Number of search runs issued (1, or 2 after a next-day retry).
    pub attempts: u32,
}

impl OrderOutcome {
    pub fn failed(order_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: OrderStatus::Error(reason.into()),
            result: None,
            delivery: Delivery::NotAttempted,
            attempts: 0,
        }
    }

    pub fn found_count(&self) -> usize {
        usize::from(self.result.is_some())
    }

    pub fn delivered_count(&self) -> usize {
        usize::from(self.delivery == Delivery::Delivered)
    }
}

/// Emitted as each order finishes, in completion order.
#[derive(Debug, Clone)]
pub struct ProgressEvent<'a> {
    pub index: usize,
    pub total: usize,
    pub order_id: &'a str,
    pub status: &'a OrderStatus,
}

impl fmt::Display for ProgressEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  [{}/{}] {}: {}",
            self.index + 1,
            self.total,
            self.order_id,
            self.status
        )
    }
}

/// Outcomes in input order plus totals. Built once every order has finished.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub outcomes: Vec<OrderOutcome>,
    pub found: usize,
    pub delivered: usize,
    pub not_found: Vec<String>,
    /// Set when any delivery failed on configuration; printed once.
    pub sink_hint: Option<&'static str>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<OrderOutcome>) -> Self {
        let mut batch = BatchResult::default();
        for outcome in &outcomes {
            batch.found += outcome.found_count();
            batch.delivered += outcome.delivered_count();
            if outcome.result.is_none() {
                batch.not_found.push(outcome.order_id.clone());
            }
            if let Delivery::Misconfigured { hint, .. } = &outcome.delivery {
                batch.sink_hint.get_or_insert(*hint);
            }
        }
        batch.outcomes = outcomes;
        batch
    }

    pub fn results(&self) -> impl Iterator<Item = &Value> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref())
    }

    /// 0 when anything was extracted, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.found > 0 {
            0
        } else {
            1
        }
    }
}

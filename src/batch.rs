use futures::stream::{self, StreamExt};
use log::error;
use std::sync::Arc;

use crate::models::order::{BatchResult, OrderOutcome, OrderRequest, ProgressEvent};
use crate::runner::OrderRunner;

/// Fans orders out over at most `workers` concurrent tasks and hands back the
/// outcomes in input order once every task has finished.
pub struct BatchOrchestrator {
    runner: Arc<OrderRunner>,
    workers: usize,
}

impl BatchOrchestrator {
    pub fn new(runner: OrderRunner, workers: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// `on_progress` fires once per order in completion order.
    pub async fn run<F>(&self, orders: Vec<OrderRequest>, mut on_progress: F) -> BatchResult
    where
        F: FnMut(&ProgressEvent<'_>),
    {
        let total = orders.len();
        let order_ids: Vec<String> = orders.iter().map(|o| o.order_id.clone()).collect();
        let mut slots: Vec<Option<OrderOutcome>> = vec![None; total];

        let mut completions = stream::iter(orders.into_iter().enumerate())
            .map(|(index, order)| {
                let runner = Arc::clone(&self.runner);
                let order_id = order.order_id.clone();
                // Spawned lazily, so only `workers` tasks are ever in flight.
                let handle = tokio::spawn(async move { runner.run(&order).await });
                async move {
                    let outcome = match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("[{}] worker failed: {}", order_id, e);
                            OrderOutcome::failed(order_id, e.to_string())
                        }
                    };
                    (index, outcome)
                }
            })
            .buffer_unordered(self.workers);

        while let Some((index, outcome)) = completions.next().await {
            on_progress(&ProgressEvent {
                index,
                total,
                order_id: &outcome.order_id,
                status: &outcome.status,
            });
            slots[index] = Some(outcome);
        }

        let outcomes = slots
            .into_iter()
            .zip(order_ids)
            .map(|(slot, order_id)| {
                slot.unwrap_or_else(|| OrderOutcome::failed(order_id, "worker produced no outcome"))
            })
            .collect();

        BatchResult::from_outcomes(outcomes)
    }
}

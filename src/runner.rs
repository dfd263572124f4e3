use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::api::{ApiError, Credentials, SumoClient};
use crate::config::SearchSettings;
use crate::extract::first_payload;
use crate::models::order::{Delivery, OrderOutcome, OrderRequest, OrderStatus};
use crate::poll::{poll_job, JobState, SearchJob};
use crate::query::{QueryBuilder, TimeWindow};
use crate::retry::RetryPolicy;
use crate::sink::Sink;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("search job {job_id} was cancelled")]
    Cancelled { job_id: String },
}

/// Runs one order end to end: search, optional next-day retry, optional delivery.
pub struct OrderRunner {
    credentials: Credentials,
    builder: QueryBuilder,
    settings: SearchSettings,
    retry: RetryPolicy,
    sink: Option<Arc<dyn Sink>>,
}

impl OrderRunner {
    pub fn new(credentials: Credentials, builder: QueryBuilder, settings: SearchSettings) -> Self {
        Self {
            credentials,
            builder,
            settings,
            retry: RetryPolicy::default(),
            sink: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sink(mut self, sink: Option<Arc<dyn Sink>>) -> Self {
        self.sink = sink;
        self
    }

    pub async fn run(&self, order: &OrderRequest) -> OrderOutcome {
        let order_id = order.order_id.as_str();
        let mut attempts = 1;
        let mut last = self.search(order_id, &order.window).await;

        let found = matches!(last, Ok(Some(_)));
        if let Some(next) = self.retry.next_window(&order.window, found) {
            info!(
                "[{}] No result for {}, trying next day.",
                order_id,
                order.window.from.date()
            );
            attempts += 1;
            last = self.search(order_id, &next).await;
        }

        let (status, result) = match last {
            Ok(Some(value)) => (OrderStatus::Found, Some(value)),
            Ok(None) => (OrderStatus::NotFound, None),
            Err(e) => {
                warn!("[{}] {}", order_id, e);
                (OrderStatus::Error(e.to_string()), None)
            }
        };

        let delivery = match &result {
            Some(value) => self.deliver(order_id, value).await,
            None => Delivery::NotAttempted,
        };

        OrderOutcome {
            order_id: order.order_id.clone(),
            status,
            result,
            delivery,
            attempts,
        }
    }

    /// One full submit, poll, extract cycle on a fresh session. The job is
    /// deleted on every path once it exists.
    async fn search(
        &self,
        order_id: &str,
        window: &TimeWindow,
    ) -> Result<Option<Value>, RunError> {
        let client = SumoClient::new(&self.credentials)?;
        let spec = self.builder.build(order_id, window);

        let job_id = client.submit(&spec).await?;
        info!("[{}] Search job created: {}", order_id, job_id);

        let mut job = SearchJob::submitted(job_id, spec);
        let result = self.drive(&client, &mut job).await;
        client.delete_quietly(&job.id).await;
        result
    }

    async fn drive(
        &self,
        client: &SumoClient,
        job: &mut SearchJob,
    ) -> Result<Option<Value>, RunError> {
        let state = poll_job(client, job, self.settings.poll_interval).await?;
        if state.has_results() {
            return Ok(first_payload(client, job, self.settings.page_size).await?);
        }
        match state {
            JobState::Cancelled => Err(RunError::Cancelled {
                job_id: job.id.clone(),
            }),
            _ => Ok(None),
        }
    }

    async fn deliver(&self, order_id: &str, value: &Value) -> Delivery {
        let Some(sink) = &self.sink else {
            return Delivery::NotAttempted;
        };
        let body = value.to_string();
        match sink.deliver(&body).await {
            Ok(()) => {
                info!("[{}] -> sent to sink", order_id);
                Delivery::Delivered
            }
            Err(e) => match e.hint() {
                Some(hint) => {
                    error!("[{}] -> sink send failed: {}", order_id, e);
                    Delivery::Misconfigured {
                        reason: e.to_string(),
                        hint,
                    }
                }
                None => {
                    warn!("[{}] -> sink send failed: {}", order_id, e);
                    Delivery::Failed(e.to_string())
                }
            },
        }
    }
}

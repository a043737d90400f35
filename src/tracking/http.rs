use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::Client;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::SendError, UnboundedSender};
use tracing::{debug, warn};

use super::{SessionEvent, SessionNotifier};
use crate::config::TrackingConfig;
use crate::error::{TrackingError, TrackingResult};

/// Posts session events as JSON to a tracking endpoint.
///
/// [`SessionNotifier::notify`] queues the event and returns at once. A single
/// delivery task per runtime drains the queue, so events arrive in the order
/// they were emitted; a slow endpoint delays later events rather than
/// reordering them. There is no retry; a failed delivery is logged and
/// forgotten.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
    queue: Arc<Mutex<Option<UnboundedSender<SessionEvent>>>>,
}

impl HttpNotifier {
    /// Create a notifier for an endpoint.
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> TrackingResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(TrackingError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            queue: Arc::new(Mutex::new(None)),
        })
    }

    /// Build from configuration; `None` when no endpoint is configured.
    pub fn from_config(config: &TrackingConfig) -> TrackingResult<Option<Self>> {
        config
            .endpoint
            .as_ref()
            .map(|endpoint| Self::new(endpoint.clone(), config.timeout_ms))
            .transpose()
    }

    /// Endpoint events are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one event and wait for the response.
    pub async fn send(&self, event: &SessionEvent) -> TrackingResult<()> {
        post_event(&self.client, &self.endpoint, event).await
    }

    /// Spawn the delivery task on `handle` and return its queue.
    fn spawn_worker(&self, handle: &Handle) -> UnboundedSender<SessionEvent> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SessionEvent>();
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        handle.spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(e) = post_event(&client, &endpoint, &event).await {
                    warn!(
                        kind = event.kind(),
                        session_id = %event.session_id(),
                        error = %e,
                        "Failed to deliver tracking event"
                    );
                }
            }
            debug!(endpoint = %endpoint, "Tracking delivery task stopped");
        });

        sender
    }
}

async fn post_event(client: &Client, endpoint: &str, event: &SessionEvent) -> TrackingResult<()> {
    let response = client.post(endpoint).json(event).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TrackingError::Rejected {
            status: status.as_u16(),
        });
    }

    debug!(
        kind = event.kind(),
        session_id = %event.session_id(),
        "Tracking event delivered"
    );
    Ok(())
}

impl SessionNotifier for HttpNotifier {
    fn notify(&self, event: SessionEvent) {
        let Ok(handle) = Handle::try_current() else {
            warn!(
                kind = event.kind(),
                session_id = %event.session_id(),
                "No async runtime available, dropping tracking event"
            );
            return;
        };

        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);

        // the delivery task dies with the runtime that spawned it
        let event = match queue.as_ref() {
            Some(sender) => match sender.send(event) {
                Ok(()) => return,
                Err(SendError(event)) => event,
            },
            None => event,
        };

        let sender = self.spawn_worker(&handle);
        if let Err(SendError(event)) = sender.send(event) {
            warn!(
                kind = event.kind(),
                session_id = %event.session_id(),
                "Tracking queue closed, dropping tracking event"
            );
        }
        *queue = Some(sender);
    }
}

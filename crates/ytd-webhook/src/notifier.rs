//! [`WebhookSenderPort`] implementation: signed, retried, throttled delivery
//! dispatched off the job's own execution path (§4.D).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use ytd_core::{JobId, WebhookEvent, WebhookSenderPort};

use crate::signer::{sanitize_url_for_log, sign};

const BACKOFF_SCHEDULE: &[Duration] = &[
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];
const THROTTLE_WINDOW: Duration = Duration::from_secs(1);

pub struct WebhookNotifier {
    client: Client,
    secret: String,
    max_retries: u32,
    per_attempt_timeout: Duration,
    last_progress_sent: Mutex<HashMap<JobId, Instant>>,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(secret: impl Into<String>, max_retries: u32, per_attempt_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            secret: secret.into(),
            max_retries,
            per_attempt_timeout,
            last_progress_sent: Mutex::new(HashMap::new()),
        }
    }

    fn should_throttle(&self, event: &WebhookEvent) -> bool {
        if !event.event.is_throttleable() {
            return false;
        }

        let mut last_sent = self.last_progress_sent.lock().unwrap();
        let now = Instant::now();
        match last_sent.get(&event.job_id) {
            Some(previous) if now.duration_since(*previous) < THROTTLE_WINDOW => true,
            _ => {
                last_sent.insert(event.job_id, now);
                false
            }
        }
    }

    async fn deliver(client: Client, secret: String, url: String, body: Vec<u8>, max_retries: u32, per_attempt_timeout: Duration) {
        let signature = sign(&secret, &body);
        let log_url = sanitize_url_for_log(&url);

        for attempt in 0..=max_retries {
            let result = client
                .post(&url)
                .header("Content-Type", "application/json")
                .header("X-Webhook-Signature", &signature)
                .timeout(per_attempt_timeout)
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(url = %log_url, attempt, "webhook delivered");
                    return;
                }
                Ok(response) if response.status().is_client_error() => {
                    warn!(url = %log_url, status = %response.status(), "webhook rejected, not retrying");
                    return;
                }
                Ok(response) => {
                    warn!(url = %log_url, status = %response.status(), attempt, "webhook delivery failed");
                }
                Err(e) => {
                    warn!(url = %log_url, error = %e, attempt, "webhook delivery error");
                }
            }

            if let Some(delay) = BACKOFF_SCHEDULE.get(attempt as usize) {
                tokio::time::sleep(*delay).await;
            }
        }

        warn!(url = %log_url, "webhook delivery exhausted retries");
    }
}

#[async_trait]
impl WebhookSenderPort for WebhookNotifier {
    async fn send(&self, url: String, event: WebhookEvent) {
        if self.should_throttle(&event) {
            debug!(job_id = %event.job_id, "suppressing throttled progress webhook");
            return;
        }

        let body = match serde_json::to_vec(&event) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to serialize webhook event");
                return;
            }
        };

        let client = self.client.clone();
        let secret = self.secret.clone();
        let max_retries = self.max_retries;
        let per_attempt_timeout = self.per_attempt_timeout;

        tokio::spawn(async move {
            Self::deliver(client, secret, url, body, max_retries, per_attempt_timeout).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytd_core::WebhookEventKind;

    fn event(kind: WebhookEventKind) -> WebhookEvent {
        WebhookEvent::new(kind, JobId::new(), serde_json::json!({}))
    }

    #[test]
    fn progress_events_throttle_within_window() {
        let notifier = WebhookNotifier::new("secret", 3, Duration::from_secs(10));
        let e = event(WebhookEventKind::DownloadProgress);
        assert!(!notifier.should_throttle(&e));
        let same_job = WebhookEvent { job_id: e.job_id, ..event(WebhookEventKind::DownloadProgress) };
        assert!(notifier.should_throttle(&same_job));
    }

    #[test]
    fn terminal_events_are_never_throttled() {
        let notifier = WebhookNotifier::new("secret", 3, Duration::from_secs(10));
        let e = event(WebhookEventKind::DownloadCompleted);
        assert!(!notifier.should_throttle(&e));
        let again = WebhookEvent { job_id: e.job_id, ..event(WebhookEventKind::DownloadCompleted) };
        assert!(!notifier.should_throttle(&again));
    }
}

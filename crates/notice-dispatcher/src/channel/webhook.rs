//! Direct-POST webhook delivery: a blocking `reqwest` client,
//! fire-and-forget, no retry (retry is `notice-retry`'s and the channel
//! worker's concern).

use std::time::Duration;

use anyhow::{Context, Result};
use notice_types::WebhookDeliveryJob;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// POST a `WebhookDeliveryJob`'s raw summary bytes to its destination
/// URL as the request body, with the subscription and event ids set as
/// headers so a receiver can deduplicate without parsing the body.
pub fn deliver(job: &WebhookDeliveryJob) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .context("failed to build webhook HTTP client")?;

    let response = client
        .post(&job.url)
        .header("Content-Type", "application/json")
        .header("X-Notice-Subscription-Id", &job.subscription_id)
        .header("X-Notice-Event-Id", &job.metadata.event_id)
        .body(job.summary_raw.clone())
        .send()
        .context("failed to send webhook request")?;

    if !response.status().is_success() {
        anyhow::bail!(
            "webhook request to {} failed with status {}",
            job.url,
            response.status()
        );
    }
    Ok(())
}

//! The Push Dispatcher: consume one notification event and fan out
//! per-subscriber delivery jobs, filtered by trigger set, with
//! partial-failure reporting.

pub mod channel;

use notice_errors::DispatchError;
use notice_queue::Publisher;
use notice_types::{
    BaselineTag, BrowserSupportStatus, DeliveryMetadata, EmailDeliveryJob, EventSummary,
    Frequency, SummaryHighlight, Subscription, Trigger, WebhookDeliveryJob,
    EVENT_SUMMARY_SCHEMA_V1,
};

/// Active subscriptions for a saved search at a frequency, regardless
/// of channel kind. The dispatcher itself groups by channel when
/// fanning out.
pub trait SubscriberFinder: Send + Sync {
    fn find_subscribers(
        &self,
        search_id: &str,
        frequency: Frequency,
    ) -> anyhow::Result<Vec<Subscription>>;
}

/// The channel-specific publish queues the dispatcher fans out onto.
pub struct DispatchQueues<'a> {
    pub email: &'a dyn Publisher<EmailDeliveryJob>,
    pub webhook: &'a dyn Publisher<WebhookDeliveryJob>,
}

/// Consume one notification event's summary and fan out delivery jobs
/// to matching subscribers.
///
/// `summary_value` is the already-parsed `EventSummary` JSON carried
/// verbatim from the notification queue message; `summary_raw` is the
/// canonical encoding of that same value, forwarded unchanged into
/// every delivery job so a channel worker never has to trust a
/// re-marshalled copy.
pub fn process_event(
    metadata: &DeliveryMetadata,
    summary_schema_version: &str,
    summary_value: &serde_json::Value,
    summary_raw: &[u8],
    subscribers: &dyn SubscriberFinder,
    queues: &DispatchQueues,
) -> Result<(), DispatchError> {
    if summary_schema_version != EVENT_SUMMARY_SCHEMA_V1 {
        return Err(DispatchError::UnknownSummarySchema {
            found: summary_schema_version.to_string(),
        });
    }
    let summary: EventSummary = serde_json::from_value(summary_value.clone())
        .map_err(|e| DispatchError::UnknownSummarySchema { found: e.to_string() })?;

    if !summary_has_changes(&summary) {
        return Ok(());
    }

    let subscriptions = subscribers
        .find_subscribers(&metadata.search_id, metadata.frequency)
        .map_err(|e| DispatchError::SubscriberLookupFailed(e.to_string()))?;

    let survivors: Vec<&Subscription> = subscriptions
        .iter()
        .filter(|s| should_notify(&s.triggers, &summary))
        .collect();

    let mut total = 0usize;
    let mut failed = 0usize;

    for subscription in survivors {
        for destination in &subscription.destinations {
            total += 1;
            let published = match destination {
                notice_types::Destination::Email { address } => queues.email.publish(
                    EVENT_SUMMARY_SCHEMA_V1,
                    "notice-dispatcher",
                    EmailDeliveryJob {
                        subscription_id: subscription.id.clone(),
                        recipient_email: address.clone(),
                        channel_id: destination.channel_id().to_string(),
                        triggers: subscription.triggers.clone(),
                        summary_raw: summary_raw.to_vec(),
                        metadata: metadata.clone(),
                    },
                ),
                notice_types::Destination::Webhook { url } => queues.webhook.publish(
                    EVENT_SUMMARY_SCHEMA_V1,
                    "notice-dispatcher",
                    WebhookDeliveryJob {
                        subscription_id: subscription.id.clone(),
                        url: url.clone(),
                        channel_id: destination.channel_id().to_string(),
                        triggers: subscription.triggers.clone(),
                        summary_raw: summary_raw.to_vec(),
                        metadata: metadata.clone(),
                    },
                ),
            };
            if published.is_err() {
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(DispatchError::PartialPublishFailure { failed, total });
    }
    Ok(())
}

/// A summary is "changed" iff any of its counters is non-zero.
fn summary_has_changes(summary: &EventSummary) -> bool {
    let c = &summary.categories;
    c.added > 0 || c.removed > 0 || c.updated > 0 || c.moved > 0 || c.split > 0 || c.query_changed > 0
}

fn should_notify(triggers: &[Trigger], summary: &EventSummary) -> bool {
    triggers
        .iter()
        .any(|t| trigger_matches(*t, &summary.highlights))
}

fn trigger_matches(trigger: Trigger, highlights: &[SummaryHighlight]) -> bool {
    highlights.iter().any(|h| {
        let SummaryHighlight::Changed {
            baseline_change,
            browser_changes,
            ..
        } = h
        else {
            return false;
        };
        match trigger {
            Trigger::FeaturePromotedToNewly => baseline_change.as_ref().is_some_and(|bc| {
                bc.from.status != BaselineTag::Newly && bc.to.status == BaselineTag::Newly
            }),
            Trigger::FeaturePromotedToWidely => baseline_change
                .as_ref()
                .is_some_and(|bc| bc.to.status == BaselineTag::Widely),
            Trigger::FeatureRegressedToLimited => baseline_change
                .as_ref()
                .is_some_and(|bc| bc.to.status == BaselineTag::Limited),
            Trigger::BrowserImplementationAnyComplete => browser_changes
                .values()
                .any(|bc| bc.to.status == BrowserSupportStatus::Available),
        }
    })
}

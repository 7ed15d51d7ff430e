//! Subscriptions, triggers, and delivery destinations.

use serde::{Deserialize, Serialize};

use crate::saved_search::Frequency;

/// A named predicate a subscriber attaches to decide whether a summary
/// should cause a delivery. Closed, versioned set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    FeaturePromotedToNewly,
    FeaturePromotedToWidely,
    FeatureRegressedToLimited,
    BrowserImplementationAnyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum Destination {
    Email { address: String },
    Webhook { url: String },
}

impl Destination {
    pub fn channel_id(&self) -> &'static str {
        match self {
            Destination::Email { .. } => "email",
            Destination::Webhook { .. } => "webhook",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub saved_search_id: String,
    pub frequency: Frequency,
    pub triggers: Vec<Trigger>,
    pub destinations: Vec<Destination>,
}

impl Subscription {
    pub fn has_trigger(&self, trigger: Trigger) -> bool {
        self.triggers.contains(&trigger)
    }
}

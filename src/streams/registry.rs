use std::collections::BTreeSet;

use dashmap::DashMap;

use crate::protocol::Subscription;
use crate::session::SessionManager;
use crate::store::Message;

/// Consumer-side record of active subscriptions.
///
/// The subscription id returned by a join is the only way to issue a matching
/// leave, so the registry keeps one per stream name.
pub struct StreamRegistry {
    /// stream_name -> Subscription
    subscriptions: DashMap<String, Subscription>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
        }
    }

    /// Join a stream through `session` and remember the binding.
    ///
    /// An existing subscription for the same stream is left first. Returns
    /// `None` and records nothing if the session is not connected.
    pub fn subscribe(
        &self,
        session: &SessionManager,
        stream_name: &str,
        group_id: &str,
        item_id: Option<&str>,
    ) -> Option<Subscription> {
        if !session.is_connected() {
            tracing::debug!(stream = %stream_name, "Not subscribing, session not connected");
            return None;
        }

        if let Some(previous) = self.unsubscribe(session, stream_name) {
            tracing::debug!(
                stream = %stream_name,
                subscription_id = %previous.subscription_id,
                "Replaced previous subscription"
            );
        }

        let subscription = Subscription::new(stream_name, group_id, item_id);
        if !session.join_stream(subscription.clone()) {
            return None;
        }
        self.subscriptions
            .insert(stream_name.to_string(), subscription.clone());
        Some(subscription)
    }

    /// Leave a stream using the recorded subscription id.
    /// Returns `None` if no subscription was recorded for it.
    pub fn unsubscribe(&self, session: &SessionManager, stream_name: &str) -> Option<Subscription> {
        let (_, subscription) = self.subscriptions.remove(stream_name)?;
        session.unsubscribe_from_stream(
            &subscription.stream_name,
            &subscription.group_id,
            &subscription.subscription_id,
            subscription.item_id.as_deref(),
        );
        Some(subscription)
    }

    pub fn get(&self, stream_name: &str) -> Option<Subscription> {
        self.subscriptions.get(stream_name).map(|s| s.clone())
    }

    /// All recorded subscriptions, ordered by stream name
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut subscriptions: Vec<Subscription> =
            self.subscriptions.iter().map(|r| r.value().clone()).collect();
        subscriptions.sort_by(|a, b| a.stream_name.cmp(&b.stream_name));
        subscriptions
    }

    /// Streams seen in `messages` plus every subscribed stream, sorted
    pub fn stream_names(&self, messages: &[Message]) -> Vec<String> {
        let mut names: BTreeSet<String> = messages
            .iter()
            .filter_map(|m| m.stream_name().map(str::to_string))
            .collect();
        names.extend(self.subscriptions.iter().map(|r| r.key().clone()));
        names.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

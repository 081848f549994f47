//! The push-channel fan-out abstraction.
//!
//! The teacher's event bridge wraps exactly one global
//! `broadcast::Sender<BroadcastEvent>` — every subscriber receives every
//! event. The outbound push-channel interface instead requires group-scoped
//! delivery keyed `call_{callID}`, plus an all-subscribers path for a fixed
//! set of call-status values. [`GroupBroadcaster`] extends the bridge's
//! single-sender idiom to a lazily-populated `DashMap` of per-group
//! senders, plus one extra sender for the all-subscribers channel.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dispatch::model::PushEvent;
use crate::error::TelecallResult;
use crate::protocol_constants::{ALL_SUBSCRIBER_CALL_STATUSES, EVENT_CHANNEL_CAPACITY, GROUP_KEY_PREFIX};

/// Builds the subscriber-group key for a call.
#[must_use]
pub fn group_key(call_id: &str) -> String {
    format!("{GROUP_KEY_PREFIX}{call_id}")
}

/// Push-channel fan-out capability, matching the outbound Broadcaster
/// interface's four operations. Each send returns `TelecallResult<()>` so
/// the dispatcher can log and continue past a failing send independently
/// of whatever persistence it already fired (see `dispatch::Dispatcher`).
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_transcript_update(&self, call_id: &str, text: &str, is_final: bool) -> TelecallResult<()>;
    async fn broadcast_call_status_update(&self, call_id: &str, status: &str) -> TelecallResult<()>;
    async fn broadcast_summary_update(
        &self,
        call_id: &str,
        summary: &str,
        key_findings: &[String],
    ) -> TelecallResult<()>;
    async fn broadcast_location_update(
        &self,
        call_id: &str,
        latitude: f64,
        longitude: f64,
        address: Option<&str>,
    ) -> TelecallResult<()>;

    /// Subscribes to a call's group channel, creating it if needed.
    fn subscribe_group(&self, call_id: &str) -> broadcast::Receiver<PushEvent>;

    /// Subscribes to the all-subscribers channel.
    fn subscribe_all(&self) -> broadcast::Receiver<PushEvent>;
}

/// Reference `Broadcaster` backed by in-process `tokio::sync::broadcast`
/// channels. Sending to a group with no current subscribers is not an
/// error — `broadcast::Sender::send` returning `Err` (zero receivers) is
/// treated as a no-op, matching the channel's own semantics.
pub struct GroupBroadcaster {
    groups: DashMap<String, broadcast::Sender<PushEvent>>,
    all_subscribers: broadcast::Sender<PushEvent>,
}

impl Default for GroupBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        let (all_subscribers, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            groups: DashMap::new(),
            all_subscribers,
        }
    }

    fn group_sender(&self, call_id: &str) -> broadcast::Sender<PushEvent> {
        self.groups
            .entry(group_key(call_id))
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn send_to_group(&self, call_id: &str, event: PushEvent) {
        let _ = self.group_sender(call_id).send(event);
    }

    fn send_to_all(&self, event: PushEvent) {
        let _ = self.all_subscribers.send(event);
    }

    fn is_all_subscribers_status(status: &str) -> bool {
        let lower = status.to_lowercase();
        ALL_SUBSCRIBER_CALL_STATUSES.iter().any(|s| *s == lower)
    }
}

#[async_trait]
impl Broadcaster for GroupBroadcaster {
    async fn broadcast_transcript_update(&self, call_id: &str, text: &str, is_final: bool) -> TelecallResult<()> {
        self.send_to_group(
            call_id,
            PushEvent::ReceiveTranscriptUpdate {
                call_id: call_id.to_string(),
                text: text.to_string(),
                is_final,
            },
        );
        Ok(())
    }

    async fn broadcast_call_status_update(&self, call_id: &str, status: &str) -> TelecallResult<()> {
        let event = PushEvent::ReceiveCallStatusUpdate {
            call_id: call_id.to_string(),
            status: status.to_string(),
        };
        if Self::is_all_subscribers_status(status) {
            self.send_to_all(event);
        } else {
            self.send_to_group(call_id, event);
        }
        Ok(())
    }

    async fn broadcast_summary_update(
        &self,
        call_id: &str,
        summary: &str,
        key_findings: &[String],
    ) -> TelecallResult<()> {
        self.send_to_group(
            call_id,
            PushEvent::ReceiveSummaryUpdate {
                call_id: call_id.to_string(),
                summary: summary.to_string(),
                key_findings: key_findings.to_vec(),
            },
        );
        Ok(())
    }

    async fn broadcast_location_update(
        &self,
        call_id: &str,
        latitude: f64,
        longitude: f64,
        address: Option<&str>,
    ) -> TelecallResult<()> {
        self.send_to_group(
            call_id,
            PushEvent::ReceiveLocationUpdate {
                call_id: call_id.to_string(),
                latitude,
                longitude,
                address: address.map(str::to_string),
            },
        );
        Ok(())
    }

    fn subscribe_group(&self, call_id: &str) -> broadcast::Receiver<PushEvent> {
        self.group_sender(call_id).subscribe()
    }

    fn subscribe_all(&self) -> broadcast::Receiver<PushEvent> {
        self.all_subscribers.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcript_update_delivers_to_group_subscriber() {
        let broadcaster = GroupBroadcaster::new();
        let mut rx = broadcaster.subscribe_group("c1");
        broadcaster.broadcast_transcript_update("c1", "hello", false).await.unwrap();
        let event = rx.recv().await.expect("event delivered");
        assert_eq!(
            event,
            PushEvent::ReceiveTranscriptUpdate {
                call_id: "c1".into(),
                text: "hello".into(),
                is_final: false,
            }
        );
    }

    #[tokio::test]
    async fn stream_started_status_goes_to_all_subscribers() {
        let broadcaster = GroupBroadcaster::new();
        let mut all_rx = broadcaster.subscribe_all();
        let mut group_rx = broadcaster.subscribe_group("c1");
        broadcaster.broadcast_call_status_update("c1", "stream_started").await.unwrap();
        assert!(all_rx.try_recv().is_ok());
        assert!(group_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn arbitrary_status_goes_to_group_only() {
        let broadcaster = GroupBroadcaster::new();
        let mut all_rx = broadcaster.subscribe_all();
        let mut group_rx = broadcaster.subscribe_group("c1");
        broadcaster.broadcast_call_status_update("c1", "stream_stopped").await.unwrap();
        assert!(group_rx.try_recv().is_ok());
        assert!(all_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sending_with_no_subscribers_does_not_panic() {
        let broadcaster = GroupBroadcaster::new();
        broadcaster.broadcast_transcript_update("c1", "hello", false).await.unwrap();
    }
}

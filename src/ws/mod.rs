use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::models::{task_status, OnboardingTask};

/// Event types for WebSocket messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OnboardingQueued,
    OnboardingStarted,
    OnboardingSucceeded,
    OnboardingFailed,
    OnboardingSkipped,
}

impl EventType {
    /// Event announcing a terminal task status
    pub fn for_outcome(status: &str) -> Self {
        match status {
            task_status::SUCCEEDED => EventType::OnboardingSucceeded,
            task_status::SKIPPED => EventType::OnboardingSkipped,
            _ => EventType::OnboardingFailed,
        }
    }
}

/// WebSocket event message
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

/// WebSocket hub manages connections and broadcasts events
pub struct Hub {
    tx: broadcast::Sender<String>,
    client_count: Arc<RwLock<usize>>,
}

impl Hub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            client_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Broadcast an event to all connected clients
    pub async fn broadcast_event(&self, event: Event) {
        let data = match serde_json::to_string(&event) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Error serializing WebSocket event: {}", e);
                return;
            }
        };

        let count = *self.client_count.read().await;
        if count > 0 {
            if let Err(e) = self.tx.send(data) {
                tracing::warn!("Error broadcasting WebSocket event: {}", e);
            } else {
                tracing::debug!("Broadcasting {:?} to {} clients", event.event_type, count);
            }
        }
    }

    /// Broadcast an onboarding task state change; the payload is the task itself
    pub async fn broadcast_task_update(&self, event_type: EventType, task: &OnboardingTask) {
        self.broadcast_event(Event {
            event_type,
            payload: serde_json::to_value(task).unwrap_or_default(),
        })
        .await;
    }

    /// Subscribe to events
    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    async fn increment_clients(&self) {
        let mut count = self.client_count.write().await;
        *count += 1;
        tracing::info!("WebSocket client connected. Total clients: {}", *count);
    }

    async fn decrement_clients(&self) {
        let mut count = self.client_count.write().await;
        *count = count.saturating_sub(1);
        tracing::info!("WebSocket client disconnected. Total clients: {}", *count);
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket handler for axum
pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (mut sender, mut receiver) = socket.split();

    hub.increment_clients().await;
    let mut rx = hub.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames are ignored; reading keeps close frames flowing
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            if msg.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    hub.decrement_clients().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OnboardingRequest;

    #[tokio::test]
    async fn test_task_event_serialization() {
        let task = OnboardingTask::unrecorded("t-1", &OnboardingRequest::new("192.0.2.1", "nyc01"));
        let event = Event {
            event_type: EventType::OnboardingQueued,
            payload: serde_json::to_value(&task).unwrap(),
        };
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["type"], "onboarding_queued");
        assert_eq!(json["payload"]["id"], "t-1");
        assert_eq!(json["payload"]["status"], "pending");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let hub = Hub::new();
        let mut rx = hub.subscribe();
        hub.increment_clients().await;

        let task = OnboardingTask::unrecorded("t-2", &OnboardingRequest::new("192.0.2.2", "nyc01"));
        hub.broadcast_task_update(EventType::OnboardingStarted, &task).await;

        let msg = rx.recv().await.unwrap();
        assert!(msg.contains("\"onboarding_started\""));
        assert!(msg.contains("t-2"));
    }

    #[test]
    fn test_no_clients_skips_send() {
        let hub = Hub::new();
        let mut rx = hub.subscribe();
        let task = OnboardingTask::unrecorded("t-3", &OnboardingRequest::new("192.0.2.3", "nyc01"));
        tokio_test::block_on(hub.broadcast_task_update(EventType::OnboardingFailed, &task));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_for_outcome() {
        assert_eq!(EventType::for_outcome("succeeded"), EventType::OnboardingSucceeded);
        assert_eq!(EventType::for_outcome("skipped"), EventType::OnboardingSkipped);
        assert_eq!(EventType::for_outcome("failed"), EventType::OnboardingFailed);
    }
}

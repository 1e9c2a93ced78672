// Event Bus Implementation - Pub/Sub for Domain Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Enables real-time event streaming to CLI, SSE endpoints, and observers.
//
// In-memory only: events are lost on restart. The durable record of score
// changes is the trust-event ledger, not this bus.

use crate::domain::agent::AgentId;
use crate::domain::events::{RoutingEvent, ScoringEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Scoring(ScoringEvent),
    Routing(RoutingEvent),
}

impl DomainEvent {
    /// Agent the event concerns, for per-agent stream filtering.
    pub fn agent_id(&self) -> Option<AgentId> {
        match self {
            DomainEvent::Scoring(event) => Some(match event {
                ScoringEvent::TrustRecalculated { agent_id, .. } => *agent_id,
                ScoringEvent::TrustDeltaApplied { agent_id, .. } => *agent_id,
                ScoringEvent::AgentFlagged { agent_id, .. } => *agent_id,
            }),
            DomainEvent::Routing(event) => match event {
                RoutingEvent::TaskAssigned { agent_id, .. } => Some(*agent_id),
                RoutingEvent::TaskReassigned { to_agent, .. } => Some(*to_agent),
            },
        }
    }
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    /// Default: 1000 events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish a scoring event
    pub fn publish_scoring_event(&self, event: ScoringEvent) {
        self.publish(DomainEvent::Scoring(event));
    }

    /// Publish a routing event
    pub fn publish_routing_event(&self, event: RoutingEvent) {
        self.publish(DomainEvent::Routing(event));
    }

    /// Publish a domain event to all subscribers
    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // Note: send() returns the number of receivers that received the message
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    /// Returns a receiver that can be used to listen for events
    pub fn subscribe(&self) -> EventReceiver {
        let receiver = self.sender.subscribe();
        EventReceiver { receiver }
    }

    /// Subscribe with the raw broadcast receiver, for adapters that need a
    /// `Stream` (the SSE endpoint wraps this in a `BroadcastStream`)
    pub fn subscribe_raw(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (blocks until event is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let agent_id = AgentId::new();
        event_bus.publish_scoring_event(ScoringEvent::TrustRecalculated {
            agent_id,
            previous_score: 70.0,
            new_score: 74.5,
            delta: 4.5,
            reason: "routine recalculation".to_string(),
            recalculated_at: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        match received {
            DomainEvent::Scoring(ScoringEvent::TrustRecalculated { agent_id: id, delta, .. }) => {
                assert_eq!(id, agent_id);
                assert_eq!(delta, 4.5);
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish_routing_event(RoutingEvent::TaskReassigned {
            task_id: crate::domain::task::TaskId::new(),
            from_agent: AgentId::new(),
            to_agent: AgentId::new(),
            reason: "latency_exceeded".to_string(),
            reassigned_at: Utc::now(),
        });

        // Both receivers should get the event
        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_domain_event_agent_id() {
        let agent_id = AgentId::new();
        let event = DomainEvent::Scoring(ScoringEvent::AgentFlagged {
            agent_id,
            occurrences: 3,
            current_score: 62.0,
            threshold: 70.0,
            flagged_at: Utc::now(),
        });
        assert_eq!(event.agent_id(), Some(agent_id));

        let to_agent = AgentId::new();
        let event = DomainEvent::Routing(RoutingEvent::TaskReassigned {
            task_id: crate::domain::task::TaskId::new(),
            from_agent: AgentId::new(),
            to_agent,
            reason: "trust_drop".to_string(),
            reassigned_at: Utc::now(),
        });
        assert_eq!(event.agent_id(), Some(to_agent));
    }
}

//! Kitchen stream wire format
//!
//! The backend pushes order changes over a long-lived HTTP connection
//! as newline-delimited JSON frames. Frames carry no sequence number;
//! consumers apply them strictly in arrival order.

use serde::{Deserialize, Serialize};

use crate::models::Order;

/// One pushed order change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Created {
        order: Order,
    },
    Updated {
        order: Order,
    },
    Deleted {
        #[serde(rename = "orderId")]
        order_id: String,
    },
}

impl StreamEvent {
    /// Identifier of the order the event refers to.
    pub fn order_id(&self) -> &str {
        match self {
            StreamEvent::Created { order } | StreamEvent::Updated { order } => &order.id,
            StreamEvent::Deleted { order_id } => order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, SourceChannel};

    #[test]
    fn test_decode_created_frame() {
        let frame = r#"{
            "type": "created",
            "order": {
                "id": "o-1",
                "channel": "dine-in",
                "status": "pending",
                "items": [],
                "subtotal": 0.0,
                "total_amount": 0.0,
                "table_number": 3,
                "customer_id": null,
                "created_at": "2025-06-01T12:00:00Z",
                "updated_at": "2025-06-01T12:00:00Z"
            }
        }"#;

        let event: StreamEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(event.order_id(), "o-1");
        match event {
            StreamEvent::Created { order } => {
                assert_eq!(order.status, OrderStatus::Pending);
                assert_eq!(order.channel, SourceChannel::DineIn);
                assert_eq!(order.table_number, Some(3));
            }
            other => panic!("expected created event, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_deleted_frame() {
        let frame = r#"{"type": "deleted", "orderId": "o-9"}"#;
        let event: StreamEvent = serde_json::from_str(frame).unwrap();
        assert_eq!(event.order_id(), "o-9");
        assert!(matches!(event, StreamEvent::Deleted { .. }));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let frame = r#"{"type": "archived", "orderId": "o-9"}"#;
        assert!(serde_json::from_str::<StreamEvent>(frame).is_err());
    }
}

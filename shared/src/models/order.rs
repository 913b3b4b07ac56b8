//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled orders never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Legal transitions: `pending -> completed`, `pending -> cancelled`.
    pub fn can_transition(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }
}

/// Order source channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SourceChannel {
    #[default]
    DineIn,
    Takeaway,
}

impl SourceChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceChannel::DineIn => "dine-in",
            SourceChannel::Takeaway => "takeaway",
        }
    }
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product reference (String ID)
    pub id: String,
    pub name: String,
    pub quantity: i32,
    /// Unit price in currency unit
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub channel: SourceChannel,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Sum of line amounts in currency unit
    pub subtotal: f64,
    /// Amount due in currency unit
    pub total_amount: f64,
    pub table_number: Option<i64>,
    pub customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    #[serde(default)]
    pub channel: Option<SourceChannel>,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub total_amount: f64,
    #[serde(default)]
    pub table_number: Option<i64>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// Update status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Order list predicate (all criteria are conjunctive)
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub table_number: Option<i64>,
    pub status: Option<OrderStatus>,
    pub channel: Option<SourceChannel>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(table) = self.table_number {
            if order.table_number != Some(table) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        if let Some(channel) = self.channel {
            if order.channel != channel {
                return false;
            }
        }
        true
    }
}

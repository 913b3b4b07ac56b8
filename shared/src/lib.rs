//! Shared types for the Mesa POS frontend
//!
//! Domain entities served by the backend API together with their
//! create/update payloads, list filters, and the kitchen stream
//! event wire type. Pure data: no I/O lives in this crate.

pub mod models;
pub mod stream;

pub use models::{
    Customer, CustomerCreate, CustomerUpdate, DiningTable, Order, OrderCreate, OrderFilter,
    OrderItem, OrderStatus, OrderStatusUpdate, PointsAdjustment, SourceChannel, TableStatus,
    TableStatusUpdate,
};
pub use stream::StreamEvent;

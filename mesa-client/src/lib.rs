//! Mesa Client - dual-mode data access for the Mesa POS frontend
//!
//! Presents one API surface for order, table, and customer operations
//! while transparently choosing between the remote backend and a local
//! in-memory fallback, and reconciles kitchen push events into the
//! local read model.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod probe;
pub mod store;
pub mod stream;

pub use client::{EventSyncHandle, MesaClient};
pub use config::{ClientConfig, StreamConfig};
pub use error::{DataError, DataResult};
pub use http::{HttpRemoteApi, RemoteApi};
pub use probe::{AvailabilityProber, OperationMode};
pub use store::EntityStore;
pub use stream::{EventStreamClient, StreamSubscription};

// Re-export shared types for convenience
pub use shared::models::{
    Customer, CustomerCreate, CustomerUpdate, DiningTable, Order, OrderCreate, OrderFilter,
    OrderItem, OrderStatus, OrderStatusUpdate, SourceChannel, TableStatus, TableStatusUpdate,
};
pub use shared::stream::StreamEvent;

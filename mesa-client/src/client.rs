//! Unified access façade
//!
//! `MesaClient` is the single entry point UI components use for order,
//! table, and customer operations. Each call is routed to the remote
//! API or the local entity store depending on the current operation
//! mode; results and errors come back in one shape either way, and
//! kitchen push events are reconciled into the store so every view
//! reads one model.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use shared::models::{
    Customer, CustomerCreate, CustomerUpdate, DiningTable, Order, OrderCreate, OrderFilter,
    OrderStatus, TableStatusUpdate,
};
use shared::stream::StreamEvent;

use crate::config::ClientConfig;
use crate::error::{DataError, DataResult};
use crate::http::{HttpRemoteApi, RemoteApi};
use crate::probe::{AvailabilityProber, OperationMode};
use crate::store::EntityStore;
use crate::stream::EventStreamClient;

pub struct MesaClient {
    remote: Arc<dyn RemoteApi>,
    store: Arc<EntityStore>,
    prober: AvailabilityProber,
    mode: RwLock<OperationMode>,
    consecutive_failures: AtomicU32,
    probe_generation: AtomicU64,
    probe_guard: Mutex<()>,
    config: ClientConfig,
}

impl MesaClient {
    /// Creates a façade over the network remote described by `config`.
    /// The first operation (or an explicit [`probe`](Self::probe))
    /// determines the operation mode.
    pub fn new(config: ClientConfig) -> DataResult<Arc<Self>> {
        let remote = Arc::new(HttpRemoteApi::new(&config)?);
        Ok(Self::with_remote(remote, config))
    }

    /// Creates a façade over an explicit remote implementation.
    pub fn with_remote(remote: Arc<dyn RemoteApi>, config: ClientConfig) -> Arc<Self> {
        let prober = AvailabilityProber::new(remote.clone(), config.probe_timeout);
        Arc::new(Self {
            remote,
            store: Arc::new(EntityStore::new()),
            prober,
            mode: RwLock::new(OperationMode::Undetermined),
            consecutive_failures: AtomicU32::new(0),
            probe_generation: AtomicU64::new(0),
            probe_guard: Mutex::new(()),
            config,
        })
    }

    /// The current operation mode.
    pub fn mode(&self) -> OperationMode {
        *self.mode.read()
    }

    /// The local entity store. Exposed for bootstrap seeding (floor
    /// plan, customer roster) on deployments that start offline; all
    /// regular traffic goes through the façade operations.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ==================== Mode management ====================

    fn set_mode(&self, mode: OperationMode) {
        let mut current = self.mode.write();
        if *current != mode {
            tracing::info!(from = ?*current, to = ?mode, "operation mode changed");
        }
        *current = mode;
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Runs the prober and adopts its verdict. Concurrent callers are
    /// coalesced onto one in-flight probe: whoever arrives while a
    /// probe is running awaits that result instead of issuing a
    /// duplicate request.
    pub async fn probe(&self) -> OperationMode {
        let generation = self.probe_generation.load(Ordering::SeqCst);
        let _guard = self.probe_guard.lock().await;
        if self.probe_generation.load(Ordering::SeqCst) != generation {
            // A probe completed while we waited for the guard.
            return self.mode();
        }
        let mode = self.prober.probe().await;
        self.set_mode(mode);
        self.probe_generation.fetch_add(1, Ordering::SeqCst);
        mode
    }

    /// No operation is serviced ahead of mode determination: callers
    /// block here until the first probe resolves.
    async fn ensure_mode(&self) -> OperationMode {
        match self.mode() {
            OperationMode::Undetermined => self.probe().await,
            mode => mode,
        }
    }

    fn note_remote_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Books a remote failure and re-probes once the hysteresis
    /// threshold is reached. The error is still returned to the
    /// caller: an unreachable backend never silently falls back
    /// mid-operation.
    async fn note_remote_failure(&self, error: DataError) -> DataError {
        if error.is_unreachable() {
            let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::warn!(failures, error = %error, "remote operation failed");
            if failures >= self.config.reprobe_after {
                self.probe().await;
            }
        } else {
            // A domain error proves the backend answered.
            self.consecutive_failures.store(0, Ordering::SeqCst);
        }
        error
    }

    // ==================== Orders ====================

    pub async fn list_orders(&self, filter: OrderFilter) -> DataResult<Vec<Order>> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.list_orders(&filter).await {
                Ok(orders) => {
                    self.note_remote_success();
                    for order in &orders {
                        self.store.upsert_order(order.clone());
                    }
                    Ok(orders)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => Ok(self.store.list_orders(&filter)),
        }
    }

    /// Reads from the entity store first: it is the read model every
    /// reconciled stream event lands in. In remote mode a cache miss
    /// falls through to a fetch.
    pub async fn get_order(&self, id: &str) -> DataResult<Order> {
        let mode = self.ensure_mode().await;
        if let Some(order) = self.store.get_order(id) {
            return Ok(order);
        }
        match mode {
            OperationMode::Remote => match self.remote.get_order(id).await {
                Ok(order) => {
                    self.note_remote_success();
                    self.store.upsert_order(order.clone());
                    Ok(order)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => Err(DataError::not_found("order")),
        }
    }

    pub async fn create_order(&self, draft: OrderCreate) -> DataResult<Order> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.create_order(&draft).await {
                Ok(order) => {
                    self.note_remote_success();
                    self.store.upsert_order(order.clone());
                    Ok(order)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.create_order(draft),
        }
    }

    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> DataResult<Order> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.update_order_status(id, status).await {
                Ok(order) => {
                    self.note_remote_success();
                    self.store.upsert_order(order.clone());
                    Ok(order)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.update_order_status(id, status),
        }
    }

    pub async fn delete_order(&self, id: &str) -> DataResult<()> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.delete_order(id).await {
                Ok(()) => {
                    self.note_remote_success();
                    self.store.remove_order(id);
                    Ok(())
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.delete_order(id),
        }
    }

    // ==================== Tables ====================

    pub async fn list_tables(&self) -> DataResult<Vec<DiningTable>> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.list_tables().await {
                Ok(tables) => {
                    self.note_remote_success();
                    for table in &tables {
                        self.store.upsert_table(table.clone());
                    }
                    Ok(tables)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => Ok(self.store.list_tables()),
        }
    }

    pub async fn update_table_status(
        &self,
        id: &str,
        update: TableStatusUpdate,
    ) -> DataResult<DiningTable> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.update_table_status(id, &update).await {
                Ok(table) => {
                    self.note_remote_success();
                    self.store.upsert_table(table.clone());
                    Ok(table)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.update_table_status(id, &update),
        }
    }

    // ==================== Customers ====================

    pub async fn add_customer(&self, draft: CustomerCreate) -> DataResult<Customer> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.add_customer(&draft).await {
                Ok(customer) => {
                    self.note_remote_success();
                    self.store.upsert_customer(customer.clone());
                    Ok(customer)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.add_customer(draft),
        }
    }

    pub async fn update_customer(
        &self,
        id: &str,
        update: CustomerUpdate,
    ) -> DataResult<Customer> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.update_customer(id, &update).await {
                Ok(customer) => {
                    self.note_remote_success();
                    self.store.upsert_customer(customer.clone());
                    Ok(customer)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.update_customer(id, &update),
        }
    }

    pub async fn find_customer_by_phone(&self, phone: &str) -> DataResult<Customer> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.find_customer_by_phone(phone).await {
                Ok(customer) => {
                    self.note_remote_success();
                    self.store.upsert_customer(customer.clone());
                    Ok(customer)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.find_customer_by_phone(phone),
        }
    }

    pub async fn award_loyalty_points(&self, id: &str, points: i64) -> DataResult<Customer> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.award_points(id, points).await {
                Ok(customer) => {
                    self.note_remote_success();
                    self.store.upsert_customer(customer.clone());
                    Ok(customer)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.award_points(id, points),
        }
    }

    pub async fn redeem_referral(&self, id: &str, points: i64) -> DataResult<Customer> {
        match self.ensure_mode().await {
            OperationMode::Remote => match self.remote.redeem_referral(id, points).await {
                Ok(customer) => {
                    self.note_remote_success();
                    self.store.upsert_customer(customer.clone());
                    Ok(customer)
                }
                Err(e) => Err(self.note_remote_failure(e).await),
            },
            _ => self.store.redeem_referral(id, points),
        }
    }

    // ==================== Stream reconciliation ====================

    /// Applies one pushed event to the entity store. Last write wins
    /// by arrival order; there is no version field to arbitrate
    /// conflicting concurrent edits. Events arriving outside remote
    /// mode are dropped: the local store is authoritative then.
    pub fn apply_stream_event(&self, event: StreamEvent) {
        if self.mode() != OperationMode::Remote {
            tracing::debug!(order_id = %event.order_id(), "dropping stream event outside remote mode");
            return;
        }
        match event {
            StreamEvent::Created { order } | StreamEvent::Updated { order } => {
                tracing::debug!(order_id = %order.id, "reconciling pushed order");
                self.store.upsert_order(order);
            }
            StreamEvent::Deleted { order_id } => {
                // Absence is not an error.
                self.store.remove_order(&order_id);
            }
        }
    }

    /// Wires the kitchen stream to this façade: keeps one subscription
    /// open, reconciling every event, and reconnects with capped
    /// exponential backoff. After `max_reconnect_attempts` consecutive
    /// failed connections the façade re-probes; if that demotes it to
    /// fallback mode the sync loop stops.
    pub fn spawn_event_sync(self: &Arc<Self>, stream: EventStreamClient) -> EventSyncHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let client = Arc::clone(self);

        let task = tokio::spawn(async move {
            let stream_config = client.config.stream.clone();
            let mut attempts: u32 = 0;
            loop {
                if client.ensure_mode().await != OperationMode::Remote {
                    tracing::info!("event sync stopped: not in remote mode");
                    return;
                }

                let (error_tx, error_rx) = oneshot::channel();
                let subscription = stream.subscribe(
                    {
                        let client = Arc::clone(&client);
                        move |event| client.apply_stream_event(event)
                    },
                    move |error| {
                        let _ = error_tx.send(error);
                    },
                );

                tokio::select! {
                    _ = token.cancelled() => {
                        subscription.close().await;
                        return;
                    }
                    lost = error_rx => {
                        subscription.close().await;
                        match lost {
                            Ok(error) => tracing::warn!(error = %error, "kitchen stream lost"),
                            Err(_) => tracing::warn!("kitchen stream ended"),
                        }
                    }
                }

                attempts += 1;
                if attempts > stream_config.max_reconnect_attempts {
                    if client.probe().await != OperationMode::Remote {
                        return;
                    }
                    attempts = 0;
                    continue;
                }

                let delay = stream_config.delay_for_attempt(attempts);
                tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "stream reconnect backoff");
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        });

        EventSyncHandle {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }
}

impl std::fmt::Debug for MesaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MesaClient")
            .field("mode", &self.mode())
            .field(
                "consecutive_failures",
                &self.consecutive_failures.load(Ordering::SeqCst),
            )
            .finish()
    }
}

/// Handle to a running event sync loop.
pub struct EventSyncHandle {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventSyncHandle {
    /// Stops the sync loop and the underlying subscription. Idempotent
    /// and safe to call during an in-flight reconnection attempt.
    pub async fn close(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("event sync task panicked");
                }
            }
        }
    }
}

impl Drop for EventSyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::http::mock::{Behavior, MockRemote, sample_draft};
    use chrono::Utc;
    use shared::models::{OrderItem, SourceChannel};

    fn test_config() -> ClientConfig {
        ClientConfig::new("http://localhost:0")
            .with_probe_timeout(Duration::from_millis(200))
            .with_reprobe_after(3)
    }

    fn pushed_order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: id.to_string(),
            channel: SourceChannel::DineIn,
            status,
            items: vec![OrderItem {
                id: "i1".to_string(),
                name: "Tea".to_string(),
                quantity: 2,
                price: 20.0,
                category: None,
            }],
            subtotal: 40.0,
            total_amount: 40.0,
            table_number: Some(1),
            customer_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fallback_create_then_delete_scenario() {
        let remote = Arc::new(MockRemote::new(Behavior::Unreachable));
        let client = MesaClient::with_remote(remote, test_config());

        let order = client.create_order(sample_draft(1)).await.unwrap();
        assert_eq!(client.mode(), OperationMode::Fallback);
        assert!(!order.id.is_empty());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 40.0);

        client.delete_order(&order.id).await.unwrap();
        let listed = client.list_orders(OrderFilter::default()).await.unwrap();
        assert!(listed.iter().all(|o| o.id != order.id));
    }

    #[tokio::test]
    async fn test_fallback_never_touches_network_again() {
        let remote = Arc::new(MockRemote::new(Behavior::Unreachable));
        let client = MesaClient::with_remote(remote.clone(), test_config());

        client.probe().await;
        assert_eq!(client.mode(), OperationMode::Fallback);
        assert_eq!(remote.calls(), 1);

        client.create_order(sample_draft(1)).await.unwrap();
        client.list_orders(OrderFilter::default()).await.unwrap();
        client.list_tables().await.unwrap();

        // Still only the probe's single call.
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_probes_coalesce() {
        let remote = Arc::new(MockRemote::new(Behavior::Healthy));
        let client = MesaClient::with_remote(remote.clone(), test_config());

        let (a, b, c) = tokio::join!(client.probe(), client.probe(), client.probe());
        assert_eq!(a, OperationMode::Remote);
        assert_eq!(b, OperationMode::Remote);
        assert_eq!(c, OperationMode::Remote);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_first_operation_blocks_on_probe() {
        let remote = Arc::new(MockRemote::new(Behavior::Healthy));
        let client = MesaClient::with_remote(remote.clone(), test_config());

        assert_eq!(client.mode(), OperationMode::Undetermined);
        client.list_orders(OrderFilter::default()).await.unwrap();
        assert_eq!(client.mode(), OperationMode::Remote);
        // Probe plus the listing itself.
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn test_remote_create_fills_cache() {
        let remote = Arc::new(MockRemote::new(Behavior::Healthy));
        let client = MesaClient::with_remote(remote, test_config());

        let order = client.create_order(sample_draft(1)).await.unwrap();
        assert_eq!(client.mode(), OperationMode::Remote);
        assert!(order.id.starts_with("remote-"));
        assert!(client.store().get_order(&order.id).is_some());
    }

    #[tokio::test]
    async fn test_unreachable_errors_demote_after_threshold() {
        let remote = Arc::new(MockRemote::new(Behavior::Healthy));
        let client = MesaClient::with_remote(remote.clone(), test_config());

        client.probe().await;
        assert_eq!(client.mode(), OperationMode::Remote);

        remote.set_behavior(Behavior::Unreachable);
        for _ in 0..2 {
            let err = client.list_orders(OrderFilter::default()).await.unwrap_err();
            assert!(err.is_unreachable());
            assert_eq!(client.mode(), OperationMode::Remote);
        }

        // Third consecutive failure crosses the threshold and the
        // embedded re-probe demotes to fallback; the error is still
        // surfaced rather than silently served locally.
        let err = client.list_orders(OrderFilter::default()).await.unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(client.mode(), OperationMode::Fallback);

        // Subsequent calls are served locally.
        assert!(client.list_orders(OrderFilter::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_domain_errors_do_not_demote() {
        let remote = Arc::new(MockRemote::new(Behavior::Healthy));
        let client = MesaClient::with_remote(remote, test_config());

        client.probe().await;
        for _ in 0..5 {
            let err = client
                .update_order_status("missing", OrderStatus::Completed)
                .await
                .unwrap_err();
            assert!(matches!(err, DataError::NotFound(_)));
        }
        assert_eq!(client.mode(), OperationMode::Remote);
    }

    #[tokio::test]
    async fn test_stream_lifecycle_reaches_the_read_model() {
        let remote = Arc::new(MockRemote::new(Behavior::Healthy));
        let client = MesaClient::with_remote(remote, test_config());
        client.probe().await;

        client.apply_stream_event(StreamEvent::Created {
            order: pushed_order("A", OrderStatus::Pending),
        });
        assert_eq!(
            client.get_order("A").await.unwrap().status,
            OrderStatus::Pending
        );

        client.apply_stream_event(StreamEvent::Updated {
            order: pushed_order("A", OrderStatus::Completed),
        });
        assert_eq!(
            client.get_order("A").await.unwrap().status,
            OrderStatus::Completed
        );

        client.apply_stream_event(StreamEvent::Deleted {
            order_id: "A".to_string(),
        });
        let listed = client.list_orders(OrderFilter::default()).await.unwrap();
        assert!(listed.iter().all(|o| o.id != "A"));

        // Deleting an already-absent order is not an error.
        client.apply_stream_event(StreamEvent::Deleted {
            order_id: "A".to_string(),
        });
    }

    #[tokio::test]
    async fn test_stream_events_dropped_in_fallback_mode() {
        let remote = Arc::new(MockRemote::new(Behavior::Unreachable));
        let client = MesaClient::with_remote(remote, test_config());
        client.probe().await;
        assert_eq!(client.mode(), OperationMode::Fallback);

        client.apply_stream_event(StreamEvent::Created {
            order: pushed_order("A", OrderStatus::Pending),
        });
        assert!(client.store().get_order("A").is_none());
    }

    #[tokio::test]
    async fn test_fallback_terminal_transition_rejected() {
        let remote = Arc::new(MockRemote::new(Behavior::Unreachable));
        let client = MesaClient::with_remote(remote, test_config());

        let order = client.create_order(sample_draft(1)).await.unwrap();
        client
            .update_order_status(&order.id, OrderStatus::Completed)
            .await
            .unwrap();
        let err = client
            .update_order_status(&order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fallback_loyalty_round_trip() {
        let remote = Arc::new(MockRemote::new(Behavior::Unreachable));
        let client = MesaClient::with_remote(remote, test_config());

        let customer = client
            .add_customer(CustomerCreate {
                name: "Ana".to_string(),
                email: None,
                phone: Some("600123123".to_string()),
            })
            .await
            .unwrap();

        client.award_loyalty_points(&customer.id, 100).await.unwrap();
        let found = client.find_customer_by_phone("600123123").await.unwrap();
        assert_eq!(found.points_balance, 100);

        let after = client.redeem_referral(&customer.id, 40).await.unwrap();
        assert_eq!(after.points_balance, 60);

        let err = client.redeem_referral(&customer.id, 1000).await.unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }
}

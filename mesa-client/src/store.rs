//! In-memory entity store
//!
//! The fallback data source and the read model for remote mode. In
//! fallback mode the store owns the canonical copy of every entity;
//! in remote mode it is a cache written only by fetch results and by
//! stream reconciliation. Only the façade mutates it.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use shared::models::{
    Customer, CustomerCreate, CustomerUpdate, DiningTable, Order, OrderCreate, OrderFilter,
    OrderStatus, TableStatusUpdate,
};

use crate::error::{DataError, DataResult};

#[derive(Debug, Default)]
pub struct EntityStore {
    orders: RwLock<HashMap<String, Order>>,
    tables: RwLock<HashMap<String, DiningTable>>,
    customers: RwLock<HashMap<String, Customer>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Orders ====================

    pub fn get_order(&self, id: &str) -> Option<Order> {
        self.orders.read().get(id).cloned()
    }

    pub fn list_orders(&self, filter: &OrderFilter) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        orders
    }

    /// Fallback-mode creation: assigns a fresh id, `pending` status,
    /// and creation/update stamps.
    pub fn create_order(&self, draft: OrderCreate) -> DataResult<Order> {
        validate_order_draft(&draft)?;
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            channel: draft.channel.unwrap_or_default(),
            status: OrderStatus::Pending,
            items: draft.items,
            subtotal: draft.subtotal,
            total_amount: draft.total_amount,
            table_number: draft.table_number,
            customer_id: draft.customer_id,
            created_at: now,
            updated_at: now,
        };
        self.orders.write().insert(order.id.clone(), order.clone());
        tracing::debug!(order_id = %order.id, "order created in local store");
        Ok(order)
    }

    pub fn update_order_status(&self, id: &str, status: OrderStatus) -> DataResult<Order> {
        let mut orders = self.orders.write();
        let order = orders
            .get_mut(id)
            .ok_or_else(|| DataError::not_found("order"))?;
        if !order.status.can_transition(status) {
            return Err(DataError::validation(format!(
                "illegal status transition {} -> {}",
                order.status.as_str(),
                status.as_str()
            )));
        }
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    pub fn delete_order(&self, id: &str) -> DataResult<()> {
        self.orders
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DataError::not_found("order"))
    }

    /// Full-record replacement keyed by id. Used by remote cache-fill
    /// and by stream reconciliation (last write wins by arrival).
    pub fn upsert_order(&self, order: Order) {
        self.orders.write().insert(order.id.clone(), order);
    }

    /// Reconciliation removal; absence is not an error.
    pub fn remove_order(&self, id: &str) -> bool {
        self.orders.write().remove(id).is_some()
    }

    // ==================== Tables ====================

    pub fn list_tables(&self) -> Vec<DiningTable> {
        let mut tables: Vec<DiningTable> = self.tables.read().values().cloned().collect();
        tables.sort_by_key(|t| t.number);
        tables
    }

    /// Seed a table into the local floor plan. Table numbers are
    /// unique within a restaurant.
    pub fn insert_table(&self, table: DiningTable) -> DataResult<()> {
        let mut tables = self.tables.write();
        if tables.values().any(|t| t.number == table.number && t.id != table.id) {
            return Err(DataError::validation(format!(
                "table number {} already in use",
                table.number
            )));
        }
        tables.insert(table.id.clone(), table);
        Ok(())
    }

    pub fn update_table_status(
        &self,
        id: &str,
        update: &TableStatusUpdate,
    ) -> DataResult<DiningTable> {
        if !update.is_consistent() {
            return Err(DataError::validation(format!(
                "status {} is inconsistent with the order reference",
                update.status.as_str()
            )));
        }
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(id)
            .ok_or_else(|| DataError::not_found("table"))?;
        table.status = update.status;
        table.current_order = update.current_order.clone();
        Ok(table.clone())
    }

    /// Cache-fill replacement keyed by id.
    pub fn upsert_table(&self, table: DiningTable) {
        self.tables.write().insert(table.id.clone(), table);
    }

    // ==================== Customers ====================

    pub fn add_customer(&self, draft: CustomerCreate) -> DataResult<Customer> {
        if draft.name.trim().is_empty() {
            return Err(DataError::validation("customer name must not be empty"));
        }
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            points_balance: 0,
        };
        self.customers
            .write()
            .insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    pub fn update_customer(&self, id: &str, update: &CustomerUpdate) -> DataResult<Customer> {
        let mut customers = self.customers.write();
        let customer = customers
            .get_mut(id)
            .ok_or_else(|| DataError::not_found("customer"))?;
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(DataError::validation("customer name must not be empty"));
            }
            customer.name = name.clone();
        }
        if let Some(email) = &update.email {
            customer.email = Some(email.clone());
        }
        if let Some(phone) = &update.phone {
            customer.phone = Some(phone.clone());
        }
        Ok(customer.clone())
    }

    pub fn find_customer_by_phone(&self, phone: &str) -> DataResult<Customer> {
        self.customers
            .read()
            .values()
            .find(|c| c.phone.as_deref() == Some(phone))
            .cloned()
            .ok_or_else(|| DataError::not_found("customer"))
    }

    pub fn award_points(&self, id: &str, points: i64) -> DataResult<Customer> {
        if points <= 0 {
            return Err(DataError::validation("awarded points must be positive"));
        }
        let mut customers = self.customers.write();
        let customer = customers
            .get_mut(id)
            .ok_or_else(|| DataError::not_found("customer"))?;
        customer.points_balance += points;
        Ok(customer.clone())
    }

    /// The only path that decreases a loyalty balance.
    pub fn redeem_referral(&self, id: &str, points: i64) -> DataResult<Customer> {
        if points <= 0 {
            return Err(DataError::validation("redeemed points must be positive"));
        }
        let mut customers = self.customers.write();
        let customer = customers
            .get_mut(id)
            .ok_or_else(|| DataError::not_found("customer"))?;
        if customer.points_balance < points {
            return Err(DataError::validation(format!(
                "insufficient points balance: {} < {}",
                customer.points_balance, points
            )));
        }
        customer.points_balance -= points;
        Ok(customer.clone())
    }

    /// Cache-fill replacement keyed by id.
    pub fn upsert_customer(&self, customer: Customer) {
        self.customers
            .write()
            .insert(customer.id.clone(), customer);
    }
}

fn validate_order_draft(draft: &OrderCreate) -> DataResult<()> {
    if draft.items.is_empty() {
        return Err(DataError::validation("order must contain at least one item"));
    }
    for item in &draft.items {
        if item.quantity < 1 {
            return Err(DataError::validation(format!(
                "item {} has non-positive quantity",
                item.id
            )));
        }
        if item.price < 0.0 {
            return Err(DataError::validation(format!(
                "item {} has negative price",
                item.id
            )));
        }
    }
    if draft.subtotal < 0.0 || draft.total_amount < 0.0 {
        return Err(DataError::validation("order amounts must not be negative"));
    }
    Ok(())
}

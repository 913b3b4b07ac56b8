//! Remote data client - CRUD against the backend REST API
//!
//! The façade holds the remote source as `Arc<dyn RemoteApi>` so the
//! dispatch logic stays a pure decision over typed results; transport
//! failures arrive as `DataError::Unreachable` values, never as
//! exceptions crossing the boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use shared::models::{
    Customer, CustomerCreate, CustomerUpdate, DiningTable, Order, OrderCreate, OrderFilter,
    OrderStatus, OrderStatusUpdate, PointsAdjustment, TableStatusUpdate,
};

use crate::config::ClientConfig;
use crate::error::{DataError, DataResult};

/// Remote CRUD surface, one method per façade operation.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn list_orders(&self, filter: &OrderFilter) -> DataResult<Vec<Order>>;
    async fn get_order(&self, id: &str) -> DataResult<Order>;
    async fn create_order(&self, draft: &OrderCreate) -> DataResult<Order>;
    async fn update_order_status(&self, id: &str, status: OrderStatus) -> DataResult<Order>;
    async fn delete_order(&self, id: &str) -> DataResult<()>;
    async fn list_tables(&self) -> DataResult<Vec<DiningTable>>;
    async fn update_table_status(
        &self,
        id: &str,
        update: &TableStatusUpdate,
    ) -> DataResult<DiningTable>;
    async fn add_customer(&self, draft: &CustomerCreate) -> DataResult<Customer>;
    async fn update_customer(&self, id: &str, update: &CustomerUpdate) -> DataResult<Customer>;
    async fn find_customer_by_phone(&self, phone: &str) -> DataResult<Customer>;
    async fn award_points(&self, id: &str, points: i64) -> DataResult<Customer>;
    async fn redeem_referral(&self, id: &str, points: i64) -> DataResult<Customer>;
}

/// Network implementation over reqwest.
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteApi {
    pub fn new(config: &ClientConfig) -> DataResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| DataError::unreachable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    fn map_error(status: StatusCode, body: String) -> DataError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DataError::Unauthorized,
            StatusCode::NOT_FOUND => {
                if body.is_empty() {
                    DataError::not_found("resource")
                } else {
                    DataError::NotFound(body)
                }
            }
            s if s.is_server_error() => DataError::unreachable(format!("server error: {s}")),
            // 400/422 and any remaining 4xx signal rejected input.
            _ => DataError::Validation(body),
        }
    }

    async fn execute<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> DataResult<T> {
        let response = self.send(req).await?;
        response
            .json()
            .await
            .map_err(|e| DataError::unreachable(format!("invalid response body: {e}")))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> DataResult<reqwest::Response> {
        let req = match self.auth_header() {
            Some(auth) => req.header(reqwest::header::AUTHORIZATION, auth),
            None => req,
        };
        let response = req
            .send()
            .await
            .map_err(|e| DataError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, "remote call rejected");
        Err(Self::map_error(status, body))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> DataResult<T> {
        self.execute(self.client.get(self.url(path))).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> DataResult<T> {
        self.execute(self.client.post(self.url(path)).json(body))
            .await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> DataResult<T> {
        self.execute(self.client.patch(self.url(path)).json(body))
            .await
    }

    async fn delete(&self, path: &str) -> DataResult<()> {
        self.send(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn list_orders(&self, filter: &OrderFilter) -> DataResult<Vec<Order>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(table) = filter.table_number {
            query.push(("table_number", table.to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(channel) = filter.channel {
            query.push(("channel", channel.as_str().to_string()));
        }
        self.execute(self.client.get(self.url("api/orders")).query(&query))
            .await
    }

    async fn get_order(&self, id: &str) -> DataResult<Order> {
        self.get(&format!("api/orders/{id}")).await
    }

    async fn create_order(&self, draft: &OrderCreate) -> DataResult<Order> {
        self.post("api/orders", draft).await
    }

    async fn update_order_status(&self, id: &str, status: OrderStatus) -> DataResult<Order> {
        self.patch(
            &format!("api/orders/{id}/status"),
            &OrderStatusUpdate { status },
        )
        .await
    }

    async fn delete_order(&self, id: &str) -> DataResult<()> {
        self.delete(&format!("api/orders/{id}")).await
    }

    async fn list_tables(&self) -> DataResult<Vec<DiningTable>> {
        self.get("api/tables").await
    }

    async fn update_table_status(
        &self,
        id: &str,
        update: &TableStatusUpdate,
    ) -> DataResult<DiningTable> {
        self.patch(&format!("api/tables/{id}/status"), update).await
    }

    async fn add_customer(&self, draft: &CustomerCreate) -> DataResult<Customer> {
        self.post("api/customers", draft).await
    }

    async fn update_customer(&self, id: &str, update: &CustomerUpdate) -> DataResult<Customer> {
        self.patch(&format!("api/customers/{id}"), update).await
    }

    async fn find_customer_by_phone(&self, phone: &str) -> DataResult<Customer> {
        self.get(&format!("api/customers/by-phone/{phone}")).await
    }

    async fn award_points(&self, id: &str, points: i64) -> DataResult<Customer> {
        self.post(
            &format!("api/customers/{id}/points/award"),
            &PointsAdjustment { points },
        )
        .await
    }

    async fn redeem_referral(&self, id: &str, points: i64) -> DataResult<Customer> {
        self.post(
            &format!("api/customers/{id}/points/redeem"),
            &PointsAdjustment { points },
        )
        .await
    }
}

//! Payment gateway
//!
//! All token movement happens on an external gateway. We submit a
//! transfer and get an order id back; the gateway later confirms or
//! rejects through the `/v1/pay/notify` webhook. Nothing here blocks
//! on settlement.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::utils::{AppError, AppResult};

/// Webhook body the gateway posts on settlement
#[derive(Debug, Clone, Deserialize)]
pub struct PayNotifyForm {
    pub order_id: String,
    pub tx_id: String,
    /// "success" or "failed"
    pub tx_status: String,
    pub tx_timestamp: i64,
}

impl PayNotifyForm {
    pub fn succeeded(&self) -> bool {
        self.tx_status.eq_ignore_ascii_case("success")
    }
}

/// What the transfer pays for; drives the webhook routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPurpose {
    SendRedpacket,
    ClaimRedpacket,
    RefundRedpacket,
    SubscribeDao,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub order_id: String,
    pub from: String,
    pub to: String,
    /// Decimal string in the token's smallest display unit
    pub amount: String,
    pub purpose: TransferPurpose,
    pub notify_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit a transfer; returns the gateway tx id. Settlement is
    /// confirmed asynchronously through the webhook.
    async fn transfer(&self, req: TransferRequest) -> AppResult<String>;
}

pub type SharedGateway = Arc<dyn PaymentGateway>;

// ========== HTTP gateway ==========

#[derive(Deserialize)]
struct GatewayResponse {
    code: i32,
    #[serde(default)]
    tx_id: String,
    #[serde(default)]
    msg: String,
}

pub struct HttpPayGateway {
    http: Client,
    base_url: String,
    notify_url: String,
}

impl HttpPayGateway {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::internal(format!("build pay client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.pay_gateway_url.trim_end_matches('/').to_string(),
            notify_url: format!(
                "{}/v1/pay/notify",
                config.pay_return_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPayGateway {
    async fn transfer(&self, mut req: TransferRequest) -> AppResult<String> {
        req.notify_url = self.notify_url.clone();
        let resp = self
            .http
            .post(format!("{}/api/transfer", self.base_url))
            .json(&req)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("pay gateway: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "pay gateway returned {}",
                resp.status()
            )));
        }
        let body: GatewayResponse = resp
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("decode pay response: {e}")))?;
        if body.code != 0 {
            return Err(AppError::upstream(format!(
                "pay gateway rejected transfer: {} ({})",
                body.msg, body.code
            )));
        }
        Ok(body.tx_id)
    }
}

// ========== Test double ==========

/// Records transfers and answers with a deterministic tx id
#[derive(Default)]
pub struct MockPayGateway {
    pub calls: parking_lot::Mutex<Vec<TransferRequest>>,
    /// When set, every transfer fails upstream
    pub fail: std::sync::atomic::AtomicBool,
}

impl MockPayGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<TransferRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPayGateway {
    async fn transfer(&self, req: TransferRequest) -> AppResult<String> {
        if self.fail.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(AppError::upstream("pay gateway unavailable"));
        }
        let tx_id = format!("tx_{}", req.order_id);
        self.calls.lock().push(req);
        Ok(tx_id)
    }
}

//! HTTP remote wallet gateway
//!
//! Wraps the backend REST surface behind [`WalletBackend`]. Every call runs
//! the same algorithm: consult the health tracker first, issue the request
//! with a bounded timeout, retry transport failures with exponential backoff,
//! and record the outcome back into the tracker. Non-2xx responses are
//! deterministic rejections and are never retried.

use crate::backend::{SendOutcome, WalletBackend};
use crate::types::{
    AckEnvelope, CreateTransactionBody, CreateWalletBody, ErrorBody, HealthEnvelope, SendBody,
    SendEnvelope, TransactionEnvelope, TransactionListEnvelope, UpdateBalanceBody,
    UpdateTxStatusBody, WalletEnvelope, WalletListEnvelope, WireTransaction, WireWallet,
};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use walletsync_error::{Result, SyncError};
use walletsync_resilience::{retry_with_backoff, BackoffConfig, CallContext, NetworkHealth};

/// Configuration for the HTTP gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend base URL, without a trailing slash
    pub base_url: String,
    /// Request timeout in the web context
    pub web_timeout: Duration,
    /// Request timeout in the extension context (extra hop latency)
    pub extension_timeout: Duration,
    /// Transport retry strategy
    pub backoff: BackoffConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".to_string(),
            web_timeout: Duration::from_secs(10),
            extension_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::gateway(),
        }
    }
}

impl GatewayConfig {
    /// Create a config pointing at the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the web-context timeout
    pub fn with_web_timeout(mut self, timeout: Duration) -> Self {
        self.web_timeout = timeout;
        self
    }

    /// Set the extension-context timeout
    pub fn with_extension_timeout(mut self, timeout: Duration) -> Self {
        self.extension_timeout = timeout;
        self
    }

    /// Set the transport retry strategy
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// HTTP implementation of [`WalletBackend`].
pub struct HttpGateway {
    config: GatewayConfig,
    client: Client,
    health: Arc<NetworkHealth>,
    timeout_secs: u64,
}

impl HttpGateway {
    /// Create a gateway sharing the given health tracker.
    ///
    /// The request timeout is chosen from the tracker's call context.
    pub fn new(config: GatewayConfig, health: Arc<NetworkHealth>) -> Result<Self> {
        let timeout = match health.context() {
            CallContext::Web => config.web_timeout,
            CallContext::Extension => config.extension_timeout,
        };
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(Self {
            timeout_secs: timeout.as_secs(),
            config,
            client,
            health,
        })
    }

    /// The health tracker this gateway reports into.
    pub fn health(&self) -> &Arc<NetworkHealth> {
        &self.health
    }

    fn map_transport(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            SyncError::Transport(err.to_string())
        }
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();

        if !status.is_success() {
            // Best-effort body parse; fall back to the status text.
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(SyncError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::Json(e.to_string()))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        if self.health.should_skip() {
            tracing::debug!(%path, "skipping call, backend marked unreachable");
            return Err(SyncError::Skipped);
        }

        let url = format!("{}{}", self.config.base_url, path);
        let result = retry_with_backoff(&self.config.backoff, || {
            let method = method.clone();
            let url = url.clone();
            let body = body.as_ref();
            async move { self.dispatch::<T>(method, &url, body).await }
        })
        .await;

        match &result {
            Ok(_) => self.health.mark_working(),
            Err(SyncError::RetriesExhausted { attempts, last }) => {
                tracing::warn!(%path, attempts, %last, "transport retries exhausted");
                self.health.mark_failed();
            }
            Err(_) => {}
        }
        result
    }

    /// Synthesized successful send response, used when the backend is
    /// unreachable so the demo flow still completes. Explicit policy, not a
    /// bug: the transaction never reaches any backend.
    fn synthesize_send(&self, body: &SendBody) -> SendOutcome {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        let hash = format!("0x{}", hex::encode(bytes));

        tracing::warn!(
            wallet = %body.wallet_id,
            %hash,
            "backend unreachable, synthesizing mock send response"
        );

        SendOutcome {
            transaction: WireTransaction {
                hash,
                wallet_id: Some(body.wallet_id.clone()),
                from: body.wallet_id.clone(),
                to: body.to.clone(),
                amount: body.amount,
                token: body.token.clone(),
                network: body.network.clone(),
                status: "confirmed".to_string(),
                direction: "send".to_string(),
                block_number: None,
                timestamp: Some(Utc::now()),
            },
            new_balance: Some(body.amount),
            fallback: true,
        }
    }
}

#[async_trait]
impl WalletBackend for HttpGateway {
    async fn list_wallets(&self, kind: Option<&str>) -> Result<Vec<WireWallet>> {
        let path = match kind {
            Some(kind) => format!("/wallets?type={kind}"),
            None => "/wallets".to_string(),
        };
        let envelope: WalletListEnvelope = self.execute(Method::GET, &path, None).await?;
        Ok(envelope.wallets)
    }

    async fn get_wallet(&self, id: &str) -> Result<WireWallet> {
        let envelope: WalletEnvelope = self
            .execute(Method::GET, &format!("/wallets/{id}"), None)
            .await?;
        Ok(envelope.wallet)
    }

    async fn create_wallet(&self, body: &CreateWalletBody) -> Result<WireWallet> {
        let envelope: WalletEnvelope = self
            .execute(Method::POST, "/wallets", Some(serde_json::to_value(body)?))
            .await?;
        Ok(envelope.wallet)
    }

    async fn update_balance(&self, wallet_id: &str, asset: &str, amount: f64) -> Result<()> {
        let body = UpdateBalanceBody {
            token_symbol: asset.to_string(),
            balance: amount,
        };
        let _: AckEnvelope = self
            .execute(
                Method::PUT,
                &format!("/wallets/{wallet_id}/balance"),
                Some(serde_json::to_value(&body)?),
            )
            .await?;
        Ok(())
    }

    async fn delete_wallet(&self, id: &str) -> Result<()> {
        let _: AckEnvelope = self
            .execute(Method::DELETE, &format!("/wallets/{id}"), None)
            .await?;
        Ok(())
    }

    async fn list_transactions(
        &self,
        wallet_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<WireTransaction>> {
        let path = match limit {
            Some(limit) => format!("/wallets/{wallet_id}/transactions?limit={limit}"),
            None => format!("/wallets/{wallet_id}/transactions"),
        };
        let envelope: TransactionListEnvelope = self.execute(Method::GET, &path, None).await?;
        Ok(envelope.transactions)
    }

    async fn create_transaction(&self, body: &CreateTransactionBody) -> Result<WireTransaction> {
        let envelope: TransactionEnvelope = self
            .execute(
                Method::POST,
                "/transactions",
                Some(serde_json::to_value(body)?),
            )
            .await?;
        Ok(envelope.transaction)
    }

    async fn update_transaction_status(
        &self,
        tx_hash: &str,
        status: &str,
        block_number: Option<u64>,
    ) -> Result<()> {
        let body = UpdateTxStatusBody {
            status: status.to_string(),
            block_number,
        };
        let _: AckEnvelope = self
            .execute(
                Method::PUT,
                &format!("/transactions/{tx_hash}/status"),
                Some(serde_json::to_value(&body)?),
            )
            .await?;
        Ok(())
    }

    async fn send(&self, body: &SendBody) -> Result<SendOutcome> {
        let result: Result<SendEnvelope> = self
            .execute(Method::POST, "/send", Some(serde_json::to_value(body)?))
            .await;

        match result {
            Ok(envelope) => Ok(SendOutcome {
                transaction: envelope.transaction,
                new_balance: envelope.new_balance,
                fallback: envelope.fallback,
            }),
            Err(SyncError::Skipped) | Err(SyncError::RetriesExhausted { .. }) => {
                Ok(self.synthesize_send(body))
            }
            Err(e) => Err(e),
        }
    }

    async fn seed(&self) -> Result<()> {
        let _: AckEnvelope = self.execute(Method::POST, "/seed", None).await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthEnvelope> {
        self.execute(Method::GET, "/health", None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletsync_resilience::NetworkHealthConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config(base_url: &str) -> GatewayConfig {
        GatewayConfig::new(base_url)
            .with_web_timeout(Duration::from_millis(200))
            .with_backoff(
                BackoffConfig::gateway().with_initial_delay(Duration::from_millis(10)),
            )
    }

    fn wallet_json() -> serde_json::Value {
        serde_json::json!({
            "id": "wallet_1",
            "name": "Demo Wallet",
            "type": "native",
            "address": "0xabc",
            "publicKey": "04aa",
            "network": "ethereum",
            "balance": { "eth": 10.0 },
            "isActive": true
        })
    }

    #[tokio::test]
    async fn test_list_wallets_success_marks_working() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wallets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "wallets": [wallet_json()]
            })))
            .mount(&server)
            .await;

        let health = Arc::new(NetworkHealth::default_web());
        health.mark_failed();
        // Pretend the window has elapsed so the probe is allowed.
        health.clear();

        let gateway = HttpGateway::new(fast_config(&server.uri()), health.clone()).unwrap();
        let wallets = gateway.list_wallets(None).await.unwrap();

        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].id, "wallet_1");
        assert!(!health.is_failed());
    }

    #[tokio::test]
    async fn test_kind_filter_is_sent_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wallets"))
            .and(query_param("type", "imported"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "wallets": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let health = Arc::new(NetworkHealth::default_web());
        let gateway = HttpGateway::new(fast_config(&server.uri()), health).unwrap();
        let wallets = gateway.list_wallets(Some("imported")).await.unwrap();
        assert!(wallets.is_empty());
    }

    #[tokio::test]
    async fn test_http_rejection_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wallets/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "error": "Wallet not found" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let health = Arc::new(NetworkHealth::default_web());
        let gateway = HttpGateway::new(fast_config(&server.uri()), health.clone()).unwrap();
        let err = gateway.get_wallet("missing").await.unwrap_err();

        match err {
            SyncError::Http { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Wallet not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        // A deterministic rejection means the backend is reachable.
        assert!(!health.is_failed());
    }

    #[tokio::test]
    async fn test_skip_short_circuits_without_io() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wallets"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let health = Arc::new(NetworkHealth::default_web());
        health.mark_failed();

        let gateway = HttpGateway::new(fast_config(&server.uri()), health).unwrap();
        let err = gateway.list_wallets(None).await.unwrap_err();
        assert!(err.is_skip());
    }

    #[tokio::test]
    async fn test_transport_failures_then_success() {
        let server = MockServer::start().await;
        // Two responses slower than the client timeout, then a fast one.
        Mock::given(method("GET"))
            .and(path("/wallets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(serde_json::json!({ "success": true, "wallets": [] })),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wallets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "wallets": [wallet_json()]
            })))
            .mount(&server)
            .await;

        let health = Arc::new(NetworkHealth::default_web());
        let gateway = HttpGateway::new(fast_config(&server.uri()), health.clone()).unwrap();

        let wallets = gateway.list_wallets(None).await.unwrap();
        assert_eq!(wallets.len(), 1);
        assert!(!health.is_failed());
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_failed() {
        let health = Arc::new(NetworkHealth::new(NetworkHealthConfig::new()));
        // Nothing listens on this port.
        let gateway =
            HttpGateway::new(fast_config("http://127.0.0.1:9"), health.clone()).unwrap();

        let err = gateway.get_wallet("wallet_1").await.unwrap_err();
        assert!(matches!(err, SyncError::RetriesExhausted { .. }));
        assert!(health.is_failed());
    }

    #[tokio::test]
    async fn test_send_synthesizes_fallback_when_unreachable() {
        let health = Arc::new(NetworkHealth::default_web());
        let gateway =
            HttpGateway::new(fast_config("http://127.0.0.1:9"), health.clone()).unwrap();

        let outcome = gateway
            .send(&SendBody {
                wallet_id: "wallet_1".to_string(),
                to: "0x1111111111111111111111111111111111111111".to_string(),
                amount: 1.0,
                token: "eth".to_string(),
                network: "ethereum".to_string(),
            })
            .await
            .unwrap();

        assert!(outcome.fallback);
        assert_eq!(outcome.transaction.status, "confirmed");
        assert!(outcome.transaction.hash.starts_with("0x"));
        assert_eq!(outcome.transaction.hash.len(), 66);
    }
}

//! Authenticated Kalshi trade API client.
//!
//! Wraps the REST endpoints the engine needs (market snapshots, open
//! positions, order submission) behind signed, rate-limited requests.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{ExchangeApi, OrderRequest};
use crate::signing::RequestSigner;
use crate::types::{ContractPrice, MarketSnapshot, Position};
use crate::{Error, Result};

/// Minimum spacing between consecutive outbound requests.
///
/// Courtesy limit, not a token bucket: request volume here is poll-driven
/// and predictable, so a blocking sleep is sufficient.
pub(crate) const MIN_REQUEST_SPACING: StdDuration = StdDuration::from_millis(100);

/// Kalshi trade API client.
pub struct KalshiClient {
    base_url: String,
    http_client: reqwest::Client,
    signer: RequestSigner,
    /// Start instant of the most recent request, for spacing enforcement.
    last_request: Mutex<Option<Instant>>,
}

impl KalshiClient {
    /// Default trade API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.elections.kalshi.com/trade-api/v2";

    pub fn new(base_url: Option<String>, signer: RequestSigner) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .connect_timeout(StdDuration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            http_client,
            signer,
            last_request: Mutex::new(None),
        }
    }

    /// Block until the spacing floor since the previous request start has elapsed.
    pub(crate) async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(started) = *last {
            let elapsed = started.elapsed();
            if elapsed < MIN_REQUEST_SPACING {
                tokio::time::sleep(MIN_REQUEST_SPACING - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Issue one signed request. The signature covers the path without the
    /// query string.
    async fn request<B: serde::Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        self.throttle().await;

        let mut url =
            Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| Error::Config {
                message: format!("Invalid exchange URL for path {}: {}", path, e),
            })?;
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let timestamp = chrono::Utc::now().timestamp_millis();
        let signature = self.signer.sign(timestamp, method.as_str(), url.path())?;

        let mut request = self
            .http_client
            .request(method, url)
            .header("KALSHI-ACCESS-KEY", self.signer.access_key())
            .header("KALSHI-ACCESS-TIMESTAMP", timestamp.to_string())
            .header("KALSHI-ACCESS-SIGNATURE", signature);
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// Decode a non-2xx response into a typed error.
    ///
    /// Signature rejections surface as authentication errors and are never
    /// retried; static credentials cannot self-heal.
    async fn decode_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("Exchange returned {}", status));

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Error::Auth { message };
        }

        Error::Api {
            message,
            status: Some(status.as_u16()),
            body: Some(body),
        }
    }
}

#[async_trait]
impl ExchangeApi for KalshiClient {
    async fn get_market(&self, ticker: &str) -> Result<MarketSnapshot> {
        let path = format!("/markets/{}", ticker);
        let response = self
            .request::<()>(Method::GET, &path, &[], None)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::MarketNotFound {
                ticker: ticker.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        let page: MarketResponse = response.json().await?;
        let snapshot = page.market.try_into()?;
        debug!(ticker, "Fetched market snapshot");
        Ok(snapshot)
    }

    async fn get_positions(&self, ticker: Option<&str>) -> Result<Vec<Position>> {
        let mut all_positions = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(ticker) = ticker {
                query.push(("ticker", ticker));
            }
            if let Some(cursor) = cursor.as_deref() {
                query.push(("cursor", cursor));
            }

            let response = self
                .request::<()>(Method::GET, "/portfolio/positions", &query, None)
                .await?;
            if !response.status().is_success() {
                return Err(Self::decode_error(response).await);
            }

            let page: PositionsResponse = response.json().await?;
            all_positions.extend(
                page.market_positions
                    .into_iter()
                    .map(|p| Position::new(p.ticker, p.position)),
            );

            match page.cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }

        debug!(count = all_positions.len(), "Fetched open positions");
        Ok(all_positions)
    }

    async fn create_order(&self, request: OrderRequest) -> Result<String> {
        let response = self
            .request(Method::POST, "/portfolio/orders", &[], Some(&request))
            .await?;
        if !response.status().is_success() {
            let error = Self::decode_error(response).await;
            warn!(
                ticker = %request.ticker,
                client_order_id = %request.client_order_id,
                error = %error,
                "Order submission rejected"
            );
            return Err(error);
        }

        let created: OrderResponse = response.json().await?;
        info!(
            ticker = %request.ticker,
            exchange_order_id = %created.order.order_id,
            count = request.count,
            "Order submitted"
        );
        Ok(created.order.order_id)
    }
}

impl std::fmt::Debug for KalshiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalshiClient")
            .field("base_url", &self.base_url)
            .field("access_key", &self.signer.access_key())
            .finish()
    }
}

// Internal API response types

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct MarketResponse {
    market: KalshiMarket,
}

#[derive(Debug, Deserialize)]
struct KalshiMarket {
    ticker: String,
    yes_bid: i64,
    yes_ask: i64,
    no_bid: i64,
    no_ask: i64,
    last_price: i64,
}

impl TryFrom<KalshiMarket> for MarketSnapshot {
    type Error = Error;

    fn try_from(m: KalshiMarket) -> Result<Self> {
        Ok(MarketSnapshot {
            ticker: m.ticker,
            yes_bid: ContractPrice::new(m.yes_bid)?,
            yes_ask: ContractPrice::new(m.yes_ask)?,
            no_bid: ContractPrice::new(m.no_bid)?,
            no_ask: ContractPrice::new(m.no_ask)?,
            last_price: ContractPrice::new(m.last_price)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    #[serde(default)]
    market_positions: Vec<KalshiPosition>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KalshiPosition {
    ticker: String,
    position: i32,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    order: KalshiOrder,
}

#[derive(Debug, Deserialize)]
struct KalshiOrder {
    order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    fn test_client() -> KalshiClient {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let signer = RequestSigner::new("test-key".to_string(), private_key);
        KalshiClient::new(None, signer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_enforces_min_spacing() {
        let client = test_client();

        let start = Instant::now();
        client.throttle().await;
        client.throttle().await;

        assert!(start.elapsed() >= MIN_REQUEST_SPACING);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_skips_sleep_after_idle_gap() {
        let client = test_client();

        client.throttle().await;
        tokio::time::sleep(StdDuration::from_millis(500)).await;

        let before = Instant::now();
        client.throttle().await;
        assert_eq!(before.elapsed(), StdDuration::ZERO);
    }

    #[test]
    fn test_market_snapshot_decoding() {
        let body = r#"{
            "market": {
                "ticker": "INX-2024",
                "yes_bid": 55, "yes_ask": 57,
                "no_bid": 43, "no_ask": 45,
                "last_price": 56, "volume": 1200
            }
        }"#;
        let page: MarketResponse = serde_json::from_str(body).unwrap();
        let snapshot: MarketSnapshot = page.market.try_into().unwrap();

        assert_eq!(snapshot.ticker, "INX-2024");
        assert_eq!(snapshot.yes_bid.value(), 55);
        assert_eq!(snapshot.last_price.value(), 56);
    }

    #[test]
    fn test_market_snapshot_rejects_out_of_range_price() {
        let market = KalshiMarket {
            ticker: "INX-2024".to_string(),
            yes_bid: 155,
            yes_ask: 57,
            no_bid: 43,
            no_ask: 45,
            last_price: 56,
        };
        assert!(MarketSnapshot::try_from(market).is_err());
    }

    #[test]
    fn test_positions_page_with_cursor() {
        let body = r#"{
            "market_positions": [
                {"ticker": "A", "position": 10},
                {"ticker": "B", "position": -4}
            ],
            "cursor": "abc123"
        }"#;
        let page: PositionsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.market_positions.len(), 2);
        assert_eq!(page.cursor.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_positions_final_page_may_be_empty() {
        let page: PositionsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.market_positions.is_empty());
        assert!(page.cursor.is_none());
    }

    #[test]
    fn test_error_body_decoding() {
        let body = r#"{"error": {"code": "insufficient_balance", "message": "not enough balance"}}"#;
        let decoded: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.error.message, "not enough balance");
    }
}

use crate::error::ApiError;
use crate::responses::ApiErrorResponse;
use crate::DashboardApi;
use async_trait::async_trait;
use configuration::{ApiSettings, Endpoints};
use core_types::{BotConfig, BotStatus, OrderHistoryItem, PortfolioSummary, Snapshot};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// `DashboardApi` over HTTP/JSON.
#[derive(Clone)]
pub struct HttpDashboardClient {
    client: reqwest::Client,
    root: String,
    endpoints: Endpoints,
}

impl HttpDashboardClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = settings.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::Configuration(format!("invalid API token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()?;

        let root = format!(
            "{}{}",
            settings.base_url.trim_end_matches('/'),
            settings.prefix.trim_end_matches('/')
        );
        // Fail on construction rather than on the first request.
        Url::parse(&root).map_err(|e| ApiError::InvalidUrl(format!("{root}: {e}")))?;

        Ok(Self {
            client,
            root,
            endpoints: settings.endpoints.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let full = if path.starts_with('/') {
            format!("{}{}", self.root, path)
        } else {
            format!("{}/{}", self.root, path)
        };
        Url::parse(&full).map_err(|e| ApiError::InvalidUrl(format!("{full}: {e}")))
    }

    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        Self::read_json(path, response).await
    }

    async fn post_json(&self, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        debug!(%url, "POST");
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::read_json(path, response).await
    }

    async fn read_json(path: &str, response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = ApiErrorResponse::detail_from_body(&text);
            warn!(path, status = status.as_u16(), detail = ?detail, "Backend rejected request");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Deserialization(format!("{path}: {e}")))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, ApiError> {
        let body = self.get_json(&self.endpoints.snapshot).await?;
        Ok(Snapshot::decode(body)?)
    }

    async fn get_portfolio_summary(&self) -> Result<PortfolioSummary, ApiError> {
        let body = self.get_json(&self.endpoints.portfolio).await?;
        Ok(PortfolioSummary::decode(body)?)
    }

    async fn get_status(&self) -> Result<BotStatus, ApiError> {
        let body = self.get_json(&self.endpoints.status).await?;
        Ok(BotStatus::decode(body)?)
    }

    async fn fetch_config(&self) -> Result<BotConfig, ApiError> {
        let body = self.get_json(&self.endpoints.config).await?;
        Ok(BotConfig::decode(body)?)
    }

    async fn update_config(&self, config: &BotConfig) -> Result<BotConfig, ApiError> {
        let payload = serde_json::to_value(config)
            .map_err(|e| ApiError::Deserialization(format!("config payload: {e}")))?;
        let body = self.post_json(&self.endpoints.config, Some(&payload)).await?;
        Ok(BotConfig::decode(body)?)
    }

    async fn start_bot(&self) -> Result<BotStatus, ApiError> {
        let body = self.post_json(&self.endpoints.bot_start, None).await?;
        Ok(BotStatus::decode(body)?)
    }

    async fn stop_bot(&self) -> Result<BotStatus, ApiError> {
        let body = self.post_json(&self.endpoints.bot_stop, None).await?;
        Ok(BotStatus::decode(body)?)
    }

    async fn liquidate(&self) -> Result<(), ApiError> {
        self.post_json(&self.endpoints.bot_liquidate, None).await?;
        Ok(())
    }

    async fn fetch_orders(&self) -> Result<Vec<OrderHistoryItem>, ApiError> {
        let body = self.get_json(&self.endpoints.orders).await?;
        Ok(OrderHistoryItem::decode_list(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String, token: Option<&str>) -> HttpDashboardClient {
        let settings = ApiSettings {
            base_url,
            token: token.map(str::to_string),
            ..ApiSettings::default()
        };
        HttpDashboardClient::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn snapshot_read_sends_no_cache_and_bearer_headers() {
        let app = Router::new().route(
            "/api/dashboard",
            get(|headers: AxumHeaders| async move {
                let cache = headers.get("cache-control").and_then(|v| v.to_str().ok()).unwrap_or("");
                let pragma = headers.get("pragma").and_then(|v| v.to_str().ok()).unwrap_or("");
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
                Json(json!({
                    "synced_at": "12:00:00",
                    "strategy_text": format!("{cache}|{pragma}|{auth}"),
                    "metrics": {"total_asset_krw": "1500000"},
                    "status": {"running": true},
                }))
            }),
        );
        let client = client_for(serve(app).await, Some("s3cret"));

        let snapshot = client.fetch_snapshot().await.unwrap();
        assert_eq!(
            snapshot.strategy_text.as_deref(),
            Some("no-cache, no-store|no-cache|Bearer s3cret")
        );
        assert_eq!(snapshot.metrics.total_asset_krw, Some(1_500_000.0));
        assert!(snapshot.status.running);
    }

    #[tokio::test]
    async fn non_success_status_carries_backend_detail() {
        let app = Router::new()
            .route(
                "/api/bot/start",
                post(|| async { (StatusCode::CONFLICT, Json(json!({"detail": "Bot already running"}))) }),
            )
            .route(
                "/api/bot/stop",
                post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
            );
        let client = client_for(serve(app).await, None);

        let err = client.start_bot().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 409, .. }));
        assert_eq!(err.detail(), Some("Bot already running"));

        let err = client.stop_bot().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, detail: None }));
    }

    #[tokio::test]
    async fn config_save_posts_full_document_and_decodes_reply() {
        let app = Router::new().route("/api/config", post(|Json(body): Json<Value>| async move { Json(body) }));
        let client = client_for(serve(app).await, None);

        let config = BotConfig::decode(json!({
            "symbols": ["KRW-BTC"],
            "grid": {"target_coin": "ETH", "grid_cooldown_seconds": 30}
        }))
        .unwrap();
        let saved = client.update_config(&config).await.unwrap();
        assert_eq!(saved, config);
        assert_eq!(saved.extra.get("symbols"), Some(&json!(["KRW-BTC"])));
    }

    #[tokio::test]
    async fn liquidate_ignores_the_response_body_and_orders_decode_as_list() {
        let app = Router::new()
            .route("/api/bot/liquidate", post(|| async { "ok" }))
            .route(
                "/api/orders/",
                get(|| async { Json(json!([{"id": 7, "symbol": "KRW-BTC", "side": "bid", "qty": "0.5"}, "junk"])) }),
            );
        let client = client_for(serve(app).await, None);

        client.liquidate().await.unwrap();
        let orders = client.fetch_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].symbol.as_deref(), Some("KRW-BTC"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_deserialization_error() {
        let app = Router::new().route("/api/status", get(|| async { "{not json" }));
        let client = client_for(serve(app).await, None);

        let err = client.get_status().await.unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn invalid_base_url_is_rejected_on_construction() {
        let settings = ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        };
        assert!(matches!(
            HttpDashboardClient::new(&settings),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}

use std::time::Duration;

use reqwest::Client;
use tickertalk_models::{Envelope, GatewayConfig};
use tracing::{debug, info, warn};

use crate::envelope::guard;
use crate::error::ToolError;

/// Provider endpoint paths, relative to the gateway base URL.
pub mod paths {
    pub const NEWS: &str = "/news";
    pub const IPO: &str = "/ipo";
    pub const STOCK: &str = "/stock";
    pub const INDUSTRY_SEARCH: &str = "/industry_search";
    pub const MUTUAL_FUND_SEARCH: &str = "/mutual_fund_search";
    pub const TRENDING: &str = "/trending";
    pub const WEEK_52_HIGH_LOW: &str = "/fetch_52_week_high_low_data";
    pub const NSE_MOST_ACTIVE: &str = "/NSE_most_active";
    pub const BSE_MOST_ACTIVE: &str = "/BSE_most_active";
    pub const MUTUAL_FUNDS: &str = "/mutual_funds";
    pub const PRICE_SHOCKERS: &str = "/price_shockers";
    pub const COMMODITIES: &str = "/commodities";
    pub const STOCK_TARGET_PRICE: &str = "/stock_target_price";
    pub const STOCK_FORECASTS: &str = "/stock_forecasts";
    pub const HISTORICAL_DATA: &str = "/historical_data";
    pub const HISTORICAL_STATS: &str = "/historical_stats";
}

/// Read-only client of the market-data provider.
///
/// Every operation is a single GET with the credential in `X-Api-Key`. No
/// retries and no caching: each call is a fresh round trip, and every
/// outcome comes back as an [`Envelope`].
pub struct MarketDataGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MarketDataGateway {
    pub fn new(config: &GatewayConfig, api_key: Option<String>) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Build a gateway reading the credential from the environment variable
    /// named by `config.api_key_env`.
    pub fn from_env(config: &GatewayConfig) -> Result<Self, ToolError> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!(var = %config.api_key_env, "Market data credential not set");
        }
        Self::new(config, api_key)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::value("Market data API key not configured"))?;

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?params, "Market data request");

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", api_key)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ToolError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Err(ToolError::value("Empty response received from API"));
        }

        let data: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ToolError::Malformed(format!("{path}: {e}")))?;

        if is_empty_payload(&data) {
            return Err(ToolError::value("Empty response received from API"));
        }

        info!(path, "Market data fetched");
        Ok(data)
    }

    /// Fetch an arbitrary provider path. Blank required parameters are
    /// rejected before any request is made.
    pub async fn fetch(&self, path: &str, params: &[(&str, &str)]) -> Envelope {
        guard(async {
            for (name, value) in params {
                require(name, value)?;
            }
            self.get(path, params).await
        })
        .await
    }

    /// Latest stock market and company news.
    pub async fn market_news(&self) -> Envelope {
        self.fetch(paths::NEWS, &[]).await
    }

    /// Upcoming, ongoing and recently listed IPOs.
    pub async fn ipo_data(&self) -> Envelope {
        self.fetch(paths::IPO, &[]).await
    }

    /// Detailed stock data for a company by name, e.g. `"Reliance"`.
    pub async fn stock_by_name(&self, name: &str) -> Envelope {
        self.fetch(paths::STOCK, &[("name", name)]).await
    }

    pub async fn industry_search(&self, query: &str) -> Envelope {
        self.fetch(paths::INDUSTRY_SEARCH, &[("query", query)]).await
    }

    pub async fn mutual_fund_search(&self, query: &str) -> Envelope {
        self.fetch(paths::MUTUAL_FUND_SEARCH, &[("query", query)])
            .await
    }

    /// Top gainers and losers.
    pub async fn trending_stocks(&self) -> Envelope {
        self.fetch(paths::TRENDING, &[]).await
    }

    pub async fn week_52_high_low(&self) -> Envelope {
        self.fetch(paths::WEEK_52_HIGH_LOW, &[]).await
    }

    pub async fn nse_most_active(&self) -> Envelope {
        self.fetch(paths::NSE_MOST_ACTIVE, &[]).await
    }

    pub async fn bse_most_active(&self) -> Envelope {
        self.fetch(paths::BSE_MOST_ACTIVE, &[]).await
    }

    pub async fn mutual_funds(&self) -> Envelope {
        self.fetch(paths::MUTUAL_FUNDS, &[]).await
    }

    /// Stocks with significant price movements.
    pub async fn price_shockers(&self) -> Envelope {
        self.fetch(paths::PRICE_SHOCKERS, &[]).await
    }

    /// Active commodity futures.
    pub async fn commodities(&self) -> Envelope {
        self.fetch(paths::COMMODITIES, &[]).await
    }

    /// Analyst target price and recommendation data.
    pub async fn stock_target_price(&self, stock_id: &str) -> Envelope {
        self.fetch(paths::STOCK_TARGET_PRICE, &[("stock_id", stock_id)])
            .await
    }

    /// Forecast data for a stock.
    ///
    /// `measure_code` is e.g. EPS, ROE, SAL; `period_type` Annual or Interim;
    /// `data_type` Actuals or Estimates; `age` e.g. OneWeekAgo, ThirtyDaysAgo.
    pub async fn stock_forecasts(
        &self,
        stock_id: &str,
        measure_code: &str,
        period_type: &str,
        data_type: &str,
        age: &str,
    ) -> Envelope {
        self.fetch(
            paths::STOCK_FORECASTS,
            &[
                ("stock_id", stock_id),
                ("measure_code", measure_code),
                ("period_type", period_type),
                ("data_type", data_type),
                ("age", age),
            ],
        )
        .await
    }

    /// Historical price/financial series. The provider defaults are
    /// `period = "5yr"` and `filter = "default"`.
    pub async fn historical_data(&self, stock_name: &str, period: &str, filter: &str) -> Envelope {
        self.fetch(
            paths::HISTORICAL_DATA,
            &[
                ("stock_name", stock_name),
                ("period", period),
                ("filter", filter),
            ],
        )
        .await
    }

    /// Historical statistics such as `quarter_results` or `balancesheet`.
    pub async fn historical_stats(&self, stock_name: &str, stats: &str) -> Envelope {
        self.fetch(
            paths::HISTORICAL_STATS,
            &[("stock_name", stock_name), ("stats", stats)],
        )
        .await
    }
}

fn require(name: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::value(format!("Parameter '{name}' must not be empty")));
    }
    Ok(())
}

/// True for payloads the provider uses to mean "nothing": null, `{}`, `[]`, `""`.
fn is_empty_payload(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickertalk_models::ErrorKind;

    fn offline_gateway(api_key: Option<&str>) -> MarketDataGateway {
        let config = GatewayConfig {
            // Nothing listens here; tests below must never reach the network.
            base_url: "http://127.0.0.1:9/".to_string(),
            ..GatewayConfig::default()
        };
        MarketDataGateway::new(&config, api_key.map(str::to_string)).unwrap()
    }

    #[test]
    fn empty_payloads() {
        assert!(is_empty_payload(&serde_json::json!(null)));
        assert!(is_empty_payload(&serde_json::json!({})));
        assert!(is_empty_payload(&serde_json::json!([])));
        assert!(is_empty_payload(&serde_json::json!("")));
        assert!(!is_empty_payload(&serde_json::json!(0)));
        assert!(!is_empty_payload(&serde_json::json!({"a": 1})));
    }

    #[test]
    fn blank_credential_is_no_credential() {
        assert!(!offline_gateway(Some("  ")).has_credential());
        assert!(offline_gateway(Some("key")).has_credential());
        assert_eq!(offline_gateway(None).base_url(), "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn missing_credential_is_value_error() {
        let gateway = offline_gateway(None);
        let env = gateway.trending_stocks().await;
        assert_eq!(env.error_kind(), Some(ErrorKind::ValueError));
    }

    #[tokio::test]
    async fn blank_parameter_is_value_error() {
        let gateway = offline_gateway(Some("key"));
        let env = gateway.stock_by_name("   ").await;
        assert_eq!(
            env,
            Envelope::error(ErrorKind::ValueError, "Parameter 'name' must not be empty")
        );
    }
}

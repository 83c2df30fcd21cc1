use serde::{Deserialize, Serialize};
use tickertalk_models::Envelope;
use tracing::info;

use crate::charts;
use crate::envelope::{guard_sync, into_envelope};
use crate::error::ToolError;
use crate::gateway::MarketDataGateway;

/// A tool invocation chosen by an agent: tool name plus a flat argument object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            args: serde_json::Map::new(),
        }
    }

    pub fn arg(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(name.to_string(), value.into());
        self
    }
}

/// Description of a tool, rendered into agent system prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub signature: &'static str,
    pub description: &'static str,
}

pub const COLLECTOR_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_stock_by_name",
        signature: "get_stock_by_name(name: str)",
        description: "Detailed stock data for a company by name.",
    },
    ToolSpec {
        name: "get_trending_stocks",
        signature: "get_trending_stocks()",
        description: "Top gainers and losers in real time.",
    },
    ToolSpec {
        name: "fetch_52_week_high_low",
        signature: "fetch_52_week_high_low()",
        description: "Stocks with 52 week high and low data.",
    },
    ToolSpec {
        name: "nse_most_active",
        signature: "nse_most_active()",
        description: "NSE most active stocks by volume.",
    },
    ToolSpec {
        name: "bse_most_active",
        signature: "bse_most_active()",
        description: "BSE most active stocks by volume.",
    },
    ToolSpec {
        name: "industry_search",
        signature: "industry_search(query: str)",
        description: "Search companies by industry.",
    },
    ToolSpec {
        name: "get_mutual_funds",
        signature: "get_mutual_funds()",
        description: "Latest mutual fund data.",
    },
    ToolSpec {
        name: "mutual_fund_search",
        signature: "mutual_fund_search(query: str)",
        description: "Search mutual funds by keyword.",
    },
    ToolSpec {
        name: "price_shockers",
        signature: "price_shockers()",
        description: "Stocks with significant price movements.",
    },
    ToolSpec {
        name: "get_commodities",
        signature: "get_commodities()",
        description: "Active commodity futures market data.",
    },
    ToolSpec {
        name: "historical_data",
        signature: "historical_data(stock_name: str, period: str = \"5yr\", filter: str = \"default\")",
        description: "Historical stock price/financial data.",
    },
    ToolSpec {
        name: "historical_stats",
        signature: "historical_stats(stock_name: str, stats: str)",
        description: "Historical statistics like quarter_results, balancesheet.",
    },
    ToolSpec {
        name: "stock_target_price",
        signature: "stock_target_price(stock_id: str)",
        description: "Analyst target price and recommendation data.",
    },
    ToolSpec {
        name: "stock_forecasts",
        signature: "stock_forecasts(stock_id: str, measure_code: str, period_type: str, data_type: str, age: str)",
        description: "Forecast data for a stock (measure_code EPS/ROE/SAL, period_type Annual/Interim, data_type Actuals/Estimates, age OneWeekAgo/ThirtyDaysAgo).",
    },
    ToolSpec {
        name: "get_ipo_data",
        signature: "get_ipo_data()",
        description: "Upcoming, ongoing and recently listed IPOs.",
    },
    ToolSpec {
        name: "get_market_news",
        signature: "get_market_news()",
        description: "Latest stock market and company news.",
    },
];

pub const ANALYST_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "plot_stock_price_trend",
        signature: "plot_stock_price_trend(data: [{date, close}])",
        description: "Stock price trend over time.",
    },
    ToolSpec {
        name: "plot_volume_chart",
        signature: "plot_volume_chart(data: [{date, volume}])",
        description: "Trading volume over time.",
    },
    ToolSpec {
        name: "plot_moving_averages",
        signature: "plot_moving_averages(data: [{date, close}], short_window: int = 20, long_window: int = 50)",
        description: "Closing price with short and long simple moving averages.",
    },
    ToolSpec {
        name: "plot_candlestick_like",
        signature: "plot_candlestick_like(data: [{date, open, high, low, close}])",
        description: "OHLC data in a candlestick-style chart.",
    },
    ToolSpec {
        name: "plot_sector_allocation",
        signature: "plot_sector_allocation(data: {sector: weight})",
        description: "Sector allocation as a pie chart.",
    },
];

/// Render a tool list as prompt text, one `- signature: description` per line.
pub fn render_catalog(tools: &[ToolSpec]) -> String {
    tools
        .iter()
        .map(|t| format!("- {}: {}", t.signature, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flat primitive arguments of a gateway tool.
struct PrimitiveArgs<'a> {
    tool: &'a str,
    args: &'a serde_json::Map<String, serde_json::Value>,
}

impl<'a> PrimitiveArgs<'a> {
    fn new(call: &'a ToolCall) -> Result<Self, ToolError> {
        for (name, value) in &call.args {
            if value.is_array() || value.is_object() {
                return Err(ToolError::value(format!(
                    "{}: argument '{name}' must be a plain value, not a nested structure",
                    call.tool
                )));
            }
        }
        Ok(Self {
            tool: &call.tool,
            args: &call.args,
        })
    }

    fn optional(&self, name: &str) -> Option<String> {
        match self.args.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn required(&self, name: &str) -> Result<String, ToolError> {
        self.optional(name).ok_or_else(|| {
            ToolError::value(format!("{}: missing required argument '{name}'", self.tool))
        })
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }
}

/// Execute a data-collector tool call against the gateway.
pub async fn dispatch_collector(gateway: &MarketDataGateway, call: &ToolCall) -> Envelope {
    info!(tool = %call.tool, "Dispatching collector tool");

    let args = match PrimitiveArgs::new(call) {
        Ok(args) => args,
        Err(e) => return into_envelope::<()>(Err(e)),
    };

    // Resolve arguments up front so a bad call never reaches the network.
    macro_rules! arg {
        ($name:expr) => {
            match args.required($name) {
                Ok(v) => v,
                Err(e) => return into_envelope::<()>(Err(e)),
            }
        };
    }

    match call.tool.as_str() {
        "get_stock_by_name" => {
            let name = match args.required("name") {
                Ok(v) => v,
                // The collector prompt historically advertised `stock_name`.
                Err(_) => arg!("stock_name"),
            };
            gateway.stock_by_name(&name).await
        }
        "get_trending_stocks" => gateway.trending_stocks().await,
        "fetch_52_week_high_low" => gateway.week_52_high_low().await,
        "nse_most_active" => gateway.nse_most_active().await,
        "bse_most_active" => gateway.bse_most_active().await,
        "industry_search" => gateway.industry_search(&arg!("query")).await,
        "get_mutual_funds" => gateway.mutual_funds().await,
        "mutual_fund_search" => gateway.mutual_fund_search(&arg!("query")).await,
        "price_shockers" => gateway.price_shockers().await,
        "get_commodities" => gateway.commodities().await,
        "historical_data" => {
            let stock_name = arg!("stock_name");
            let period = args.or_default("period", "5yr");
            let filter = args.or_default("filter", "default");
            gateway.historical_data(&stock_name, &period, &filter).await
        }
        "historical_stats" => {
            let stock_name = arg!("stock_name");
            let stats = arg!("stats");
            gateway.historical_stats(&stock_name, &stats).await
        }
        "stock_target_price" => gateway.stock_target_price(&arg!("stock_id")).await,
        "stock_forecasts" => {
            let stock_id = arg!("stock_id");
            let measure_code = arg!("measure_code");
            let period_type = arg!("period_type");
            let data_type = arg!("data_type");
            let age = arg!("age");
            gateway
                .stock_forecasts(&stock_id, &measure_code, &period_type, &data_type, &age)
                .await
        }
        "get_ipo_data" => gateway.ipo_data().await,
        "get_market_news" => gateway.market_news().await,
        other => into_envelope::<()>(Err(ToolError::value(format!("Unknown tool: {other}")))),
    }
}

/// Execute a data-analyst (chart) tool call.
pub fn dispatch_analyst(call: &ToolCall) -> Envelope {
    info!(tool = %call.tool, "Dispatching analyst tool");

    let data = call.args.get("data").cloned().unwrap_or(serde_json::Value::Null);
    match call.tool.as_str() {
        "plot_stock_price_trend" => guard_sync(|| charts::price_trend(&data)),
        "plot_volume_chart" => guard_sync(|| charts::volume_chart(&data)),
        "plot_moving_averages" => guard_sync(|| {
            let short = window_arg(call, "short_window", charts::DEFAULT_SHORT_WINDOW)?;
            let long = window_arg(call, "long_window", charts::DEFAULT_LONG_WINDOW)?;
            charts::moving_averages(&data, short, long)
        }),
        "plot_candlestick_like" => guard_sync(|| charts::candlestick(&data)),
        "plot_sector_allocation" => guard_sync(|| charts::sector_allocation(&data)),
        other => into_envelope::<()>(Err(ToolError::value(format!("Unknown tool: {other}")))),
    }
}

fn window_arg(call: &ToolCall, name: &str, default: usize) -> Result<usize, ToolError> {
    match call.args.get(name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .filter(|w| *w > 0)
            .map(|w| w as usize)
            .ok_or_else(|| ToolError::value(format!("'{name}' must be a positive integer"))),
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tickertalk_models::{Envelope, ErrorKind};
use tickertalk_tools::catalog::{dispatch_analyst, dispatch_collector};
use tickertalk_tools::MarketDataGateway;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::model::{complete_logged, ChatModel, ModelRequest};
use crate::parser::{parse_analyst_reply, parse_tool_call};
use crate::prompts::{analyst_system_prompt, collector_system_prompt, for_user};

/// A sub-agent the supervisor delegates to. Mockable for testing.
///
/// Takes a plain-text request and returns the agent's final text. Tool
/// faults come back inside that text as error envelopes; only a model
/// failure is an `Err`.
#[async_trait]
pub trait SubAgent: Send + Sync {
    /// Tool name the supervisor uses for this agent.
    fn name(&self) -> &str;

    async fn invoke(&self, request: &str, user_name: &str) -> Result<String, AgentError>;
}

/// Fetches raw market data: the model picks one gateway tool, the tool runs,
/// and the envelope is returned as JSON text.
pub struct DataCollector {
    model: Arc<dyn ChatModel>,
    gateway: Arc<MarketDataGateway>,
}

impl DataCollector {
    pub fn new(model: Arc<dyn ChatModel>, gateway: Arc<MarketDataGateway>) -> Self {
        Self { model, gateway }
    }
}

#[async_trait]
impl SubAgent for DataCollector {
    fn name(&self) -> &str {
        "collect_market_data"
    }

    async fn invoke(&self, request: &str, user_name: &str) -> Result<String, AgentError> {
        let system_prompt = for_user(&collector_system_prompt(), user_name);
        let model_request = ModelRequest::single(system_prompt, request);
        let raw = complete_logged(self.model.as_ref(), self.name(), user_name, &model_request).await?;

        let envelope = match parse_tool_call(&raw) {
            Ok(call) => dispatch_collector(&self.gateway, &call).await,
            Err(e) => {
                warn!(error = %e, "Collector did not select a tool");
                Envelope::error(ErrorKind::ValueError, format!("No tool selected: {e}"))
            }
        };

        info!(success = envelope.is_success(), "called this tool collect_market_data");
        Ok(envelope.to_json_string())
    }
}

/// Interprets already collected data, optionally attaching a chart.
pub struct DataAnalyst {
    model: Arc<dyn ChatModel>,
}

impl DataAnalyst {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl SubAgent for DataAnalyst {
    fn name(&self) -> &str {
        "analyze_market_data"
    }

    async fn invoke(&self, request: &str, user_name: &str) -> Result<String, AgentError> {
        let system_prompt = for_user(&analyst_system_prompt(), user_name);
        let model_request = ModelRequest::single(system_prompt, request);
        let raw = complete_logged(self.model.as_ref(), self.name(), user_name, &model_request).await?;

        let reply = parse_analyst_reply(&raw);
        let text = match reply.chart {
            Some(call) => {
                let chart = dispatch_analyst(&call);
                format!("{}\n\nChart: {}", reply.analysis, chart.to_json_string())
            }
            None => reply.analysis,
        };

        info!("called this tool analyze_market_data");
        Ok(text)
    }
}

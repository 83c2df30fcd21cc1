use tickertalk_tools::ToolCall;
use tracing::warn;

use crate::error::AgentError;
use crate::supervisor::Decision;

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles common model response formats:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Here is the tool call:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<serde_json::Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON object found in response (length={})",
        text.len()
    )))
}

/// Extract JSON from a markdown code block (```json ... ``` or ``` ... ```)
fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                let extracted = text[json_start..json_start + end].trim();
                return Some(extracted.to_string());
            }
        }
    }

    None
}

/// Find the first balanced { ... } in the text.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the supervisor's routing reply.
///
/// Expects `{"action": "collect_market_data" | "analyze_market_data", "request": "..."}`
/// or `{"action": "respond"}`. Anything unparseable, or a request that is not a
/// non-empty string, means respond directly.
pub fn parse_decision(raw: &str) -> Decision {
    let parsed = extract_json(raw)
        .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).map_err(AgentError::from));
    let Ok(value) = parsed else {
        return Decision::RespondDirectly;
    };

    let action = value.get("action").and_then(|a| a.as_str()).unwrap_or("respond");
    let request = value
        .get("request")
        .and_then(|r| r.as_str())
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    match (action, request) {
        ("collect_market_data", Some(request)) => Decision::CallCollector { request },
        ("analyze_market_data", Some(request)) => Decision::CallAnalyst { request },
        ("respond", _) => Decision::RespondDirectly,
        (action, _) => {
            warn!(action, "Unusable supervisor decision, responding directly");
            Decision::RespondDirectly
        }
    }
}

/// Parse the collector's tool selection: `{"tool": "...", "args": {...}}`.
pub fn parse_tool_call(raw: &str) -> Result<ToolCall, AgentError> {
    let json_str = extract_json(raw)?;
    serde_json::from_str(&json_str)
        .map_err(|e| AgentError::Parse(format!("Failed to parse tool call: {e}\nJSON: {json_str}")))
}

/// The analyst's reply: prose plus an optional chart request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalystReply {
    pub analysis: String,
    pub chart: Option<ToolCall>,
}

/// Parse `{"analysis": "...", "chart": null | {"tool": ..., "args": ...}}`.
/// A reply that is not in that shape is taken as plain analysis text.
pub fn parse_analyst_reply(raw: &str) -> AnalystReply {
    let plain = || AnalystReply {
        analysis: raw.trim().to_string(),
        chart: None,
    };

    let Ok(json_str) = extract_json(raw) else {
        return plain();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&json_str) else {
        return plain();
    };
    let Some(analysis) = value.get("analysis").and_then(|a| a.as_str()) else {
        return plain();
    };

    let chart = value
        .get("chart")
        .filter(|c| !c.is_null())
        .and_then(|c| serde_json::from_value(c.clone()).ok());

    AnalystReply {
        analysis: analysis.to_string(),
        chart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_clean_json() {
        let input = r#"{"tool": "get_trending_stocks", "args": {}}"#;
        let result = extract_json(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn extract_from_markdown() {
        let input = "Calling:\n```json\n{\"tool\": \"get_market_news\"}\n```\nDone.";
        let result = extract_json(input).unwrap();
        assert_eq!(result, r#"{"tool": "get_market_news"}"#);
    }

    #[test]
    fn extract_from_markdown_no_lang() {
        let input = "Result:\n```\n{\"action\": \"respond\"}\n```";
        let result = extract_json(input).unwrap();
        assert_eq!(result, r#"{"action": "respond"}"#);
    }

    #[test]
    fn extract_with_escaped_braces_in_strings() {
        let input = r#"{"request": "price of {TCS} today", "action": "collect_market_data"}"#;
        let result = extract_json(input).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["action"], "collect_market_data");
    }

    #[test]
    fn extract_no_json() {
        assert!(extract_json("Hello Alice, how can I help?").is_err());
    }

    #[test]
    fn decisions() {
        assert_eq!(
            parse_decision(r#"{"action": "collect_market_data", "request": "Show trending stocks"}"#),
            Decision::CallCollector {
                request: "Show trending stocks".to_string()
            }
        );
        assert_eq!(
            parse_decision("Sure:\n{\"action\": \"analyze_market_data\", \"request\": \"trend of TCS\"}"),
            Decision::CallAnalyst {
                request: "trend of TCS".to_string()
            }
        );
        assert_eq!(parse_decision(r#"{"action": "respond"}"#), Decision::RespondDirectly);
    }

    #[test]
    fn unusable_decisions_respond_directly() {
        assert_eq!(parse_decision("Hi Alice!"), Decision::RespondDirectly);
        assert_eq!(
            parse_decision(r#"{"action": "collect_market_data", "request": {"type": "trending"}}"#),
            Decision::RespondDirectly
        );
        assert_eq!(
            parse_decision(r#"{"action": "buy_stock", "request": "TCS"}"#),
            Decision::RespondDirectly
        );
    }

    #[test]
    fn tool_call_from_fenced_reply() {
        let call = parse_tool_call("```json\n{\"tool\": \"historical_data\", \"args\": {\"stock_name\": \"TCS\", \"period\": \"1yr\"}}\n```").unwrap();
        assert_eq!(call.tool, "historical_data");
        assert_eq!(call.args["period"], "1yr");

        assert!(parse_tool_call("I would call get_market_news").is_err());
    }

    #[test]
    fn analyst_reply_shapes() {
        let reply = parse_analyst_reply(
            r#"{"analysis": "Sideways trend.", "chart": {"tool": "plot_volume_chart", "args": {"data": []}}}"#,
        );
        assert_eq!(reply.analysis, "Sideways trend.");
        assert_eq!(reply.chart.unwrap().tool, "plot_volume_chart");

        let plain = parse_analyst_reply("  Data is insufficient.  ");
        assert_eq!(plain.analysis, "Data is insufficient.");
        assert!(plain.chart.is_none());

        let no_chart = parse_analyst_reply(r#"{"analysis": "Bullish.", "chart": null}"#);
        assert!(no_chart.chart.is_none());
    }
}

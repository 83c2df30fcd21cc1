//! Chart tools for the analyst.
//!
//! Nothing is drawn here. Each tool validates its rows and returns a
//! renderer-neutral [`ChartSpec`] the front-end can plot however it likes.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

pub const DEFAULT_SHORT_WINDOW: usize = 20;
pub const DEFAULT_LONG_WINDOW: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Line {
        title: String,
        x_label: String,
        y_label: String,
        series: Vec<Series>,
    },
    Bar {
        title: String,
        x_label: String,
        y_label: String,
        points: Vec<Point>,
    },
    Candlestick {
        title: String,
        candles: Vec<Candle>,
    },
    Pie {
        title: String,
        slices: Vec<Slice>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<Point>,
}

/// `value` is `None` where a rolling window is not yet full.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub percent: f64,
}

pub fn price_trend(data: &Value) -> Result<ChartSpec, ToolError> {
    let points = rows(data)?
        .iter()
        .map(|row| dated_value(row, "close"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChartSpec::Line {
        title: "Stock Price Trend".to_string(),
        x_label: "Date".to_string(),
        y_label: "Closing Price".to_string(),
        series: vec![Series {
            label: "Close".to_string(),
            points,
        }],
    })
}

pub fn volume_chart(data: &Value) -> Result<ChartSpec, ToolError> {
    let points = rows(data)?
        .iter()
        .map(|row| dated_value(row, "volume"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChartSpec::Bar {
        title: "Trading Volume".to_string(),
        x_label: "Date".to_string(),
        y_label: "Volume".to_string(),
        points,
    })
}

pub fn moving_averages(
    data: &Value,
    short_window: usize,
    long_window: usize,
) -> Result<ChartSpec, ToolError> {
    if short_window == 0 || long_window == 0 {
        return Err(ToolError::value("Moving average windows must be at least 1"));
    }

    let rows = rows(data)?;
    let mut dates = Vec::with_capacity(rows.len());
    let mut closes = Vec::with_capacity(rows.len());
    for row in rows {
        dates.push(date_field(row)?);
        closes.push(number_field(row, "close")?);
    }

    let close = dates
        .iter()
        .zip(&closes)
        .map(|(date, c)| Point {
            date: *date,
            value: Some(*c),
        })
        .collect();

    let averaged = |window: usize| -> Vec<Point> {
        dates
            .iter()
            .zip(simple_moving_average(&closes, window))
            .map(|(date, value)| Point { date: *date, value })
            .collect()
    };

    Ok(ChartSpec::Line {
        title: "Moving Averages".to_string(),
        x_label: "Date".to_string(),
        y_label: "Price".to_string(),
        series: vec![
            Series {
                label: "Close Price".to_string(),
                points: close,
            },
            Series {
                label: format!("SMA {short_window}"),
                points: averaged(short_window),
            },
            Series {
                label: format!("SMA {long_window}"),
                points: averaged(long_window),
            },
        ],
    })
}

pub fn candlestick(data: &Value) -> Result<ChartSpec, ToolError> {
    let candles = rows(data)?
        .iter()
        .map(|row| {
            let candle = Candle {
                date: date_field(row)?,
                open: number_field(row, "open")?,
                high: number_field(row, "high")?,
                low: number_field(row, "low")?,
                close: number_field(row, "close")?,
            };
            if candle.low > candle.open.min(candle.close)
                || candle.high < candle.open.max(candle.close)
            {
                return Err(ToolError::value(format!(
                    "Inconsistent OHLC row for {}: low/high must bound open and close",
                    candle.date
                )));
            }
            Ok(candle)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChartSpec::Candlestick {
        title: "OHLC (Candlestick Style)".to_string(),
        candles,
    })
}

pub fn sector_allocation(data: &Value) -> Result<ChartSpec, ToolError> {
    let weights = data
        .as_object()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ToolError::value("Sector allocation expects a non-empty {sector: weight} object"))?;

    let mut entries = Vec::with_capacity(weights.len());
    for (sector, weight) in weights {
        let value = number(weight)
            .ok_or_else(|| ToolError::value(format!("Weight for '{sector}' is not a number")))?;
        if value < 0.0 {
            return Err(ToolError::value(format!("Weight for '{sector}' is negative")));
        }
        entries.push((sector.clone(), value));
    }

    let total: f64 = entries.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        return Err(ToolError::value("Sector weights sum to zero"));
    }

    let slices = entries
        .into_iter()
        .map(|(label, value)| Slice {
            label,
            value,
            percent: (value / total * 1000.0).round() / 10.0,
        })
        .collect();

    Ok(ChartSpec::Pie {
        title: "Sector Allocation".to_string(),
        slices,
    })
}

/// Trailing simple moving average; the first `window - 1` entries are `None`.
pub fn simple_moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        out.push((i + 1 >= window).then(|| sum / window as f64));
    }
    out
}

fn rows(data: &Value) -> Result<&Vec<Value>, ToolError> {
    data.as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| ToolError::value("Chart data must be a non-empty list of rows"))
}

fn dated_value(row: &Value, field: &str) -> Result<Point, ToolError> {
    Ok(Point {
        date: date_field(row)?,
        value: Some(number_field(row, field)?),
    })
}

fn date_field(row: &Value) -> Result<NaiveDate, ToolError> {
    let raw = row
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::value("Row is missing 'date'"))?;
    parse_date(raw).ok_or_else(|| ToolError::value(format!("Unrecognized date: {raw}")))
}

fn number_field(row: &Value, field: &str) -> Result<f64, ToolError> {
    row.get(field)
        .and_then(number)
        .ok_or_else(|| ToolError::value(format!("Row is missing numeric '{field}'")))
}

/// Numbers, or strings holding one (the provider often quotes prices).
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|d| d.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn sma_leading_gaps() {
        let sma = simple_moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(sma, vec![None, Some(1.5), Some(2.5), Some(3.5)]);

        let long = simple_moving_average(&[1.0, 2.0], 5);
        assert_eq!(long, vec![None, None]);
    }

    #[test]
    fn price_trend_accepts_quoted_numbers_and_timestamps() {
        let data = json!([
            {"date": "2026-01-01", "close": 3500},
            {"date": "2026-01-02T09:15:00", "close": "3,512.5"},
        ]);
        let ChartSpec::Line { series, .. } = price_trend(&data).unwrap() else {
            panic!("expected line chart");
        };
        assert_eq!(series[0].points[1].date, date("2026-01-02"));
        assert_eq!(series[0].points[1].value, Some(3512.5));
    }

    #[test]
    fn missing_field_is_value_error() {
        let err = volume_chart(&json!([{"date": "2026-01-01"}])).unwrap_err();
        assert!(matches!(err, ToolError::Value(_)));

        let err = price_trend(&json!([])).unwrap_err();
        assert!(matches!(err, ToolError::Value(_)));
    }

    #[test]
    fn moving_averages_series() {
        let data = json!([
            {"date": "2026-01-01", "close": 10},
            {"date": "2026-01-02", "close": 20},
            {"date": "2026-01-03", "close": 30},
        ]);
        let ChartSpec::Line { series, .. } = moving_averages(&data, 2, 3).unwrap() else {
            panic!("expected line chart");
        };
        assert_eq!(series.len(), 3);
        assert_eq!(series[1].label, "SMA 2");
        assert_eq!(series[1].points[0].value, None);
        assert_eq!(series[1].points[2].value, Some(25.0));
        assert_eq!(series[2].points[2].value, Some(20.0));

        assert!(moving_averages(&data, 0, 3).is_err());
    }

    #[test]
    fn candle_bounds_checked() {
        let ok = json!([{"date": "2026-01-01", "open": 10, "high": 12, "low": 9, "close": 11}]);
        assert!(candlestick(&ok).is_ok());

        let bad = json!([{"date": "2026-01-01", "open": 10, "high": 10.5, "low": 9, "close": 11}]);
        assert!(matches!(candlestick(&bad).unwrap_err(), ToolError::Value(_)));
    }

    #[test]
    fn sector_percentages() {
        let chart = sector_allocation(&json!({"IT": 35, "Banking": 25, "Pharma": 15, "FMCG": 25})).unwrap();
        let ChartSpec::Pie { slices, .. } = chart else {
            panic!("expected pie chart");
        };
        let it = slices.iter().find(|s| s.label == "IT").unwrap();
        assert_eq!(it.percent, 35.0);

        assert!(sector_allocation(&json!({"IT": 0})).is_err());
        assert!(sector_allocation(&json!({"IT": -1, "Banking": 5})).is_err());
    }

    #[test]
    fn chart_spec_is_tagged() {
        let chart = volume_chart(&json!([{"date": "2026-01-01", "volume": 100}])).unwrap();
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["kind"], "bar");
        assert_eq!(json["points"][0]["date"], "2026-01-01");
    }
}

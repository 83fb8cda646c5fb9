use crate::config::Settings;
use crate::quotes::frame::{ColumnKey, QuoteFrame};
use crate::quotes::provider::QuoteProvider;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
// Yahoo rejects requests without a browser-looking user agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const FIELDS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// Yahoo v8 chart API response, reduced to what frame assembly needs.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartOuter,
}

#[derive(Debug, Deserialize)]
struct ChartOuter {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: i32,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

/// One symbol's bars, timestamps already shifted into the exchange offset.
#[derive(Debug)]
struct SymbolBars {
    timestamps: Vec<DateTime<FixedOffset>>,
    fields: Vec<(&'static str, Vec<Option<f64>>)>,
}

/// Quote provider backed by the Yahoo-style v8 chart API. One HTTP request
/// per symbol, no retries; a failed symbol contributes no columns.
#[derive(Debug, Clone)]
pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.quote_api_base_url.clone())
    }

    pub fn new(base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build chart API http client")?;
        Ok(Self { http, base_url })
    }

    fn chart_url(&self, symbol: &str, days: u32) -> String {
        format!(
            "{}/v8/finance/chart/{symbol}?range={days}d&interval=1m&includePrePost=true",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn fetch_symbol(&self, symbol: &str, days: u32) -> Result<SymbolBars> {
        let url = self.chart_url(symbol, days);

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("chart API request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read chart API response")?;
        anyhow::ensure!(status.is_success(), "chart API HTTP {status}: {text}");

        let parsed: ChartResponse = serde_json::from_str(&text)
            .with_context(|| format!("chart response for {symbol} is not valid JSON"))?;
        parse_chart(parsed)
    }
}

#[async_trait::async_trait]
impl QuoteProvider for YahooChartClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_intraday_1m(&self, symbols: &[String], days: u32) -> Result<QuoteFrame> {
        let mut fetched: Vec<(String, SymbolBars)> = Vec::new();
        for symbol in symbols {
            match self.fetch_symbol(symbol, days).await {
                Ok(bars) => fetched.push((symbol.clone(), bars)),
                Err(err) => {
                    tracing::warn!(
                        symbol = %symbol,
                        error = %err,
                        "chart fetch failed; symbol contributes no columns"
                    );
                }
            }
        }
        assemble_frame(symbols.len(), fetched)
    }
}

fn parse_chart(resp: ChartResponse) -> Result<SymbolBars> {
    if let Some(err) = resp.chart.error {
        anyhow::bail!("chart API error {}: {}", err.code, err.description);
    }
    let result = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .context("chart result is empty")?;

    let offset = FixedOffset::east_opt(result.meta.gmtoffset)
        .with_context(|| format!("chart meta gmtoffset {} is out of range", result.meta.gmtoffset))?;

    let raw_timestamps = result.timestamp.unwrap_or_default();
    let mut timestamps = Vec::with_capacity(raw_timestamps.len());
    for ts in raw_timestamps {
        let dt = DateTime::from_timestamp(ts, 0)
            .with_context(|| format!("invalid chart timestamp: {ts}"))?;
        timestamps.push(dt.with_timezone(&offset));
    }

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let n = timestamps.len();
    let fields = vec![
        ("Open", fit(quote.open, n)),
        ("High", fit(quote.high, n)),
        ("Low", fit(quote.low, n)),
        ("Close", fit(quote.close, n)),
        ("Volume", fit(quote.volume, n)),
    ];

    Ok(SymbolBars { timestamps, fields })
}

/// Pads or clips a field column to the timestamp count.
fn fit(cells: Option<Vec<Option<f64>>>, n: usize) -> Vec<Option<f64>> {
    let mut cells = cells.unwrap_or_default();
    cells.resize(n, None);
    cells
}

/// Builds the download frame the way the upstream helper lays it out: flat
/// field columns when exactly one symbol was requested, `[symbol, field]`
/// columns over the union of all timestamps otherwise.
fn assemble_frame(requested: usize, fetched: Vec<(String, SymbolBars)>) -> Result<QuoteFrame> {
    if requested == 1 {
        let Some((_, bars)) = fetched.into_iter().next() else {
            return Ok(QuoteFrame::empty());
        };
        let mut columns = Vec::with_capacity(bars.fields.len());
        for (name, cells) in bars.fields {
            columns.push((ColumnKey::new([name])?, cells));
        }
        return QuoteFrame::new(bars.timestamps, columns);
    }

    let mut index: Vec<DateTime<FixedOffset>> = fetched
        .iter()
        .flat_map(|(_, bars)| bars.timestamps.iter().copied())
        .collect();
    index.sort();
    index.dedup();

    let positions: BTreeMap<DateTime<FixedOffset>, usize> =
        index.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();

    let mut columns = Vec::new();
    for (symbol, bars) in fetched {
        let SymbolBars { timestamps, fields } = bars;
        for (name, cells) in fields {
            let mut column = vec![None; index.len()];
            for (ts, cell) in timestamps.iter().zip(cells) {
                if let Some(&i) = positions.get(ts) {
                    column[i] = cell;
                }
            }
            columns.push((ColumnKey::new([symbol.as_str(), name])?, column));
        }
    }

    QuoteFrame::new(index, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::frame::ResponseShape;
    use serde_json::json;

    // 2024-03-12 09:30 EST, one bar per minute.
    const T0: i64 = 1_710_253_800;
    const EST: i32 = -5 * 3600;

    fn chart_body(timestamps: &[i64], close: &[Option<f64>]) -> ChartResponse {
        let v = json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": EST},
                    "timestamp": timestamps,
                    "indicators": {"quote": [{
                        "open": close,
                        "high": close,
                        "low": close,
                        "close": close,
                        "volume": close,
                    }]}
                }],
                "error": null
            }
        });
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn parses_bars_in_the_exchange_offset() {
        let resp = chart_body(&[T0, T0 + 60], &[Some(410.0), Some(410.5)]);
        let bars = parse_chart(resp).unwrap();

        assert_eq!(bars.timestamps.len(), 2);
        assert_eq!(bars.timestamps[0].offset().local_minus_utc(), EST);
        assert_eq!(
            bars.timestamps[0].to_rfc3339(),
            "2024-03-12T09:30:00-05:00"
        );
        assert_eq!(bars.fields.len(), 5);
        let (name, close) = &bars.fields[3];
        assert_eq!(*name, "Close");
        assert_eq!(close, &vec![Some(410.0), Some(410.5)]);
    }

    #[test]
    fn chart_error_fails_the_symbol() {
        let resp: ChartResponse = serde_json::from_value(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        }))
        .unwrap();

        let err = parse_chart(resp).unwrap_err();
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn missing_field_block_pads_with_nulls() {
        let resp: ChartResponse = serde_json::from_value(json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": EST},
                    "timestamp": [T0, T0 + 60],
                    "indicators": {"quote": [{
                        "close": [Some(410.0), Some(410.5)],
                    }]}
                }],
                "error": null
            }
        }))
        .unwrap();

        let bars = parse_chart(resp).unwrap();
        let (_, open) = &bars.fields[0];
        assert_eq!(open, &vec![None, None]);
        let (_, close) = &bars.fields[3];
        assert_eq!(close, &vec![Some(410.0), Some(410.5)]);
    }

    #[test]
    fn single_symbol_assembles_flat_columns() {
        let bars = parse_chart(chart_body(&[T0], &[Some(410.0)])).unwrap();
        let frame = assemble_frame(1, vec![("MSFT".to_string(), bars)]).unwrap();

        assert_eq!(frame.shape(), ResponseShape::FlatSingle);
        assert!(frame.column(&["Close"]).is_some());
        assert!(frame.column(&["MSFT", "Close"]).is_none());
    }

    #[test]
    fn multi_symbol_assembles_hierarchical_union() {
        // AAPL misses the second minute; its cell is padded to null.
        let msft = parse_chart(chart_body(&[T0, T0 + 60], &[Some(410.0), Some(410.5)])).unwrap();
        let aapl = parse_chart(chart_body(&[T0], &[Some(231.0)])).unwrap();
        let frame = assemble_frame(
            2,
            vec![("MSFT".to_string(), msft), ("AAPL".to_string(), aapl)],
        )
        .unwrap();

        assert_eq!(frame.shape(), ResponseShape::HierarchicalMulti);
        assert_eq!(frame.index().len(), 2);
        assert_eq!(
            frame.column(&["MSFT", "Close"]),
            Some(&[Some(410.0), Some(410.5)][..])
        );
        assert_eq!(
            frame.column(&["AAPL", "Close"]),
            Some(&[Some(231.0), None][..])
        );
    }

    #[test]
    fn all_symbols_failed_is_an_empty_frame() {
        let frame = assemble_frame(1, Vec::new()).unwrap();
        assert_eq!(frame.shape(), ResponseShape::Empty);
    }

    #[test]
    fn chart_url_shape() {
        let client = YahooChartClient::new("https://query2.finance.yahoo.com/".to_string()).unwrap();
        assert_eq!(
            client.chart_url("MSFT", 2),
            "https://query2.finance.yahoo.com/v8/finance/chart/MSFT?range=2d&interval=1m&includePrePost=true"
        );
    }
}

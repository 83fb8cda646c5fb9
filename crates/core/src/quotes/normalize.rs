use crate::quotes::frame::{QuoteFrame, ResponseShape};
use crate::quotes::series::{PricePoint, PriceSeries};
use std::collections::BTreeMap;
use std::fmt;

const CLOSE_FIELD: &str = "Close";

/// Why one symbol's series could not be extracted from a frame. Callers map
/// any variant to an empty series; extraction never aborts a batch.
#[derive(Debug, Clone)]
pub struct ExtractError {
    pub symbol: String,
    pub detail: String,
}

impl ExtractError {
    fn new(symbol: &str, detail: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot extract close series for '{}': {}",
            self.symbol, self.detail
        )
    }
}

impl std::error::Error for ExtractError {}

/// Extracts a clean close series per requested symbol, whatever the frame's
/// column layout.
///
/// The shape is classified once, then each symbol goes through the matching
/// extraction path. Every requested symbol gets an entry in the output; a
/// symbol whose extraction fails degrades to an empty series and is logged,
/// leaving the rest of the batch untouched. Never fails.
pub fn normalize(frame: &QuoteFrame, symbols: &[String]) -> BTreeMap<String, PriceSeries> {
    let shape = frame.shape();

    let mut out = BTreeMap::new();
    for symbol in symbols {
        let series = match extract_series(frame, shape, symbol, symbols.len()) {
            Ok(series) => series,
            Err(err) => {
                tracing::warn!(
                    symbol = %symbol,
                    shape = ?shape,
                    error = %err,
                    "close-series extraction failed; degrading to empty series"
                );
                Vec::new()
            }
        };
        out.insert(symbol.clone(), series);
    }
    out
}

fn extract_series(
    frame: &QuoteFrame,
    shape: ResponseShape,
    symbol: &str,
    requested: usize,
) -> Result<PriceSeries, ExtractError> {
    match shape {
        ResponseShape::Empty => Ok(Vec::new()),
        ResponseShape::HierarchicalMulti => extract_hierarchical(frame, symbol),
        ResponseShape::FlatSingle => extract_flat(frame, symbol, requested),
    }
}

/// Hierarchical lookup: the exact `[symbol, "Close"]` column first, then any
/// column grouped under `symbol` whose innermost field is `"Close"`.
/// Matching is case-sensitive against the caller's spelling.
fn extract_hierarchical(frame: &QuoteFrame, symbol: &str) -> Result<PriceSeries, ExtractError> {
    if let Some(cells) = frame.column(&[symbol, CLOSE_FIELD]) {
        return Ok(collect_points(frame, cells));
    }

    let nested = frame
        .columns()
        .find(|(key, _)| key.depth() >= 2 && key.group() == symbol && key.field() == CLOSE_FIELD);
    match nested {
        Some((_, cells)) => Ok(collect_points(frame, cells)),
        None => Err(ExtractError::new(
            symbol,
            "no Close column under this symbol",
        )),
    }
}

/// Flat lookup: the plain `["Close"]` column. Only valid when the caller
/// requested exactly one symbol; a flat frame cannot be attributed to any
/// symbol of a multi-symbol request.
fn extract_flat(
    frame: &QuoteFrame,
    symbol: &str,
    requested: usize,
) -> Result<PriceSeries, ExtractError> {
    if requested != 1 {
        return Err(ExtractError::new(
            symbol,
            format!("flat columns cannot serve a {requested}-symbol request"),
        ));
    }
    match frame.column(&[CLOSE_FIELD]) {
        Some(cells) => Ok(collect_points(frame, cells)),
        None => Err(ExtractError::new(symbol, "no Close column")),
    }
}

/// Pairs cells with the frame index, dropping nulls. No interpolation, no
/// zero-filling.
fn collect_points(frame: &QuoteFrame, cells: &[Option<f64>]) -> PriceSeries {
    frame
        .index()
        .iter()
        .zip(cells)
        .filter_map(|(ts, cell)| {
            cell.map(|close| PricePoint {
                timestamp: *ts,
                close,
            })
        })
        .collect()
}

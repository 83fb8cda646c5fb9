//! Live intraday quotes: provider boundary, download-result frame, shape
//! normalization, and the last-day filter.

pub mod frame;
pub mod normalize;
pub mod provider;
pub mod series;
pub mod yahoo;

pub use frame::{ColumnKey, QuoteFrame, ResponseShape};
pub use normalize::{normalize, ExtractError};
pub use provider::QuoteProvider;
pub use series::{last_day, PricePoint, PriceSeries};
pub use yahoo::YahooChartClient;

use std::collections::BTreeMap;

/// Fetches 1-minute bars for `symbols` over a `days` lookback and
/// normalizes them into one close series per symbol.
///
/// Total: a provider-level failure degrades to an empty frame (logged, not
/// surfaced), and normalization itself never fails — every requested symbol
/// has an entry in the result, possibly empty.
pub async fn download_1m(
    provider: &dyn QuoteProvider,
    symbols: &[String],
    days: u32,
) -> BTreeMap<String, PriceSeries> {
    let frame = match provider.fetch_intraday_1m(symbols, days).await {
        Ok(frame) => frame,
        Err(err) => {
            tracing::warn!(
                provider = provider.provider_name(),
                error = %err,
                "intraday fetch failed; degrading to empty frame"
            );
            QuoteFrame::empty()
        }
    };
    normalize(&frame, symbols)
}

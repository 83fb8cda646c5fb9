use crate::quotes::frame::QuoteFrame;
use anyhow::Result;

/// Seam to the upstream quote feed. Implementations fetch 1-minute bars
/// (pre/post-market included) over a `days` lookback and hand back a
/// [`QuoteFrame`] whose column layout follows the symbol count: flat field
/// columns for one symbol, `[symbol, field]` columns for several.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_intraday_1m(&self, symbols: &[String], days: u32) -> Result<QuoteFrame>;
}

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Upper bound the API enforces on `page_size`.
pub const MAX_PAGE_SIZE: usize = 100;

/// One news row, keyed by the column names of the archive file. Columns are
/// whatever the file declares; this service does not impose a schema.
pub type NewsRecord = BTreeMap<String, String>;

/// A pagination window over one ticker's news archive.
///
/// `items` is the contiguous slice of the file's rows at offset
/// `(page - 1) * page_size`, clipped to the available rows. Out-of-range
/// pages are valid and yield empty `items` with the metadata intact.
#[derive(Debug, Clone, Serialize)]
pub struct NewsPage {
    pub ticker: String,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<NewsRecord>,
}

#[derive(Debug)]
pub enum NewsError {
    /// No archive file exists for the normalized ticker. The only condition
    /// the API reports as 404; everything else is a server error.
    NotFound { ticker: String },
    Csv { path: PathBuf, source: csv::Error },
}

impl fmt::Display for NewsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsError::NotFound { ticker } => {
                write!(f, "No news file found for ticker '{ticker}'")
            }
            NewsError::Csv { path, source } => {
                write!(f, "failed to read news file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for NewsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NewsError::NotFound { .. } => None,
            NewsError::Csv { source, .. } => Some(source),
        }
    }
}

/// Reads one page of a ticker's news archive.
///
/// The ticker is uppercased and resolved to `{news_dir}/{TICKER}.csv`. The
/// file is parsed with the csv reader's defaults: first row is the header,
/// UTF-8 content, strict field counts — a row whose width differs from the
/// header fails the whole read. Callers guarantee `page >= 1` and
/// `page_size` in `[1, MAX_PAGE_SIZE]`.
pub fn read_news_page(
    news_dir: &Path,
    ticker: &str,
    page: usize,
    page_size: usize,
) -> Result<NewsPage, NewsError> {
    let ticker = ticker.to_uppercase();
    let path = news_dir.join(format!("{ticker}.csv"));

    if !path.exists() {
        return Err(NewsError::NotFound { ticker });
    }

    let csv_err = |source: csv::Error| NewsError::Csv {
        path: path.clone(),
        source,
    };

    let mut reader = csv::Reader::from_path(&path).map_err(&csv_err)?;
    let headers = reader.headers().map_err(&csv_err)?.clone();

    let mut rows: Vec<NewsRecord> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(&csv_err)?;
        rows.push(
            headers
                .iter()
                .map(str::to_string)
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }

    let total = rows.len();
    let start = page.saturating_sub(1).saturating_mul(page_size);
    let items = if start >= total {
        Vec::new()
    } else {
        rows.into_iter().skip(start).take(page_size).collect()
    };

    Ok(NewsPage {
        ticker,
        total,
        page,
        page_size,
        items,
    })
}

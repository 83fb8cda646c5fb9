use anyhow::Result;
use chrono::{DateTime, FixedOffset};

/// Label path addressing one column of a download result.
///
/// One segment for flat single-symbol frames (`["Close"]`), two or more for
/// hierarchical frames where fields are grouped under a symbol
/// (`["MSFT", "Close"]`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ColumnKey(Vec<String>);

impl ColumnKey {
    pub fn new<I, S>(path: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        anyhow::ensure!(!path.is_empty(), "column key path must be non-empty");
        Ok(Self(path))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Top-level label: the symbol for hierarchical keys, the field name for
    /// flat ones.
    pub fn group(&self) -> &str {
        &self.0[0]
    }

    /// Last path segment, the field name under any grouping.
    pub fn field(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn matches(&self, segments: &[&str]) -> bool {
        self.0.len() == segments.len() && self.0.iter().zip(segments).all(|(a, b)| a == b)
    }
}

/// How a download result lays out its columns. Classified once per frame;
/// extraction dispatches on the variant instead of re-probing per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Columns are (symbol, field) paths — several symbols in one result.
    HierarchicalMulti,
    /// Columns are plain field names — a single-symbol result.
    FlatSingle,
    /// The download failed or returned nothing.
    Empty,
}

/// Tabular quote-download result at the provider boundary: a shared
/// ascending timestamp index plus one cell column per [`ColumnKey`].
/// Missing observations are `None` cells.
#[derive(Debug, Clone)]
pub struct QuoteFrame {
    index: Vec<DateTime<FixedOffset>>,
    columns: Vec<(ColumnKey, Vec<Option<f64>>)>,
}

impl QuoteFrame {
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn new(
        index: Vec<DateTime<FixedOffset>>,
        columns: Vec<(ColumnKey, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        for window in index.windows(2) {
            anyhow::ensure!(
                window[0] <= window[1],
                "frame index must be ascending: {} follows {}",
                window[1],
                window[0]
            );
        }
        for (key, cells) in &columns {
            anyhow::ensure!(
                cells.len() == index.len(),
                "column {:?} has {} cells for an index of {}",
                key.segments(),
                cells.len(),
                index.len()
            );
        }
        Ok(Self { index, columns })
    }

    pub fn shape(&self) -> ResponseShape {
        if self.index.is_empty() || self.columns.is_empty() {
            ResponseShape::Empty
        } else if self.columns.iter().any(|(key, _)| key.depth() >= 2) {
            ResponseShape::HierarchicalMulti
        } else {
            ResponseShape::FlatSingle
        }
    }

    pub fn index(&self) -> &[DateTime<FixedOffset>] {
        &self.index
    }

    /// Cells of the column at exactly `segments`, if present.
    pub fn column(&self, segments: &[&str]) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(key, _)| key.matches(segments))
            .map(|(_, cells)| cells.as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&ColumnKey, &[Option<f64>])> {
        self.columns
            .iter()
            .map(|(key, cells)| (key, cells.as_slice()))
    }
}

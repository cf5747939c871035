//! Row sources for imports

use std::fmt;
use std::iter::Peekable;

use crate::models::{CellValue, RawTable};

type RowIter = Box<dyn Iterator<Item = Vec<CellValue>> + Send>;

/// A finite, single-pass stream of rows under a header
///
/// The rows are pulled lazily, so a source can wrap a reader over a file far
/// larger than memory.
pub struct RowSource {
    columns: Vec<String>,
    rows: Peekable<RowIter>,
    /// Exact row count when known up front
    len: Option<u64>,
}

impl RowSource {
    pub fn new<I>(columns: Vec<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<CellValue>>,
        I::IntoIter: Send + 'static,
    {
        let rows: RowIter = Box::new(rows.into_iter());
        let (lower, upper) = rows.size_hint();
        let len = (Some(lower) == upper).then_some(lower as u64);
        Self {
            columns,
            rows: rows.peekable(),
            len,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row count when the source knows it in advance
    pub fn len_hint(&self) -> Option<u64> {
        self.len
    }

    /// Whether at least one row remains
    pub fn has_rows(&mut self) -> bool {
        self.rows.peek().is_some()
    }

    /// Pull up to `n` rows
    pub fn take_rows(&mut self, n: usize) -> Vec<Vec<CellValue>> {
        self.rows.by_ref().take(n).collect()
    }
}

impl From<RawTable> for RowSource {
    fn from(table: RawTable) -> Self {
        RowSource::new(table.columns, table.rows)
    }
}

impl fmt::Debug for RowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSource")
            .field("columns", &self.columns)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_hint_for_vec() {
        let source = RowSource::from(RawTable::new(
            vec!["a".into()],
            vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)]],
        ));
        assert_eq!(source.len_hint(), Some(2));
    }

    #[test]
    fn test_lazy_source_is_single_pass() {
        let mut source = RowSource::new(
            vec!["n".into()],
            (0..5).filter(|n| n % 2 == 0).map(|n| vec![CellValue::Int(n)]),
        );
        assert_eq!(source.len_hint(), None);
        assert!(source.has_rows());
        assert_eq!(source.take_rows(2).len(), 2);
        assert_eq!(source.take_rows(10).len(), 1);
        assert!(!source.has_rows());
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scout_core::ResultRow;

/// Append-only row sequence shared by the coordinator task (writer) and the reporter (reader).
#[derive(Debug, Clone, Default)]
pub struct ResultBuffer {
    rows: Arc<Mutex<Vec<ResultRow>>>,
}

impl ResultBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<ResultRow> {
        self.lock().clone()
    }

    /// Rows at index `seen` and later, in append order.
    pub fn rows_since(&self, seen: usize) -> Vec<ResultRow> {
        let rows = self.lock();
        rows.get(seen..).map(<[ResultRow]>::to_vec).unwrap_or_default()
    }

    /// Returns the new length.
    pub(crate) fn push(&self, row: ResultRow) -> usize {
        let mut rows = self.lock();
        rows.push(row);
        rows.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ResultRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::ExperienceLevel;

    fn row(title: &str) -> ResultRow {
        ResultRow {
            search_keyword: "k".into(),
            title: title.into(),
            company: String::new(),
            link: String::new(),
            location: String::new(),
            description: String::new(),
            date: String::new(),
            experience_level: ExperienceLevel::Associate,
        }
    }

    #[test]
    fn rows_since_returns_tail() {
        let buffer = ResultBuffer::new();
        assert!(buffer.is_empty());
        buffer.push(row("a"));
        buffer.push(row("b"));
        assert_eq!(buffer.push(row("c")), 3);

        let tail: Vec<_> = buffer.rows_since(1).into_iter().map(|r| r.title).collect();
        assert_eq!(tail, vec!["b", "c"]);
        assert!(buffer.rows_since(3).is_empty());
        assert!(buffer.rows_since(10).is_empty());
    }
}

//! Error types for weekdeck-core

/// Failure to parse a raw gateway row into a typed record
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    /// Row shape did not match the collection's contract
    #[error("malformed {table} row: {source}")]
    Malformed {
        /// Collection the row came from
        table: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
}

impl RowError {
    /// Wrap a decode error with the collection it came from
    #[inline]
    #[must_use]
    pub fn malformed(table: &'static str, source: serde_json::Error) -> Self {
        Self::Malformed { table, source }
    }

    /// Collection the offending row came from
    #[inline]
    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            Self::Malformed { table, .. } => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_error_display() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = RowError::malformed("weeks", source);
        assert!(err.to_string().contains("malformed weeks row"));
        assert_eq!(err.table(), "weeks");
    }
}

// Error Taxonomy - What can go wrong, and how little of it propagates
//
// Almost everything in this crate recovers locally: missing data becomes a
// zero or an empty counter, unknown standard versions fall back to 1.01.
// Only a record that is not a usable tree at all aborts that one record's
// evaluation. Nothing ever aborts the corpus.

use thiserror::Error;

// ============================================================================
// EVALUATION ERRORS
// ============================================================================

/// The single fatal per-record error. The aggregator counts these and keeps
/// folding the remaining records.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The record's root element is not a reporting unit we recognise.
    #[error("malformed record: root element <{0}> is not a reporting unit")]
    MalformedRecord(String),
}

/// Recoverable per-field anomalies. These are never raised; they are logged
/// at low severity and surface only as data (fallback values, counters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// Absent value element, unparsable numeric text, absent date.
    MissingData,
    /// Declared standard version not in the Version codelist.
    UnsupportedVersion,
    /// A statistic could not evaluate this record meaningfully; it yields
    /// its shape identity instead.
    StructuralAnomaly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_message() {
        let err = EvalError::MalformedRecord("garbage".to_string());
        assert!(err.to_string().contains("<garbage>"));
    }
}

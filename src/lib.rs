// IATI Stats - Core Library
// Statistic computation and hierarchical aggregation over aid-activity records

pub mod record;
pub mod codes;
pub mod dates;
pub mod error;
pub mod reference;         // Read-only lookup tables: codelists, prefixes, languages
pub mod currency;          // Historical USD normalization
pub mod stat;              // Result shapes and the merge rule
pub mod registry;          // Statistic declarations as data
pub mod evaluate;          // Per-record leaf evaluation
pub mod comprehensiveness; // Currentness classification and criterion battery
pub mod humanitarian;      // Humanitarian flags and the veto rule
pub mod aggregate;         // record -> file -> publisher -> corpus folding

// Re-export commonly used types
pub use record::{Element, Record, RecordKind};
pub use codes::MajorVersion;
pub use error::{Anomaly, EvalError};
pub use reference::{ReferenceSpend, ReferenceTables};
pub use currency::{CurrencyConverter, ExchangeRateTable};
pub use stat::{fold, Counter1, Counter2, Counter3, Shape, StatResult};
pub use registry::{AggregationMode, Applies, Level, Registry, StatisticDef};
pub use evaluate::{Evaluator, LeafContext, RecordStats, SchemaOracle};
pub use comprehensiveness::{Criterion, CurrentReason, CRITERIA};
pub use humanitarian::HumanitarianFacts;
pub use aggregate::{Aggregate, CorpusBuilder, CorpusReport, GroupKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

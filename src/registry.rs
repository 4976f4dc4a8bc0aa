// Statistic Registry - Declarations as data
//
// Every statistic is declared once: name, result shape, aggregation mode,
// the hierarchy level that produces it, which record kinds it applies to,
// and (for record-level statistics) the pure leaf function. Evaluation and
// aggregation dispatch by iterating this table; nothing is discovered at
// runtime.

use crate::evaluate::{self as ev, LeafContext};
use crate::stat::{Shape, StatResult};

// ============================================================================
// DECLARATION
// ============================================================================

/// How group values are produced from the level below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// Folded upward with the shape's merge rule.
    Summed,
    /// Never folded; recomputed at its level from already-merged values.
    Derived,
}

/// The hierarchy level that produces a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Record,
    File,
    Publisher,
    Corpus,
}

/// Which record kinds a record-level statistic applies to. Non-applicable
/// records yield the shape identity, keeping shapes uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applies {
    Both,
    ActivityOnly,
    OrganisationOnly,
}

impl Applies {
    pub fn matches(self, kind: crate::record::RecordKind) -> bool {
        match self {
            Applies::Both => true,
            Applies::ActivityOnly => kind == crate::record::RecordKind::Activity,
            Applies::OrganisationOnly => kind == crate::record::RecordKind::Organisation,
        }
    }
}

pub type LeafFn = fn(&LeafContext) -> StatResult;

pub struct StatisticDef {
    pub name: &'static str,
    pub shape: Shape,
    pub mode: AggregationMode,
    pub level: Level,
    pub applies: Applies,
    pub func: Option<LeafFn>,
}

// ============================================================================
// THE TABLE
// ============================================================================

use AggregationMode::{Derived, Summed};
use Applies::{ActivityOnly, Both, OrganisationOnly};
use Level::{Corpus, File, Publisher, Record};
use Shape::{Counter1, Counter2, Counter3, Number};

macro_rules! stat {
    ($name:literal, $shape:ident, $mode:ident, $level:ident, $applies:ident, $func:expr) => {
        StatisticDef {
            name: $name,
            shape: $shape,
            mode: $mode,
            level: $level,
            applies: $applies,
            func: $func,
        }
    };
}

static DEFS: &[StatisticDef] = &[
    // Record level, both kinds.
    stat!("activities", Number, Summed, Record, ActivityOnly, Some(ev::s_activities)),
    stat!("organisations", Number, Summed, Record, OrganisationOnly, Some(ev::s_organisations)),
    stat!("iati_identifiers", Counter1, Summed, Record, Both, Some(ev::s_iati_identifiers)),
    stat!("reporting_orgs", Counter1, Summed, Record, Both, Some(ev::s_reporting_orgs)),
    stat!("participating_orgs", Counter1, Summed, Record, Both, Some(ev::s_participating_orgs)),
    stat!("versions", Counter1, Summed, Record, Both, Some(ev::s_versions)),
    stat!("version_mismatch", Counter1, Summed, Record, Both, Some(ev::s_version_mismatch)),
    stat!("validation", Counter1, Summed, Record, Both, Some(ev::s_validation)),
    stat!("elements", Counter1, Summed, Record, Both, Some(ev::s_elements)),
    stat!("elements_total", Counter1, Summed, Record, Both, Some(ev::s_elements_total)),
    stat!("boolean_values", Counter2, Summed, Record, Both, Some(ev::s_boolean_values)),
    // Record level, activities only.
    stat!("hierarchies", Counter1, Summed, Record, ActivityOnly, Some(ev::s_hierarchies)),
    stat!("currencies", Counter1, Summed, Record, ActivityOnly, Some(ev::s_currencies)),
    stat!("activities_per_year", Counter1, Summed, Record, ActivityOnly, Some(ev::s_activities_per_year)),
    stat!("transaction_timing", Counter1, Summed, Record, ActivityOnly, Some(ev::s_transaction_timing)),
    stat!("transaction_months", Counter1, Summed, Record, ActivityOnly, Some(ev::s_transaction_months)),
    stat!("transaction_months_with_year", Counter1, Summed, Record, ActivityOnly, Some(ev::s_transaction_months_with_year)),
    stat!("transaction_dates", Counter2, Summed, Record, ActivityOnly, Some(ev::s_transaction_dates)),
    stat!("activity_dates", Counter2, Summed, Record, ActivityOnly, Some(ev::s_activity_dates)),
    stat!("count_transactions_by_type_by_year", Counter2, Summed, Record, ActivityOnly, Some(ev::s_count_transactions_by_type_by_year)),
    stat!("sum_transactions_by_type_by_year", Counter3, Summed, Record, ActivityOnly, Some(ev::s_sum_transactions_by_type_by_year)),
    stat!("sum_transactions_by_type_by_year_usd", Counter3, Summed, Record, ActivityOnly, Some(ev::s_sum_transactions_by_type_by_year_usd)),
    stat!("spend_currency_year", Counter2, Summed, Record, ActivityOnly, Some(ev::s_spend_currency_year)),
    stat!("forwardlooking_currency_year", Counter2, Summed, Record, ActivityOnly, Some(ev::s_forwardlooking_currency_year)),
    stat!("count_budgets_by_type_by_year", Counter2, Summed, Record, ActivityOnly, Some(ev::s_count_budgets_by_type_by_year)),
    stat!("sum_budgets_by_type_by_year", Counter3, Summed, Record, ActivityOnly, Some(ev::s_sum_budgets_by_type_by_year)),
    stat!("sum_budgets_by_type_by_year_usd", Counter3, Summed, Record, ActivityOnly, Some(ev::s_sum_budgets_by_type_by_year_usd)),
    stat!("count_planned_disbursements_by_year", Counter1, Summed, Record, ActivityOnly, Some(ev::s_count_planned_disbursements_by_year)),
    stat!("sum_planned_disbursements_by_year", Counter2, Summed, Record, ActivityOnly, Some(ev::s_sum_planned_disbursements_by_year)),
    stat!("budget_lengths", Counter1, Summed, Record, ActivityOnly, Some(ev::s_budget_lengths)),
    stat!("provider_activity_id", Counter1, Summed, Record, ActivityOnly, Some(ev::s_provider_activity_id)),
    stat!("sum_commitments_and_disbursements_by_activity_id_usd", Counter1, Summed, Record, ActivityOnly, Some(ev::s_sum_commitments_and_disbursements_by_activity_id_usd)),
    stat!("activities_with_future_transactions", Number, Summed, Record, ActivityOnly, Some(ev::s_activities_with_future_transactions)),
    stat!("transaction_total", Number, Summed, Record, ActivityOnly, Some(ev::s_transaction_total)),
    stat!("activities_secondary_reported", Counter1, Summed, Record, ActivityOnly, Some(ev::s_activities_secondary_reported)),
    stat!("humanitarian", Counter1, Summed, Record, ActivityOnly, Some(ev::s_humanitarian)),
    stat!("comprehensiveness", Counter1, Summed, Record, ActivityOnly, Some(ev::s_comprehensiveness)),
    stat!("comprehensiveness_with_validation", Counter1, Summed, Record, ActivityOnly, Some(ev::s_comprehensiveness_with_validation)),
    stat!("comprehensiveness_denominators", Counter1, Summed, Record, ActivityOnly, Some(ev::s_comprehensiveness_denominators)),
    stat!("comprehensiveness_denominator_default", Number, Summed, Record, ActivityOnly, Some(ev::s_comprehensiveness_denominator_default)),
    // File level, injected by the aggregator.
    stat!("activity_files", Number, Summed, File, Both, None),
    stat!("organisation_files", Number, Summed, File, Both, None),
    // Publisher level, computed from the merged publisher aggregate.
    stat!("publishers", Number, Summed, Publisher, Both, None),
    stat!("publishers_per_version", Counter1, Summed, Publisher, Both, None),
    stat!("publishers_validation", Counter1, Summed, Publisher, Both, None),
    stat!("publisher_has_org_file", Counter1, Summed, Publisher, Both, None),
    stat!("publisher_unique_identifiers", Number, Summed, Publisher, Both, None),
    stat!("publisher_duplicate_identifiers", Counter1, Summed, Publisher, Both, None),
    stat!("provider_activity_id_without_own", Counter1, Summed, Publisher, Both, None),
    stat!("iati_identifiers_by_publisher", Counter2, Summed, Publisher, Both, None),
    stat!("sum_commitments_and_disbursements_by_activity_id_by_publisher_id_usd", Counter2, Summed, Publisher, Both, None),
    stat!("transaction_frequency", Counter1, Derived, Publisher, Both, None),
    stat!("timelag", Counter1, Derived, Publisher, Both, None),
    stat!("transaction_alignment", Counter1, Derived, Publisher, Both, None),
    stat!("budget_length_median", Number, Derived, Publisher, Both, None),
    stat!("budget_alignment", Counter1, Derived, Publisher, Both, None),
    stat!("most_recent_transaction_date", Counter1, Derived, Publisher, Both, None),
    stat!("reference_spend_usd", Counter2, Derived, Publisher, Both, None),
    // Corpus level.
    stat!("unique_identifiers", Number, Derived, Corpus, Both, None),
    stat!("duplicate_identifiers", Counter1, Derived, Corpus, Both, None),
    stat!("traceable_activities_by_publisher_id", Counter1, Derived, Corpus, Both, None),
    stat!("traceable_activities_by_publisher_id_denominator", Counter1, Derived, Corpus, Both, None),
    stat!("traceable_sum_commitments_and_disbursements_by_publisher_id", Counter1, Derived, Corpus, Both, None),
    stat!("traceable_sum_commitments_and_disbursements_by_publisher_id_denominator", Counter1, Derived, Corpus, Both, None),
    stat!("records_skipped", Number, Derived, Corpus, Both, None),
];

// ============================================================================
// REGISTRY
// ============================================================================

/// The fixed set of declared statistics, built once at startup.
pub struct Registry {
    defs: &'static [StatisticDef],
}

impl Registry {
    pub fn standard() -> Self {
        Registry { defs: DEFS }
    }

    pub fn defs(&self) -> impl Iterator<Item = &StatisticDef> {
        self.defs.iter()
    }

    /// Statistics evaluated per record by the leaf evaluator.
    pub fn record_defs(&self) -> impl Iterator<Item = &StatisticDef> {
        self.defs.iter().filter(|d| d.level == Level::Record)
    }

    pub fn get(&self, name: &str) -> Option<&StatisticDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// Whether a statistic folds upward. Unknown names fold; dropping data
    /// silently would be worse than carrying it.
    pub fn is_summed(&self, name: &str) -> bool {
        self.get(name)
            .map(|d| d.mode == AggregationMode::Summed)
            .unwrap_or(true)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// TESTS
// ============================================================================

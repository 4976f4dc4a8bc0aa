// Leaf Evaluator - Every statistic for one record, computed once
//
// Evaluation is a pure function of (record, reference tables, rate table,
// clock). Facts that several statistics need, like the resolved standard
// version or the per-transaction financial roll-up, are memoized in an
// explicit per-record cache that lives exactly as long as one evaluate()
// call. Nothing is shared across records and nothing is mutated after it is
// returned.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::unsync::OnceCell;
use rust_decimal::Decimal;
use tracing::debug;

use crate::codes::{
    commitment_code, disbursement_code, expenditure_code, incoming_funds_code,
    actual_start_code, planned_start_code, actual_end_code, planned_end_code,
    MajorVersion, LEGACY_VERSION,
};
use crate::comprehensiveness::{self, CurrentReason};
use crate::currency::CurrencyConverter;
use crate::dates::{budget_year, iso_date, planned_disbursement_year, transaction_date};
use crate::error::{Anomaly, EvalError};
use crate::humanitarian;
use crate::record::{Element, Record, RecordKind};
use crate::reference::ReferenceTables;
use crate::registry::Registry;
use crate::stat::{bump, bump_by, merge_counter1, Counter1, Counter2, Counter3, StatResult};

// ============================================================================
// SCHEMA ORACLE
// ============================================================================

/// External structural-validity collaborator. One statistic consults it; the
/// core algorithm never does.
pub trait SchemaOracle: Sync {
    /// Whether the record validates against the schema for the given
    /// standard version.
    fn validate(&self, record: &Record, version: &str) -> bool;
}

// ============================================================================
// EVALUATOR
// ============================================================================

/// Evaluates the full statistic registry against single records. Holds only
/// shared read-only state, so one evaluator can serve any number of threads.
pub struct Evaluator<'a> {
    tables: &'a ReferenceTables,
    converter: &'a CurrencyConverter,
    registry: Registry,
    today: NaiveDate,
    oracle: Option<&'a dyn SchemaOracle>,
}

impl<'a> Evaluator<'a> {
    pub fn new(tables: &'a ReferenceTables, converter: &'a CurrencyConverter) -> Self {
        Evaluator {
            tables,
            converter,
            registry: Registry::standard(),
            today: Utc::now().date_naive(),
            oracle: None,
        }
    }

    /// Fix the evaluation date. Statistics compare against this clock, so
    /// pinning it makes runs reproducible.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_oracle(mut self, oracle: &'a dyn SchemaOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Build the per-record memo cache without running every statistic.
    pub fn leaf_context<'c>(&'c self, record: &'c Record) -> LeafContext<'c> {
        LeafContext {
            record,
            tables: self.tables,
            converter: self.converter,
            today: self.today,
            oracle: self.oracle,
            version: OnceCell::new(),
            start_date: OnceCell::new(),
            end_date: OnceCell::new(),
            current: OnceCell::new(),
            txn_sums: OnceCell::new(),
            txn_sums_usd: OnceCell::new(),
        }
    }

    /// Evaluate every declared statistic for one record. Statistics that do
    /// not apply to the record's kind yield their shape identity, so the
    /// result always carries the full registry with consistent shapes.
    pub fn evaluate(&self, record: &Record) -> Result<RecordStats, EvalError> {
        if record.root.tag != record.kind.root_tag() {
            return Err(EvalError::MalformedRecord(record.root.tag.clone()));
        }
        let ctx = self.leaf_context(record);
        let mut values = BTreeMap::new();
        for def in self.registry.record_defs() {
            let func = match def.func {
                Some(func) => func,
                None => continue,
            };
            let value = if def.applies.matches(record.kind) {
                func(&ctx)
            } else {
                def.shape.identity()
            };
            debug_assert_eq!(value.shape(), def.shape, "shape invariant broken: {}", def.name);
            values.insert(def.name.to_string(), value);
        }
        Ok(RecordStats {
            kind: record.kind,
            values,
        })
    }
}

/// One record's full statistic mapping.
#[derive(Debug, Clone)]
pub struct RecordStats {
    pub kind: RecordKind,
    pub values: BTreeMap<String, StatResult>,
}

impl RecordStats {
    pub fn get(&self, name: &str) -> Option<&StatResult> {
        self.values.get(name)
    }
}

// ============================================================================
// PER-RECORD CONTEXT
// ============================================================================

/// Shared inputs plus the per-record memo cache. Discarded when the
/// evaluate() call that created it returns.
pub struct LeafContext<'a> {
    pub record: &'a Record,
    pub tables: &'a ReferenceTables,
    pub converter: &'a CurrencyConverter,
    pub today: NaiveDate,
    pub(crate) oracle: Option<&'a dyn SchemaOracle>,
    version: OnceCell<String>,
    start_date: OnceCell<Option<NaiveDate>>,
    end_date: OnceCell<Option<NaiveDate>>,
    current: OnceCell<Option<CurrentReason>>,
    txn_sums: OnceCell<Counter3>,
    txn_sums_usd: OnceCell<Counter3>,
}

impl<'a> LeafContext<'a> {
    /// The record's resolved standard version. Unrecognised or absent
    /// declarations fall back to 1.01; that is an irregularity worth
    /// logging, not an error.
    pub fn version(&self) -> &str {
        self.version.get_or_init(|| match self.record.file_version.as_deref() {
            Some(declared) if self.tables.version_is_known(declared) => declared.to_string(),
            Some(declared) => {
                debug!(declared, anomaly = ?Anomaly::UnsupportedVersion, "unrecognised standard version, assuming 1.01");
                LEGACY_VERSION.to_string()
            }
            None => {
                debug!(anomaly = ?Anomaly::UnsupportedVersion, "no declared standard version, assuming 1.01");
                LEGACY_VERSION.to_string()
            }
        })
    }

    pub fn major(&self) -> MajorVersion {
        MajorVersion::of(self.version())
    }

    /// Activity start: the actual start date when reported, otherwise the
    /// planned one.
    pub fn start_date(&self) -> Option<NaiveDate> {
        *self.start_date.get_or_init(|| {
            let major = self.major();
            for code in [actual_start_code(major), planned_start_code(major)] {
                let date = self
                    .record
                    .root
                    .findall("activity-date")
                    .filter(|d| d.attr("type") == Some(code))
                    .find_map(iso_date);
                if date.is_some() {
                    return date;
                }
            }
            None
        })
    }

    /// Activity end: actual preferred over planned.
    pub fn end_date(&self) -> Option<NaiveDate> {
        *self.end_date.get_or_init(|| {
            let major = self.major();
            for code in [actual_end_code(major), planned_end_code(major)] {
                let date = self
                    .record
                    .root
                    .findall("activity-date")
                    .filter(|d| d.attr("type") == Some(code))
                    .find_map(iso_date);
                if date.is_some() {
                    return date;
                }
            }
            None
        })
    }

    pub fn current_reason(&self) -> Option<CurrentReason> {
        *self
            .current
            .get_or_init(|| comprehensiveness::current_reason(self))
    }

    /// Currency of a transaction, budget or planned disbursement: the value
    /// element's own currency attribute overrides the record default.
    pub fn currency_of(&self, element: &'a Element) -> Option<&'a str> {
        element
            .find("value")
            .and_then(|v| v.attr("currency"))
            .or_else(|| self.record.root.attr("default-currency"))
    }

    fn transaction_type_code(&self, transaction: &'a Element) -> Option<&'a str> {
        transaction
            .find("transaction-type")
            .and_then(|t| t.attr("code"))
    }

    /// Financial roll-up: type -> currency -> year, exact decimal sums, for
    /// the four principal transaction types. Transactions without a date
    /// are excluded; unparsable values count as zero.
    pub fn transaction_sums(&self) -> &Counter3 {
        self.txn_sums.get_or_init(|| {
            let major = self.major();
            let principal = [
                incoming_funds_code(major),
                commitment_code(major),
                disbursement_code(major),
                expenditure_code(major),
            ];
            let mut out = Counter3::new();
            for transaction in self.record.root.findall("transaction") {
                let type_code = match self.transaction_type_code(transaction) {
                    Some(code) if principal.contains(&code) => code,
                    _ => continue,
                };
                let year = match transaction_date(transaction) {
                    Some(date) => date.year(),
                    None => continue,
                };
                let amount = decimal_text(transaction.find("value"));
                let currency = or_null(self.currency_of(transaction));
                bump_by(
                    out.entry(type_code.to_string())
                        .or_default()
                        .entry(currency)
                        .or_default(),
                    year.to_string(),
                    amount,
                );
            }
            out
        })
    }

    /// The same roll-up normalized to USD. Years past the converter's clamp
    /// year are keyed under the clamp year, matching the rate actually used.
    pub fn transaction_sums_usd(&self) -> &Counter3 {
        self.txn_sums_usd.get_or_init(|| {
            let mut out = Counter3::new();
            for (type_code, by_currency) in self.transaction_sums() {
                for (currency, by_year) in by_currency {
                    if currency == "null" {
                        continue;
                    }
                    for (year_key, amount) in by_year {
                        let year: i32 = match year_key.parse() {
                            Ok(y) => y,
                            Err(_) => continue,
                        };
                        let keyed_year = match self.converter.clamp_year() {
                            Some(clamp) if year > clamp => clamp,
                            _ => year,
                        };
                        bump_by(
                            out.entry(type_code.clone())
                                .or_default()
                                .entry("USD".to_string())
                                .or_default(),
                            keyed_year.to_string(),
                            self.converter.to_usd(currency, *amount, year),
                        );
                    }
                }
            }
            out
        })
    }
}

fn or_null(value: Option<&str>) -> String {
    value.unwrap_or("null").to_string()
}

/// Text of a value element as an exact decimal, zero when absent or
/// unparsable.
fn decimal_text(value: Option<&Element>) -> Decimal {
    match value.and_then(Element::text_str) {
        Some(text) => text.trim().parse().unwrap_or_else(|_| {
            debug!(text, anomaly = ?Anomaly::MissingData, "unparsable numeric text, counting zero");
            Decimal::ZERO
        }),
        None => Decimal::ZERO,
    }
}

fn flag(value: bool) -> StatResult {
    StatResult::Number(if value { Decimal::ONE } else { Decimal::ZERO })
}

// ============================================================================
// STATISTIC FUNCTIONS
// ============================================================================

pub(crate) fn s_activities(_ctx: &LeafContext) -> StatResult {
    StatResult::count(1)
}

pub(crate) fn s_organisations(_ctx: &LeafContext) -> StatResult {
    StatResult::count(1)
}

pub(crate) fn s_iati_identifiers(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    bump(&mut out, or_null(ctx.record.iati_identifier()));
    StatResult::Counter1(out)
}

pub(crate) fn s_reporting_orgs(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    let reference = ctx
        .record
        .root
        .find("reporting-org")
        .and_then(|o| o.attr("ref"));
    bump(&mut out, or_null(reference));
    StatResult::Counter1(out)
}

pub(crate) fn s_participating_orgs(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for org in ctx.record.root.findall("participating-org") {
        // Repeated references collapse to a presence marker per reference.
        out.insert(or_null(org.attr("ref")), Decimal::ONE);
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_versions(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    bump(&mut out, or_null(ctx.record.file_version.as_deref()));
    StatResult::Counter1(out)
}

pub(crate) fn s_version_mismatch(ctx: &LeafContext) -> StatResult {
    let mismatch = match (ctx.record.file_version.as_deref(), ctx.record.root.attr("version")) {
        (Some(file), Some(element)) => file != element,
        _ => false,
    };
    let mut out = Counter1::new();
    bump(&mut out, if mismatch { "true" } else { "false" });
    StatResult::Counter1(out)
}

pub(crate) fn s_validation(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    if let Some(oracle) = ctx.oracle {
        let verdict = if oracle.validate(ctx.record, ctx.version()) {
            "pass"
        } else {
            "fail"
        };
        bump(&mut out, verdict);
    }
    StatResult::Counter1(out)
}

/// Pure recursive walk: each level returns a fresh mapping and the caller
/// merges it with the ordinary counter rule.
fn element_counts(element: &Element, path: &str, count_multiple: bool) -> Counter1 {
    let mut out = Counter1::new();
    out.insert(path.to_string(), Decimal::ONE);
    for (name, value) in &element.attrs {
        if value.is_empty() {
            continue;
        }
        out.insert(format!("{path}/@{name}"), Decimal::ONE);
    }
    for child in &element.children {
        let child_path = format!("{path}/{}", child.tag);
        let child_counts = element_counts(child, &child_path, count_multiple);
        if count_multiple {
            merge_counter1(&mut out, child_counts);
        } else {
            for (key, _) in child_counts {
                out.insert(key, Decimal::ONE);
            }
        }
    }
    out
}

pub(crate) fn s_elements(ctx: &LeafContext) -> StatResult {
    StatResult::Counter1(element_counts(
        &ctx.record.root,
        ctx.record.kind.root_tag(),
        false,
    ))
}

pub(crate) fn s_elements_total(ctx: &LeafContext) -> StatResult {
    StatResult::Counter1(element_counts(
        &ctx.record.root,
        ctx.record.kind.root_tag(),
        true,
    ))
}

const BOOLEAN_PATHS: [&str; 9] = [
    "conditions/@attached",
    "crs-add/aidtype-flag/@significance",
    "crs-add/other-flags/@significance",
    "fss/@priority",
    "@humanitarian",
    "reporting-org/@secondary-reporter",
    "result/indicator/@ascending",
    "result/@aggregation-status",
    "transaction/@humanitarian",
];

pub(crate) fn s_boolean_values(ctx: &LeafContext) -> StatResult {
    let mut out = Counter2::new();
    for path in BOOLEAN_PATHS {
        for value in ctx.record.root.path_values(path) {
            bump(out.entry(path.to_string()).or_default(), value);
        }
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_hierarchies(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    bump(&mut out, or_null(ctx.record.root.attr("hierarchy")));
    StatResult::Counter1(out)
}

pub(crate) fn s_currencies(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for transaction in ctx.record.root.findall("transaction") {
        if transaction.find("value").is_some() {
            out.insert(or_null(ctx.currency_of(transaction)), Decimal::ONE);
        }
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_activities_per_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    let year = ctx.start_date().map(|d| d.year().to_string());
    bump(&mut out, or_null(year.as_deref()));
    StatResult::Counter1(out)
}

/// Cumulative recency buckets: a transaction 10 days old counts in every
/// bucket. All buckets are always present so group-level classifications
/// can read them directly.
pub(crate) fn s_transaction_timing(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for bucket in [30u32, 60, 90, 180, 360] {
        out.insert(bucket.to_string(), Decimal::ZERO);
    }
    for transaction in ctx.record.root.findall("transaction") {
        if let Some(date) = transaction_date(transaction) {
            let days = (ctx.today - date).num_days();
            if days < -1 {
                continue;
            }
            for bucket in [30i64, 60, 90, 180, 360] {
                if days < bucket {
                    bump(&mut out, bucket.to_string());
                }
            }
        }
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_transaction_months(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for transaction in ctx.record.root.findall("transaction") {
        if let Some(date) = transaction_date(transaction) {
            bump(&mut out, date.month().to_string());
        }
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_transaction_months_with_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for transaction in ctx.record.root.findall("transaction") {
        if let Some(date) = transaction_date(transaction) {
            bump(&mut out, format!("{}-{:02}", date.year(), date.month()));
        }
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_transaction_dates(ctx: &LeafContext) -> StatResult {
    let mut out = Counter2::new();
    for transaction in ctx.record.root.findall("transaction") {
        let type_code = or_null(ctx.transaction_type_code(transaction));
        let date = transaction_date(transaction).map(|d| d.to_string());
        bump(out.entry(type_code).or_default(), or_null(date.as_deref()));
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_activity_dates(ctx: &LeafContext) -> StatResult {
    let mut out = Counter2::new();
    for activity_date in ctx.record.root.findall("activity-date") {
        let type_code = or_null(activity_date.attr("type"));
        let date = iso_date(activity_date).map(|d| d.to_string());
        bump(out.entry(type_code).or_default(), or_null(date.as_deref()));
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_count_transactions_by_type_by_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter2::new();
    for transaction in ctx.record.root.findall("transaction") {
        let type_code = or_null(ctx.transaction_type_code(transaction));
        let year = transaction_date(transaction).map(|d| d.year().to_string());
        bump(out.entry(type_code).or_default(), or_null(year.as_deref()));
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_sum_transactions_by_type_by_year(ctx: &LeafContext) -> StatResult {
    StatResult::Counter3(ctx.transaction_sums().clone())
}

pub(crate) fn s_sum_transactions_by_type_by_year_usd(ctx: &LeafContext) -> StatResult {
    StatResult::Counter3(ctx.transaction_sums_usd().clone())
}

/// Disbursement and expenditure sums bucketed year first, currency second.
pub(crate) fn s_spend_currency_year(ctx: &LeafContext) -> StatResult {
    let major = ctx.major();
    let spend_codes = [disbursement_code(major), expenditure_code(major)];
    let mut out = Counter2::new();
    for transaction in ctx.record.root.findall("transaction") {
        match ctx.transaction_type_code(transaction) {
            Some(code) if spend_codes.contains(&code) => {}
            _ => continue,
        }
        let year = transaction_date(transaction).map(|d| d.year().to_string());
        let amount = decimal_text(transaction.find("value"));
        bump_by(
            out.entry(or_null(year.as_deref())).or_default(),
            or_null(ctx.currency_of(transaction)),
            amount,
        );
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_forwardlooking_currency_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter2::new();
    for budget in ctx.record.root.findall("budget") {
        let year = budget_year(budget).map(|y| y.to_string());
        let amount = decimal_text(budget.find("value"));
        bump_by(
            out.entry(or_null(year.as_deref())).or_default(),
            or_null(ctx.currency_of(budget)),
            amount,
        );
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_count_budgets_by_type_by_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter2::new();
    for budget in ctx.record.root.findall("budget") {
        if let Some(year) = budget_year(budget) {
            bump(
                out.entry(or_null(budget.attr("type"))).or_default(),
                year.to_string(),
            );
        }
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_sum_budgets_by_type_by_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter3::new();
    for budget in ctx.record.root.findall("budget") {
        if let Some(year) = budget_year(budget) {
            let amount = decimal_text(budget.find("value"));
            bump_by(
                out.entry(or_null(budget.attr("type")))
                    .or_default()
                    .entry(or_null(ctx.currency_of(budget)))
                    .or_default(),
                year.to_string(),
                amount,
            );
        }
    }
    StatResult::Counter3(out)
}

pub(crate) fn s_sum_budgets_by_type_by_year_usd(ctx: &LeafContext) -> StatResult {
    let raw = match s_sum_budgets_by_type_by_year(ctx) {
        StatResult::Counter3(c) => c,
        _ => unreachable!(),
    };
    let mut out = Counter3::new();
    for (budget_type, by_currency) in &raw {
        for (currency, by_year) in by_currency {
            if currency == "null" {
                continue;
            }
            for (year_key, amount) in by_year {
                let year: i32 = match year_key.parse() {
                    Ok(y) => y,
                    Err(_) => continue,
                };
                bump_by(
                    out.entry(budget_type.clone())
                        .or_default()
                        .entry("USD".to_string())
                        .or_default(),
                    year_key.clone(),
                    ctx.converter.to_usd(currency, *amount, year),
                );
            }
        }
    }
    StatResult::Counter3(out)
}

pub(crate) fn s_count_planned_disbursements_by_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for pd in ctx.record.root.findall("planned-disbursement") {
        let year = planned_disbursement_year(pd).map(|y| y.to_string());
        bump(&mut out, or_null(year.as_deref()));
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_sum_planned_disbursements_by_year(ctx: &LeafContext) -> StatResult {
    let mut out = Counter2::new();
    for pd in ctx.record.root.findall("planned-disbursement") {
        let year = planned_disbursement_year(pd).map(|y| y.to_string());
        let amount = decimal_text(pd.find("value"));
        bump_by(
            out.entry(or_null(ctx.currency_of(pd))).or_default(),
            or_null(year.as_deref()),
            amount,
        );
    }
    StatResult::Counter2(out)
}

pub(crate) fn s_budget_lengths(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for budget in ctx.record.root.findall("budget") {
        let start = budget.find("period-start").and_then(iso_date);
        let end = budget.find("period-end").and_then(iso_date);
        if let (Some(start), Some(end)) = (start, end) {
            bump(&mut out, (end - start).num_days().to_string());
        }
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_provider_activity_id(ctx: &LeafContext) -> StatResult {
    let mut out = Counter1::new();
    for value in ctx
        .record
        .root
        .path_values("transaction/provider-org/@provider-activity-id")
    {
        bump(&mut out, value);
    }
    // An activity pointing at itself is not traceability.
    if let Some(own) = ctx.record.iati_identifier() {
        out.remove(own);
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_sum_commitments_and_disbursements_by_activity_id_usd(
    ctx: &LeafContext,
) -> StatResult {
    let sums = ctx.transaction_sums_usd();
    let mut total = Decimal::ZERO;
    // Both majors' commitment and disbursement codes, whichever apply.
    for type_code in ["C", "2", "D", "3"] {
        if let Some(by_year) = sums.get(type_code).and_then(|c| c.get("USD")) {
            total += by_year.values().copied().sum::<Decimal>();
        }
    }
    let mut out = Counter1::new();
    if !total.is_zero() {
        bump_by(&mut out, or_null(ctx.record.iati_identifier()), total);
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_activities_with_future_transactions(ctx: &LeafContext) -> StatResult {
    let future = ctx
        .record
        .root
        .findall("transaction")
        .filter_map(transaction_date)
        .any(|date| date > ctx.today);
    flag(future)
}

pub(crate) fn s_transaction_total(ctx: &LeafContext) -> StatResult {
    StatResult::count(ctx.record.root.findall("transaction").count() as u64)
}

pub(crate) fn s_activities_secondary_reported(ctx: &LeafContext) -> StatResult {
    let secondary = ctx
        .record
        .root
        .find("reporting-org")
        .and_then(|o| o.attr("secondary-reporter"))
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);
    let mut out = Counter1::new();
    if secondary {
        bump(&mut out, or_null(ctx.record.iati_identifier()));
    }
    StatResult::Counter1(out)
}

pub(crate) fn s_humanitarian(ctx: &LeafContext) -> StatResult {
    StatResult::Counter1(humanitarian::flag_counter(
        ctx.record,
        ctx.version(),
        ctx.major(),
    ))
}

pub(crate) fn s_comprehensiveness(ctx: &LeafContext) -> StatResult {
    StatResult::Counter1(comprehensiveness::score(ctx, false))
}

pub(crate) fn s_comprehensiveness_with_validation(ctx: &LeafContext) -> StatResult {
    StatResult::Counter1(comprehensiveness::score(ctx, true))
}

pub(crate) fn s_comprehensiveness_denominators(ctx: &LeafContext) -> StatResult {
    StatResult::Counter1(comprehensiveness::denominators(ctx))
}

pub(crate) fn s_comprehensiveness_denominator_default(ctx: &LeafContext) -> StatResult {
    flag(ctx.current_reason().is_some())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::ExchangeRateTable;
    use crate::reference::{ReferenceTables, CL_VERSION};

    fn tables() -> ReferenceTables {
        let mut t = ReferenceTables::new();
        t.add_codelist(
            MajorVersion::Two,
            CL_VERSION,
            ["1.01", "1.05", "2.01", "2.02", "2.03"],
        );
        t
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("iati_stats=debug")
            .try_init();
    }

    fn converter() -> CurrencyConverter {
        let mut table = ExchangeRateTable::new();
        table.insert("EUR", 2013, Decimal::new(8, 1));
        CurrencyConverter::new(table)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()
    }

    fn disbursement(iso: &str, amount: &str, currency: Option<&str>) -> Element {
        let mut value = Element::new("value").with_text(amount);
        if let Some(code) = currency {
            value = value.with_attr("currency", code);
        }
        Element::new("transaction")
            .with_child(Element::new("transaction-type").with_attr("code", "3"))
            .with_child(Element::new("transaction-date").with_attr("iso-date", iso))
            .with_child(value)
    }

    #[test]
    fn test_every_statistic_keeps_its_shape_on_an_empty_record() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());

        let empty_activity = Record::activity(Element::new("iati-activity"), None);
        let stats = evaluator.evaluate(&empty_activity).unwrap();
        for def in evaluator.registry().record_defs() {
            let value = stats.get(def.name).expect("statistic missing");
            assert_eq!(value.shape(), def.shape, "shape mismatch for {}", def.name);
        }

        let empty_org = Record::organisation(Element::new("iati-organisation"), None);
        let stats = evaluator.evaluate(&empty_org).unwrap();
        for def in evaluator.registry().record_defs() {
            assert_eq!(stats.get(def.name).unwrap().shape(), def.shape);
        }
    }

    #[test]
    fn test_malformed_record_is_the_only_fatal_case() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter);
        let bad = Record::activity(Element::new("not-an-activity"), None);
        assert!(evaluator.evaluate(&bad).is_err());
    }

    #[test]
    fn test_version_fallback_to_legacy() {
        init_tracing();
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter);

        let unknown = Record::activity(Element::new("iati-activity"), Some("9.99".into()));
        let ctx = evaluator.leaf_context(&unknown);
        assert_eq!(ctx.version(), "1.01");

        let known = Record::activity(Element::new("iati-activity"), Some("2.03".into()));
        let ctx = evaluator.leaf_context(&known);
        assert_eq!(ctx.version(), "2.03");
        assert_eq!(ctx.major(), MajorVersion::Two);
    }

    #[test]
    fn test_eur_disbursement_scenario() {
        // 100 EUR disbursed in 2013 at rate 0.8 is 125 USD.
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let root = Element::new("iati-activity").with_child(disbursement("2013-06-15", "100", Some("EUR")));
        let record = Record::activity(root, Some("2.03".into()));
        let stats = evaluator.evaluate(&record).unwrap();

        let usd = stats
            .get("sum_transactions_by_type_by_year_usd")
            .unwrap()
            .as_counter3()
            .unwrap();
        assert_eq!(usd["3"]["USD"]["2013"], Decimal::from(125));

        let raw = stats
            .get("sum_transactions_by_type_by_year")
            .unwrap()
            .as_counter3()
            .unwrap();
        assert_eq!(raw["3"]["EUR"]["2013"], Decimal::from(100));
    }

    #[test]
    fn test_transaction_currency_override_beats_default() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let root = Element::new("iati-activity")
            .with_attr("default-currency", "USD")
            .with_child(disbursement("2013-06-15", "100", Some("EUR")))
            .with_child(disbursement("2013-07-15", "50", None));
        let record = Record::activity(root, Some("2.03".into()));
        let ctx = evaluator.leaf_context(&record);
        let sums = ctx.transaction_sums();
        assert_eq!(sums["3"]["EUR"]["2013"], Decimal::from(100));
        assert_eq!(sums["3"]["USD"]["2013"], Decimal::from(50));
    }

    #[test]
    fn test_usd_sums_key_under_clamp_year() {
        let tables = tables();
        let mut table = ExchangeRateTable::new();
        table.insert("EUR", 2013, Decimal::new(8, 1));
        let converter = CurrencyConverter::new(table);
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let root = Element::new("iati-activity").with_child(disbursement("2015-02-01", "80", Some("EUR")));
        let record = Record::activity(root, Some("2.03".into()));
        let ctx = evaluator.leaf_context(&record);
        let usd = ctx.transaction_sums_usd();
        // 2015 is past the table's coverage; the sum lands on 2013.
        assert_eq!(usd["3"]["USD"]["2013"], Decimal::from(100));
    }

    #[test]
    fn test_element_walk_presence_vs_total() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let root = Element::new("iati-activity")
            .with_child(Element::new("sector").with_attr("code", "11110"))
            .with_child(Element::new("sector").with_attr("code", "11120"));
        let record = Record::activity(root, Some("2.03".into()));
        let stats = evaluator.evaluate(&record).unwrap();

        let presence = stats.get("elements").unwrap().as_counter1().unwrap();
        assert_eq!(presence["iati-activity/sector"], Decimal::ONE);
        assert_eq!(presence["iati-activity/sector/@code"], Decimal::ONE);

        let totals = stats.get("elements_total").unwrap().as_counter1().unwrap();
        assert_eq!(totals["iati-activity/sector"], Decimal::from(2));
        assert_eq!(totals["iati-activity/sector/@code"], Decimal::from(2));
    }

    #[test]
    fn test_transaction_timing_buckets_are_cumulative() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let root = Element::new("iati-activity")
            .with_child(disbursement("2015-05-25", "1", Some("EUR")))
            .with_child(disbursement("2014-01-01", "1", Some("EUR")));
        let record = Record::activity(root, Some("2.03".into()));
        let stats = evaluator.evaluate(&record).unwrap();
        let timing = stats.get("transaction_timing").unwrap().as_counter1().unwrap();
        assert_eq!(timing["30"], Decimal::ONE);
        assert_eq!(timing["360"], Decimal::ONE);
        assert_eq!(timing["180"], Decimal::ONE);
    }

    #[test]
    fn test_provider_activity_id_drops_own_identifier() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let root = Element::new("iati-activity")
            .with_child(Element::new("iati-identifier").with_text("XM-1"))
            .with_child(
                Element::new("transaction").with_child(
                    Element::new("provider-org").with_attr("provider-activity-id", "XM-1"),
                ),
            )
            .with_child(
                Element::new("transaction").with_child(
                    Element::new("provider-org").with_attr("provider-activity-id", "XM-2"),
                ),
            );
        let record = Record::activity(root, Some("2.03".into()));
        let stats = evaluator.evaluate(&record).unwrap();
        let providers = stats.get("provider_activity_id").unwrap().as_counter1().unwrap();
        assert!(!providers.contains_key("XM-1"));
        assert_eq!(providers["XM-2"], Decimal::ONE);
    }

    #[test]
    fn test_organisation_record_yields_identities_for_activity_stats() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let record = Record::organisation(
            Element::new("iati-organisation")
                .with_child(Element::new("iati-identifier").with_text("GB-ORG-1")),
            Some("2.03".into()),
        );
        let stats = evaluator.evaluate(&record).unwrap();
        assert_eq!(stats.get("activities").unwrap().as_number(), Some(Decimal::ZERO));
        assert_eq!(stats.get("organisations").unwrap().as_number(), Some(Decimal::ONE));
        assert!(stats.get("comprehensiveness").unwrap().as_counter1().unwrap().is_empty());
        let ids = stats.get("iati_identifiers").unwrap().as_counter1().unwrap();
        assert_eq!(ids["GB-ORG-1"], Decimal::ONE);
    }

    #[test]
    fn test_boolean_values_paths() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let root = Element::new("iati-activity")
            .with_attr("humanitarian", "1")
            .with_child(
                Element::new("transaction").with_attr("humanitarian", "true"),
            );
        let record = Record::activity(root, Some("2.03".into()));
        let stats = evaluator.evaluate(&record).unwrap();
        let booleans = stats.get("boolean_values").unwrap().as_counter2().unwrap();
        assert_eq!(booleans["@humanitarian"]["1"], Decimal::ONE);
        assert_eq!(booleans["transaction/@humanitarian"]["true"], Decimal::ONE);
    }

    #[test]
    fn test_registry_shapes_are_declared_once() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter);
        let names: Vec<&str> = evaluator.registry().defs().map(|d| d.name).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "duplicate statistic names");
    }
}

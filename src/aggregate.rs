// Aggregator - Fold leaf results up the hierarchy
//
// record -> file -> publisher -> corpus, all with the same shape merge rule.
// The fold never fails: a record that could not be evaluated is counted and
// skipped, and the corpus aggregate is always producible. Derived
// statistics (classifications, medians, uniqueness counts) are recomputed
// at their own level from already-merged values and excluded from folding.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyConverter;
use crate::dates::iso_date_str;
use crate::evaluate::RecordStats;
use crate::record::RecordKind;
use crate::reference::ReferenceTables;
use crate::registry::Registry;
use crate::stat::{Counter1, Counter2, StatResult};

// ============================================================================
// AGGREGATE
// ============================================================================

/// One hierarchy node's statistic mapping, built bottom-up by folding.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    values: BTreeMap<String, StatResult>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&StatResult> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: StatResult) {
        self.values.insert(name.into(), value);
    }

    pub fn values(&self) -> &BTreeMap<String, StatResult> {
        &self.values
    }

    /// Fold one record's statistics in. Record statistics are always
    /// foldable.
    pub fn absorb_record(&mut self, stats: RecordStats) {
        for (name, value) in stats.values {
            match self.values.get_mut(&name) {
                Some(existing) => existing.merge(value),
                None => {
                    self.values.insert(name, value);
                }
            }
        }
    }

    /// Fold a lower-level aggregate in, skipping derived statistics, which
    /// are local to the level that computed them.
    pub fn merge_summed(&mut self, other: &Aggregate, registry: &Registry) {
        for (name, value) in &other.values {
            if !registry.is_summed(name) {
                continue;
            }
            match self.values.get_mut(name) {
                Some(existing) => existing.merge(value.clone()),
                None => {
                    self.values.insert(name.clone(), value.clone());
                }
            }
        }
    }

    /// Nested key-value rendering for downstream reporting tools.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.values).unwrap_or(serde_json::Value::Null)
    }

    fn counter1(&self, name: &str) -> Option<&Counter1> {
        self.get(name).and_then(StatResult::as_counter1)
    }

    fn counter2(&self, name: &str) -> Option<&Counter2> {
        self.get(name).and_then(StatResult::as_counter2)
    }

    fn number(&self, name: &str) -> Decimal {
        self.get(name)
            .and_then(StatResult::as_number)
            .unwrap_or(Decimal::ZERO)
    }
}

fn label(value: &str) -> StatResult {
    let mut out = Counter1::new();
    out.insert(value.to_string(), Decimal::ONE);
    StatResult::Counter1(out)
}

// ============================================================================
// GROUPING
// ============================================================================

/// Identifies where a record came from: source file and publishing
/// organisation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub publisher: String,
    pub file: String,
}

impl GroupKey {
    pub fn new(publisher: impl Into<String>, file: impl Into<String>) -> Self {
        GroupKey {
            publisher: publisher.into(),
            file: file.into(),
        }
    }
}

// ============================================================================
// CORPUS BUILDER
// ============================================================================

/// Folds a stream of evaluated records into per-file, per-publisher and
/// corpus aggregates. Merging is associative and commutative, so the order
/// records arrive in never changes the result.
pub struct CorpusBuilder<'a> {
    registry: Registry,
    tables: &'a ReferenceTables,
    converter: &'a CurrencyConverter,
    today: NaiveDate,
    files: BTreeMap<GroupKey, FileAccumulator>,
    skipped: u64,
}

#[derive(Default)]
struct FileAccumulator {
    aggregate: Aggregate,
    has_activities: bool,
    has_organisations: bool,
}

/// The finished roll-up: one aggregate per publisher plus the corpus total.
pub struct CorpusReport {
    pub publishers: BTreeMap<String, Aggregate>,
    pub corpus: Aggregate,
    pub records_skipped: u64,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new(
        tables: &'a ReferenceTables,
        converter: &'a CurrencyConverter,
        today: NaiveDate,
    ) -> Self {
        CorpusBuilder {
            registry: Registry::standard(),
            tables,
            converter,
            today,
            files: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// Fold one evaluated record into its file's aggregate.
    pub fn add(&mut self, key: &GroupKey, stats: RecordStats) {
        let file = self.files.entry(key.clone()).or_default();
        match stats.kind {
            RecordKind::Activity => file.has_activities = true,
            RecordKind::Organisation => file.has_organisations = true,
        }
        file.aggregate.absorb_record(stats);
    }

    /// Record that one record could not be evaluated. The rest of the
    /// corpus is unaffected.
    pub fn add_failure(&mut self, _key: &GroupKey) {
        self.skipped += 1;
    }

    pub fn finish(self) -> CorpusReport {
        let mut publishers: BTreeMap<String, Aggregate> = BTreeMap::new();
        for (key, file) in self.files {
            let mut file_aggregate = file.aggregate;
            if file.has_activities {
                file_aggregate.insert("activity_files", StatResult::count(1));
            }
            if file.has_organisations {
                file_aggregate.insert("organisation_files", StatResult::count(1));
            }
            publishers
                .entry(key.publisher)
                .or_default()
                .merge_summed(&file_aggregate, &self.registry);
        }

        for (publisher, aggregate) in &mut publishers {
            derive_publisher(aggregate, publisher, self.tables, self.converter, self.today);
        }

        let mut corpus = Aggregate::new();
        for aggregate in publishers.values() {
            corpus.merge_summed(aggregate, &self.registry);
        }
        derive_corpus(&mut corpus, self.skipped);

        CorpusReport {
            publishers,
            corpus,
            records_skipped: self.skipped,
        }
    }
}

// ============================================================================
// PUBLISHER-LEVEL DERIVED STATISTICS
// ============================================================================

fn derive_publisher(
    aggregate: &mut Aggregate,
    publisher: &str,
    tables: &ReferenceTables,
    converter: &CurrencyConverter,
    today: NaiveDate,
) {
    aggregate.insert("publishers", StatResult::count(1));

    let versions: Vec<String> = aggregate
        .counter1("versions")
        .map(|c| c.keys().cloned().collect())
        .unwrap_or_default();
    let mut per_version = Counter1::new();
    for version in versions {
        per_version.insert(version, Decimal::ONE);
    }
    aggregate.insert("publishers_per_version", StatResult::Counter1(per_version));

    let any_fail = aggregate
        .counter1("validation")
        .and_then(|c| c.get("fail"))
        .map(|n| !n.is_zero())
        .unwrap_or(false);
    aggregate.insert(
        "publishers_validation",
        label(if any_fail { "fail" } else { "pass" }),
    );

    let has_org_file = !aggregate.number("organisation_files").is_zero();
    aggregate.insert(
        "publisher_has_org_file",
        label(if has_org_file { "yes" } else { "no" }),
    );

    let identifiers = aggregate.counter1("iati_identifiers").cloned().unwrap_or_default();
    aggregate.insert(
        "publisher_unique_identifiers",
        StatResult::count(identifiers.len() as u64),
    );
    let duplicates: Counter1 = identifiers
        .iter()
        .filter(|(_, count)| **count > Decimal::ONE)
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    aggregate.insert(
        "publisher_duplicate_identifiers",
        StatResult::Counter1(duplicates),
    );

    let providers = aggregate.counter1("provider_activity_id").cloned().unwrap_or_default();
    let without_own: Counter1 = providers
        .into_iter()
        .filter(|(id, _)| !identifiers.contains_key(id))
        .collect();
    aggregate.insert(
        "provider_activity_id_without_own",
        StatResult::Counter1(without_own),
    );

    let mut ids_by_publisher = Counter2::new();
    ids_by_publisher.insert(publisher.to_string(), identifiers);
    aggregate.insert(
        "iati_identifiers_by_publisher",
        StatResult::Counter2(ids_by_publisher),
    );

    let spend = aggregate
        .counter1("sum_commitments_and_disbursements_by_activity_id_usd")
        .cloned()
        .unwrap_or_default();
    let mut spend_by_publisher = Counter2::new();
    spend_by_publisher.insert(publisher.to_string(), spend);
    aggregate.insert(
        "sum_commitments_and_disbursements_by_activity_id_by_publisher_id_usd",
        StatResult::Counter2(spend_by_publisher),
    );

    aggregate.insert(
        "transaction_frequency",
        label(transaction_frequency(aggregate)),
    );
    aggregate.insert("timelag", label(timelag(aggregate, today)));

    match transaction_alignment(aggregate) {
        Some(value) => aggregate.insert("transaction_alignment", label(value)),
        None => aggregate.insert("transaction_alignment", StatResult::Counter1(Counter1::new())),
    }

    let median = budget_length_median(aggregate);
    if let Some(median) = median {
        aggregate.insert("budget_length_median", StatResult::Number(median));
    }
    aggregate.insert("budget_alignment", label(budget_alignment(median)));

    match most_recent_transaction_date(aggregate, today) {
        Some(date) => aggregate.insert("most_recent_transaction_date", label(&date)),
        None => aggregate.insert(
            "most_recent_transaction_date",
            StatResult::Counter1(Counter1::new()),
        ),
    }

    if let Some(spend) = reference_spend_usd(publisher, tables, converter) {
        aggregate.insert("reference_spend_usd", StatResult::Counter2(spend));
    }
}

/// How often the publisher reports, judged from the cumulative transaction
/// recency buckets.
fn transaction_frequency(aggregate: &Aggregate) -> &'static str {
    let timing = aggregate.counter1("transaction_timing");
    let bucket = |key: &str| -> Decimal {
        timing
            .and_then(|c| c.get(key))
            .copied()
            .unwrap_or(Decimal::ZERO)
    };
    let zeroes = ["30", "60", "90"]
        .iter()
        .filter(|k| bucket(k).is_zero())
        .count();
    if zeroes <= 1 {
        "Monthly"
    } else if zeroes <= 2 {
        "Quarterly"
    } else if !bucket("180").is_zero() {
        "Six-monthly"
    } else if !bucket("360").is_zero() {
        "Annual"
    } else {
        "Beyond one year"
    }
}

fn previous_months(today: NaiveDate) -> Vec<String> {
    let mut year = today.year();
    let mut month = today.month() as i32;
    (0..12)
        .map(|_| {
            month -= 1;
            if month <= 0 {
                year -= 1;
                month = 12;
            }
            format!("{}-{:02}", year, month)
        })
        .collect()
}

/// How far behind real events the publisher's reporting runs, judged from
/// which of the preceding twelve months saw reported transactions.
fn timelag(aggregate: &Aggregate, today: NaiveDate) -> &'static str {
    let empty = Counter1::new();
    let months = aggregate
        .counter1("transaction_months_with_year")
        .unwrap_or(&empty);
    let recent = previous_months(today);
    let present = |window: &[String]| window.iter().filter(|m| months.contains_key(*m)).count();
    if present(&recent[..3]) >= 2 {
        "One month"
    } else if present(&recent[..3]) >= 1 {
        "A quarter"
    } else if present(&recent[..6]) >= 1 {
        "Six months"
    } else if present(&recent[..12]) >= 1 {
        "One year"
    } else {
        "More than one year"
    }
}

fn transaction_alignment(aggregate: &Aggregate) -> Option<&'static str> {
    let empty = Counter1::new();
    let months = aggregate.counter1("transaction_months").unwrap_or(&empty);
    if months.len() == 12 {
        return Some("Monthly");
    }
    let quarters: BTreeSet<u32> = months
        .keys()
        .filter_map(|m| m.parse::<u32>().ok())
        .map(|m| (m - 1) / 3)
        .collect();
    if quarters.len() == 4 {
        Some("Quarterly")
    } else if !months.is_empty() {
        Some("Annually")
    } else {
        None
    }
}

/// Weighted median over the budget period length histogram. When the
/// midpoint falls exactly between two frequency bins the two are averaged.
fn budget_length_median(aggregate: &Aggregate) -> Option<Decimal> {
    let lengths = aggregate.counter1("budget_lengths")?;
    let mut bins: Vec<(i64, Decimal)> = lengths
        .iter()
        .filter_map(|(k, v)| k.parse::<i64>().ok().map(|days| (days, *v)))
        .collect();
    bins.sort_unstable_by_key(|(days, _)| *days);
    let total: Decimal = bins.iter().map(|(_, count)| *count).sum();
    if total.is_zero() {
        return None;
    }
    let half = total / Decimal::from(2);
    let mut cumulative = Decimal::ZERO;
    let mut median: Option<Decimal> = None;
    for (days, count) in bins {
        cumulative += count;
        if cumulative >= half {
            median = Some(match median {
                Some(lower) => (lower + Decimal::from(days)) / Decimal::from(2),
                None => Decimal::from(days),
            });
            if cumulative != half {
                break;
            }
        }
    }
    median
}

fn budget_alignment(median: Option<Decimal>) -> &'static str {
    match median {
        None => "Not known",
        Some(m) if m < Decimal::from(100) => "Quarterly",
        Some(m) if m < Decimal::from(370) => "Annually",
        Some(_) => "Beyond one year",
    }
}

/// Latest non-future transaction date across the publisher's records.
fn most_recent_transaction_date(aggregate: &Aggregate, today: NaiveDate) -> Option<String> {
    aggregate
        .counter2("transaction_dates")?
        .values()
        .flat_map(|by_date| by_date.keys())
        .filter_map(|raw| iso_date_str(raw))
        .filter(|date| *date <= today)
        .max()
        .map(|date| date.to_string())
}

/// Reference spend figures converted to USD, with the official forecast
/// passed through since it is already denominated in USD.
fn reference_spend_usd(
    publisher: &str,
    tables: &ReferenceTables,
    converter: &CurrencyConverter,
) -> Option<Counter2> {
    let spend = tables.reference_spend(publisher)?;
    let mut out = Counter2::new();
    if let Some(amount) = spend.spend_2014 {
        out.entry("2014".to_string()).or_default().insert(
            "ref_spend_usd".to_string(),
            converter.to_usd(&spend.currency, amount, 2014),
        );
    }
    let mut y2015 = Counter1::new();
    if let Some(amount) = spend.spend_2015 {
        y2015.insert(
            "ref_spend_usd".to_string(),
            converter.to_usd(&spend.currency, amount, 2015),
        );
    }
    if let Some(forecast) = spend.official_forecast_2015 {
        y2015.insert("official_forecast_usd".to_string(), forecast);
    }
    if !y2015.is_empty() {
        out.insert("2015".to_string(), y2015);
    }
    let mut flags = Counter1::new();
    flags.insert(
        "spend_data_error_reported".to_string(),
        if spend.spend_data_error_reported {
            Decimal::ONE
        } else {
            Decimal::ZERO
        },
    );
    flags.insert(
        "DAC".to_string(),
        if spend.dac { Decimal::ONE } else { Decimal::ZERO },
    );
    out.insert("flags".to_string(), flags);
    Some(out)
}

// ============================================================================
// CORPUS-LEVEL DERIVED STATISTICS
// ============================================================================

fn derive_corpus(corpus: &mut Aggregate, skipped: u64) {
    let identifiers = corpus.counter1("iati_identifiers").cloned().unwrap_or_default();
    corpus.insert(
        "unique_identifiers",
        StatResult::count(identifiers.len() as u64),
    );
    let duplicates: Counter1 = identifiers
        .iter()
        .filter(|(_, count)| **count > Decimal::ONE)
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    corpus.insert("duplicate_identifiers", StatResult::Counter1(duplicates));

    let referenced = corpus
        .counter1("provider_activity_id_without_own")
        .cloned()
        .unwrap_or_default();

    let ids_by_publisher = corpus
        .counter2("iati_identifiers_by_publisher")
        .cloned()
        .unwrap_or_default();
    let mut traceable = Counter1::new();
    let mut traceable_denominator = Counter1::new();
    for (publisher, ids) in &ids_by_publisher {
        for (id, count) in ids {
            *traceable_denominator
                .entry(publisher.clone())
                .or_insert(Decimal::ZERO) += *count;
            if referenced.contains_key(id) {
                *traceable.entry(publisher.clone()).or_insert(Decimal::ZERO) += *count;
            }
        }
    }
    corpus.insert(
        "traceable_activities_by_publisher_id",
        StatResult::Counter1(traceable),
    );
    corpus.insert(
        "traceable_activities_by_publisher_id_denominator",
        StatResult::Counter1(traceable_denominator),
    );

    let spend_by_publisher = corpus
        .counter2("sum_commitments_and_disbursements_by_activity_id_by_publisher_id_usd")
        .cloned()
        .unwrap_or_default();
    let mut traceable_spend = Counter1::new();
    let mut traceable_spend_denominator = Counter1::new();
    for (publisher, by_activity) in &spend_by_publisher {
        for (id, amount) in by_activity {
            *traceable_spend_denominator
                .entry(publisher.clone())
                .or_insert(Decimal::ZERO) += *amount;
            if referenced.contains_key(id) {
                *traceable_spend
                    .entry(publisher.clone())
                    .or_insert(Decimal::ZERO) += *amount;
            }
        }
    }
    corpus.insert(
        "traceable_sum_commitments_and_disbursements_by_publisher_id",
        StatResult::Counter1(traceable_spend),
    );
    corpus.insert(
        "traceable_sum_commitments_and_disbursements_by_publisher_id_denominator",
        StatResult::Counter1(traceable_spend_denominator),
    );

    corpus.insert("records_skipped", StatResult::count(skipped));
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::ExchangeRateTable;
    use crate::evaluate::Evaluator;
    use crate::record::{Element, Record};
    use crate::reference::CL_VERSION;
    use crate::codes::MajorVersion;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()
    }

    fn tables() -> ReferenceTables {
        let mut t = ReferenceTables::new();
        t.add_codelist(MajorVersion::Two, CL_VERSION, ["1.01", "2.02", "2.03"]);
        t
    }

    fn converter() -> CurrencyConverter {
        let mut table = ExchangeRateTable::new();
        table.insert("EUR", 2013, Decimal::new(8, 1));
        CurrencyConverter::new(table)
    }

    fn activity(identifier: &str, children: Vec<Element>) -> Record {
        let mut root =
            Element::new("iati-activity").with_child(Element::new("iati-identifier").with_text(identifier));
        for child in children {
            root = root.with_child(child);
        }
        Record::activity(root, Some("2.03".to_string()))
    }

    fn disbursement(iso: &str, amount: &str) -> Element {
        Element::new("transaction")
            .with_child(Element::new("transaction-type").with_attr("code", "3"))
            .with_child(Element::new("transaction-date").with_attr("iso-date", iso))
            .with_child(Element::new("value").with_attr("currency", "EUR").with_text(amount))
    }

    #[test]
    fn test_hierarchy_roll_up_and_traceability() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let mut builder = CorpusBuilder::new(&tables, &converter, today());

        // Publisher A reports XM-A-1 with spend; publisher B funds it.
        let a1 = activity("XM-A-1", vec![disbursement("2013-03-01", "100")]);
        let b1 = activity(
            "XM-B-1",
            vec![Element::new("transaction").with_child(
                Element::new("provider-org").with_attr("provider-activity-id", "XM-A-1"),
            )],
        );
        let key_a = GroupKey::new("pub-a", "pub-a/file1.xml");
        let key_b = GroupKey::new("pub-b", "pub-b/file1.xml");
        builder.add(&key_a, evaluator.evaluate(&a1).unwrap());
        builder.add(&key_b, evaluator.evaluate(&b1).unwrap());

        let report = builder.finish();
        assert_eq!(report.records_skipped, 0);
        assert_eq!(report.corpus.number("activities"), Decimal::from(2));
        assert_eq!(report.corpus.number("activity_files"), Decimal::from(2));
        assert_eq!(report.corpus.number("publishers"), Decimal::from(2));
        assert_eq!(report.corpus.number("unique_identifiers"), Decimal::from(2));

        let traceable = report
            .corpus
            .counter1("traceable_activities_by_publisher_id")
            .unwrap();
        assert_eq!(traceable.get("pub-a"), Some(&Decimal::ONE));
        assert_eq!(traceable.get("pub-b"), None);
        let denominator = report
            .corpus
            .counter1("traceable_activities_by_publisher_id_denominator")
            .unwrap();
        assert_eq!(denominator["pub-a"], Decimal::ONE);
        assert_eq!(denominator["pub-b"], Decimal::ONE);

        // 100 EUR at 0.8 in 2013: 125 USD of traceable spend for pub-a.
        let spend = report
            .corpus
            .counter1("traceable_sum_commitments_and_disbursements_by_publisher_id")
            .unwrap();
        assert_eq!(spend["pub-a"], Decimal::from(125));
    }

    #[test]
    fn test_failures_are_counted_not_fatal() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let mut builder = CorpusBuilder::new(&tables, &converter, today());

        let key = GroupKey::new("pub-a", "pub-a/file1.xml");
        let good = activity("XM-A-1", vec![]);
        builder.add(&key, evaluator.evaluate(&good).unwrap());
        builder.add_failure(&key);
        builder.add_failure(&key);

        let report = builder.finish();
        assert_eq!(report.records_skipped, 2);
        assert_eq!(report.corpus.number("records_skipped"), Decimal::from(2));
        assert_eq!(report.corpus.number("activities"), Decimal::ONE);
    }

    #[test]
    fn test_publisher_classifications() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let mut builder = CorpusBuilder::new(&tables, &converter, today());

        // Transactions in each of the three most recent months.
        let record = activity(
            "XM-A-1",
            vec![
                disbursement("2015-05-15", "10"),
                disbursement("2015-04-15", "10"),
                disbursement("2015-03-15", "10"),
            ],
        );
        let key = GroupKey::new("pub-a", "pub-a/file1.xml");
        builder.add(&key, evaluator.evaluate(&record).unwrap());
        let report = builder.finish();

        let publisher = &report.publishers["pub-a"];
        let frequency = publisher.counter1("transaction_frequency").unwrap();
        assert_eq!(frequency["Monthly"], Decimal::ONE);
        let lag = publisher.counter1("timelag").unwrap();
        assert_eq!(lag["One month"], Decimal::ONE);
        let recent = publisher.counter1("most_recent_transaction_date").unwrap();
        assert!(recent.contains_key("2015-05-15"));

        // Derived labels do not fold into the corpus.
        assert!(report.corpus.get("timelag").is_none());
        assert!(report.corpus.get("transaction_frequency").is_none());
        // Summed publisher statistics do.
        assert_eq!(report.corpus.number("publisher_unique_identifiers"), Decimal::ONE);
    }

    #[test]
    fn test_duplicate_identifiers_across_publishers() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let mut builder = CorpusBuilder::new(&tables, &converter, today());

        let key_a = GroupKey::new("pub-a", "pub-a/file1.xml");
        let key_b = GroupKey::new("pub-b", "pub-b/file1.xml");
        builder.add(&key_a, evaluator.evaluate(&activity("XM-DUP", vec![])).unwrap());
        builder.add(&key_b, evaluator.evaluate(&activity("XM-DUP", vec![])).unwrap());

        let report = builder.finish();
        assert_eq!(report.corpus.number("unique_identifiers"), Decimal::ONE);
        let duplicates = report.corpus.counter1("duplicate_identifiers").unwrap();
        assert_eq!(duplicates["XM-DUP"], Decimal::from(2));
        // Neither publisher sees a duplicate on its own.
        for publisher in report.publishers.values() {
            assert!(publisher
                .counter1("publisher_duplicate_identifiers")
                .unwrap()
                .is_empty());
        }
    }

    #[test]
    fn test_budget_length_median_and_alignment() {
        let mut aggregate = Aggregate::new();
        let mut lengths = Counter1::new();
        lengths.insert("90".to_string(), Decimal::from(3));
        lengths.insert("365".to_string(), Decimal::from(1));
        aggregate.insert("budget_lengths", StatResult::Counter1(lengths));

        let median = budget_length_median(&aggregate);
        assert_eq!(median, Some(Decimal::from(90)));
        assert_eq!(budget_alignment(median), "Quarterly");
        assert_eq!(budget_alignment(None), "Not known");
        assert_eq!(budget_alignment(Some(Decimal::from(365))), "Annually");
        assert_eq!(budget_alignment(Some(Decimal::from(400))), "Beyond one year");
    }

    #[test]
    fn test_median_averages_between_bins() {
        let mut aggregate = Aggregate::new();
        let mut lengths = Counter1::new();
        lengths.insert("100".to_string(), Decimal::from(1));
        lengths.insert("200".to_string(), Decimal::from(1));
        aggregate.insert("budget_lengths", StatResult::Counter1(lengths));
        assert_eq!(budget_length_median(&aggregate), Some(Decimal::from(150)));
    }

    #[test]
    fn test_empty_publisher_classifies_conservatively() {
        let mut aggregate = Aggregate::new();
        assert_eq!(transaction_frequency(&aggregate), "Beyond one year");
        assert_eq!(timelag(&aggregate, today()), "More than one year");
        assert_eq!(transaction_alignment(&aggregate), None);
        assert_eq!(budget_length_median(&aggregate), None);
        derive_publisher(
            &mut aggregate,
            "pub-x",
            &tables(),
            &converter(),
            today(),
        );
        assert_eq!(aggregate.number("publishers"), Decimal::ONE);
    }

    #[test]
    fn test_to_json_is_nested_document() {
        let tables = tables();
        let converter = converter();
        let evaluator = Evaluator::new(&tables, &converter).with_today(today());
        let mut builder = CorpusBuilder::new(&tables, &converter, today());
        let key = GroupKey::new("pub-a", "pub-a/file1.xml");
        builder.add(
            &key,
            evaluator
                .evaluate(&activity("XM-A-1", vec![disbursement("2013-03-01", "100")]))
                .unwrap(),
        );
        let report = builder.finish();
        let json = report.corpus.to_json();
        assert_eq!(json["activities"], serde_json::json!("1"));
        assert!(json["sum_transactions_by_type_by_year_usd"]["3"]["USD"]["2013"].is_string());
    }
}

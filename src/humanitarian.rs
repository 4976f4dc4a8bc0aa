// Humanitarian Classification - Explicit flags, sector inference, veto
//
// A record can be humanitarian by an explicit attribute (only meaningful in
// the versions that define it), or by carrying a humanitarian DAC sector
// code at activity or transaction level. An explicit not-humanitarian flag
// on the record vetoes every positive signal and is applied last.

use crate::codes::{dac_3_code, dac_5_code, MajorVersion, HUMANITARIAN_ATTRIB_VERSIONS};
use crate::comprehensiveness::all_true_and_not_empty;
use crate::record::{Element, Record};
use crate::stat::Counter1;

/// DAC 5-digit sector codes deemed humanitarian.
pub const HUMANITARIAN_SECTORS_DAC_5: [&str; 8] = [
    "72010", "72011", "72012", "72040", "72050", "73010", "74010", "74020",
];

/// DAC 3-digit sector category codes deemed humanitarian.
pub const HUMANITARIAN_SECTORS_DAC_3: [&str; 3] = ["720", "730", "740"];

// ============================================================================
// FACTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct HumanitarianFacts {
    pub by_attrib_activity: bool,
    pub not_by_attrib_activity: bool,
    pub by_attrib_transaction: bool,
    pub by_attrib: bool,
    pub by_sector: bool,
    pub is_humanitarian: bool,
}

fn is_true_flag(value: &str) -> bool {
    value == "1" || value == "true"
}

fn is_false_flag(value: &str) -> bool {
    value == "0" || value == "false"
}

/// Sectors of an element matching the DAC 5-digit vocabulary (explicitly, or
/// implicitly when no vocabulary is declared).
fn dac_5_sector_codes<'a>(element: &'a Element, major: MajorVersion) -> Vec<&'a str> {
    element
        .findall("sector")
        .filter(|s| matches!(s.attr("vocabulary"), None) || s.attr("vocabulary") == Some(dac_5_code(major)))
        .filter_map(|s| s.attr("code"))
        .collect()
}

fn dac_3_sector_codes<'a>(element: &'a Element, major: MajorVersion) -> Vec<&'a str> {
    element
        .findall("sector")
        .filter(|s| s.attr("vocabulary") == Some(dac_3_code(major)))
        .filter_map(|s| s.attr("code"))
        .collect()
}

/// Transactions that are not themselves explicitly flagged not-humanitarian.
fn transactions_not_vetoed(record: &Record) -> impl Iterator<Item = &Element> {
    record
        .root
        .findall("transaction")
        .filter(|t| !t.attr("humanitarian").map(is_false_flag).unwrap_or(false))
}

pub fn facts(record: &Record, version: &str, major: MajorVersion) -> HumanitarianFacts {
    let attrib = record.root.attr("humanitarian");
    let by_attrib_activity = attrib.map(is_true_flag).unwrap_or(false);
    let not_by_attrib_activity = attrib.map(is_false_flag).unwrap_or(false);
    let by_attrib_transaction = record
        .root
        .path_values("transaction/@humanitarian")
        .iter()
        .any(|v| is_true_flag(v));

    let attrib_version = HUMANITARIAN_ATTRIB_VERSIONS.contains(&version);
    let by_attrib = attrib_version
        && (by_attrib_activity || (by_attrib_transaction && !not_by_attrib_activity));

    let by_sector_activity = dac_5_sector_codes(&record.root, major)
        .iter()
        .any(|c| HUMANITARIAN_SECTORS_DAC_5.contains(c))
        || dac_3_sector_codes(&record.root, major)
            .iter()
            .any(|c| HUMANITARIAN_SECTORS_DAC_3.contains(c));

    let by_sector_transaction = transactions_not_vetoed(record).any(|t| {
        dac_5_sector_codes(t, major)
            .iter()
            .any(|c| HUMANITARIAN_SECTORS_DAC_5.contains(c))
            || dac_3_sector_codes(t, major)
                .iter()
                .any(|c| HUMANITARIAN_SECTORS_DAC_3.contains(c))
    });
    let by_sector =
        by_sector_activity || (by_sector_transaction && major == MajorVersion::Two);

    let mut is_humanitarian = by_attrib || by_sector;
    // The explicit record-level veto wins over everything; applied last.
    if not_by_attrib_activity {
        is_humanitarian = false;
    }

    HumanitarianFacts {
        by_attrib_activity,
        not_by_attrib_activity,
        by_attrib_transaction,
        by_attrib,
        by_sector,
        is_humanitarian,
    }
}

// ============================================================================
// FLAG COUNTER
// ============================================================================

fn flag(value: bool) -> rust_decimal::Decimal {
    if value {
        rust_decimal::Decimal::ONE
    } else {
        rust_decimal::Decimal::ZERO
    }
}

/// The full humanitarian flag battery for one record.
pub fn flag_counter(record: &Record, version: &str, major: MajorVersion) -> Counter1 {
    let facts = facts(record, version, major);
    let attrib_version = HUMANITARIAN_ATTRIB_VERSIONS.contains(&version);

    let scope_complete = attrib_version
        && all_true_and_not_empty(
            record
                .root
                .findall("humanitarian-scope")
                .map(|s| s.attr("type").is_some()),
        )
        && all_true_and_not_empty(
            record
                .root
                .findall("humanitarian-scope")
                .map(|s| s.attr("code").is_some()),
        );

    let clusters_vocab = attrib_version
        && record
            .root
            .path_values("sector/@vocabulary")
            .iter()
            .any(|v| *v == "10");

    let scope_vocabs = record.root.path_values("humanitarian-scope/@vocabulary");
    let glide = attrib_version && !scope_vocabs.is_empty() && scope_vocabs.iter().any(|v| *v == "1-2");
    let hrp = attrib_version && !scope_vocabs.is_empty() && scope_vocabs.iter().any(|v| *v == "2-1");

    let mut out = Counter1::new();
    out.insert("is_humanitarian".into(), flag(facts.is_humanitarian));
    out.insert("is_humanitarian_by_attrib".into(), flag(facts.by_attrib));
    out.insert(
        "contains_humanitarian_scope".into(),
        flag(facts.is_humanitarian && scope_complete),
    );
    out.insert(
        "contains_humanitarian_scope_without_humanitarian".into(),
        flag(!facts.is_humanitarian && scope_complete),
    );
    out.insert(
        "uses_humanitarian_clusters_vocab".into(),
        flag(facts.is_humanitarian && clusters_vocab),
    );
    out.insert(
        "uses_humanitarian_clusters_vocab_without_humanitarian".into(),
        flag(!facts.is_humanitarian && clusters_vocab),
    );
    out.insert(
        "uses_humanitarian_glide_codes".into(),
        flag(facts.is_humanitarian && glide),
    );
    out.insert(
        "uses_humanitarian_glide_codes_without_humanitarian".into(),
        flag(!facts.is_humanitarian && glide),
    );
    out.insert(
        "uses_humanitarian_hrp_codes".into(),
        flag(facts.is_humanitarian && hrp),
    );
    out.insert(
        "uses_humanitarian_hrp_codes_without_humanitarian".into(),
        flag(!facts.is_humanitarian && hrp),
    );
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(root: Element) -> Record {
        Record::activity(root, Some("2.03".to_string()))
    }

    #[test]
    fn test_explicit_flag_on_defining_version() {
        let record = activity(Element::new("iati-activity").with_attr("humanitarian", "1"));
        let f = facts(&record, "2.03", MajorVersion::Two);
        assert!(f.by_attrib);
        assert!(f.is_humanitarian);
    }

    #[test]
    fn test_explicit_flag_ignored_on_other_versions() {
        let record = activity(Element::new("iati-activity").with_attr("humanitarian", "1"));
        let f = facts(&record, "2.01", MajorVersion::Two);
        assert!(!f.by_attrib);
        assert!(!f.is_humanitarian);
    }

    #[test]
    fn test_sector_inference_at_activity_level() {
        let record = activity(
            Element::new("iati-activity")
                .with_child(Element::new("sector").with_attr("code", "72010")),
        );
        let f = facts(&record, "2.01", MajorVersion::Two);
        assert!(f.by_sector);
        assert!(f.is_humanitarian);
    }

    #[test]
    fn test_transaction_sector_inference_only_v2() {
        let root = Element::new("iati-activity").with_child(
            Element::new("transaction")
                .with_child(Element::new("sector").with_attr("code", "72010")),
        );
        let v2 = facts(&activity(root.clone()), "2.03", MajorVersion::Two);
        assert!(v2.is_humanitarian);

        let record = Record::activity(root, Some("1.05".to_string()));
        let v1 = facts(&record, "1.05", MajorVersion::One);
        assert!(!v1.is_humanitarian);
    }

    #[test]
    fn test_not_humanitarian_veto_beats_sector_signals() {
        let record = activity(
            Element::new("iati-activity")
                .with_attr("humanitarian", "0")
                .with_child(Element::new("sector").with_attr("code", "72010"))
                .with_child(
                    Element::new("transaction")
                        .with_attr("humanitarian", "1")
                        .with_child(Element::new("sector").with_attr("code", "72010")),
                ),
        );
        let f = facts(&record, "2.03", MajorVersion::Two);
        assert!(!f.is_humanitarian);
        let flags = flag_counter(&record, "2.03", MajorVersion::Two);
        assert_eq!(flags["is_humanitarian"], rust_decimal::Decimal::ZERO);
    }

    #[test]
    fn test_vetoed_transaction_does_not_infer() {
        let record = activity(Element::new("iati-activity").with_child(
            Element::new("transaction").with_attr("humanitarian", "0").with_child(
                Element::new("sector").with_attr("code", "72010"),
            ),
        ));
        let f = facts(&record, "2.03", MajorVersion::Two);
        assert!(!f.is_humanitarian);
    }

    #[test]
    fn test_scope_flags() {
        let record = activity(
            Element::new("iati-activity")
                .with_attr("humanitarian", "1")
                .with_child(
                    Element::new("humanitarian-scope")
                        .with_attr("type", "1")
                        .with_attr("code", "FL-2014-000123")
                        .with_attr("vocabulary", "1-2"),
                ),
        );
        let flags = flag_counter(&record, "2.03", MajorVersion::Two);
        assert_eq!(flags["contains_humanitarian_scope"], rust_decimal::Decimal::ONE);
        assert_eq!(flags["uses_humanitarian_glide_codes"], rust_decimal::Decimal::ONE);
        assert_eq!(flags["uses_humanitarian_hrp_codes"], rust_decimal::Decimal::ZERO);
    }
}

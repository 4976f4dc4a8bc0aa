// Comprehensiveness Engine - Currentness classification and criterion battery
//
// Scoring only applies to "current" activities. A current record is scored
// against a fixed battery of criteria, each with a presence test, a stricter
// validity test, and optionally a denominator override that restricts which
// records the criterion is measured over. Non-current records contribute
// nothing at all: no numerator, no denominator.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::codes::{
    actual_end_code, actual_start_code, commitment_code, dac_3_code, dac_5_code,
    disbursement_code, expenditure_code, funding_role_code, extending_role_code,
    implementing_role_code, incoming_funds_code, planned_end_code, planned_start_code,
    MajorVersion,
};
use crate::dates::{add_years, iso_date, value_date};
use crate::evaluate::LeafContext;
use crate::record::Element;
use crate::reference::{
    CL_ACTIVITY_STATUS, CL_AID_TYPE, CL_BUDGET_NOT_PROVIDED, CL_CURRENCY,
    CL_DOCUMENT_CATEGORY, CL_SECTOR, CL_SECTOR_CATEGORY, CL_VERSION,
};
use crate::stat::Counter1;

/// Non-empty and every element true.
pub(crate) fn all_true_and_not_empty<I: IntoIterator<Item = bool>>(iter: I) -> bool {
    let mut any = false;
    for value in iter {
        if !value {
            return false;
        }
        any = true;
    }
    any
}

// ============================================================================
// CURRENTNESS
// ============================================================================

/// Why a record counts as current. The numeric values match the historical
/// reporting convention for this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentReason {
    /// No planned end date and the status code says still active (2 or 4).
    StillActiveStatus = 1,
    /// An actual end date within the trailing twelve months.
    RecentActualEnd = 2,
    /// A planned end date still in the future.
    FuturePlannedEnd = 3,
}

fn end_dates(ctx: &LeafContext, type_code: &str) -> Vec<NaiveDate> {
    ctx.record
        .root
        .findall("activity-date")
        .filter(|d| d.attr("type") == Some(type_code))
        .filter_map(iso_date)
        .collect()
}

/// Classify a record's currentness. Run once per record, no retained state.
pub fn current_reason(ctx: &LeafContext) -> Option<CurrentReason> {
    let major = ctx.major();
    let planned_ends = end_dates(ctx, planned_end_code(major));
    let actual_ends = end_dates(ctx, actual_end_code(major));
    let status_code = ctx
        .record
        .root
        .find("activity-status")
        .and_then(|s| s.attr("code"));

    if planned_ends.is_empty() {
        if let Some(code) = status_code {
            if code == "2" || code == "4" {
                return Some(CurrentReason::StillActiveStatus);
            }
        }
    }

    let year_ago = add_years(ctx.today, -1);
    if actual_ends.iter().any(|d| *d >= year_ago && *d <= ctx.today) {
        return Some(CurrentReason::RecentActualEnd);
    }

    if planned_ends.iter().any(|d| *d >= ctx.today) {
        return Some(CurrentReason::FuturePlannedEnd);
    }

    None
}

// ============================================================================
// FIELD-LEVEL VALIDITY HELPERS
// ============================================================================

fn decimal_or_zero(raw: Option<&str>) -> Decimal {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(Decimal::ZERO)
}

fn valid_iso_date_attr(element: &Element) -> bool {
    element.attr("iso-date").is_some() && iso_date(element).is_some()
}

fn valid_value_date_attr(element: &Element) -> bool {
    element.attr("value-date").is_some() && value_date(element).is_some()
}

/// A value element whose text is a well-formed decimal.
fn valid_value(element: Option<&Element>) -> bool {
    element
        .and_then(Element::text_str)
        .map(|t| t.trim().parse::<Decimal>().is_ok())
        .unwrap_or(false)
}

fn valid_url_value(url: Option<&str>) -> bool {
    url.map(|u| u.contains("://")).unwrap_or(false)
}

/// `lat lng`, both in range, and not the (0, 0) point in international
/// waters which is near-certainly not actual data.
fn valid_coords(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split(' ').collect();
    if parts.len() != 2 {
        return false;
    }
    let (lat, lng) = match (parts[0].parse::<Decimal>(), parts[1].parse::<Decimal>()) {
        (Ok(lat), Ok(lng)) => (lat, lng),
        _ => return false,
    };
    if lat.is_zero() && lng.is_zero() {
        return false;
    }
    lat >= Decimal::from(-90)
        && lat <= Decimal::from(90)
        && lng >= Decimal::from(-180)
        && lng <= Decimal::from(180)
}

/// True when the elements are absent, a single entry, or their percentage
/// attributes sum to exactly 100. With `by_vocab`, the rule applies within
/// each vocabulary group separately.
fn empty_or_percentage_sum_is_100(elements: &[&Element], by_vocab: bool) -> bool {
    if elements.is_empty() {
        return true;
    }
    if by_vocab {
        let mut groups: BTreeMap<Option<&str>, Vec<&Element>> = BTreeMap::new();
        for element in elements {
            groups.entry(element.attr("vocabulary")).or_default().push(*element);
        }
        groups.values().all(|group| percentage_group_ok(group))
    } else {
        percentage_group_ok(elements)
    }
}

fn percentage_group_ok(group: &[&Element]) -> bool {
    group.len() == 1
        || group
            .iter()
            .map(|e| decimal_or_zero(e.attr("percentage")))
            .sum::<Decimal>()
            == Decimal::from(100)
}

// ============================================================================
// SHARED RECORD FACTS
// ============================================================================

fn transactions<'a>(ctx: &'a LeafContext) -> Vec<&'a Element> {
    ctx.record.root.findall("transaction").collect()
}

fn transaction_type(txn: &Element) -> Option<&str> {
    txn.find("transaction-type").and_then(|t| t.attr("code"))
}

fn commitment_transactions<'a>(ctx: &'a LeafContext) -> Vec<&'a Element> {
    let code = commitment_code(ctx.major());
    transactions(ctx)
        .into_iter()
        .filter(|t| matches!(transaction_type(t), Some(c) if c == code || c == "11"))
        .collect()
}

fn spend_transactions<'a>(ctx: &'a LeafContext) -> Vec<&'a Element> {
    let major = ctx.major();
    let disb = disbursement_code(major);
    let exp = expenditure_code(major);
    transactions(ctx)
        .into_iter()
        .filter(|t| matches!(transaction_type(t), Some(c) if c == disb || c == exp))
        .collect()
}

/// Transactions relevant to traceability: incoming funds, incoming
/// commitments (11) and incoming pledges (13).
fn traceability_transactions<'a>(ctx: &'a LeafContext) -> Vec<&'a Element> {
    let incoming = incoming_funds_code(ctx.major());
    transactions(ctx)
        .into_iter()
        .filter(|t| matches!(transaction_type(t), Some(c) if c == incoming || c == "11" || c == "13"))
        .collect()
}

fn participating_refs_with_role<'a>(ctx: &'a LeafContext, role: &str) -> Vec<&'a str> {
    ctx.record
        .root
        .findall("participating-org")
        .filter(|o| o.attr("role") == Some(role))
        .filter_map(|o| o.attr("ref"))
        .collect()
}

/// A donor publisher reports itself as funding or extending, and not as
/// implementing.
fn is_donor_publisher(ctx: &LeafContext) -> bool {
    let major = ctx.major();
    let reporting_ref = match ctx.record.root.find("reporting-org").and_then(|o| o.attr("ref")) {
        Some(r) => r,
        None => return false,
    };
    let mut funder_refs = participating_refs_with_role(ctx, funding_role_code(major));
    funder_refs.extend(participating_refs_with_role(ctx, extending_role_code(major)));
    let implementing_refs = participating_refs_with_role(ctx, implementing_role_code(major));
    funder_refs.contains(&reporting_ref) && !implementing_refs.contains(&reporting_ref)
}

/// Languages used by one title or description element, resolved against the
/// record's default language. Version 2 text lives in narrative children.
fn element_languages<'a>(ctx: &'a LeafContext, element: &'a Element) -> Vec<&'a str> {
    let default_lang = ctx.record.root.attr("xml:lang");
    let mut langs = Vec::new();
    if ctx.major() == MajorVersion::Two {
        for narrative in element.findall("narrative") {
            if let Some(lang) = narrative.attr("xml:lang").or(default_lang) {
                langs.push(lang);
            }
        }
    } else if let Some(lang) = element.attr("xml:lang").or(default_lang) {
        langs.push(lang);
    }
    langs.sort_unstable();
    langs.dedup();
    langs
}

fn is_text_in_element(ctx: &LeafContext, name: &str) -> bool {
    match ctx.major() {
        MajorVersion::Two => ctx
            .record
            .root
            .findall(name)
            .any(|e| e.findall("narrative").any(|n| n.text_str().map(|t| !t.is_empty()).unwrap_or(false))),
        MajorVersion::One => ctx
            .record
            .root
            .findall(name)
            .any(|e| e.text_str().map(|t| !t.is_empty()).unwrap_or(false)),
    }
}

// ============================================================================
// PRESENCE PREDICATES
// ============================================================================

fn p_version(ctx: &LeafContext) -> bool {
    ctx.record.file_version.is_some()
}

fn p_reporting_org(ctx: &LeafContext) -> bool {
    ctx.record
        .root
        .find("reporting-org")
        .and_then(|o| o.attr("ref"))
        .is_some()
        && is_text_in_element(ctx, "reporting-org")
}

fn p_iati_identifier(ctx: &LeafContext) -> bool {
    ctx.record.iati_identifier().map(|t| !t.is_empty()).unwrap_or(false)
}

fn p_participating_org(ctx: &LeafContext) -> bool {
    ctx.record.root.find("participating-org").is_some()
}

fn p_title(ctx: &LeafContext) -> bool {
    is_text_in_element(ctx, "title")
}

fn p_description(ctx: &LeafContext) -> bool {
    is_text_in_element(ctx, "description")
}

fn p_activity_status(ctx: &LeafContext) -> bool {
    ctx.record.root.find("activity-status").is_some()
}

fn p_activity_date(ctx: &LeafContext) -> bool {
    ctx.record.root.find("activity-date").is_some()
}

fn p_sector(ctx: &LeafContext) -> bool {
    ctx.record.root.find("sector").is_some()
        || (ctx.major() != MajorVersion::One
            && all_true_and_not_empty(
                transactions(ctx).iter().map(|t| t.find("sector").is_some()),
            ))
}

fn p_country_or_region(ctx: &LeafContext) -> bool {
    ctx.record.root.find("recipient-country").is_some()
        || ctx.record.root.find("recipient-region").is_some()
        || (ctx.major() != MajorVersion::One
            && all_true_and_not_empty(transactions(ctx).iter().map(|t| {
                t.find("recipient-country").is_some() || t.find("recipient-region").is_some()
            })))
}

fn p_transaction_commitment(ctx: &LeafContext) -> bool {
    !commitment_transactions(ctx).is_empty()
}

fn p_transaction_spend(ctx: &LeafContext) -> bool {
    !spend_transactions(ctx).is_empty()
}

fn p_transaction_currency(ctx: &LeafContext) -> bool {
    let has_default = ctx.record.root.attr("default-currency").is_some();
    all_true_and_not_empty(transactions(ctx).iter().map(|t| {
        let has_value_date = t.findall("value").any(|v| v.attr("value-date").is_some());
        let has_currency = has_default || t.findall("value").any(|v| v.attr("currency").is_some());
        has_value_date && has_currency
    }))
}

fn p_transaction_traceability(ctx: &LeafContext) -> bool {
    all_true_and_not_empty(traceability_transactions(ctx).iter().map(|t| {
        t.find("provider-org")
            .and_then(|o| o.attr("provider-activity-id"))
            .is_some()
    })) || is_donor_publisher(ctx)
}

fn p_budget(ctx: &LeafContext) -> bool {
    ctx.record.root.find("budget").is_some()
}

fn p_budget_not_provided(ctx: &LeafContext) -> bool {
    ctx.record.root.attr("budget-not-provided").is_some()
}

fn p_contact_info(ctx: &LeafContext) -> bool {
    !ctx.record.root.path_elements("contact-info/email").is_empty()
}

fn p_location(ctx: &LeafContext) -> bool {
    for path in [
        "location/point/pos",
        "location/name",
        "location/description",
        "location/location-administrative",
    ] {
        if !ctx.record.root.path_elements(path).is_empty() {
            return true;
        }
    }
    false
}

fn p_location_point_pos(ctx: &LeafContext) -> bool {
    !ctx.record.root.path_elements("location/point/pos").is_empty()
}

fn dac_sectors<'a>(element: &'a Element, major: MajorVersion) -> Vec<&'a Element> {
    element
        .findall("sector")
        .filter(|s| {
            s.attr("vocabulary").is_none()
                || s.attr("vocabulary") == Some(dac_5_code(major))
                || s.attr("vocabulary") == Some(dac_3_code(major))
        })
        .collect()
}

fn p_sector_dac(ctx: &LeafContext) -> bool {
    let major = ctx.major();
    if !dac_sectors(&ctx.record.root, major).is_empty() {
        return true;
    }
    major != MajorVersion::One
        && all_true_and_not_empty(
            transactions(ctx)
                .iter()
                .map(|t| !dac_sectors(t, major).is_empty()),
        )
}

fn p_capital_spend(ctx: &LeafContext) -> bool {
    ctx.record
        .root
        .find("capital-spend")
        .and_then(|c| c.attr("percentage"))
        .is_some()
}

fn p_document_link(ctx: &LeafContext) -> bool {
    ctx.record.root.find("document-link").is_some()
}

fn website_elements<'a>(ctx: &'a LeafContext) -> Vec<&'a Element> {
    match ctx.major() {
        MajorVersion::One => ctx.record.root.findall("activity-website").collect(),
        MajorVersion::Two => ctx
            .record
            .root
            .findall("document-link")
            .filter(|d| d.findall("category").any(|c| c.attr("code") == Some("A12")))
            .collect(),
    }
}

fn p_activity_website(ctx: &LeafContext) -> bool {
    !website_elements(ctx).is_empty()
}

fn uses_country_language(ctx: &LeafContext, element_name: &str, country_langs: &[String]) -> bool {
    ctx.record
        .root
        .findall(element_name)
        .flat_map(|e| element_languages(ctx, e))
        .any(|lang| country_langs.iter().any(|c| c == lang))
}

fn p_recipient_language(ctx: &LeafContext) -> bool {
    let countries: Vec<&Element> = ctx.record.root.findall("recipient-country").collect();
    if countries.len() != 1 {
        return false;
    }
    let country_langs = countries[0]
        .attr("code")
        .map(|code| ctx.tables.languages_for(code))
        .unwrap_or(&[]);
    uses_country_language(ctx, "title", country_langs)
        && uses_country_language(ctx, "description", country_langs)
}

fn p_conditions_attached(ctx: &LeafContext) -> bool {
    ctx.record
        .root
        .find("conditions")
        .and_then(|c| c.attr("attached"))
        .is_some()
}

fn p_result_indicator(ctx: &LeafContext) -> bool {
    !ctx.record.root.path_elements("result/indicator").is_empty()
}

fn p_aid_type(ctx: &LeafContext) -> bool {
    let defaults: Vec<&str> = ctx.record.root.path_values("default-aid-type/@code");
    if !defaults.is_empty() {
        return true;
    }
    all_true_and_not_empty(
        transactions(ctx)
            .iter()
            .map(|t| !t.path_values("aid-type/@code").is_empty()),
    )
}

// ============================================================================
// VALIDITY PREDICATES
// ============================================================================

fn v_version(ctx: &LeafContext) -> bool {
    p_version(ctx)
        && ctx
            .record
            .file_version
            .as_deref()
            .map(|v| ctx.tables.in_codelist(ctx.major(), CL_VERSION, v))
            .unwrap_or(false)
}

fn v_iati_identifier(ctx: &LeafContext) -> bool {
    if !p_iati_identifier(ctx) {
        return false;
    }
    // The 1.x standard never required prefix-consistent identifiers.
    if ctx.major() == MajorVersion::One {
        return true;
    }
    let identifier = ctx.record.iati_identifier().unwrap_or("");
    let reporting_ref = ctx.record.root.find("reporting-org").and_then(|o| o.attr("ref"));
    let previous_refs: Vec<&str> = ctx
        .record
        .root
        .findall("other-identifier")
        .filter(|o| o.attr("type") == Some("B1"))
        .filter_map(|o| o.attr("ref"))
        .collect();
    reporting_ref
        .map(|r| identifier.starts_with(r))
        .unwrap_or(false)
        || previous_refs.iter().any(|r| identifier.starts_with(r))
}

fn v_participating_org(ctx: &LeafContext) -> bool {
    p_participating_org(ctx)
        && ctx
            .record
            .root
            .path_values("participating-org/@role")
            .contains(&funding_role_code(ctx.major()))
}

fn v_activity_status(ctx: &LeafContext) -> bool {
    p_activity_status(ctx)
        && all_true_and_not_empty(
            ctx.record
                .root
                .path_values("activity-status/@code")
                .iter()
                .map(|c| ctx.tables.in_codelist(ctx.major(), CL_ACTIVITY_STATUS, c)),
        )
}

fn v_activity_date(ctx: &LeafContext) -> bool {
    let major = ctx.major();
    let has_start = ctx.record.root.findall("activity-date").any(|d| {
        d.attr("type") == Some(planned_start_code(major))
            || d.attr("type") == Some(actual_start_code(major))
    });
    p_activity_date(ctx)
        && has_start
        && all_true_and_not_empty(
            ctx.record
                .root
                .findall("activity-date")
                .map(valid_iso_date_attr),
        )
}

fn v_sector(ctx: &LeafContext) -> bool {
    let sectors: Vec<&Element> = ctx.record.root.findall("sector").collect();
    p_sector(ctx) && empty_or_percentage_sum_is_100(&sectors, true)
}

fn v_country_or_region(ctx: &LeafContext) -> bool {
    let mut targets: Vec<&Element> = ctx.record.root.findall("recipient-country").collect();
    targets.extend(ctx.record.root.findall("recipient-region"));
    p_country_or_region(ctx) && empty_or_percentage_sum_is_100(&targets, false)
}

fn valid_financial_transactions(txns: &[&Element]) -> bool {
    txns.iter().all(|t| valid_value(t.find("value")))
        && all_true_and_not_empty(txns.iter().map(|t| {
            t.findall("transaction-date").any(|d| valid_iso_date_attr(d))
                || t.findall("value").any(|v| valid_value_date_attr(v))
        }))
}

fn v_transaction_commitment(ctx: &LeafContext) -> bool {
    p_transaction_commitment(ctx) && valid_financial_transactions(&commitment_transactions(ctx))
}

fn v_transaction_spend(ctx: &LeafContext) -> bool {
    p_transaction_spend(ctx) && valid_financial_transactions(&spend_transactions(ctx))
}

fn v_transaction_currency(ctx: &LeafContext) -> bool {
    // Vacuously true with no transactions, matching the methodology.
    let major = ctx.major();
    let default_currency = ctx.record.root.attr("default-currency");
    transactions(ctx).iter().all(|t| {
        let dates_ok = t.findall("value").all(valid_value_date_attr);
        let mut codes: Vec<&str> = t.findall("value").filter_map(|v| v.attr("currency")).collect();
        codes.extend(default_currency);
        let codes_ok = codes
            .iter()
            .all(|c| ctx.tables.in_codelist(major, CL_CURRENCY, c));
        dates_ok && codes_ok
    })
}

fn v_budget(ctx: &LeafContext) -> bool {
    p_budget(ctx)
        && ctx.record.root.findall("budget").all(|b| {
            b.find("period-start").map(valid_iso_date_attr).unwrap_or(false)
                && b.find("period-end").map(valid_iso_date_attr).unwrap_or(false)
                && b.find("value").map(valid_value_date_attr).unwrap_or(false)
                && valid_value(b.find("value"))
        })
}

fn v_budget_not_provided(ctx: &LeafContext) -> bool {
    p_budget_not_provided(ctx)
        && ctx
            .record
            .root
            .attr("budget-not-provided")
            .map(|c| ctx.tables.in_codelist(ctx.major(), CL_BUDGET_NOT_PROVIDED, c))
            .unwrap_or(false)
}

fn v_location_point_pos(ctx: &LeafContext) -> bool {
    all_true_and_not_empty(
        ctx.record
            .root
            .path_elements("location/point/pos")
            .iter()
            .map(|pos| pos.text_str().map(valid_coords).unwrap_or(false)),
    )
}

fn v_sector_dac(ctx: &LeafContext) -> bool {
    if !p_sector_dac(ctx) {
        return false;
    }
    let major = ctx.major();
    let dac5_ok = ctx
        .record
        .root
        .findall("sector")
        .filter(|s| s.attr("vocabulary").is_none() || s.attr("vocabulary") == Some(dac_5_code(major)))
        .all(|s| {
            s.attr("code")
                .map(|c| ctx.tables.in_codelist(major, CL_SECTOR, c))
                .unwrap_or(false)
        });
    let dac3_ok = ctx
        .record
        .root
        .findall("sector")
        .filter(|s| s.attr("vocabulary") == Some(dac_3_code(major)))
        .all(|s| {
            s.attr("code")
                .map(|c| ctx.tables.in_codelist(major, CL_SECTOR_CATEGORY, c))
                .unwrap_or(false)
        });
    dac5_ok && dac3_ok
}

fn v_document_link(ctx: &LeafContext) -> bool {
    all_true_and_not_empty(ctx.record.root.findall("document-link").map(|d| {
        valid_url_value(d.attr("url"))
            && d.find("category")
                .and_then(|c| c.attr("code"))
                .map(|c| ctx.tables.in_codelist(ctx.major(), CL_DOCUMENT_CATEGORY, c))
                .unwrap_or(false)
    }))
}

fn v_activity_website(ctx: &LeafContext) -> bool {
    all_true_and_not_empty(website_elements(ctx).iter().map(|e| match ctx.major() {
        MajorVersion::One => valid_url_value(e.text_str()),
        MajorVersion::Two => valid_url_value(e.attr("url")),
    }))
}

fn v_aid_type(ctx: &LeafContext) -> bool {
    if !p_aid_type(ctx) {
        return false;
    }
    let major = ctx.major();
    let defaults: Vec<&str> = ctx.record.root.path_values("default-aid-type/@code");
    let defaults_ok = all_true_and_not_empty(
        defaults
            .iter()
            .map(|c| ctx.tables.in_codelist(major, CL_AID_TYPE, c)),
    );
    let per_transaction_ok = all_true_and_not_empty(transactions(ctx).iter().map(|t| {
        t.path_values("aid-type/@code")
            .iter()
            .any(|c| ctx.tables.in_codelist(major, CL_AID_TYPE, c))
    }));
    defaults_ok || per_transaction_ok
}

// ============================================================================
// DENOMINATOR OVERRIDES
// ============================================================================

fn d_recipient_language(ctx: &LeafContext) -> bool {
    ctx.record.root.findall("recipient-country").count() == 1
}

/// Spend is only expected from activities that started more than a year ago.
fn d_transaction_spend(ctx: &LeafContext) -> bool {
    match ctx.start_date() {
        Some(start) => start < ctx.today && (ctx.today - start).num_days() > 365,
        None => false,
    }
}

fn d_transaction_traceability(ctx: &LeafContext) -> bool {
    !traceability_transactions(ctx).is_empty() || is_donor_publisher(ctx)
}

// ============================================================================
// THE CRITERION BATTERY
// ============================================================================

type Predicate = fn(&LeafContext) -> bool;

/// One comprehensiveness criterion: presence test, validity test, and an
/// optional denominator override restricting which records it applies to.
pub struct Criterion {
    pub name: &'static str,
    pub presence: Predicate,
    pub validity: Predicate,
    pub denominator: Option<Predicate>,
}

pub const CRITERIA: &[Criterion] = &[
    Criterion { name: "version", presence: p_version, validity: v_version, denominator: None },
    Criterion { name: "reporting-org", presence: p_reporting_org, validity: p_reporting_org, denominator: None },
    Criterion { name: "iati-identifier", presence: p_iati_identifier, validity: v_iati_identifier, denominator: None },
    Criterion { name: "participating-org", presence: p_participating_org, validity: v_participating_org, denominator: None },
    Criterion { name: "title", presence: p_title, validity: p_title, denominator: None },
    Criterion { name: "description", presence: p_description, validity: p_description, denominator: None },
    Criterion { name: "activity-status", presence: p_activity_status, validity: v_activity_status, denominator: None },
    Criterion { name: "activity-date", presence: p_activity_date, validity: v_activity_date, denominator: None },
    Criterion { name: "sector", presence: p_sector, validity: v_sector, denominator: None },
    Criterion { name: "country_or_region", presence: p_country_or_region, validity: v_country_or_region, denominator: None },
    Criterion { name: "transaction_commitment", presence: p_transaction_commitment, validity: v_transaction_commitment, denominator: None },
    Criterion { name: "transaction_spend", presence: p_transaction_spend, validity: v_transaction_spend, denominator: Some(d_transaction_spend) },
    Criterion { name: "transaction_currency", presence: p_transaction_currency, validity: v_transaction_currency, denominator: None },
    Criterion { name: "transaction_traceability", presence: p_transaction_traceability, validity: p_transaction_traceability, denominator: Some(d_transaction_traceability) },
    Criterion { name: "budget", presence: p_budget, validity: v_budget, denominator: None },
    Criterion { name: "budget_not_provided", presence: p_budget_not_provided, validity: v_budget_not_provided, denominator: None },
    Criterion { name: "contact-info", presence: p_contact_info, validity: p_contact_info, denominator: None },
    Criterion { name: "location", presence: p_location, validity: p_location, denominator: None },
    Criterion { name: "location_point_pos", presence: p_location_point_pos, validity: v_location_point_pos, denominator: None },
    Criterion { name: "sector_dac", presence: p_sector_dac, validity: v_sector_dac, denominator: None },
    Criterion { name: "capital-spend", presence: p_capital_spend, validity: p_capital_spend, denominator: None },
    Criterion { name: "document-link", presence: p_document_link, validity: v_document_link, denominator: None },
    Criterion { name: "activity-website", presence: p_activity_website, validity: v_activity_website, denominator: None },
    Criterion { name: "recipient_language", presence: p_recipient_language, validity: p_recipient_language, denominator: Some(d_recipient_language) },
    Criterion { name: "conditions_attached", presence: p_conditions_attached, validity: p_conditions_attached, denominator: None },
    Criterion { name: "result_indicator", presence: p_result_indicator, validity: p_result_indicator, denominator: None },
    Criterion { name: "aid_type", presence: p_aid_type, validity: v_aid_type, denominator: None },
];

// ============================================================================
// SCORING
// ============================================================================

fn zero_one(value: bool) -> Decimal {
    if value {
        Decimal::ONE
    } else {
        Decimal::ZERO
    }
}

/// Numerator counter over the chosen test. Empty for non-current records. A
/// criterion with a failing denominator override scores zero regardless of
/// the test outcome, so the numerator never exceeds the denominator.
pub fn score(ctx: &LeafContext, with_validation: bool) -> Counter1 {
    if ctx.current_reason().is_none() {
        return Counter1::new();
    }
    let mut out = Counter1::new();
    for criterion in CRITERIA {
        let test = if with_validation {
            criterion.validity
        } else {
            criterion.presence
        };
        let in_denominator = criterion.denominator.map(|d| d(ctx)).unwrap_or(true);
        out.insert(criterion.name.into(), zero_one(test(ctx) && in_denominator));
    }
    out
}

/// The three override denominators, 1 or 0 per criterion. Empty map for
/// non-current records so they dilute nothing.
pub fn denominators(ctx: &LeafContext) -> Counter1 {
    let mut out = Counter1::new();
    if ctx.current_reason().is_none() {
        for criterion in CRITERIA.iter().filter(|c| c.denominator.is_some()) {
            out.insert(criterion.name.into(), Decimal::ZERO);
        }
        return out;
    }
    for criterion in CRITERIA {
        if let Some(denominator) = criterion.denominator {
            out.insert(criterion.name.into(), zero_one(denominator(ctx)));
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

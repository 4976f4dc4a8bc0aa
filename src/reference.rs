// Reference Tables - Read-only lookup structures
//
// Codelist value sets per standard major version, organisation identifier
// prefix checks, country-to-language mappings and per-publisher reference
// spend figures. All of it is built once at process start by the caller and
// then shared read-only across every evaluation; nothing here mutates after
// construction.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::codes::MajorVersion;

// ============================================================================
// CODELIST NAMES
// ============================================================================

pub const CL_VERSION: &str = "Version";
pub const CL_ACTIVITY_STATUS: &str = "ActivityStatus";
pub const CL_CURRENCY: &str = "Currency";
pub const CL_SECTOR: &str = "Sector";
pub const CL_SECTOR_CATEGORY: &str = "SectorCategory";
pub const CL_DOCUMENT_CATEGORY: &str = "DocumentCategory";
pub const CL_AID_TYPE: &str = "AidType";
pub const CL_BUDGET_NOT_PROVIDED: &str = "BudgetNotProvided";
pub const CL_ORG_REGISTRATION_AGENCY: &str = "OrganisationRegistrationAgency";
pub const CL_CRS_CHANNEL_CODE: &str = "CRSChannelCode";

// ============================================================================
// REFERENCE SPEND
// ============================================================================

/// Static per-publisher spend figures from the transparency indicator data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSpend {
    pub publisher_name: String,
    pub spend_2014: Option<Decimal>,
    pub spend_2015: Option<Decimal>,
    pub official_forecast_2015: Option<Decimal>,
    pub currency: String,
    pub spend_data_error_reported: bool,
    pub dac: bool,
}

// ============================================================================
// REFERENCE TABLES
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    codelists: BTreeMap<(MajorVersion, String), BTreeSet<String>>,
    country_languages: BTreeMap<String, Vec<String>>,
    reference_spend: BTreeMap<String, ReferenceSpend>,
}

impl ReferenceTables {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    pub fn add_codelist<I, S>(&mut self, major: MajorVersion, name: &str, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codelists
            .entry((major, name.to_string()))
            .or_default()
            .extend(codes.into_iter().map(Into::into));
    }

    pub fn add_country_language(&mut self, country: impl Into<String>, language: impl Into<String>) {
        self.country_languages
            .entry(country.into())
            .or_default()
            .push(language.into());
    }

    /// Decode the country/language CSV (country code in the first column,
    /// language code in the third).
    pub fn add_country_languages_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(reader);
        for row in csv_reader.records() {
            let row = row.context("failed to read country language row")?;
            let country = row.get(0).context("country language row missing country")?;
            let language = row.get(2).context("country language row missing language")?;
            self.add_country_language(country, language);
        }
        Ok(())
    }

    pub fn add_reference_spend(&mut self, publisher: impl Into<String>, spend: ReferenceSpend) {
        self.reference_spend.insert(publisher.into(), spend);
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn codelist(&self, major: MajorVersion, name: &str) -> Option<&BTreeSet<String>> {
        self.codelists.get(&(major, name.to_string()))
    }

    pub fn in_codelist(&self, major: MajorVersion, name: &str, code: &str) -> bool {
        self.codelist(major, name)
            .map(|codes| codes.contains(code))
            .unwrap_or(false)
    }

    /// Whether a declared version string is recognised. The version codelist
    /// of the 2.x standard is authoritative for both majors.
    pub fn version_is_known(&self, version: &str) -> bool {
        self.in_codelist(MajorVersion::Two, CL_VERSION, version)
    }

    /// Whether an organisation identifier starts with a known registration
    /// agency prefix or CRS channel code.
    pub fn valid_org_prefix(&self, major: MajorVersion, org_id: &str) -> bool {
        for name in [CL_ORG_REGISTRATION_AGENCY, CL_CRS_CHANNEL_CODE] {
            if let Some(codes) = self.codelist(major, name) {
                if codes.iter().any(|prefix| org_id.starts_with(prefix.as_str())) {
                    return true;
                }
            }
        }
        false
    }

    pub fn languages_for(&self, country: &str) -> &[String] {
        self.country_languages
            .get(country)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reference_spend(&self, publisher: &str) -> Option<&ReferenceSpend> {
        self.reference_spend.get(publisher)
    }
}

// ============================================================================
// TESTS
// ============================================================================

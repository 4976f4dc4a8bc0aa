// Currency Conversion - Historical USD normalization
//
// Rates are local-currency-per-USD, keyed by currency and year. Conversion
// never fails: a currency or year the table does not cover, or a recorded
// rate of exactly zero, contributes zero to the aggregate. IATI data often
// predates or omits rate coverage, and silently undercounting beats failing
// a whole aggregation run.

use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::Anomaly;

// ============================================================================
// EXCHANGE RATE TABLE
// ============================================================================

/// currency code -> year -> rate (local units per USD). Immutable after load.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRateTable {
    rates: BTreeMap<String, BTreeMap<i32, Decimal>>,
}

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, currency: impl Into<String>, year: i32, rate: Decimal) {
        self.rates.entry(currency.into()).or_default().insert(year, rate);
    }

    /// Decode the canonical rates CSV: `Currency,Rate,Date` with an ISO date
    /// whose year keys the row. Later rows for the same (currency, year)
    /// overwrite earlier ones.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut table = ExchangeRateTable::new();
        let mut csv_reader = csv::Reader::from_reader(reader);
        for row in csv_reader.records() {
            let row = row.context("failed to read exchange rate row")?;
            let currency = row
                .get(0)
                .context("exchange rate row missing currency column")?;
            let rate: Decimal = row
                .get(1)
                .context("exchange rate row missing rate column")?
                .parse()
                .context("exchange rate is not a decimal")?;
            let year: i32 = row
                .get(2)
                .and_then(|d| d.get(..4))
                .context("exchange rate row missing date column")?
                .parse()
                .context("exchange rate date does not start with a year")?;
            table.insert(currency, year, rate);
        }
        Ok(table)
    }

    pub fn rate(&self, currency: &str, year: i32) -> Option<Decimal> {
        self.rates.get(currency).and_then(|years| years.get(&year)).copied()
    }

    /// Latest year covered by any currency, if the table is non-empty.
    pub fn latest_year(&self) -> Option<i32> {
        self.rates
            .values()
            .filter_map(|years| years.keys().next_back())
            .max()
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

// ============================================================================
// CONVERTER
// ============================================================================

/// Converts (currency, amount, year) to USD against a fixed rate table.
///
/// Years past `clamp_year` are clamped down to it before lookup, so recent
/// data with known reporting lag is not silently zeroed. The clamp defaults
/// to the latest year the table covers and is configurable.
#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    table: ExchangeRateTable,
    clamp_year: Option<i32>,
}

impl CurrencyConverter {
    pub fn new(table: ExchangeRateTable) -> Self {
        let clamp_year = table.latest_year();
        CurrencyConverter { table, clamp_year }
    }

    /// Override the year beyond which lookups clamp.
    pub fn with_clamp_year(mut self, year: i32) -> Self {
        self.clamp_year = Some(year);
        self
    }

    pub fn clamp_year(&self) -> Option<i32> {
        self.clamp_year
    }

    /// `amount / rate[currency][year]`, or zero when the table cannot answer.
    pub fn to_usd(&self, currency: &str, amount: Decimal, year: i32) -> Decimal {
        let year = match self.clamp_year {
            Some(clamp) if year > clamp => clamp,
            _ => year,
        };
        match self.table.rate(currency, year) {
            Some(rate) if !rate.is_zero() => amount / rate,
            Some(_) => {
                debug!(currency, year, anomaly = ?Anomaly::MissingData, "zero exchange rate, contributing zero");
                Decimal::ZERO
            }
            None => {
                debug!(currency, year, anomaly = ?Anomaly::MissingData, "no exchange rate, contributing zero");
                Decimal::ZERO
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn eur_table() -> ExchangeRateTable {
        let mut table = ExchangeRateTable::new();
        table.insert("EUR", 2013, Decimal::new(8, 1)); // 0.8
        table.insert("EUR", 2014, Decimal::new(9, 1)); // 0.9
        table
    }

    #[test]
    fn test_eur_2013_conversion() {
        let converter = CurrencyConverter::new(eur_table());
        let usd = converter.to_usd("EUR", Decimal::from(100), 2013);
        assert_eq!(usd, Decimal::from(125));
    }

    #[test]
    fn test_missing_currency_is_zero() {
        let converter = CurrencyConverter::new(eur_table());
        assert_eq!(converter.to_usd("XYZ", Decimal::from(5000), 2013), Decimal::ZERO);
    }

    #[test]
    fn test_missing_year_is_zero() {
        let converter = CurrencyConverter::new(eur_table());
        assert_eq!(converter.to_usd("EUR", Decimal::from(100), 1990), Decimal::ZERO);
    }

    #[test]
    fn test_zero_rate_is_zero() {
        let mut table = eur_table();
        table.insert("VEF", 2013, Decimal::ZERO);
        let converter = CurrencyConverter::new(table);
        assert_eq!(converter.to_usd("VEF", Decimal::from(100), 2013), Decimal::ZERO);
    }

    #[test]
    fn test_years_beyond_coverage_clamp_to_latest() {
        let converter = CurrencyConverter::new(eur_table());
        // 2020 clamps to 2014 where the rate is 0.9.
        let usd = converter.to_usd("EUR", Decimal::from(90), 2020);
        assert_eq!(usd, Decimal::from(100));
    }

    #[test]
    fn test_configurable_clamp_year() {
        let converter = CurrencyConverter::new(eur_table()).with_clamp_year(2013);
        let usd = converter.to_usd("EUR", Decimal::from(80), 2020);
        assert_eq!(usd, Decimal::from(100));
    }

    #[test]
    fn test_from_csv() {
        let csv = "Currency,Rate,Date\nEUR,0.8,2013-12-31\nEUR,0.9,2014-12-31\nGBP,0.65,2013-12-31\n";
        let table = ExchangeRateTable::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rate("EUR", 2013), Some(Decimal::new(8, 1)));
        assert_eq!(table.rate("GBP", 2013), Some(Decimal::new(65, 2)));
        assert_eq!(table.latest_year(), Some(2014));
    }
}

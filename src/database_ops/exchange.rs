use std::collections::BTreeMap;
use tracing::warn;

/// Static country → reference-currency multiplier table.
///
/// This is configuration, not a live feed: loaded once at startup and never
/// mutated afterwards. Countries missing from the table convert at 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRates {
    rates: BTreeMap<String, f64>,
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self::from_pairs(Self::default_table())
    }
}

impl ExchangeRates {
    /// Curated defaults (JPY per unit of the storefront currency).
    pub fn default_table() -> BTreeMap<&'static str, f64> {
        // Keep deterministic order for predictable snapshots
        BTreeMap::from([
            ("jp", 1.0),   // JPY
            ("us", 150.0), // USD
            ("kr", 0.11),  // KRW
            ("de", 160.0), // EUR
            ("fr", 160.0),
            ("es", 160.0),
            ("it", 160.0),
            ("nl", 160.0),
            ("gb", 190.0), // GBP
            ("ca", 110.0), // CAD
            ("au", 100.0), // AUD
            ("cn", 21.0),  // CNY
            ("tw", 4.7),   // TWD
            ("hk", 19.0),  // HKD
            ("br", 27.0),  // BRL
            ("mx", 8.5),   // MXN
            ("ch", 170.0), // CHF
            ("pl", 37.0),  // PLN
            ("se", 14.0),  // SEK
            ("no", 14.0),  // NOK
            ("tr", 4.5),   // TRY
            ("in", 1.8),   // INR
        ])
    }

    pub fn empty() -> Self {
        Self {
            rates: BTreeMap::new(),
        }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        Self {
            rates: pairs
                .into_iter()
                .map(|(cc, r)| (cc.trim().to_ascii_lowercase(), r))
                .collect(),
        }
    }

    /// Defaults overlaid with a `"us:150,kr:0.11"` style override string.
    /// Malformed entries are skipped with a warning.
    pub fn with_overrides(mut self, spec: &str) -> Self {
        for part in spec.split([',', ' ']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once(':') {
                Some((cc, rate)) => match rate.trim().parse::<f64>() {
                    Ok(r) if r.is_finite() && r >= 0.0 => {
                        self.rates.insert(cc.trim().to_ascii_lowercase(), r);
                    }
                    _ => warn!(entry = part, "ignoring exchange rate override with bad rate"),
                },
                None => warn!(entry = part, "ignoring exchange rate override without ':'"),
            }
        }
        self
    }

    pub fn rate_for(&self, country: &str) -> f64 {
        self.rates
            .get(country.trim().to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(1.0)
    }

    /// `round(price * rate)` using round-half-to-even on exact ties.
    pub fn to_reference(&self, price: f64, country: &str) -> i64 {
        (price * self.rate_for(country)).round_ties_even() as i64
    }
}

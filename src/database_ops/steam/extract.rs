//! Flatten one Steam `appdetails` payload into a [`GameRow`].
//!
//! Extraction is best-effort: numeric fields default to zero/false, list
//! fields to the empty string. A payload whose shape is wrong where a value
//! *is* present (e.g. a genre without a description) is rejected as a whole
//! and the caller drops it.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::database_ops::db::GameRow;
use crate::database_ops::exchange::ExchangeRates;
use crate::normalization::platform::platform_list;

/// `{ "<appid>": { "success": true, "data": { ... } } }`
#[derive(Debug, Deserialize)]
struct AppDetailsEntry {
    data: AppData,
}

#[derive(Debug, Deserialize)]
struct AppData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price_overview: Option<PriceOverview>,
    #[serde(default)]
    genres: Option<Vec<GenreEntry>>,
    #[serde(default)]
    release_date: Option<ReleaseDate>,
    #[serde(default)]
    recommendations: Option<Recommendations>,
    #[serde(default)]
    developers: Option<Vec<String>>,
    #[serde(default)]
    publishers: Option<Vec<String>>,
    #[serde(default)]
    platforms: Option<Map<String, Value>>,
    // Steam serves this as a number for most apps and a string for some.
    #[serde(default)]
    required_age: Option<Value>,
    #[serde(default)]
    is_free: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    #[serde(rename = "final", default)]
    final_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GenreEntry {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseDate {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Recommendations {
    #[serde(default)]
    total: Option<i64>,
}

/// Extract a canonical row, or `None` when the payload cannot be read.
///
/// `country` comes from the request context (file name), never the payload.
pub fn extract(doc: &Value, app_id: i64, country: &str, rates: &ExchangeRates) -> Option<GameRow> {
    let entry = doc.get(app_id.to_string())?;
    let parsed = match AppDetailsEntry::deserialize(entry) {
        Ok(p) => p,
        Err(err) => {
            debug!(app_id, country, error = %err, "appdetails payload rejected");
            return None;
        }
    };
    let data = parsed.data;

    let price = data
        .price_overview
        .and_then(|p| p.final_price)
        .map(|minor| minor / 100.0)
        .unwrap_or(0.0);
    if !price.is_finite() {
        return None;
    }
    let country = country.trim().to_ascii_lowercase();

    Some(GameRow {
        app_id,
        name: data.name,
        price,
        price_jpy: rates.to_reference(price, &country),
        genres: data
            .genres
            .unwrap_or_default()
            .into_iter()
            .map(|g| g.description)
            .collect::<Vec<_>>()
            .join(", "),
        release_date: data.release_date.and_then(|r| r.date),
        recommendations: data
            .recommendations
            .and_then(|r| r.total)
            .unwrap_or(0)
            .max(0),
        developers: data.developers.unwrap_or_default().join(", "),
        publishers: data.publishers.unwrap_or_default().join(", "),
        platforms: data.platforms.as_ref().map(platform_list).unwrap_or_default(),
        required_age: data.required_age.as_ref().map(parse_age).unwrap_or(0),
        is_free: data.is_free.unwrap_or(false),
        country,
    })
}

/// Parse raw bytes first; malformed JSON is an extraction failure, not an error.
pub fn extract_from_slice(
    raw: &[u8],
    app_id: i64,
    country: &str,
    rates: &ExchangeRates,
) -> Option<GameRow> {
    let doc: Value = match serde_json::from_slice(raw) {
        Ok(v) => v,
        Err(err) => {
            debug!(app_id, country, error = %err, "appdetails payload is not JSON");
            return None;
        }
    };
    extract(&doc, app_id, country, rates)
}

/// `success` flag of an appdetails response for `app_id`.
pub fn is_success(doc: &Value, app_id: i64) -> bool {
    doc.get(app_id.to_string())
        .and_then(|e| e.get("success"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// `data.recommendations.total`, 0 when absent.
pub fn recommendation_total(doc: &Value, app_id: i64) -> i64 {
    doc.get(app_id.to_string())
        .and_then(|e| e.pointer("/data/recommendations/total"))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn parse_age(v: &Value) -> i64 {
    let age = match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().trim_end_matches('+').parse::<i64>().ok(),
        _ => None,
    };
    age.unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rates_one() -> ExchangeRates {
        ExchangeRates::empty()
    }

    fn full_doc() -> Value {
        json!({
            "570": {
                "success": true,
                "data": {
                    "name": "Dota 2",
                    "price_overview": { "currency": "USD", "initial": 1999, "final": 1499 },
                    "genres": [
                        { "id": "1", "description": "Action" },
                        { "id": "37", "description": "Free to Play" }
                    ],
                    "release_date": { "coming_soon": false, "date": "9 Jul, 2013" },
                    "recommendations": { "total": 2000 },
                    "developers": ["Valve", "Hidden Path"],
                    "publishers": ["Valve"],
                    "platforms": { "windows": true, "mac": false, "linux": true },
                    "required_age": 0,
                    "is_free": false
                }
            }
        })
    }

    #[test]
    fn flattens_every_field() {
        let rates = ExchangeRates::from_pairs([("us", 150.0)]);
        let row = extract(&full_doc(), 570, "US", &rates).unwrap();
        assert_eq!(row.name.as_deref(), Some("Dota 2"));
        assert_eq!(row.price, 14.99);
        assert_eq!(row.price_jpy, (14.99f64 * 150.0).round_ties_even() as i64);
        assert_eq!(row.genres, "Action, Free to Play");
        assert_eq!(row.release_date.as_deref(), Some("9 Jul, 2013"));
        assert_eq!(row.recommendations, 2000);
        assert_eq!(row.developers, "Valve, Hidden Path");
        assert_eq!(row.publishers, "Valve");
        assert_eq!(row.platforms, "windows, linux");
        assert_eq!(row.required_age, 0);
        assert!(!row.is_free);
        assert_eq!(row.country, "us");
    }

    #[test]
    fn missing_price_overview_means_zero_price() {
        let doc = json!({ "10": { "success": true, "data": { "name": "Free thing", "is_free": true } } });
        let row = extract(&doc, 10, "jp", &rates_one()).unwrap();
        assert_eq!(row.price, 0.0);
        assert_eq!(row.price_jpy, 0);
        assert!(row.is_free);
        assert_eq!(row.genres, "");
        assert_eq!(row.platforms, "");
        assert_eq!(row.release_date, None);
    }

    #[test]
    fn unknown_country_converts_at_unit_rate() {
        let rates = ExchangeRates::from_pairs([("us", 150.0)]);
        let row = extract(&full_doc(), 570, "zz", &rates).unwrap();
        assert_eq!(row.price_jpy, 15);
    }

    #[test]
    fn wrong_app_key_or_missing_data_fails() {
        assert!(extract(&full_doc(), 571, "us", &rates_one()).is_none());
        let doc = json!({ "570": { "success": false } });
        assert!(extract(&doc, 570, "us", &rates_one()).is_none());
        assert!(extract(&json!([1, 2]), 570, "us", &rates_one()).is_none());
    }

    #[test]
    fn malformed_present_fields_fail() {
        let doc = json!({ "1": { "data": { "genres": [ { "id": "1" } ] } } });
        assert!(extract(&doc, 1, "jp", &rates_one()).is_none());
        let doc = json!({ "1": { "data": { "price_overview": { "final": "cheap" } } } });
        assert!(extract(&doc, 1, "jp", &rates_one()).is_none());
        assert!(extract_from_slice(b"{not json", 1, "jp", &rates_one()).is_none());
    }

    #[test]
    fn string_ages_are_parsed() {
        let doc = json!({ "1": { "data": { "required_age": "18" } } });
        assert_eq!(extract(&doc, 1, "jp", &rates_one()).unwrap().required_age, 18);
        let doc = json!({ "1": { "data": { "required_age": "mature" } } });
        assert_eq!(extract(&doc, 1, "jp", &rates_one()).unwrap().required_age, 0);
    }

    #[test]
    fn fetch_helpers_read_success_and_recommendations() {
        assert!(is_success(&full_doc(), 570));
        assert_eq!(recommendation_total(&full_doc(), 570), 2000);
        assert_eq!(recommendation_total(&json!({}), 570), 0);
    }
}

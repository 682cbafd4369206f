use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// USD per million tokens.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub input: f64,
    pub output: f64,
}

#[derive(Deserialize)]
struct PricingFile {
    models: HashMap<String, PriceEntry>,
}

const BUILTIN_PRICES: &[(&str, PriceEntry)] = &[
    (
        "gpt-5.2-pro",
        PriceEntry {
            input: 21.0,
            output: 168.0,
        },
    ),
    (
        "gpt-5.2",
        PriceEntry {
            input: 1.75,
            output: 14.0,
        },
    ),
    (
        "gpt-5-mini",
        PriceEntry {
            input: 0.25,
            output: 2.0,
        },
    ),
];

pub static PRICING: LazyLock<HashMap<String, PriceEntry>> = LazyLock::new(|| {
    let mut prices: HashMap<String, PriceEntry> = BUILTIN_PRICES
        .iter()
        .map(|(model, entry)| (model.to_string(), *entry))
        .collect();

    if let Ok(path) = std::env::var("PRICING_JSON_PATH")
        && !path.is_empty()
    {
        match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|data| {
                serde_json::from_str::<PricingFile>(&data).map_err(|e| e.to_string())
            }) {
            Ok(parsed) => prices.extend(parsed.models),
            Err(e) => tracing::warn!(path = %path, error = %e, "pricing override ignored"),
        }
    }

    prices
});

/// Dated snapshots (`gpt-5.2-pro-2025-12-11`) are priced as their base model.
fn lookup(model: &str) -> Option<&'static PriceEntry> {
    if let Some(entry) = PRICING.get(model) {
        return Some(entry);
    }
    PRICING
        .iter()
        .filter(|(name, _)| model.starts_with(&format!("{name}-")))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, entry)| entry)
}

pub fn calculate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    match lookup(model) {
        Some(entry) => {
            (f64::from(input_tokens) * entry.input / 1_000_000.0)
                + (f64::from(output_tokens) * entry.output / 1_000_000.0)
        }
        None => 0.0,
    }
}

/// `server.address` and `server.port` recorded on gen_ai spans. An
/// unparseable base URL is reported as-is on the HTTPS port.
pub fn server_endpoint(base_url: &str) -> (String, i64) {
    match Url::parse(base_url) {
        Ok(url) => (
            url.host_str().unwrap_or_default().to_string(),
            url.port_or_known_default().map_or(443, i64::from),
        ),
        Err(_) => (base_url.to_string(), 443),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_cost_known_model() {
        let cost = calculate_cost("gpt-5.2-pro", 1_000_000, 1_000_000);
        assert!((cost - 189.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_cost_dated_snapshot() {
        let base = calculate_cost("gpt-5.2", 2_000, 500);
        let dated = calculate_cost("gpt-5.2-2025-12-11", 2_000, 500);
        assert!(base > 0.0);
        assert_eq!(base, dated);
    }

    #[test]
    fn test_snapshot_prefers_longest_base_name() {
        let pro = calculate_cost("gpt-5.2-pro-2025-12-11", 1_000_000, 0);
        assert!((pro - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_cost_unknown_model() {
        let cost = calculate_cost("nonexistent-model-xyz", 1000, 1000);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_calculate_cost_zero_tokens() {
        let cost = calculate_cost("gpt-5.2-pro", 0, 0);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_server_endpoint() {
        assert_eq!(
            server_endpoint("https://api.openai.com/v1"),
            ("api.openai.com".to_string(), 443)
        );
        assert_eq!(
            server_endpoint("http://127.0.0.1:4010/v1"),
            ("127.0.0.1".to_string(), 4010)
        );
        assert_eq!(
            server_endpoint("http://proxy.internal/v1"),
            ("proxy.internal".to_string(), 80)
        );
    }

    #[test]
    fn test_server_endpoint_ipv6_userinfo_and_scheme_case() {
        assert_eq!(server_endpoint("http://[::1]/v1"), ("[::1]".to_string(), 80));
        assert_eq!(
            server_endpoint("http://[::1]:8443/v1"),
            ("[::1]".to_string(), 8443)
        );
        assert_eq!(
            server_endpoint("https://user:pw@proxy.corp/v1"),
            ("proxy.corp".to_string(), 443)
        );
        assert_eq!(server_endpoint("HTTP://host/v1"), ("host".to_string(), 80));
    }

    #[test]
    fn test_server_endpoint_unparseable() {
        assert_eq!(
            server_endpoint("not a url"),
            ("not a url".to_string(), 443)
        );
    }
}

use crate::guard::PROTECTED_ROUTE_PREFIXES;
use crate::market::types::PRICE_POLL_INTERVAL_MS;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfoResponse {
    pub product_name: String,
    pub version: String,
    pub platform: String,
    pub arch: String,
    pub protected_routes: Vec<String>,
    pub price_poll_interval_ms: u64,
}

pub fn app_info() -> AppInfoResponse {
    AppInfoResponse {
        product_name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        protected_routes: PROTECTED_ROUTE_PREFIXES
            .iter()
            .map(|prefix| prefix.to_string())
            .collect(),
        price_poll_interval_ms: PRICE_POLL_INTERVAL_MS,
    }
}

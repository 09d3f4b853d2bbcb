use crate::error::AppError;
use serde::{Deserialize, Serialize};

pub const EXCHANGE_PREFIX: &str = "BINANCE";
pub const QUOTE_ASSET: &str = "USDT";
pub const DEFAULT_BASE_ASSET: &str = "BTC";
pub const SELECTED_COIN_STORAGE_KEY: &str = "selectedCoin";
pub const PRICE_POLL_INTERVAL_MS: u64 = 5_000;
pub const MIN_BASE_ASSET_LEN: usize = 2;
pub const MAX_BASE_ASSET_LEN: usize = 10;

const ICON_BASE_URL: &str = "https://assets.coincap.io/assets/icons";

/// The instrument the user is viewing or trading, always quoted in USDT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    /// Exchange-qualified ticker, e.g. `BINANCE:BTCUSDT`.
    pub value: String,
    /// Display label, e.g. `BTC/USDT`.
    pub label: String,
    /// Base asset code, e.g. `BTC`.
    pub symbol: String,
    pub icon: String,
}

impl Coin {
    pub fn from_base_asset(raw: &str) -> Result<Self, AppError> {
        let symbol = raw.trim().to_ascii_uppercase();

        if !(MIN_BASE_ASSET_LEN..=MAX_BASE_ASSET_LEN).contains(&symbol.len())
            || !symbol.chars().all(|ch| ch.is_ascii_alphanumeric())
        {
            return Err(AppError::InvalidArgument(format!(
                "base asset must be {MIN_BASE_ASSET_LEN}-{MAX_BASE_ASSET_LEN} alphanumeric ASCII characters"
            )));
        }

        Ok(Self {
            value: format!("{EXCHANGE_PREFIX}:{symbol}{QUOTE_ASSET}"),
            label: format!("{symbol}/{QUOTE_ASSET}"),
            icon: format!("{ICON_BASE_URL}/{}@2x.png", symbol.to_ascii_lowercase()),
            symbol,
        })
    }

    /// Ticker as the exchange API expects it, without the exchange prefix.
    pub fn ticker(&self) -> &str {
        self.value
            .split_once(':')
            .map(|(_, ticker)| ticker)
            .unwrap_or(&self.value)
    }
}

impl Default for Coin {
    fn default() -> Self {
        Self {
            value: format!("{EXCHANGE_PREFIX}:{DEFAULT_BASE_ASSET}{QUOTE_ASSET}"),
            label: format!("{DEFAULT_BASE_ASSET}/{QUOTE_ASSET}"),
            symbol: DEFAULT_BASE_ASSET.to_string(),
            icon: format!(
                "{ICON_BASE_URL}/{}@2x.png",
                DEFAULT_BASE_ASSET.to_ascii_lowercase()
            ),
        }
    }
}

/// Stored shape of the selected coin. Only `symbol` is trusted on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedCoinRecord {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl From<&Coin> for PersistedCoinRecord {
    fn from(coin: &Coin) -> Self {
        Self {
            value: Some(coin.value.clone()),
            label: Some(coin.label.clone()),
            symbol: Some(coin.symbol.clone()),
        }
    }
}

pub fn encode_persisted_coin(coin: &Coin) -> Result<String, AppError> {
    Ok(simd_json::to_string(&PersistedCoinRecord::from(coin))?)
}

/// Rebuilds the coin from a stored record; `None` when the record is unusable.
pub fn parse_persisted_coin(raw: &str) -> Option<Coin> {
    let mut payload = raw.as_bytes().to_vec();
    let record = simd_json::from_slice::<PersistedCoinRecord>(&mut payload).ok()?;
    let symbol = record.symbol?;
    Coin::from_base_asset(&symbol).ok()
}

/// Parse-or-default: absent or corrupt records resolve to the default coin.
pub fn coin_from_storage(raw: Option<&str>) -> Coin {
    raw.and_then(parse_persisted_coin).unwrap_or_default()
}

pub fn format_price(raw: &str) -> Result<String, AppError> {
    let price = raw.trim().parse::<f64>()?;
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::InvalidArgument(
            "price must be a finite non-negative number".to_string(),
        ));
    }
    Ok(format!("{price:.2}"))
}

#[derive(Debug, Deserialize)]
pub struct TickerPriceWire {
    pub symbol: String,
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectCoinArgs {
    pub symbol: Option<String>,
}

impl SelectCoinArgs {
    pub fn normalize(self) -> Result<Coin, AppError> {
        let symbol = self
            .symbol
            .ok_or_else(|| AppError::InvalidArgument("symbol is required".to_string()))?;
        Coin::from_base_asset(&symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_coin_is_btc_against_usdt() {
        let coin = Coin::default();
        assert_eq!(coin.value, "BINANCE:BTCUSDT");
        assert_eq!(coin.label, "BTC/USDT");
        assert_eq!(coin.symbol, "BTC");
        assert_eq!(coin.ticker(), "BTCUSDT");
        assert_eq!(Coin::from_base_asset("btc").expect("btc is valid"), coin);
    }

    #[test]
    fn derives_ticker_and_label_from_base_asset() {
        let coin = Coin::from_base_asset(" eth ").expect("eth is valid");
        assert_eq!(coin.value, "BINANCE:ETHUSDT");
        assert_eq!(coin.label, "ETH/USDT");
        assert_eq!(coin.symbol, "ETH");
        assert!(coin.icon.ends_with("/eth@2x.png"));
        assert_ne!(coin, Coin::default());
    }

    #[test]
    fn rejects_invalid_base_assets() {
        for raw in ["", "B", "BTC-USD", "DOGECOINXYZ", "ÉTH"] {
            assert!(Coin::from_base_asset(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn persisted_record_restores_the_selected_coin() {
        let coin = Coin::from_base_asset("SOL").expect("sol is valid");
        let stored = encode_persisted_coin(&coin).expect("record encodes");
        assert!(stored.contains("\"symbol\":\"SOL\""));
        assert_eq!(parse_persisted_coin(&stored), Some(coin));
    }

    #[test]
    fn stale_value_and_label_are_recomputed_from_symbol() {
        let stored = r#"{"value":"OLDEX:XRPBUSD","label":"whatever","symbol":"xrp"}"#;
        let coin = parse_persisted_coin(stored).expect("symbol is enough");
        assert_eq!(coin.value, "BINANCE:XRPUSDT");
        assert_eq!(coin.label, "XRP/USDT");
    }

    #[test]
    fn corrupt_records_fall_back_to_default() {
        assert_eq!(coin_from_storage(None), Coin::default());
        assert_eq!(coin_from_storage(Some("not json")), Coin::default());
        assert_eq!(
            coin_from_storage(Some(r#"{"value":"BINANCE:ETHUSDT","label":"ETH/USDT"}"#)),
            Coin::default()
        );
        assert_eq!(coin_from_storage(Some(r#"{"symbol":null}"#)), Coin::default());
        assert_eq!(coin_from_storage(Some(r#"{"symbol":"??"}"#)), Coin::default());
        assert_eq!(coin_from_storage(Some("[]")), Coin::default());
    }

    #[test]
    fn formats_prices_with_two_decimals() {
        assert_eq!(format_price("64123.45678").expect("valid"), "64123.46");
        assert_eq!(format_price("0.1").expect("valid"), "0.10");
        assert!(format_price("NaN").is_err());
        assert!(format_price("-1").is_err());
        assert!(format_price("").is_err());
    }

    #[test]
    fn select_args_require_a_valid_symbol() {
        assert!(SelectCoinArgs::default().normalize().is_err());
        let coin = SelectCoinArgs {
            symbol: Some("ada".to_string()),
        }
        .normalize()
        .expect("ada is valid");
        assert_eq!(coin.value, "BINANCE:ADAUSDT");
    }
}

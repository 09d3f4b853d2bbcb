use crate::error::AppError;
use crate::market::types::{format_price, TickerPriceWire, QUOTE_ASSET};
use crate::market::PriceSource;
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

fn ticker_price_endpoint(base_url: &str, ticker: &str) -> String {
    format!(
        "{base_url}/api/v3/ticker/price?symbol={}",
        ticker.to_ascii_uppercase()
    )
}

fn spot_symbols_endpoint(base_url: &str) -> String {
    format!("{base_url}/api/v3/exchangeInfo?permissions=SPOT")
}

/// Public exchange price API; no authentication.
#[derive(Debug, Clone)]
pub struct BinancePriceClient {
    client: Client,
    base_url: String,
}

impl BinancePriceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_ticker_price(&self, ticker: &str) -> Result<String, AppError> {
        let endpoint = ticker_price_endpoint(&self.base_url, ticker);
        let response = self.client.get(endpoint).send().await?.error_for_status()?;
        let payload = response.json::<TickerPriceWire>().await?;
        if !payload.symbol.eq_ignore_ascii_case(ticker) {
            return Err(AppError::InvalidArgument(format!(
                "price payload for {} does not match requested {ticker}",
                payload.symbol
            )));
        }
        format_price(&payload.price)
    }

    pub async fn fetch_usdt_base_assets(&self) -> Result<Vec<String>, AppError> {
        let endpoint = spot_symbols_endpoint(&self.base_url);
        let response = self.client.get(endpoint).send().await?.error_for_status()?;
        let payload = response.json::<BinanceExchangeInfoWire>().await?;
        Ok(usdt_base_assets(payload))
    }
}

impl PriceSource for BinancePriceClient {
    fn fetch_price<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, Result<String, AppError>> {
        Box::pin(self.fetch_ticker_price(ticker))
    }
}

#[derive(Debug, Deserialize)]
struct BinanceExchangeInfoWire {
    symbols: Vec<BinanceExchangeSymbolWire>,
}

#[derive(Debug, Deserialize)]
struct BinanceExchangeSymbolWire {
    status: String,
    #[serde(rename = "baseAsset")]
    base_asset: String,
    #[serde(rename = "quoteAsset")]
    quote_asset: String,
    #[serde(rename = "isSpotTradingAllowed")]
    is_spot_trading_allowed: bool,
}

fn usdt_base_assets(payload: BinanceExchangeInfoWire) -> Vec<String> {
    let mut assets: Vec<String> = payload
        .symbols
        .into_iter()
        .filter(|entry| {
            entry.is_spot_trading_allowed
                && entry.status.eq_ignore_ascii_case("TRADING")
                && entry.quote_asset.eq_ignore_ascii_case(QUOTE_ASSET)
        })
        .map(|entry| entry.base_asset.to_ascii_uppercase())
        .collect();

    assets.sort_unstable();
    assets.dedup();
    assets
}

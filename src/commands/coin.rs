use crate::error::AppError;
use crate::market::types::{Coin, SelectCoinArgs};
use crate::state::ClientRuntime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPriceResponse {
    pub ticker: String,
    pub price: String,
}

pub fn coin_selected(state: &ClientRuntime) -> Coin {
    state.coin.selected()
}

pub fn coin_select(state: &ClientRuntime, args: SelectCoinArgs) -> Result<Coin, AppError> {
    let coin = args.normalize()?;
    state.coin.select(coin.clone());
    Ok(coin)
}

pub fn market_price(state: &ClientRuntime) -> MarketPriceResponse {
    MarketPriceResponse {
        ticker: state.coin.selected().ticker().to_string(),
        price: state.coin.market_price(),
    }
}

pub async fn available_coins(state: &ClientRuntime) -> Result<Vec<Coin>, AppError> {
    let assets = state.prices.fetch_usdt_base_assets().await?;
    Ok(assets
        .iter()
        .filter_map(|asset| Coin::from_base_asset(asset).ok())
        .collect())
}

use tradedesk_client_lib::{logging::init_tracing, run, AppError, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing();
    let config = ClientConfig::from_env()?;
    run(config).await
}

use stock_data_fetcher::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stock_data_fetcher::init_tracing();

    let config = AppConfig::from_env()?;
    stock_data_fetcher::run(config).await?;

    Ok(())
}

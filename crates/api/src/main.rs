use voucherdesk_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voucherdesk_observability::init();

    let config = AppConfig::from_env()?;
    let app = voucherdesk_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

use gasdesk_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gasdesk_observability::init();

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr();
    let app = gasdesk_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

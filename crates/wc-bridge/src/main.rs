//! wc-bridge: replays WalletConnect v2 session traffic through the request bridge

use eyre::eyre;
use wc_bridge_adapters::BridgeConfig;

mod runner;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting wc-bridge");

    let script = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre!("usage: wc-bridge <script.jsonl>"))?;
    let config = BridgeConfig::from_env();
    tracing::info!(
        relay_url = %config.relay_url,
        sessions_path = %config.sessions_path.display(),
        user_wallet_id = %config.user_wallet_id,
        "bridge configured"
    );

    let responses = runner::run_script_file(&config, &script).await?;
    for response in responses {
        println!("{}", serde_json::to_string(&response)?);
    }
    Ok(())
}

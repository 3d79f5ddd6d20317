//! nanorelay-node — the payment-coordination server binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the SQLite store
//!   2. Load the wallet seed, generating and persisting one on a fresh store
//!   3. Build the chain adapter (node RPC + WS confirmation feed)
//!   4. Start the scavenger background sweep
//!   5. Serve the HTTP API

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use nanorelay_chain::{ChainAdapter, NodeChainAdapter};
use nanorelay_core::CONFIG_KEY_WALLET_SEED;
use nanorelay_engine::LifecycleController;
use nanorelay_store::Store;

#[derive(Parser, Debug)]
#[command(
    name = "nanorelay-node",
    version,
    about = "Nanorelay payment-coordination server"
)]
struct Args {
    /// HTTP listen port.
    #[arg(long, default_value_t = 7080)]
    listen_port: u16,

    /// Path to the SQLite database file.
    #[arg(long, default_value = "./data.db")]
    db_path: PathBuf,

    /// Node RPC endpoint.
    #[arg(long, default_value = "http://[::1]:7076")]
    rpc_url: String,

    /// Remote `work_generate` RPC endpoint. Empty disables it — PoW is then
    /// generated locally by brute force.
    #[arg(long, default_value = "")]
    pow_url: String,

    /// Node WebSocket confirmation feed.
    #[arg(long, default_value = "ws://[::1]:7078")]
    ws_url: String,

    /// Webhook URL fired (best-effort) after a handoff settles. Empty disables it.
    #[arg(long, default_value = "")]
    callback_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nanorelay=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("nanorelay-node starting");

    let store = Store::open(&args.db_path)
        .with_context(|| format!("opening store at {}", args.db_path.display()))?;
    let seed = load_or_generate_seed(&store).context("loading wallet seed")?;

    let pow_url = (!args.pow_url.is_empty()).then(|| args.pow_url.clone());
    let adapter = NodeChainAdapter::new(args.rpc_url.clone(), pow_url, args.ws_url.clone());
    let chain: Arc<dyn ChainAdapter> = Arc::new(adapter);

    let callback_url = (!args.callback_url.is_empty()).then(|| args.callback_url.clone());
    let controller = Arc::new(LifecycleController::new(
        store,
        chain,
        seed,
        callback_url,
    ));

    tokio::spawn(nanorelay_engine::scavenger::run(controller.clone()));

    let router = nanorelay_server::router(controller);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.listen_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, "listening");
    axum::serve(listener, router)
        .await
        .context("serving HTTP")?;

    Ok(())
}

/// Load the persisted wallet seed, or generate and persist a fresh one on a
/// brand-new store. The seed is read-only after this point — every ephemeral
/// receive account is derived from it, so regenerating it would orphan every
/// outstanding allocation.
fn load_or_generate_seed(store: &Store) -> anyhow::Result<[u8; 32]> {
    if let Some(hex_seed) = store.get_config(CONFIG_KEY_WALLET_SEED)? {
        let bytes = hex::decode(&hex_seed).context("decoding stored wallet seed")?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("stored wallet seed is not 32 bytes"))?;
        return Ok(seed);
    }

    tracing::warn!("no wallet seed found — generating a fresh one");
    let mut seed = [0u8; 32];
    use rand::RngCore;
    rand::thread_rng().fill_bytes(&mut seed);
    store.set_config(CONFIG_KEY_WALLET_SEED, &hex::encode(seed))?;
    Ok(seed)
}

use std::{fs, sync::Arc, time::Duration};

use anyhow::{anyhow, Context as _};
use tracing::{info, warn};

use snsd_chainio::traits::{ChainStore, QuorumNet};
use snsd_common::{clock::SystemClock, logging};
use snsd_config::Config;
use snsd_crypto::ed25519::Keypair;
use snsd_pulse::{clock::Clock, machine::Context as PulseContext};
use snsd_snse::Snse;
use snsd_state::QuorumKind;

use crate::{args::Args, backend::{UnwiredChainStore, UnwiredQuorumNet}};

mod args;
mod backend;

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");
        return Err(e);
    }
    Ok(())
}

fn main_inner(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    logging::init(logging::LoggerConfig::new("snsd".to_string()));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("snsd-rt")
        .build()
        .expect("init: build runtime");

    let keypair = load_node_keypair(&config)?;
    info!(pubkey = ?keypair.public_key(), "node identity loaded");

    let net = config.network.to_primitives();
    let snse = Arc::new(Snse::new(net, config.max_short_term_history));

    info!(?net, "service-node state engine initialized at genesis");

    let chain: Arc<dyn ChainStore> = Arc::new(UnwiredChainStore);
    let quorum_net: Arc<dyn QuorumNet> = Arc::new(UnwiredQuorumNet::new(net));

    runtime.block_on(run_pulse_task(snse, keypair, chain, quorum_net));

    info!("exiting");
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let raw = fs::read_to_string(&args.config)
        .with_context(|| format!("reading config file {:?}", args.config))?;
    let mut config: Config = toml::from_str(&raw).context("parsing config TOML")?;
    args.override_config(&mut config)?;
    Ok(config)
}

fn load_node_keypair(config: &Config) -> anyhow::Result<Keypair> {
    let bytes = fs::read(&config.datadir.node_key_path)
        .with_context(|| format!("reading node key {:?}", config.datadir.node_key_path))?;
    let seed: [u8; 32] = bytes
        .get(..32)
        .ok_or_else(|| anyhow!("node key file must contain at least 32 bytes"))?
        .try_into()
        .expect("slice is exactly 32 bytes");
    Ok(Keypair::from_seed(seed))
}

/// Drives the Pulse state machine against whatever collaborators are
/// wired in. With [`UnwiredChainStore`]/[`UnwiredQuorumNet`] every round
/// stalls immediately; this loop exists to exercise the bootstrap path and
/// give a real storage/P2P backend a concrete place to plug in later.
async fn run_pulse_task(
    snse: Arc<Snse>,
    keypair: Keypair,
    chain: Arc<dyn ChainStore>,
    quorum_net: Arc<dyn QuorumNet>,
) {
    let clock = SystemClock;
    let current = snse.current();

    let Some(quorum) = current.quorum(QuorumKind::Pulse).cloned() else {
        warn!("no Pulse quorum available at startup (fewer than the minimum active nodes); idling");
        tokio::signal::ctrl_c().await.ok();
        return;
    };

    let mut ctx = PulseContext::new(
        Arc::new(keypair),
        current.height,
        current.block_hash,
        clock.now_secs(),
        quorum,
    );

    info!(round = ctx.round(), "pulse state machine started");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            result = ctx.tick(&clock, chain.as_ref(), quorum_net.as_ref()) => {
                match result {
                    Ok(outcome) => {
                        tracing::debug!(?outcome, "pulse tick");
                    }
                    Err(e) => {
                        warn!(error = %e, "pulse tick failed");
                    }
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    }
}

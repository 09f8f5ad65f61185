use battleship_bridge::{
    init_logging, terminal, Bridge, ClientNode, FileStore, RelayConfig, SessionMachine,
    SessionStore, WsTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT,
    DEFAULT_LISTEN_ADDR, DEFAULT_MAX_FRAME_LEN, DEFAULT_MAX_PENDING_WRITE, DEFAULT_UPSTREAM_ADDR,
};

use clap::Parser;
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Relay browser WebSocket clients to the game server.
    Relay {
        #[arg(long, env = "BATTLESHIP_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
        listen: String,
        #[arg(long, env = "BATTLESHIP_UPSTREAM", default_value = DEFAULT_UPSTREAM_ADDR)]
        upstream: String,
        #[arg(long, help = "Seconds without game server traffic before a link is dropped",
              default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
        idle_timeout: u64,
        #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
        connect_timeout: u64,
        #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LEN)]
        max_frame_len: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_PENDING_WRITE)]
        max_pending_write: usize,
    },
    /// Play from the terminal through a running relay.
    Play {
        #[arg(long, env = "BATTLESHIP_RELAY_URL", default_value = "ws://127.0.0.1:3000")]
        relay_url: String,
        #[arg(long, env = "BATTLESHIP_STORE", default_value = "battleship-client.json")]
        store: String,
        #[arg(long, help = "Fix RNG seed for reproducible auto-placement (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Relay {
            listen,
            upstream,
            idle_timeout,
            connect_timeout,
            max_frame_len,
            max_pending_write,
        } => {
            let config = RelayConfig {
                listen_addr: listen,
                upstream_addr: upstream,
                idle_timeout: Duration::from_secs(idle_timeout),
                connect_timeout: Duration::from_secs(connect_timeout),
                max_frame_len,
                max_pending_write,
            };
            let bridge = Bridge::new(config);
            let shutdown = bridge.shutdown_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, shutting down");
                    shutdown.trigger();
                }
            });
            bridge.run().await?;
        }
        Commands::Play {
            relay_url,
            store,
            seed,
        } => {
            let store = FileStore::open(&store)?;
            let identity = store.identity().unwrap_or_else(|e| {
                warn!("ignoring stored identity: {}", e);
                None
            });
            let rng = match seed {
                Some(s) => SmallRng::seed_from_u64(s),
                None => SmallRng::from_rng(&mut rand::rng()),
            };
            let transport = WsTransport::connect(&relay_url).await?;
            let machine = SessionMachine::with_rng(identity, rng);
            let mut node = ClientNode::with_machine(machine, store, Box::new(transport));
            terminal::run(&mut node, &relay_url).await?;
        }
    }
    Ok(())
}

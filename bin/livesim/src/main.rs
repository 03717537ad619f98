use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use livesim::{load_playlist, serve, server::DEFAULT_PORT, Launch, ServerConfig};
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct LiveSimArgs {
    /// Media playlist file
    #[clap(short, long, default_value = "media.m3u8", env = "LIVESIM_PLAYLIST")]
    playlist: PathBuf,

    /// Address to listen on
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Port to listen on
    #[clap(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds between two slides of the live window
    #[clap(long, default_value = "3")]
    interval: u64,

    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,
}

impl LiveSimArgs {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            addr: SocketAddr::new(self.host, self.port),
            interval: Duration::from_secs(self.interval.max(1)),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = LiveSimArgs::parse();

    let default_level = if args.verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.server_config();
    let source = load_playlist(&args.playlist).await?;
    match Launch::from_source(source, config.interval) {
        Launch::Serve(state) => {
            let listener = TcpListener::bind(config.addr).await?;
            serve(listener, state, shutdown_signal()).await?;
        }
        Launch::Describe(description) => print!("{description}"),
    }

    Ok(())
}

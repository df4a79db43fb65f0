use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use stranger_chat_signaling_server::rendezvous::Rendezvous;
use stranger_chat_signaling_server::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("failed to initialise logging")?;

    let address = env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9001".to_owned());
    let address = SocketAddr::from_str(&address)
        .with_context(|| format!("invalid ip address provided: {}", address))?;

    info!("signaling server listening on {}", address);
    axum::Server::bind(&address)
        .serve(router::create(Rendezvous::default()).into_make_service())
        .await
        .context("server error")
}

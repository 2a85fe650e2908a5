use clap::Parser;
use segment_proxy::Config;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.log_filter())
        .init();

    if let Err(e) = segment_proxy::serve(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

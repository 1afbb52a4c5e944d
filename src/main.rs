//! firegen CLI entry point.

use firegen::cli::{self, Cli};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("{}", e);
        eprintln!("firegen: {e}");
        std::process::exit(1);
    }
}

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = checkpoint::cli::Cli::parse();
    if let Err(e) = checkpoint::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

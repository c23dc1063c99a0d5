use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = tollgate::cli::Cli::parse();
    if let Err(e) = tollgate::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

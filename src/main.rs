#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenderscout_cli::cli::app::run().await
}

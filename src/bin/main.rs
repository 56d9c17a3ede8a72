#[tokio::main]
async fn main() -> skos_rs::Result<()> {
    skos_rs::cli::main().await
}

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ctx_client::main_entry().await
}

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ctx_server::main_entry().await
}

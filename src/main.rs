use anyhow::Result;

use gcs_mirror::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let app = App::new()?;
    let run = app.start().await;
    let shutdown = app.shutdown().await;
    run?;
    shutdown
}

use anyhow::Result;
use iotlt_harvest::{Crawler, logging};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let crawler = Crawler::builder().build()?;

    let cancel_token = CancellationToken::new();
    let token_clone = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, saving slide cache");
            token_clone.cancel();
        }
    });

    let stats = crawler.run_with_cancellation(cancel_token).await?;
    println!(
        "{} events from {} pages ({} skipped)",
        stats.events_extracted, stats.pages_visited, stats.errors_encountered
    );

    Ok(())
}

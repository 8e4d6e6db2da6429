use scan_organizer::{AuditSink, Config, InferenceClient, Pipeline};
use std::sync::{atomic::Ordering, Arc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    let audit = Arc::new(AuditSink::new("."));
    let client = Arc::new(InferenceClient::new(
        reqwest::Client::new(),
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
        config.timeout,
    ));

    let pipeline = Pipeline::new(config, client, audit);

    // Ctrl-C flips the shared cancellation flag; stages stop pulling work.
    let cancel = pipeline.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::Relaxed);
        }
    });

    pipeline.run().await;
    Ok(())
}

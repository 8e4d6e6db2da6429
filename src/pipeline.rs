use crate::{
    analyzer::Analyzer, audit::AuditSink, client::InferenceClient, config::Config,
    copier::Copier, scanner::Scanner,
};
use futures::future::join_all;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;

/// The three-stage organizing pipeline.
///
/// Wires Scanner → Analyzer → Copier over two unbounded channels, spawns one
/// tokio task per stage, and waits on all three. Channel closure propagates
/// shutdown: the Scanner drops its sender once every source is processed,
/// the Analyzer drops its own once the inbound channel drains, and the
/// Copier returns when there is nothing left to copy.
pub struct Pipeline {
    config: Config,
    client: Arc<InferenceClient>,
    audit: Arc<AuditSink>,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: Config, client: Arc<InferenceClient>, audit: Arc<AuditSink>) -> Self {
        Self {
            config,
            client,
            audit,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an externally owned cancellation flag.
    ///
    /// Setting the flag makes in-flight stages stop pulling new work. No
    /// partial-drain protocol: a Publication being copied when the flag is
    /// set may end up partially copied.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle to the pipeline's cancellation flag.
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Run all three stages to completion.
    pub async fn run(self) {
        let (page_set_tx, page_set_rx) = mpsc::unbounded_channel();
        let (publication_tx, publication_rx) = mpsc::unbounded_channel();

        let scanner = Scanner::new(
            self.config.input_root.clone(),
            Arc::clone(&self.client),
            Arc::clone(&self.audit),
            Arc::clone(&self.cancel),
            page_set_tx,
        );

        let analyzer = Analyzer::new(
            Arc::clone(&self.client),
            Arc::clone(&self.audit),
            Arc::clone(&self.cancel),
            page_set_rx,
            publication_tx,
        );

        let copier = Copier::new(
            self.config.output_root.clone(),
            Arc::clone(&self.audit),
            Arc::clone(&self.cancel),
            publication_rx,
        );

        let handles = vec![
            tokio::spawn(scanner.run()),
            tokio::spawn(analyzer.run()),
            tokio::spawn(copier.run()),
        ];

        for result in join_all(handles).await {
            if let Err(e) = result {
                self.audit.error(format!("A pipeline stage panicked: {}", e));
            }
        }
    }
}

//! Accept loop.
//!
//! One long-lived task owns the listener; every accepted connection is
//! served on its own spawned task so a slow or failing client never blocks
//! accept. A broadcast shutdown signal stops the loop and closes the
//! listener; in-flight handlers run to completion.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::handler::{handle_request, Interceptor};

/// Run the accept loop until the shutdown signal fires. The listener is
/// dropped (closed) when this returns.
pub async fn serve(
    listener: TcpListener,
    interceptor: Arc<Interceptor>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let local_addr = listener.local_addr().ok();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let interceptor = Arc::clone(&interceptor);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let interceptor = Arc::clone(&interceptor);
                                async move { handle_request(req, interceptor).await }
                            });
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                debug!(peer = %peer, "connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        // OS-level accept faults; keep serving.
                        error!("accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!(addr = ?local_addr, "interceptor shutting down");
                break;
            }
        }
    }
}

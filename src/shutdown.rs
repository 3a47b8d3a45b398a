//! Shutdown on SIGINT or SIGTERM
//!
//! The controller loop is synchronous, so the signals are awaited on a helper thread
//! with its own single-threaded runtime. The thread only raises a flag that the loop
//! checks between polls.

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Set `stop` when the process receives SIGINT or SIGTERM. The handlers are
/// installed before this returns.
#[cfg(unix)]
pub fn stop_on_signal(stop: Arc<AtomicBool>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;
    let (mut sigint, mut sigterm) = {
        let _guard = runtime.enter();
        (
            signal(SignalKind::interrupt())?,
            signal(SignalKind::terminate())?,
        )
    };

    std::thread::spawn(move || {
        runtime.block_on(async {
            tokio::select! {
                _ = sigint.recv() => info!("SIGINT received"),
                _ = sigterm.recv() => info!("SIGTERM received"),
            }
        });
        stop.store(true, Ordering::SeqCst);
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn stop_on_signal(stop: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    std::thread::spawn(move || {
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            info!("Ctrl+C received");
            stop.store(true, Ordering::SeqCst);
        }
    });
    Ok(())
}

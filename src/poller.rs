//! Fixed-period poll loop.

use crate::error::Result;
use crate::protocol::AstroLink4Micro;
use crate::transport::Transport;
use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Background thread polling a shared driver every `interval`.
///
/// Each tick holds the driver lock for the whole cycle, so client calls made
/// through the same mutex never interleave with a poll exchange. The loop
/// runs until [`Poller::stop`] or drop.
pub struct Poller {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<T>(device: Arc<Mutex<AstroLink4Micro<T>>>, interval: Duration) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("astrolink-poll".to_string())
            .spawn(move || {
                loop {
                    device
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .poll_once();

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Poll loop stopped");
            })?;

        Ok(Poller {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop polling and wait for the current cycle to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

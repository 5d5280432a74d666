//! One-shot stop signal for the promdash poller.
//!
//! A [`Broadcaster`] and a [`Watcher`] are made as a pair by [`signal`]. The
//! task that must stop holds the watcher and awaits [`Watcher::recv`]. The
//! owner fires the broadcaster once, optionally waiting until the watcher is
//! gone with [`Broadcaster::signal_and_wait`].

use tokio::sync::watch;
use tracing::debug;

/// Construct a `Watcher` and `Broadcaster` pair.
#[must_use]
pub fn signal() -> (Watcher, Broadcaster) {
    let (sender, receiver) = watch::channel(false);
    (Watcher { receiver }, Broadcaster { sender })
}

#[derive(Debug)]
/// Fires the stop signal to its [`Watcher`].
pub struct Broadcaster {
    sender: watch::Sender<bool>,
}

impl Broadcaster {
    /// Fire the signal without waiting for the watcher to observe it.
    pub fn signal(self) {
        self.sender.send_replace(true);
    }

    /// Fire the signal and wait until the watcher has observed it or been
    /// dropped.
    pub async fn signal_and_wait(self) {
        self.sender.send_replace(true);
        if !self.sender.is_closed() {
            debug!("waiting on watcher to stop");
        }
        self.sender.closed().await;
    }
}

#[derive(Debug)]
/// Waits for the stop signal.
pub struct Watcher {
    receiver: watch::Receiver<bool>,
}

impl Watcher {
    /// Wait for the stop signal. Returns immediately if it already fired.
    ///
    /// A dropped [`Broadcaster`] counts as fired.
    pub async fn recv(mut self) {
        // Err means the broadcaster is gone, which is a stop as well.
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }
}

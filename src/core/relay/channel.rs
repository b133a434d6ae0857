//! Single-writer channel carrying accumulated text from the relay task to
//! its readers.
//!
//! The primary reader gets every snapshot, in order, through an unbounded
//! queue. Any number of [`SnapshotWatcher`]s can observe the same stream but
//! only the newest snapshot is kept for them. Closing happens when the
//! writer is consumed or dropped, so a closed channel cannot reopen.

use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub closed: bool,
}

pub fn channel() -> (ChannelWriter, ChannelReader) {
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let (latest_tx, latest_rx) = watch::channel(Snapshot::default());
    (
        ChannelWriter {
            updates: updates_tx,
            latest: latest_tx,
        },
        ChannelReader {
            updates: updates_rx,
            latest: latest_rx,
            drained: false,
        },
    )
}

#[derive(Debug)]
pub struct ChannelWriter {
    updates: mpsc::UnboundedSender<String>,
    latest: watch::Sender<Snapshot>,
}

impl ChannelWriter {
    /// Publishes the full accumulated text. Returns `false` once the primary
    /// reader has gone away.
    pub fn publish(&self, text: &str) -> bool {
        self.latest.send_modify(|snapshot| {
            snapshot.text.clear();
            snapshot.text.push_str(text);
        });
        self.updates.send(text.to_string()).is_ok()
    }

    pub fn close(self) {}
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.latest.send_modify(|snapshot| snapshot.closed = true);
    }
}

#[derive(Debug)]
pub struct ChannelReader {
    updates: mpsc::UnboundedReceiver<String>,
    latest: watch::Receiver<Snapshot>,
    drained: bool,
}

impl ChannelReader {
    /// Next snapshot in publication order; `None` once the channel is closed
    /// and every snapshot has been read.
    pub async fn next(&mut self) -> Option<String> {
        if self.drained {
            return None;
        }
        let next = self.updates.recv().await;
        if next.is_none() {
            self.drained = true;
        }
        next
    }

    /// The newest published text. After closure this is the final answer and
    /// never changes again.
    #[must_use]
    pub fn latest(&self) -> String {
        self.latest.borrow().text.clone()
    }

    /// Closed and fully read: no further snapshot can be observed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.drained || (self.latest.borrow().closed && self.updates.is_empty())
    }

    #[must_use]
    pub fn watch(&self) -> SnapshotWatcher {
        let mut rx = self.latest.clone();
        rx.mark_changed();
        SnapshotWatcher {
            rx,
            seen_len: 0,
            done: false,
        }
    }
}

/// Latest-value observer. Intermediate snapshots may be skipped; the newest
/// one at attach time and the final one are always seen.
#[derive(Debug)]
pub struct SnapshotWatcher {
    rx: watch::Receiver<Snapshot>,
    seen_len: usize,
    done: bool,
}

impl SnapshotWatcher {
    pub async fn next(&mut self) -> Option<String> {
        while !self.done {
            if self.rx.changed().await.is_err() {
                self.done = true;
            }
            let snapshot = self.rx.borrow_and_update().clone();
            if snapshot.closed {
                self.done = true;
            }
            if snapshot.text.len() > self.seen_len {
                self.seen_len = snapshot.text.len();
                return Some(snapshot.text);
            }
        }
        None
    }

    #[must_use]
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }
}

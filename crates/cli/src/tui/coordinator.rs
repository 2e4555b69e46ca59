// Key / row multiplexer
//
// Two background threads feed one bounded channel: the key reader, which
// asks the input source for a key only when the editor requests one, and the
// row fetcher, which scans the input stream until it is exhausted or told to
// stop. The editor can then wait for a key while rows keep arriving.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tabula_engine::Row;

use super::input::{self, InputError, SharedInput};

const CHANNEL_BOUND: usize = 64;

/// One message from the row source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// A scanned row; `non_utf8` reports whether the fetcher's decoder has
    /// fallen back to the legacy codepage.
    Row { row: Row, non_utf8: bool },
    /// The stream failed; no more rows will come.
    Failed(String),
    /// The stream is exhausted.
    End,
}

impl Feed {
    pub fn is_last(&self) -> bool {
        !matches!(self, Feed::Row { .. })
    }
}

enum Event {
    Key(Result<String, InputError>),
    Feed(Feed),
}

pub struct Coordinator {
    events: Receiver<Event>,
    key_requests: SyncSender<()>,
    stop: Arc<AtomicBool>,
    pending_keys: VecDeque<Result<String, InputError>>,
    exhausted: bool,
}

impl Coordinator {
    /// Start both threads. `next_feed` is called on the fetcher thread until
    /// it returns a last message (`End` or `Failed`) or the coordinator is
    /// dropped.
    pub fn spawn<F>(input: SharedInput, mut next_feed: F) -> Self
    where
        F: FnMut() -> Feed + Send + 'static,
    {
        let (event_tx, events) = mpsc::sync_channel(CHANNEL_BOUND);
        let (key_requests, request_rx) = mpsc::sync_channel::<()>(1);
        let stop = Arc::new(AtomicBool::new(false));

        let key_tx = event_tx.clone();
        thread::spawn(move || {
            while request_rx.recv().is_ok() {
                let key = match input::lock(&input) {
                    Ok(mut source) => source.get_key(),
                    Err(e) => Err(e),
                };
                if key_tx.send(Event::Key(key)).is_err() {
                    break;
                }
            }
        });

        let fetch_stop = stop.clone();
        thread::spawn(move || {
            while !fetch_stop.load(Ordering::Relaxed) {
                let feed = next_feed();
                let last = feed.is_last();
                if event_tx.send(Event::Feed(feed)).is_err() || last {
                    break;
                }
            }
        });

        Self {
            events,
            key_requests,
            stop,
            pending_keys: VecDeque::new(),
            exhausted: false,
        }
    }

    /// A coordinator whose row source is already exhausted.
    pub fn keys_only(input: SharedInput) -> Self {
        let mut coordinator = Self::spawn(input, || Feed::End);
        coordinator.exhausted = true;
        coordinator
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Wait for the next key, handing every row that arrives meanwhile to
    /// `on_feed`. Once the stream has ended this is a plain key wait.
    pub fn get_or(&mut self, mut on_feed: impl FnMut(Feed)) -> Result<String, InputError> {
        if let Some(key) = self.pending_keys.pop_front() {
            return key;
        }
        self.key_requests.send(()).map_err(|_| InputError::Closed)?;
        loop {
            match self.events.recv() {
                Ok(Event::Key(key)) => return key,
                Ok(Event::Feed(feed)) => {
                    if self.exhausted {
                        continue;
                    }
                    self.exhausted = feed.is_last();
                    on_feed(feed);
                }
                Err(_) => return Err(InputError::Closed),
            }
        }
    }

    /// Next row message if one arrives within `timeout`.
    pub fn try_fetch(&mut self, timeout: Duration) -> Option<Feed> {
        self.receive(Some(timeout))
    }

    /// Next row message, however long it takes.
    pub fn fetch(&mut self) -> Option<Feed> {
        self.receive(None)
    }

    fn receive(&mut self, timeout: Option<Duration>) -> Option<Feed> {
        while !self.exhausted {
            let event = match timeout {
                Some(timeout) => match self.events.recv_timeout(timeout) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => return None,
                    Err(RecvTimeoutError::Disconnected) => {
                        self.exhausted = true;
                        return None;
                    }
                },
                None => match self.events.recv() {
                    Ok(event) => event,
                    Err(_) => {
                        self.exhausted = true;
                        return None;
                    }
                },
            };
            match event {
                Event::Feed(feed) => {
                    self.exhausted = feed.is_last();
                    return Some(feed);
                }
                Event::Key(key) => self.pending_keys.push_back(key),
            }
        }
        None
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        // The fetcher may be blocked on a slow stream; it is not joined.
        self.stop.store(true, Ordering::Relaxed);
    }
}

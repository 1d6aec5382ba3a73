//! Welcome-display rotation over the live visitor feed.
//!
//! A cursor advances circularly through a newest-first queue on a fixed
//! interval. When the staleness window has elapsed the queue is re-fetched
//! from the store and replaced in place; the cursor is then clamped into the
//! new bounds rather than reset, so a long queue keeps its place across
//! refreshes. A pushed arrival replaces the queue and resets the cursor to
//! the head, putting the newcomer on screen at the next render.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use eventlens_core::VisitorRecord;
use eventlens_store::VisitorStore;

/// How many records the rotation keeps in memory.
const QUEUE_LIMIT: usize = 50;

struct RotationState {
    queue: Vec<VisitorRecord>,
    cursor: usize,
    last_fetch: Instant,
}

pub struct WelcomeBoard {
    store: Arc<VisitorStore>,
    state: Mutex<RotationState>,
    rotation_interval: Duration,
    staleness_window: Duration,
}

/// Clamp a cursor into the bounds of a refreshed queue.
///
/// The queue may have shrunk (or emptied) between fetches; the displayed
/// position must stay a valid index either way.
fn reconcile_cursor(cursor: usize, new_len: usize) -> usize {
    if new_len == 0 {
        0
    } else {
        cursor % new_len
    }
}

impl WelcomeBoard {
    pub fn new(
        store: Arc<VisitorStore>,
        rotation_interval: Duration,
        staleness_window: Duration,
    ) -> Self {
        Self {
            store,
            state: Mutex::new(RotationState {
                queue: Vec::new(),
                cursor: 0,
                last_fetch: Instant::now(),
            }),
            rotation_interval,
            staleness_window,
        }
    }

    /// The visitor currently on display, if any.
    pub async fn current(&self) -> Option<VisitorRecord> {
        let state = self.state.lock().await;
        state.queue.get(state.cursor).cloned()
    }

    /// Seed the queue from the store. Called once at startup.
    pub async fn load(&self) -> anyhow::Result<()> {
        let queue = self.store.recent(QUEUE_LIMIT).await?;
        let mut state = self.state.lock().await;
        info!(visitors = queue.len(), "Welcome queue loaded");
        state.queue = queue;
        state.cursor = 0;
        state.last_fetch = Instant::now();
        Ok(())
    }

    /// One rotation step: advance the cursor, then refresh the queue if the
    /// staleness window has elapsed.
    pub async fn tick(&self) {
        let needs_refresh = {
            let mut state = self.state.lock().await;
            if !state.queue.is_empty() {
                state.cursor = (state.cursor + 1) % state.queue.len();
            }
            state.last_fetch.elapsed() > self.staleness_window
        };

        if needs_refresh {
            if let Err(e) = self.refresh().await {
                error!(error = %e, "Welcome queue refresh failed");
            }
        }
    }

    /// Replace the queue from the store, keeping the cursor position clamped
    /// into the new bounds.
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let queue = self.store.recent(QUEUE_LIMIT).await?;
        let mut state = self.state.lock().await;
        state.cursor = reconcile_cursor(state.cursor, queue.len());
        state.queue = queue;
        state.last_fetch = Instant::now();
        debug!(visitors = state.queue.len(), cursor = state.cursor, "Welcome queue refreshed");
        Ok(())
    }

    /// A newly persisted visitor: refetch and show them first.
    pub async fn on_arrival(&self, record: &VisitorRecord) {
        info!(id = %record.id, name = ?record.fields.name, "New visitor on welcome display");
        let queue = match self.store.recent(QUEUE_LIMIT).await {
            Ok(q) => q,
            Err(e) => {
                error!(error = %e, "Failed to refetch queue on arrival");
                return;
            }
        };
        let mut state = self.state.lock().await;
        state.queue = queue;
        state.cursor = 0;
        state.last_fetch = Instant::now();
    }

    /// Run the rotation loop: interval ticks plus live-feed arrivals.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let board = self;
        tokio::spawn(async move {
            if let Err(e) = board.load().await {
                error!(error = %e, "Initial welcome queue load failed");
            }

            let mut arrivals = board.store.subscribe();
            let mut interval = tokio::time::interval(board.rotation_interval);
            // First tick fires immediately; skip it so the first visitor
            // stays up for a full interval.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        board.tick().await;
                    }
                    arrival = arrivals.recv() => {
                        match arrival {
                            Ok(record) => board.on_arrival(&record).await,
                            // Lagged: fall back to the staleness refresh.
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventlens_core::VisitorFields;

    fn named(name: &str) -> VisitorFields {
        VisitorFields {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    fn board(store: Arc<VisitorStore>) -> WelcomeBoard {
        WelcomeBoard::new(store, Duration::from_secs(10), Duration::from_secs(10))
    }

    #[test]
    fn test_reconcile_cursor_stays_in_bounds() {
        assert_eq!(reconcile_cursor(0, 5), 0);
        assert_eq!(reconcile_cursor(4, 5), 4);
        // List shrank below the cursor.
        assert_eq!(reconcile_cursor(4, 3), 1);
        assert_eq!(reconcile_cursor(7, 2), 1);
        // List emptied.
        assert_eq!(reconcile_cursor(4, 0), 0);
    }

    #[tokio::test]
    async fn test_empty_store_shows_nothing() {
        let store = Arc::new(VisitorStore::in_memory().unwrap());
        let board = board(store);
        board.load().await.unwrap();
        assert!(board.current().await.is_none());
        // Ticking an empty queue must not panic or divide by zero.
        board.tick().await;
        assert!(board.current().await.is_none());
    }

    #[tokio::test]
    async fn test_cursor_advances_and_wraps() {
        let store = Arc::new(VisitorStore::in_memory().unwrap());
        for name in ["a", "b", "c"] {
            store.insert(named(name)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let board = board(store);
        board.load().await.unwrap();

        // Newest first: c, b, a.
        assert_eq!(board.current().await.unwrap().fields.name.as_deref(), Some("c"));
        board.tick().await;
        assert_eq!(board.current().await.unwrap().fields.name.as_deref(), Some("b"));
        board.tick().await;
        assert_eq!(board.current().await.unwrap().fields.name.as_deref(), Some("a"));
        board.tick().await;
        assert_eq!(board.current().await.unwrap().fields.name.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_cursor_valid() {
        let store = Arc::new(VisitorStore::in_memory().unwrap());
        for name in ["a", "b", "c"] {
            store.insert(named(name)).await.unwrap();
        }
        let board = board(store.clone());
        board.load().await.unwrap();
        board.tick().await;
        board.tick().await;

        board.refresh().await.unwrap();
        // Cursor survived the refresh and still indexes a record.
        assert!(board.current().await.is_some());
        let state = board.state.lock().await;
        assert!(state.cursor < state.queue.len());
    }

    #[tokio::test]
    async fn test_arrival_resets_to_head() {
        let store = Arc::new(VisitorStore::in_memory().unwrap());
        store.insert(named("old")).await.unwrap();
        let board = board(store.clone());
        board.load().await.unwrap();
        board.tick().await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        let newcomer = store.insert(named("newcomer")).await.unwrap();
        board.on_arrival(&newcomer).await;

        assert_eq!(
            board.current().await.unwrap().fields.name.as_deref(),
            Some("newcomer")
        );
    }
}

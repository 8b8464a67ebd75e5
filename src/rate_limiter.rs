//! FIFO admission control for outbound provider calls.
//!
//! Callers park an admission request in a queue and wait on its oneshot. A single
//! drain task (spawned on demand, guarded by `processing`) grants admissions in
//! order while fewer than `limit` grants happened in the last `window`; otherwise
//! it sleeps until the oldest grant ages out.
//!
//! A grant reserves its slot at the drain's clock; the admitted caller then stamps
//! the slot with the instant its work actually starts, so a caller that wakes late
//! keeps the slot occupied for a full window from its real send time.

use crate::errors::EnrichmentError;
use crate::stats::StatsRecorder;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

struct Admission {
    granted: oneshot::Sender<u64>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Admission>,
    /// `(ticket, start)` of every slot used inside the current window.
    dispatched: VecDeque<(u64, Instant)>,
    next_ticket: u64,
    processing: bool,
}

struct Shared {
    limit: usize,
    window: Duration,
    state: Mutex<QueueState>,
    stats: Arc<StatsRecorder>,
}

enum Tick {
    Idle,
    Granted,
    Wait(Duration),
}

#[derive(Clone)]
pub struct RequestQueue {
    enabled: bool,
    shared: Arc<Shared>,
}

impl RequestQueue {
    pub fn new(enabled: bool, requests_per_second: u32, stats: Arc<StatsRecorder>) -> Self {
        Self::with_window(enabled, requests_per_second, WINDOW, stats)
    }

    pub fn with_window(
        enabled: bool,
        limit: u32,
        window: Duration,
        stats: Arc<StatsRecorder>,
    ) -> Self {
        Self {
            enabled,
            shared: Arc::new(Shared {
                limit: limit.max(1) as usize,
                window,
                state: Mutex::new(QueueState::default()),
                stats,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of callers still waiting for admission.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Waits for admission, then runs `work` and returns its result.
    ///
    /// With rate limiting disabled the work runs immediately.
    pub async fn enqueue<T, Fut>(&self, work: Fut) -> Result<T, EnrichmentError>
    where
        Fut: Future<Output = Result<T, EnrichmentError>>,
    {
        if self.enabled {
            self.admit().await?;
        }
        work.await
    }

    async fn admit(&self) -> Result<(), EnrichmentError> {
        let (tx, rx) = oneshot::channel();
        let start_drain = {
            let mut state = self.shared.state.lock();
            state.pending.push_back(Admission { granted: tx });
            !std::mem::replace(&mut state.processing, true)
        };

        if start_drain {
            tokio::spawn(drain(Arc::clone(&self.shared)));
        }

        let ticket = rx
            .await
            .map_err(|_| EnrichmentError::Internal("request queue dropped admission".to_string()))?;
        self.shared.mark_started(ticket);
        Ok(())
    }
}

async fn drain(shared: Arc<Shared>) {
    loop {
        match shared.tick() {
            Tick::Idle => return,
            Tick::Granted => continue,
            Tick::Wait(delay) => {
                shared.stats.record_rate_limit_hit();
                tracing::debug!("Rate limit reached, waiting {:?} for admission", delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Shared {
    fn tick(&self) -> Tick {
        let mut state = self.state.lock();
        let now = Instant::now();
        let window = self.window;

        // Starts can be stamped out of grant order, so prune the whole list
        state
            .dispatched
            .retain(|(_, at)| now.duration_since(*at) < window);

        if state.pending.is_empty() {
            state.processing = false;
            return Tick::Idle;
        }

        if state.dispatched.len() < self.limit {
            if let Some(next) = state.pending.pop_front() {
                let ticket = state.next_ticket;
                state.next_ticket = state.next_ticket.wrapping_add(1);
                // A caller that gave up does not consume a slot
                if next.granted.send(ticket).is_ok() {
                    state.dispatched.push_back((ticket, now));
                }
            }
            return Tick::Granted;
        }

        match state.dispatched.iter().map(|(_, at)| *at).min() {
            Some(oldest) => Tick::Wait(window.saturating_sub(now.duration_since(oldest))),
            None => Tick::Granted,
        }
    }

    /// Moves a granted slot's timestamp to the moment its work starts.
    fn mark_started(&self, ticket: u64) {
        let mut state = self.state.lock();
        let now = Instant::now();
        if let Some(slot) = state.dispatched.iter_mut().find(|(t, _)| *t == ticket) {
            slot.1 = now;
        }
    }
}

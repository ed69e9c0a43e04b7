//! Tick sources for the session controller.
//!
//! A [`Ticker`] only decides *when* ticks happen; the controller owns all
//! countdown state. Every `start` opens a new epoch and the tick callback is
//! handed that epoch, so ticks from a source that was already stopped can be
//! told apart from live ones.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Something that can deliver a tick once per period until stopped.
pub trait Ticker: Send {
    fn start(&mut self, epoch: u64);
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// Callback invoked on every tick with the epoch it was started for.
pub type TickHandler = Arc<dyn Fn(u64) + Send + Sync>;

/// Ticks on the tokio runtime at a fixed period.
///
/// The background task is aborted on `stop` and when the ticker is dropped.
pub struct IntervalTicker {
    period: Duration,
    handler: TickHandler,
    task: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    pub fn new(period: Duration, handler: TickHandler) -> Self {
        Self {
            period,
            handler,
            task: None,
        }
    }

    /// One tick per second.
    pub fn every_second(handler: TickHandler) -> Self {
        Self::new(Duration::from_secs(1), handler)
    }
}

impl Ticker for IntervalTicker {
    fn start(&mut self, epoch: u64) {
        self.stop();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Cannot start ticker outside a tokio runtime: {}", e);
                return;
            }
        };

        let period = self.period;
        let handler = self.handler.clone();
        self.task = Some(runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                handler(epoch);
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A ticker that never fires on its own; the caller drives ticks.
///
/// Clones share state, so a test can hand one to a controller and keep
/// another to see how often and for which epoch it was started.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    active: bool,
    epoch: Option<u64>,
    starts: u32,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().expect("ticker lock poisoned")
    }

    /// Epoch of the most recent start.
    pub fn epoch(&self) -> Option<u64> {
        self.state().epoch
    }

    pub fn starts(&self) -> u32 {
        self.state().starts
    }
}

impl Ticker for ManualTicker {
    fn start(&mut self, epoch: u64) {
        let mut state = self.state();
        state.active = true;
        state.epoch = Some(epoch);
        state.starts += 1;
    }

    fn stop(&mut self) {
        self.state().active = false;
    }

    fn is_active(&self) -> bool {
        self.state().active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counting_handler() -> (Arc<AtomicU64>, Arc<AtomicU64>, TickHandler) {
        let ticks = Arc::new(AtomicU64::new(0));
        let last_epoch = Arc::new(AtomicU64::new(0));
        let (t, e) = (ticks.clone(), last_epoch.clone());
        let handler: TickHandler = Arc::new(move |epoch| {
            t.fetch_add(1, Ordering::SeqCst);
            e.store(epoch, Ordering::SeqCst);
        });
        (ticks, last_epoch, handler)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period_after_start() {
        let (ticks, epoch, handler) = counting_handler();
        let mut ticker = IntervalTicker::every_second(handler);

        ticker.start(7);
        assert!(ticker.is_active());
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(epoch.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks() {
        let (ticks, _, handler) = counting_handler();
        let mut ticker = IntervalTicker::every_second(handler);

        ticker.start(1);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        ticker.stop();
        assert!(!ticker.is_active());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_task() {
        let (ticks, epoch, handler) = counting_handler();
        let mut ticker = IntervalTicker::every_second(handler);

        ticker.start(1);
        ticker.start(2);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(epoch.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_task() {
        let (ticks, _, handler) = counting_handler();
        {
            let mut ticker = IntervalTicker::every_second(handler);
            ticker.start(1);
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_without_runtime_is_inert() {
        let (_, _, handler) = counting_handler();
        let mut ticker = IntervalTicker::every_second(handler);
        ticker.start(1);
        assert!(!ticker.is_active());
    }
}

use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use futures::FutureExt;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{error, warn};

struct CountdownEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

struct DeadlineEntry {
    generation: u64,
    handle: JoinHandle<()>,
    started_at: Instant,
    limit_secs: u64,
}

/// Per-lobby countdown and question-deadline scheduling.
///
/// All wall-clock scheduling funnels through this registry; starting a timer
/// for a lobby cancels whatever was running for that lobby first, so no two
/// timers for the same lobby ever run concurrently. Callback panics are
/// caught and logged at this boundary and never leave a dangling timer.
pub struct TimerRegistry {
    generation: AtomicU64,
    countdowns: DashMap<String, CountdownEntry>,
    deadlines: DashMap<String, DeadlineEntry>,
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self {
            generation: AtomicU64::new(0),
            countdowns: DashMap::new(),
            deadlines: DashMap::new(),
        }
    }
}

impl TimerRegistry {
    /// Fresh registry with no timers scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a countdown for `lobby_id`, cancelling any prior timer for the
    /// same lobby. `on_tick(remaining)` fires once per elapsed second while
    /// seconds remain; `on_complete` fires once at zero.
    pub fn start_countdown<T, TF, C, CF>(
        self: &Arc<Self>,
        lobby_id: &str,
        seconds: u32,
        on_tick: T,
        on_complete: C,
    ) where
        T: Fn(u32) -> TF + Send + Sync + 'static,
        TF: Future<Output = ()> + Send,
        C: FnOnce() -> CF + Send + 'static,
        CF: Future<Output = ()> + Send,
    {
        self.clear(lobby_id);

        let generation = self.next_generation();
        let registry = Arc::clone(self);
        let id = lobby_id.to_owned();

        let handle = tokio::spawn({
            let id = id.clone();
            async move {
                let mut remaining = seconds;
                while remaining > 0 {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    remaining -= 1;
                    if remaining > 0 {
                        run_guarded(&id, "countdown tick", on_tick(remaining)).await;
                    }
                }
                // Drop our own slot first so the completion callback can arm
                // the question deadline without aborting this task.
                registry
                    .countdowns
                    .remove_if(&id, |_, entry| entry.generation == generation);
                run_guarded(&id, "countdown complete", on_complete()).await;
            }
        });

        self.countdowns
            .insert(id, CountdownEntry { generation, handle });
    }

    /// Arm the question deadline for `lobby_id`, cancelling any prior timer
    /// for the same lobby. The start instant and limit stay queryable via
    /// [`elapsed`](Self::elapsed) until the timer fires or is cleared.
    pub fn start_question_deadline<E, EF>(
        self: &Arc<Self>,
        lobby_id: &str,
        seconds: u64,
        on_expire: E,
    ) where
        E: FnOnce() -> EF + Send + 'static,
        EF: Future<Output = ()> + Send,
    {
        self.clear(lobby_id);

        let generation = self.next_generation();
        let registry = Arc::clone(self);
        let id = lobby_id.to_owned();

        let handle = tokio::spawn({
            let id = id.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(seconds)).await;
                // Drop the bookkeeping before the callback runs so a late
                // answer arriving during end-question is seen as desynced.
                registry
                    .deadlines
                    .remove_if(&id, |_, entry| entry.generation == generation);
                run_guarded(&id, "question deadline", on_expire()).await;
            }
        });

        self.deadlines.insert(
            id,
            DeadlineEntry {
                generation,
                handle,
                started_at: Instant::now(),
                limit_secs: seconds,
            },
        );
    }

    /// Cancel both timers for the lobby if present. Safe to call when nothing
    /// is scheduled.
    pub fn clear(&self, lobby_id: &str) {
        if let Some((_, entry)) = self.countdowns.remove(lobby_id) {
            entry.handle.abort();
        }
        if let Some((_, entry)) = self.deadlines.remove(lobby_id) {
            entry.handle.abort();
        }
    }

    /// Seconds since the current question's recorded start, or `None` when no
    /// question timer is active for the lobby.
    pub fn elapsed(&self, lobby_id: &str) -> Option<f64> {
        self.deadlines
            .get(lobby_id)
            .map(|entry| entry.started_at.elapsed().as_secs_f64())
    }

    /// The limit the active question timer was armed with, if any.
    pub fn deadline_limit(&self, lobby_id: &str) -> Option<u64> {
        self.deadlines.get(lobby_id).map(|entry| entry.limit_secs)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }
}

/// Run a timer callback, containing panics so a failing callback can never
/// tear down the registry or the runtime.
async fn run_guarded<F>(lobby_id: &str, what: &'static str, fut: F)
where
    F: Future<Output = ()>,
{
    if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
        error!(lobby_id, what, "timer callback panicked");
    }
}

/// Remaining seconds for a question that started at `start_millis` with the
/// given limit, computed purely from the durable record. Used to rebuild
/// timing state for reconnecting hosts and players.
pub fn remaining_from_wall_clock(start_millis: i64, limit_secs: u64, now_millis: i64) -> u64 {
    let elapsed_secs = (now_millis.saturating_sub(start_millis)) / 1_000;
    if elapsed_secs < 0 {
        warn!(start_millis, now_millis, "question start time is in the future");
        return limit_secs;
    }
    limit_secs.saturating_sub(elapsed_secs as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_down_then_completes() {
        let registry = Arc::new(TimerRegistry::new());
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());

        let tick_log = Arc::clone(&ticks);
        let done_tx = Arc::clone(&done);
        registry.start_countdown(
            "main",
            3,
            move |remaining| {
                let tick_log = Arc::clone(&tick_log);
                async move {
                    tick_log.lock().unwrap().push(remaining);
                }
            },
            move || async move {
                done_tx.notify_one();
            },
        );

        done.notified().await;
        assert_eq!(*ticks.lock().unwrap(), vec![2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn question_deadline_fires_once_and_clears_bookkeeping() {
        let registry = Arc::new(TimerRegistry::new());
        let done = Arc::new(Notify::new());

        let done_tx = Arc::clone(&done);
        registry.start_question_deadline("main", 5, move || async move {
            done_tx.notify_one();
        });

        assert!(registry.elapsed("main").is_some());
        assert_eq!(registry.deadline_limit("main"), Some(5));

        done.notified().await;
        assert!(registry.elapsed("main").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn starting_a_new_timer_cancels_the_previous_one() {
        let registry = Arc::new(TimerRegistry::new());
        let fired = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(Notify::new());

        let first_log = Arc::clone(&fired);
        registry.start_countdown(
            "main",
            10,
            |_| async {},
            move || async move {
                first_log.lock().unwrap().push("first");
            },
        );

        let second_log = Arc::clone(&fired);
        let done_tx = Arc::clone(&done);
        registry.start_countdown(
            "main",
            2,
            |_| async {},
            move || async move {
                second_log.lock().unwrap().push("second");
                done_tx.notify_one();
            },
        );

        done.notified().await;
        // Give the aborted first timer's slot time to surface if it survived.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timers_for_different_lobbies_are_independent() {
        let registry = Arc::new(TimerRegistry::new());
        let done = Arc::new(Notify::new());

        let done_tx = Arc::clone(&done);
        registry.start_question_deadline("a", 3, move || async move {
            done_tx.notify_one();
        });
        registry.start_question_deadline("b", 30, || async {});

        done.notified().await;
        assert!(registry.elapsed("a").is_none());
        assert!(registry.elapsed("b").is_some());
        registry.clear("b");
        assert!(registry.elapsed("b").is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent_when_nothing_is_scheduled() {
        let registry = Arc::new(TimerRegistry::new());
        registry.clear("main");
        registry.clear("main");
        assert!(registry.elapsed("main").is_none());
    }

    #[test]
    fn remaining_time_is_rebuilt_from_wall_clock() {
        // 20 seconds into a 30 second question leaves 10.
        assert_eq!(remaining_from_wall_clock(0, 30, 20_000), 10);
        // Past the limit the question has effectively ended.
        assert_eq!(remaining_from_wall_clock(0, 30, 31_000), 0);
        assert_eq!(remaining_from_wall_clock(0, 30, 300_000), 0);
    }
}

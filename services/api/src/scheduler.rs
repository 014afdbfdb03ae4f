use crate::infra::{build_notifier, InMemoryShelterStore, SweepBoard};
use shelter_bot::config::{SchedulerConfig, TelegramConfig};
use shelter_bot::probation::{Notifier, NotifyError, ProbationEngine};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

type ServiceEngine = ProbationEngine<InMemoryShelterStore, InMemoryShelterStore, dyn Notifier>;

/// Loop bookkeeping between sweeps.
#[derive(Debug, Default)]
pub(crate) struct TickState {
    pub(crate) tick_count: u64,
    pub(crate) consecutive_failures: u32,
}

impl TickState {
    pub(crate) fn tick(&mut self, failures: usize) {
        self.tick_count += 1;
        if failures == 0 {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
    }
}

/// Handle to the sweep task. Dropping the handle also stops the loop at its next wait.
pub(crate) struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the loop and waits for a sweep in flight to finish.
    pub(crate) async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "probation sweep task ended abnormally");
        }
    }
}

/// Starts the periodic sweep on the runtime. The first sweep runs immediately, later
/// ones every `scheduler.interval`; a sweep that overruns pushes the next one back.
pub(crate) fn spawn(
    store: InMemoryShelterStore,
    scheduler: SchedulerConfig,
    telegram: TelegramConfig,
    board: Arc<SweepBoard>,
) -> SchedulerHandle {
    let (stop, stopped) = watch::channel(false);
    let task = tokio::spawn(run_loop(store, scheduler, telegram, board, stopped));
    SchedulerHandle { stop, task }
}

async fn run_loop(
    store: InMemoryShelterStore,
    scheduler: SchedulerConfig,
    telegram: TelegramConfig,
    board: Arc<SweepBoard>,
    mut stop: watch::Receiver<bool>,
) {
    let telegram_enabled = telegram.bot_token.is_some();
    let sweep_config = scheduler.sweep_config();

    // The Bot API client blocks, so it is built and dropped off the async workers.
    let built = tokio::task::spawn_blocking(move || {
        let notifier = build_notifier(&telegram, true)?;
        let store = Arc::new(store);
        Ok::<_, NotifyError>(Arc::new(ServiceEngine::new(
            store.clone(),
            store,
            notifier,
            sweep_config,
        )))
    })
    .await;
    let engine = match built {
        Ok(Ok(engine)) => engine,
        Ok(Err(err)) => {
            error!(error = %err, "failed to build notifier; probation sweeps disabled");
            return;
        }
        Err(err) => {
            error!(error = %err, "notifier setup task failed; probation sweeps disabled");
            return;
        }
    };

    info!(
        interval_secs = scheduler.interval.as_secs(),
        unit = ?scheduler.deadline_unit,
        mode = ?scheduler.deadline_mode,
        telegram = telegram_enabled,
        "probation sweep scheduler started"
    );

    let mut ticker = tokio::time::interval(scheduler.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state = TickState::default();

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }

        let sweep_engine = engine.clone();
        let summary = match tokio::task::spawn_blocking(move || sweep_engine.run_sweep()).await {
            Ok(summary) => summary,
            Err(err) => {
                error!(error = %err, "probation sweep task failed");
                state.tick(1);
                continue;
            }
        };

        state.tick(summary.failures());
        if state.consecutive_failures > 0 {
            warn!(
                tick = state.tick_count,
                consecutive = state.consecutive_failures,
                failures = summary.failures(),
                "probation sweep finished with failures"
            );
        }
        board.record(summary);

        if *stop.borrow() {
            break;
        }
    }

    let _ = tokio::task::spawn_blocking(move || drop(engine)).await;
    info!(ticks = state.tick_count, "probation sweep scheduler stopped");
}

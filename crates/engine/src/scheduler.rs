//! The polling loop.
//!
//! `FreshStart -> Polling -> {Claiming -> Terminal} | {BanCooldown ->
//! FreshStart} | {WorkCooldown -> FreshStart} | {Aborted -> Terminal}`.
//!
//! Retry intervals are uniformly random and the cooldown phases sign out
//! and restart from a clean session; both exist to stay under the
//! portal's abuse defenses. A fixed poll interval is the wrong behavior.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rand::Rng;
use slotwatch_browser::Bridge;
use slotwatch_core::config::TimingConfig;
use slotwatch_core::{AvailableDate, ClaimResult, Config, Journal, Result, TargetWindow};
use slotwatch_notify::Notifier;
use tokio::sync::broadcast;
use tokio::time::{sleep, Duration, Instant};
use tracing::{error, info, warn};

use crate::claim::{FormPoster, RescheduleTransactor};
use crate::fetch::AvailabilityFetcher;
use crate::select;
use crate::session::SessionManager;

/// Per-phase counters, reset on every fresh start.
struct RunState {
    started_at: Instant,
    request_count: u32,
}

impl RunState {
    fn fresh() -> Self {
        Self {
            started_at: Instant::now(),
            request_count: 0,
        }
    }
}

/// What one polling cycle decided to do with its fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CycleOutcome {
    /// Empty dates feed: assume a temporary block.
    BanCooldown,
    /// A date inside the window; hand over to the transactor.
    Claim(NaiveDate),
    /// No match and the work limit is spent; take a rest break.
    WorkCooldown,
    /// No match; sleep a jittered interval and poll again.
    Retry,
}

fn classify_cycle(
    dates: Option<&[AvailableDate]>,
    window: &TargetWindow,
    elapsed: Duration,
    work_limit: Duration,
) -> CycleOutcome {
    // Ban detection comes first: an absent or fully empty feed is the
    // block signal regardless of how long we have been working.
    let dates = match dates {
        Some(dates) if !dates.is_empty() => dates,
        _ => return CycleOutcome::BanCooldown,
    };
    if let Some(date) = select::pick(dates, window) {
        return CycleOutcome::Claim(date);
    }
    if elapsed > work_limit {
        CycleOutcome::WorkCooldown
    } else {
        CycleOutcome::Retry
    }
}

/// Uniformly random wait between availability checks.
fn retry_delay(timing: &TimingConfig) -> Duration {
    let secs = rand::thread_rng().gen_range(timing.retry_lower_secs..=timing.retry_upper_secs);
    Duration::from_secs(secs)
}

fn hours(value: f64) -> Duration {
    Duration::from_secs_f64(value * 3600.0)
}

/// How the run ended. Every variant passes through the same terminal
/// cleanup: final journal line, final notification, sign-out, browser
/// release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The single claim attempt ran (successfully or not).
    Claimed(ClaimResult),
    /// An unhandled error broke the loop.
    Aborted(String),
    /// Shutdown signal received during a sleep.
    Interrupted,
}

pub struct PollScheduler {
    session: SessionManager,
    fetcher: AvailabilityFetcher,
    transactor: RescheduleTransactor,
    bridge: Arc<dyn Bridge>,
    notifier: Arc<dyn Notifier>,
    journal: Journal,
    config: Arc<Config>,
    shutdown: broadcast::Receiver<()>,
}

impl PollScheduler {
    pub fn new(
        bridge: Arc<dyn Bridge>,
        poster: Arc<dyn FormPoster>,
        notifier: Arc<dyn Notifier>,
        journal: Journal,
        config: Arc<Config>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            session: SessionManager::new(bridge.clone(), config.clone()),
            fetcher: AvailabilityFetcher::new(bridge.clone(), config.clone()),
            transactor: RescheduleTransactor::new(bridge.clone(), poster, config.clone()),
            bridge,
            notifier,
            journal,
            config,
            shutdown,
        }
    }

    /// Drive the loop to its terminal state and perform the cleanup every
    /// terminal path shares.
    pub async fn run(&mut self) -> RunOutcome {
        let outcome = match self.drive().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Breaking the loop after error");
                RunOutcome::Aborted(e.to_string())
            }
        };

        let (title, message) = match &outcome {
            RunOutcome::Claimed(result) if result.is_success() => {
                ("SUCCESS", result.summary())
            }
            RunOutcome::Claimed(result) => ("FAIL", result.summary()),
            RunOutcome::Aborted(reason) => {
                ("EXCEPTION", format!("Run aborted: {}", reason))
            }
            RunOutcome::Interrupted => {
                ("STOP", "Interrupted by shutdown signal".to_string())
            }
        };
        info!("{}", message);
        self.journal.append(&message);
        self.notifier.notify(title, &message).await;
        self.session.sign_out().await;
        self.bridge.close().await;
        outcome
    }

    async fn drive(&mut self) -> Result<RunOutcome> {
        let window = self.config.target_window()?;
        let work_limit = hours(self.config.timing.work_limit_hours);

        'fresh: loop {
            // FreshStart: clean counters, forced login.
            let mut state = RunState::fresh();
            self.session.login().await?;

            loop {
                // Polling.
                state.request_count += 1;
                self.session.ensure_logged_in().await?;

                self.journal.append(&"-".repeat(60));
                self.journal.append(&format!(
                    "Request count: {}, Log time: {}",
                    state.request_count,
                    Local::now()
                ));

                let dates = self.fetcher.get_dates().await?;
                if let Some(dates) = &dates {
                    let listing = dates
                        .iter()
                        .map(|d| d.date.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.journal.append(&format!("Available dates: {}", listing));
                }

                match classify_cycle(
                    dates.as_deref(),
                    &window,
                    state.started_at.elapsed(),
                    work_limit,
                ) {
                    CycleOutcome::Claim(date) => {
                        // Claiming: one attempt, then terminal either way.
                        let msg = format!("A good available date: {}", date);
                        info!("{}", msg);
                        self.journal.append(&msg);
                        self.notifier.notify("FOUND", &msg).await;

                        let result = self.transactor.claim(&self.fetcher, date).await?;
                        return Ok(RunOutcome::Claimed(result));
                    }
                    CycleOutcome::BanCooldown => {
                        let cooldown = self.config.timing.ban_cooldown_hours;
                        let msg = format!(
                            "Dates feed is empty, probably banned. Sleeping {} hours.",
                            cooldown
                        );
                        warn!("{}", msg);
                        self.journal.append(&msg);
                        self.notifier.notify("BAN", &msg).await;
                        self.session.sign_out().await;
                        if !self.pause(hours(cooldown)).await {
                            return Ok(RunOutcome::Interrupted);
                        }
                        continue 'fresh;
                    }
                    CycleOutcome::WorkCooldown => {
                        let msg = format!(
                            "Break time after {} hours of work | Repeated {} times",
                            self.config.timing.work_limit_hours, state.request_count
                        );
                        info!("{}", msg);
                        self.journal.append(&msg);
                        self.notifier.notify("REST", &msg).await;
                        self.session.sign_out().await;
                        if !self
                            .pause(hours(self.config.timing.work_cooldown_hours))
                            .await
                        {
                            return Ok(RunOutcome::Interrupted);
                        }
                        continue 'fresh;
                    }
                    CycleOutcome::Retry => {
                        let elapsed = state.started_at.elapsed();
                        self.journal.append(&format!(
                            "Working time: ~ {:.2} minutes",
                            elapsed.as_secs_f64() / 60.0
                        ));
                        let delay = retry_delay(&self.config.timing);
                        self.journal
                            .append(&format!("Retry wait time: {} seconds", delay.as_secs()));
                        if !self.pause(delay).await {
                            return Ok(RunOutcome::Interrupted);
                        }
                    }
                }
            }
        }
    }

    /// Sleep that a shutdown signal can cut short. Returns false when the
    /// run should stop.
    async fn pause(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = sleep(duration) => true,
            _ = self.shutdown.recv() => {
                info!("Shutdown requested, stopping");
                false
            }
        }
    }
}

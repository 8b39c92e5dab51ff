//! One-second ticker driving a shared [`QuizSession`].
//!
//! The task ticks the session, forwards what happened as [`QuizEvent`]s and
//! submits on its own when a countdown runs out, retrying after
//! [`AUTO_SUBMIT_RETRY`] while delivery fails. At most one ticker runs per
//! [`TimerSlot`]; starting a new one cancels the previous one first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use tutor_core::SessionError;
use tutor_core::model::{QuizSession, TickEvent};

use super::QuizEvent;
use super::live::submit_shared;
use super::service::QuizService;
use crate::error::QuizServiceError;

const TICK: Duration = Duration::from_secs(1);

/// Pause after a failed automatic submission before the next attempt.
pub const AUTO_SUBMIT_RETRY: Duration = Duration::from_secs(5);

struct TimerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Holds the single running ticker, if any.
#[derive(Default)]
pub struct TimerSlot {
    current: Option<TimerHandle>,
}

impl TimerSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking `session`, replacing any running ticker.
    pub fn start(
        &mut self,
        service: Arc<QuizService>,
        session: Arc<Mutex<QuizSession>>,
        events: mpsc::Sender<QuizEvent>,
    ) {
        self.cancel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            run(service, session, events, cancel.clone()).instrument(info_span!("quiz_timer")),
        );
        self.current = Some(TimerHandle { cancel, task });
    }

    /// Stop the running ticker. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(handle) => {
                handle.cancel.cancel();
                !handle.task.is_finished()
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(
    service: Arc<QuizService>,
    session: Arc<Mutex<QuizSession>>,
    events: mpsc::Sender<QuizEvent>,
    cancel: CancellationToken,
) {
    let mut interval = time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("ticker cancelled");
                return;
            }
            _ = interval.tick() => {}
        }

        let (event, timer) = {
            let mut guard = session.lock().await;
            let event = guard.tick();
            (event, guard.timer())
        };

        match event {
            TickEvent::Ticked(timer) => {
                let _ = events.send(QuizEvent::Tick(timer)).await;
            }
            TickEvent::Warning(warning) => {
                info!(remaining = %timer, "{}", warning.message());
                let _ = events.send(QuizEvent::Tick(timer)).await;
                let _ = events.send(QuizEvent::Warning(warning)).await;
            }
            TickEvent::Paused => {}
            TickEvent::Closed => {
                debug!("session closed; ticker stopping");
                return;
            }
            TickEvent::TimeUp => {
                info!("time is up; submitting");
                let _ = events.send(QuizEvent::Tick(timer)).await;
                let _ = events.send(QuizEvent::TimeUp).await;
                if auto_submit(&service, &session, &events).await {
                    return;
                }
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = time::sleep(AUTO_SUBMIT_RETRY) => interval.reset(),
                }
            }
        }
    }
}

/// Submit after time ran out. Returns whether the session is now terminal.
async fn auto_submit(
    service: &QuizService,
    session: &Mutex<QuizSession>,
    events: &mpsc::Sender<QuizEvent>,
) -> bool {
    match submit_shared(service, session).await {
        Ok(score) => {
            let _ = events.send(QuizEvent::Submitted(score)).await;
            true
        }
        Err(QuizServiceError::Session(SessionError::Expired)) => {
            let _ = events.send(QuizEvent::Expired).await;
            true
        }
        Err(QuizServiceError::Session(SessionError::AlreadySubmitting)) => {
            debug!("submission already in flight");
            false
        }
        Err(err) => {
            warn!(error = %err, "automatic submission failed");
            let _ = events.send(QuizEvent::SubmitFailed(err.to_string())).await;
            session.lock().await.is_terminal()
        }
    }
}

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use tutor_core::model::{QuizSession, Score};

use super::QuizEvent;
use super::service::QuizService;
use super::timer::TimerSlot;
use crate::error::QuizServiceError;

const EVENT_CAPACITY: usize = 64;

/// A session being taken right now: shared state plus its running ticker.
///
/// Edits go through [`LiveQuiz::with_session`]; timer ticks and automatic
/// submission arrive on the receiver returned by [`LiveQuiz::start`].
pub struct LiveQuiz {
    service: Arc<QuizService>,
    session: Arc<Mutex<QuizSession>>,
    timer: TimerSlot,
    events: mpsc::Sender<QuizEvent>,
}

impl LiveQuiz {
    /// Wrap `session` and start its ticker.
    #[must_use]
    pub fn start(service: Arc<QuizService>, session: QuizSession) -> (Self, mpsc::Receiver<QuizEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_CAPACITY);
        let mut live = Self {
            service,
            session: Arc::new(Mutex::new(session)),
            timer: TimerSlot::new(),
            events,
        };
        live.resume_timer();
        (live, receiver)
    }

    /// Run `f` against the locked session.
    pub async fn with_session<T>(&self, f: impl FnOnce(&mut QuizSession) -> T) -> T {
        let mut guard = self.session.lock().await;
        f(&mut guard)
    }

    #[must_use]
    pub fn session(&self) -> Arc<Mutex<QuizSession>> {
        Arc::clone(&self.session)
    }

    /// (Re)start the ticker unless the session is already over.
    pub fn resume_timer(&mut self) {
        if self.session.try_lock().is_ok_and(|session| session.is_terminal()) {
            self.timer.cancel();
            return;
        }
        self.timer.start(
            Arc::clone(&self.service),
            Arc::clone(&self.session),
            self.events.clone(),
        );
    }

    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Submit the current answers.
    ///
    /// # Errors
    ///
    /// See [`QuizService::submit`].
    pub async fn submit(&mut self) -> Result<Score, QuizServiceError> {
        let result = submit_shared(&self.service, &self.session).await;
        if self.session.lock().await.is_terminal() {
            self.timer.cancel();
        }
        result
    }

    /// Stop the ticker and checkpoint. Returns whether a draft was written.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Draft` if the draft cannot be written.
    pub async fn close(mut self) -> Result<bool, QuizServiceError> {
        self.timer.cancel();
        let guard = self.session.lock().await;
        self.service.close(&guard).await
    }
}

/// Submit a shared session without holding its lock while the request is out,
/// so the ticker and editors stay responsive.
pub(crate) async fn submit_shared(
    service: &QuizService,
    session: &Mutex<QuizSession>,
) -> Result<Score, QuizServiceError> {
    let submission = {
        let mut guard = session.lock().await;
        service.prepare(&mut guard).await?
    };
    let outcome = service.deliver(&submission).await;
    let mut guard = session.lock().await;
    service.settle(&mut guard, outcome).await
}

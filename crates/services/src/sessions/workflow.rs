use std::sync::Arc;

use quml_core::model::{Answer, SessionConfig};
use storage::repository::{QuestionSource, StorageError};

use super::controller::NavigationController;
use super::fetch::{FetchWindow, LoadFailure};
use super::signals::Signal;
use super::state::{NavOutcome, SessionState};
use crate::Clock;
use crate::error::SessionError;

/// Drives a `NavigationController` against a question source.
///
/// Every action reads `now` from the clock, forwards it to the controller,
/// then fulfils whatever batch requests the transition produced.
pub struct SessionRunner {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    controller: NavigationController,
}

impl SessionRunner {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<dyn QuestionSource>, config: SessionConfig) -> Self {
        Self {
            clock,
            source,
            controller: NavigationController::new(config),
        }
    }

    /// Wrap an already-built controller.
    #[must_use]
    pub fn with_controller(
        clock: Clock,
        source: Arc<dyn QuestionSource>,
        controller: NavigationController,
    ) -> Self {
        Self {
            clock,
            source,
            controller,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Mutable clock access, for advancing a fixed clock.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.controller.state(self.clock.now())
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        self.controller.drain_signals()
    }

    /// Load the first batch and leave a disabled start page.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuestionLoad` if the first batch cannot be loaded.
    pub async fn start(&mut self) -> Result<NavOutcome, SessionError> {
        if let Err(failure) = self.pump().await {
            return Err(SessionError::QuestionLoad(failure));
        }
        let outcome = self.controller.begin(self.clock.now());
        self.settle().await;
        Ok(outcome)
    }

    /// Re-fetch the window that failed and resume navigation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::QuestionLoad` if the retry fails too.
    pub async fn retry_load(&mut self) -> Result<(), SessionError> {
        let Some(window) = self.controller.failed_window() else {
            return Ok(());
        };
        match self.fetch(window).await {
            Ok(()) => {
                self.controller.resume_loading();
                self.pump().await.map_err(SessionError::QuestionLoad)
            }
            Err(failure) => {
                self.controller.report_load_failure(window, failure);
                Err(SessionError::QuestionLoad(failure))
            }
        }
    }

    /// # Errors
    ///
    /// Propagates controller errors.
    pub fn select_option(&mut self, answer: Answer) -> Result<NavOutcome, SessionError> {
        self.controller.select_option(answer, self.clock.now())
    }

    /// # Errors
    ///
    /// Propagates controller errors.
    pub fn clear_selection(&mut self) -> Result<NavOutcome, SessionError> {
        self.controller.clear_selection(self.clock.now())
    }

    /// # Errors
    ///
    /// Propagates controller errors; load failures pause the session instead.
    pub async fn next(&mut self) -> Result<NavOutcome, SessionError> {
        let outcome = self.controller.next(self.clock.now())?;
        self.settle().await;
        Ok(outcome)
    }

    /// # Errors
    ///
    /// As `next`.
    pub async fn previous(&mut self) -> Result<NavOutcome, SessionError> {
        let outcome = self.controller.previous(self.clock.now())?;
        self.settle().await;
        Ok(outcome)
    }

    /// # Errors
    ///
    /// As `next`.
    pub async fn jump(&mut self, target: usize) -> Result<NavOutcome, SessionError> {
        let outcome = self.controller.jump(target, self.clock.now())?;
        self.settle().await;
        Ok(outcome)
    }

    pub fn submit(&mut self) -> NavOutcome {
        self.controller.submit(self.clock.now())
    }

    pub async fn replay(&mut self) -> NavOutcome {
        let outcome = self.controller.replay(self.clock.now());
        let begun = self.controller.begin(self.clock.now());
        self.settle().await;
        if matches!(begun, NavOutcome::Moved { .. }) {
            begun
        } else {
            outcome
        }
    }

    /// Advance timers to the clock's current instant.
    ///
    /// # Errors
    ///
    /// As `next`.
    pub async fn tick(&mut self) -> Result<Option<NavOutcome>, SessionError> {
        let outcome = self.controller.tick(self.clock.now())?;
        self.settle().await;
        Ok(outcome)
    }

    pub fn view_solution(&mut self) -> NavOutcome {
        self.controller.view_solution(self.clock.now())
    }

    pub fn close_solution(&mut self) -> NavOutcome {
        self.controller.close_solution(self.clock.now())
    }

    /// # Errors
    ///
    /// Propagates controller errors.
    pub fn mark_answer_shown(&mut self) -> Result<NavOutcome, SessionError> {
        self.controller.mark_answer_shown(self.clock.now())
    }

    async fn settle(&mut self) {
        if let Err(failure) = self.pump().await {
            tracing::debug!(%failure, "session paused on load failure");
        }
    }

    async fn pump(&mut self) -> Result<(), LoadFailure> {
        if let Some(failure) = self.controller.load_failure() {
            return Err(failure);
        }
        let mut pending = self.controller.take_fetch_requests().into_iter();
        while let Some(window) = pending.next() {
            if let Err(failure) = self.fetch(window).await {
                self.controller.report_load_failure(window, failure);
                self.controller.requeue_fetches(pending);
                return Err(failure);
            }
        }
        Ok(())
    }

    async fn fetch(&mut self, window: FetchWindow) -> Result<(), LoadFailure> {
        let ids = self.controller.window_ids(window);
        match self.source.fetch_questions(&ids).await {
            Ok(batch) => {
                self.controller.merge_questions(batch);
                Ok(())
            }
            Err(err) => Err(self.classify(&err)),
        }
    }

    fn classify(&self, err: &StorageError) -> LoadFailure {
        if !self.source.is_online() || err.is_connectivity() {
            LoadFailure::ConnectivityLost
        } else {
            LoadFailure::ContentLoadFailed
        }
    }
}

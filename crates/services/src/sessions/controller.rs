use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::rng;
use rand::seq::SliceRandom;

use quml_core::model::{Answer, Question, QuestionId, QuestionType, SessionConfig, SessionId};
use quml_core::progress::{ProgressEntry, ProgressStatus, ProgressTracker};
use quml_core::scoring::{ScoringEngine, Verdict, max_attainable};
use quml_core::time::millis;

use super::fetch::{FetchCursor, FetchWindow, LoadFailure};
use super::signals::{SessionResult, Signal, TelemetryKind, events};
use super::state::{FeedbackView, NavAction, NavOutcome, Page, RejectReason, SessionState};
use crate::error::SessionError;
use crate::question_store::{QuestionSlot, QuestionStore};
use crate::timer::{Scheduled, TimerController, TimerEvent};

/// Session state machine.
///
/// Owns the current page, the pending selection, feedback and popup
/// deadlines, the progress ledger and the session timer. Every action takes
/// the current instant; nothing here reads the clock or performs I/O.
/// Question batches are requested through `take_fetch_requests` and handed
/// back with `merge_questions`.
pub struct NavigationController {
    session_id: SessionId,
    config: SessionConfig,
    store: QuestionStore,
    progress: ProgressTracker,
    timer: TimerController,
    scoring: ScoringEngine,
    cursor: FetchCursor,
    page: Page,
    selection: Option<Answer>,
    feedback: Option<FeedbackView>,
    auto_advance: Scheduled<NavAction>,
    info_popup: Scheduled<()>,
    solution_open: bool,
    load_failure: Option<(FetchWindow, LoadFailure)>,
    fetch_queue: VecDeque<FetchWindow>,
    result: Option<SessionResult>,
    signals: Vec<Signal>,
}

impl NavigationController {
    /// Build a controller for a validated configuration.
    ///
    /// A shuffled configuration is permuted once, here. The first batch
    /// request is queued immediately.
    #[must_use]
    pub fn new(mut config: SessionConfig) -> Self {
        if config.shuffle() {
            let mut ids = config.question_ids().to_vec();
            ids.shuffle(&mut rng());
            if let Err(err) = config.set_question_order(ids) {
                tracing::warn!(%err, "keeping configured question order");
            }
        }

        let count = config.question_count();
        let mut controller = Self {
            session_id: SessionId::generate(),
            store: QuestionStore::initialize(config.question_ids().to_vec()),
            progress: ProgressTracker::new(count, config.show_feedback()),
            timer: TimerController::new(config.total_time_ms(), config.warning_time_ms()),
            scoring: ScoringEngine::new(config.multi_select_scoring()),
            cursor: FetchCursor::new(count, config.threshold()),
            page: Page::Start,
            selection: None,
            feedback: None,
            auto_advance: Scheduled::new(),
            info_popup: Scheduled::new(),
            solution_open: false,
            load_failure: None,
            fetch_queue: VecDeque::new(),
            result: None,
            signals: Vec::new(),
            config,
        };
        if let Some(window) = controller.cursor.initial() {
            controller.request_fetch(window);
        }
        tracing::info!(
            session_id = %controller.session_id,
            questions = count,
            linear = controller.config.is_linear(),
            "session created"
        );
        controller
    }

    /// Replace the scoring engine, e.g. with a custom multi-select combiner.
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    // Accessors
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn page(&self) -> Page {
        self.page
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.page.position(self.question_count())
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionStore {
        &self.store
    }

    #[must_use]
    pub fn current_question(&self) -> QuestionSlot<'_> {
        match self.page.question_index() {
            Some(index) => self.store.get(index),
            None => QuestionSlot::OutOfRange,
        }
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    #[must_use]
    pub fn entries(&self) -> &[ProgressEntry] {
        self.progress.entries()
    }

    /// Running total; well-defined mid-session.
    #[must_use]
    pub fn total_score(&self) -> f64 {
        self.progress.total()
    }

    #[must_use]
    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Answer> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&FeedbackView> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn auto_advance_deadline(&self) -> Option<DateTime<Utc>> {
        self.auto_advance.deadline()
    }

    #[must_use]
    pub fn info_popup_deadline(&self) -> Option<DateTime<Utc>> {
        self.info_popup.deadline()
    }

    #[must_use]
    pub fn is_solution_open(&self) -> bool {
        self.solution_open
    }

    #[must_use]
    pub fn load_failure(&self) -> Option<LoadFailure> {
        self.load_failure.map(|(_, failure)| failure)
    }

    /// Frozen result, once the end page has been reached.
    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.page == Page::End
    }

    /// Max score for the result: configured, else the sum over loaded questions.
    ///
    /// Without a configured value, questions that were never fetched do not
    /// contribute, so a session ending early under batched loading reports a
    /// smaller maximum.
    #[must_use]
    pub fn max_score(&self) -> f64 {
        self.config
            .max_score()
            .unwrap_or_else(|| self.store.questions().iter().map(max_attainable).sum())
    }

    /// Snapshot for renderers.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        let current = self.current_question();
        SessionState {
            session_id: self.session_id,
            page: self.page,
            position: self.position(),
            question_count: self.question_count(),
            current_question_id: current.loaded().map(|q| q.id().clone()),
            question_pending: matches!(current, QuestionSlot::Pending),
            show_start_page: self.config.show_start_page(),
            end_reached: self.is_ended(),
            requires_submit: self.config.requires_submit(),
            navigation_mode: self.config.navigation_mode(),
            answer_pending: self.selection.is_some(),
            feedback: self.feedback,
            solution_open: self.solution_open,
            info_popup: self.info_popup.is_armed(),
            load_failure: self.load_failure(),
            score: self.total_score(),
            elapsed_ms: self.timer.elapsed_ms(now),
            remaining_ms: self.timer.remaining_ms(now),
            total_time_ms: self.timer.total_ms(),
            warning_time_ms: self.timer.warning_ms(),
        }
    }

    /// Take every signal emitted since the last drain.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Windows the caller should fetch and hand back through `merge_questions`.
    pub fn take_fetch_requests(&mut self) -> Vec<FetchWindow> {
        self.fetch_queue.drain(..).collect()
    }

    /// Put unserved windows back at the front of the queue, in order.
    pub(crate) fn requeue_fetches(&mut self, windows: impl DoubleEndedIterator<Item = FetchWindow>) {
        for window in windows.rev() {
            self.fetch_queue.push_front(window);
        }
    }

    /// Canonical ids covered by `window`.
    #[must_use]
    pub fn window_ids(&self, window: FetchWindow) -> Vec<QuestionId> {
        let ids = self.store.canonical_ids();
        let end = window.end().min(ids.len());
        ids.get(window.start..end).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Merge a fetched batch. Never moves the current position.
    pub fn merge_questions(&mut self, batch: Vec<Question>) {
        let waiting = self
            .page
            .question_index()
            .filter(|index| !self.store.is_loaded(*index));

        self.store.merge(batch);
        self.retag();

        if let Some(index) = waiting {
            if let Some(question) = self.store.get(index).loaded() {
                self.signals.push(Signal::CurrentQuestionChanged {
                    position: index + 1,
                    question_id: Some(question.id().clone()),
                });
            }
        }
    }

    /// Record a failed fetch. Navigation pauses until `resume_loading`.
    pub fn report_load_failure(&mut self, window: FetchWindow, failure: LoadFailure) {
        tracing::warn!(
            session_id = %self.session_id,
            start = window.start,
            size = window.size,
            %failure,
            "question batch failed to load"
        );
        self.load_failure = Some((window, failure));
        self.signals.push(Signal::LoadFailed { failure });
    }

    /// The window whose fetch failed, if loading is paused.
    #[must_use]
    pub fn failed_window(&self) -> Option<FetchWindow> {
        self.load_failure.map(|(window, _)| window)
    }

    pub fn resume_loading(&mut self) {
        if self.load_failure.take().is_some() {
            tracing::info!(session_id = %self.session_id, "question loading resumed");
        }
    }

    //
    // ─── ACTIONS ───────────────────────────────────────────────────────────────
    //

    /// Leave the start page automatically when it is disabled.
    pub fn begin(&mut self, now: DateTime<Utc>) -> NavOutcome {
        if self.page != Page::Start || self.config.show_start_page() {
            return NavOutcome::Ignored;
        }
        self.move_to(Page::Question(1), now)
    }

    /// Record (without committing) the learner's choice for the current question.
    ///
    /// An empty answer behaves like `clear_selection`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress` if the ledger has no entry for the
    /// current question.
    pub fn select_option(
        &mut self,
        answer: Answer,
        now: DateTime<Utc>,
    ) -> Result<NavOutcome, SessionError> {
        let Some(index) = self.page.question_index() else {
            return Ok(NavOutcome::rejected(RejectReason::NotOnQuestion));
        };
        if self.load_failure.is_some() {
            return Ok(NavOutcome::rejected(RejectReason::LoadPaused));
        }
        if self.feedback.is_some() {
            return Ok(NavOutcome::rejected(RejectReason::FeedbackShowing));
        }
        if !self.store.is_loaded(index) {
            return Ok(NavOutcome::rejected(RejectReason::QuestionPending));
        }
        if answer.is_empty() {
            return self.clear_selection(now);
        }

        self.selection = Some(answer);
        self.info_popup.cancel();
        self.telemetry(events::OPTION_SELECTED, TelemetryKind::Interact);
        Ok(NavOutcome::Updated)
    }

    /// "Try again": drop the selection and any feedback on screen.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress` if the ledger has no entry for the
    /// current question.
    pub fn clear_selection(&mut self, _now: DateTime<Utc>) -> Result<NavOutcome, SessionError> {
        let Some(index) = self.page.question_index() else {
            return Ok(NavOutcome::rejected(RejectReason::NotOnQuestion));
        };
        self.selection = None;
        self.feedback = None;
        self.auto_advance.cancel();
        self.progress.mark_skipped_if_untouched(index)?;
        self.telemetry(events::TRY_AGAIN_CLICKED, TelemetryKind::Interact);
        Ok(NavOutcome::Updated)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Scoring` if the pending answer cannot be scored
    /// (the selection is kept), or `SessionError::Progress` on ledger errors.
    pub fn next(&mut self, now: DateTime<Utc>) -> Result<NavOutcome, SessionError> {
        self.telemetry(events::NEXT_CLICKED, TelemetryKind::Interact);
        self.navigate(NavAction::Next, now)
    }

    /// # Errors
    ///
    /// As `next`.
    pub fn previous(&mut self, now: DateTime<Utc>) -> Result<NavOutcome, SessionError> {
        self.telemetry(events::PREVIOUS_CLICKED, TelemetryKind::Interact);
        self.navigate(NavAction::Previous, now)
    }

    /// Jump to `target` (0 = start page, 1..=N = question).
    ///
    /// # Errors
    ///
    /// As `next`.
    pub fn jump(&mut self, target: usize, now: DateTime<Utc>) -> Result<NavOutcome, SessionError> {
        self.telemetry(events::JUMP_CLICKED, TelemetryKind::Interact);
        self.navigate(NavAction::Jump(target), now)
    }

    /// Leave the score board for the end page.
    pub fn submit(&mut self, now: DateTime<Utc>) -> NavOutcome {
        match self.page {
            Page::ScoreBoard => {
                self.telemetry(events::SUBMIT_CLICKED, TelemetryKind::Interact);
                self.finish(now, false)
            }
            Page::End => NavOutcome::Ignored,
            Page::Start | Page::Question(_) => NavOutcome::rejected(RejectReason::NotOnScoreBoard),
        }
    }

    /// Start over from the end page: position 0, zero score, fresh ledger,
    /// timer re-armed for the next entry into a question.
    pub fn replay(&mut self, _now: DateTime<Utc>) -> NavOutcome {
        if self.page != Page::End {
            return NavOutcome::rejected(RejectReason::NotEnded);
        }
        self.telemetry(events::REPLAY_CLICKED, TelemetryKind::Interact);

        self.progress.reset();
        self.retag();
        self.timer.reset();
        self.result = None;
        self.clear_transients();
        self.page = Page::Start;
        self.signals.push(Signal::CurrentQuestionChanged {
            position: 0,
            question_id: None,
        });
        tracing::info!(session_id = %self.session_id, "session replayed");
        NavOutcome::Moved {
            from: Page::End,
            to: Page::Start,
        }
    }

    /// Force the end page. Bypasses the score board; repeats are ignored.
    pub fn time_expired(&mut self, now: DateTime<Utc>) -> NavOutcome {
        if self.page == Page::End {
            return NavOutcome::Ignored;
        }
        tracing::info!(session_id = %self.session_id, "session time expired");
        self.finish(now, true)
    }

    /// Advance deadlines: popup expiry, timer warning/expiry, then feedback
    /// auto-advance. A due auto-advance stays armed while loading is paused.
    ///
    /// # Errors
    ///
    /// Propagates errors from an auto-advance navigation.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<NavOutcome>, SessionError> {
        let _ = self.info_popup.take_due(now);

        for event in self.timer.poll(now) {
            match event {
                TimerEvent::Warning { remaining_ms } => {
                    tracing::debug!(session_id = %self.session_id, remaining_ms, "time warning");
                    self.signals.push(Signal::TimeWarning { remaining_ms });
                }
                TimerEvent::Expired => return Ok(Some(self.time_expired(now))),
            }
        }

        if self.load_failure.is_some() {
            return Ok(None);
        }
        match self.auto_advance.take_due(now) {
            Some(action) => self.navigate(action, now).map(Some),
            None => Ok(None),
        }
    }

    /// Open the current question's solution. Stops a pending auto-advance.
    pub fn view_solution(&mut self, _now: DateTime<Utc>) -> NavOutcome {
        let Some(index) = self.page.question_index() else {
            return NavOutcome::rejected(RejectReason::NotOnQuestion);
        };
        let has_solutions = self
            .store
            .get(index)
            .loaded()
            .is_some_and(Question::has_solutions);
        if !self.config.show_solutions() || !has_solutions {
            return NavOutcome::rejected(RejectReason::SolutionsUnavailable);
        }

        self.solution_open = true;
        if self.auto_advance.cancel().is_some() {
            if let Some(feedback) = self.feedback.as_mut() {
                feedback.auto_advance = false;
            }
        }
        self.telemetry(events::SOLUTION_VIEWED, TelemetryKind::Interact);
        NavOutcome::Updated
    }

    pub fn close_solution(&mut self, _now: DateTime<Utc>) -> NavOutcome {
        if !self.solution_open {
            return NavOutcome::Ignored;
        }
        self.solution_open = false;
        self.telemetry(events::SOLUTION_CLOSED, TelemetryKind::Interact);
        NavOutcome::Updated
    }

    /// Reveal the model answer of the current subjective question and
    /// credit it as answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress` if the ledger has no entry for the
    /// current question.
    pub fn mark_answer_shown(&mut self, _now: DateTime<Utc>) -> Result<NavOutcome, SessionError> {
        let Some(index) = self.page.question_index() else {
            return Ok(NavOutcome::rejected(RejectReason::NotOnQuestion));
        };
        let is_subjective = self
            .store
            .get(index)
            .loaded()
            .is_some_and(|q| q.question_type() == QuestionType::Subjective);
        if !is_subjective {
            return Ok(NavOutcome::rejected(RejectReason::NotSubjective));
        }

        self.store.mark_answer_shown(index);
        self.progress
            .update(index, ProgressStatus::Correct, None, None)?;
        self.telemetry(events::ANSWER_SHOWN, TelemetryKind::Interact);
        Ok(NavOutcome::Updated)
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    fn navigate(&mut self, action: NavAction, now: DateTime<Utc>) -> Result<NavOutcome, SessionError> {
        if self.load_failure.is_some() && self.page != Page::End {
            return Ok(NavOutcome::rejected(RejectReason::LoadPaused));
        }
        match self.page {
            Page::End => Ok(NavOutcome::rejected(RejectReason::SessionEnded)),
            Page::Start => Ok(self.navigate_from_start(action, now)),
            Page::ScoreBoard => Ok(self.navigate_from_score_board(action, now)),
            Page::Question(i) => self.navigate_from_question(i, action, now),
        }
    }

    fn navigate_from_start(&mut self, action: NavAction, now: DateTime<Utc>) -> NavOutcome {
        let n = self.question_count();
        match action {
            NavAction::Next => self.move_to(Page::Question(1), now),
            NavAction::Previous => NavOutcome::rejected(RejectReason::AtStart),
            NavAction::Jump(0) => NavOutcome::Ignored,
            NavAction::Jump(target) if target > n => {
                NavOutcome::rejected(RejectReason::OutOfRange { target })
            }
            NavAction::Jump(target) if self.config.is_linear() && target != 1 => {
                NavOutcome::rejected(RejectReason::LinearNavigation)
            }
            NavAction::Jump(target) => self.move_to(Page::Question(target), now),
        }
    }

    fn navigate_from_score_board(&mut self, action: NavAction, now: DateTime<Utc>) -> NavOutcome {
        let n = self.question_count();
        match action {
            NavAction::Next => NavOutcome::rejected(RejectReason::SubmitRequired),
            NavAction::Jump(0) => {
                let to = self.start_or_first();
                self.move_to(to, now)
            }
            NavAction::Jump(target) if target > n => {
                NavOutcome::rejected(RejectReason::OutOfRange { target })
            }
            _ if self.config.is_linear() => NavOutcome::rejected(RejectReason::LinearNavigation),
            NavAction::Previous => self.move_to(Page::Question(n), now),
            NavAction::Jump(target) => self.move_to(Page::Question(target), now),
        }
    }

    fn navigate_from_question(
        &mut self,
        i: usize,
        action: NavAction,
        now: DateTime<Utc>,
    ) -> Result<NavOutcome, SessionError> {
        let n = self.question_count();
        let index = i - 1;

        let to = match action {
            NavAction::Next if i < n => Page::Question(i + 1),
            NavAction::Next if self.config.requires_submit() => Page::ScoreBoard,
            NavAction::Next => Page::End,
            NavAction::Previous if i > 1 => Page::Question(i - 1),
            NavAction::Previous if self.config.show_start_page() => Page::Start,
            NavAction::Previous => return Ok(NavOutcome::rejected(RejectReason::AtStart)),
            NavAction::Jump(target) if target > n => {
                return Ok(NavOutcome::rejected(RejectReason::OutOfRange { target }));
            }
            NavAction::Jump(target) if target == i => return Ok(NavOutcome::Ignored),
            NavAction::Jump(0) => self.start_or_first(),
            NavAction::Jump(target) => {
                if self.config.is_linear() && (target < i || !self.is_resolved(index)) {
                    return Ok(NavOutcome::rejected(RejectReason::LinearNavigation));
                }
                Page::Question(target)
            }
        };

        let forward = match to {
            Page::Question(j) => j > i,
            Page::ScoreBoard | Page::End => true,
            Page::Start => false,
        };
        // Only auto-scored questions can demand an answer.
        let skip_blocked = !self.config.allow_skip()
            && self
                .store
                .get(index)
                .loaded()
                .is_some_and(|q| q.question_type().is_auto_scored());
        if forward && skip_blocked && self.feedback.is_none() && !self.is_resolved(index)
        {
            let until = now + millis(self.config.info_popup_ms());
            self.info_popup.schedule(until, ());
            self.signals.push(Signal::InfoPopup { until });
            return Ok(NavOutcome::rejected(RejectReason::AnswerRequired));
        }

        // Feedback on screen means the answer is already committed.
        if self.feedback.is_some() {
            return Ok(self.move_to(to, now));
        }

        if let Some(answer) = self.selection.take() {
            let verdict = match self.score_at(index, &answer) {
                Ok(verdict) => verdict,
                Err(err) => {
                    self.selection = Some(answer);
                    return Err(err);
                }
            };
            match verdict {
                Verdict::Graded(result) if self.config.show_feedback() => {
                    self.progress.update(
                        index,
                        result.outcome.into(),
                        Some(result.score),
                        Some(answer),
                    )?;
                    self.feedback = Some(FeedbackView {
                        position: i,
                        result,
                        auto_advance: true,
                    });
                    let at = now + millis(self.config.feedback_display_ms());
                    self.auto_advance.schedule(at, action);
                    tracing::debug!(
                        session_id = %self.session_id,
                        position = i,
                        outcome = ?result.outcome,
                        score = result.score,
                        "feedback shown"
                    );
                    return Ok(NavOutcome::FeedbackShown { result });
                }
                Verdict::Graded(result) => {
                    self.progress.update(
                        index,
                        ProgressStatus::Attempted,
                        Some(result.score),
                        Some(answer),
                    )?;
                }
                Verdict::Ungraded => {
                    self.progress
                        .update(index, ProgressStatus::Attempted, None, Some(answer))?;
                }
            }
        } else {
            self.progress.mark_skipped_if_untouched(index)?;
        }

        Ok(self.move_to(to, now))
    }

    fn move_to(&mut self, to: Page, now: DateTime<Utc>) -> NavOutcome {
        if to == Page::End {
            return self.finish(now, false);
        }

        let from = self.page;
        self.clear_transients();
        self.page = to;

        match to {
            Page::Question(j) => {
                self.timer.start(now);
                if let Some(window) = self.cursor.on_visit(j - 1) {
                    self.request_fetch(window);
                }
                let question_id = self.store.get(j - 1).loaded().map(|q| q.id().clone());
                self.signals.push(Signal::CurrentQuestionChanged {
                    position: j,
                    question_id,
                });
                self.telemetry(events::QUESTION_VIEWED, TelemetryKind::Impression);
            }
            Page::ScoreBoard => {
                self.telemetry(events::SCORE_BOARD_VIEWED, TelemetryKind::Impression);
            }
            Page::Start => {
                self.signals.push(Signal::CurrentQuestionChanged {
                    position: 0,
                    question_id: None,
                });
            }
            Page::End => {}
        }

        tracing::debug!(session_id = %self.session_id, ?from, ?to, "navigated");
        NavOutcome::Moved { from, to }
    }

    fn finish(&mut self, now: DateTime<Utc>, duration_ended: bool) -> NavOutcome {
        let from = self.page;
        if from == Page::End {
            return NavOutcome::Ignored;
        }
        if let Some(index) = from.question_index() {
            if let Err(err) = self.progress.mark_skipped_if_untouched(index) {
                tracing::warn!(session_id = %self.session_id, %err, "could not mark last question");
            }
        }

        self.clear_transients();
        self.timer.stop(now);
        let result = SessionResult {
            score: self.progress.total(),
            max_score: self.max_score(),
            summary: self.progress.summary(),
            duration_ms: self.timer.elapsed_ms(now),
            duration_ended,
            position: from.position(self.question_count()),
        };
        self.page = Page::End;

        tracing::info!(
            session_id = %self.session_id,
            score = result.score,
            max_score = result.max_score,
            duration_ms = result.duration_ms,
            duration_ended,
            "session ended"
        );
        self.telemetry(events::END_PAGE_VIEWED, TelemetryKind::Impression);
        self.signals.push(Signal::SessionEnded(result.clone()));
        self.result = Some(result);
        NavOutcome::Moved {
            from,
            to: Page::End,
        }
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    fn score_at(&self, index: usize, answer: &Answer) -> Result<Verdict, SessionError> {
        match self.store.get(index) {
            QuestionSlot::Loaded(question) => Ok(self.scoring.score(question, answer)?),
            QuestionSlot::Pending | QuestionSlot::OutOfRange => Ok(Verdict::Ungraded),
        }
    }

    /// Answered, either pending commit or already recorded.
    fn is_resolved(&self, index: usize) -> bool {
        self.selection.is_some()
            || self
                .progress
                .get(index)
                .is_some_and(|entry| !entry.status.is_untouched())
    }

    fn start_or_first(&self) -> Page {
        if self.config.show_start_page() {
            Page::Start
        } else {
            Page::Question(1)
        }
    }

    fn clear_transients(&mut self) {
        self.selection = None;
        self.feedback = None;
        self.auto_advance.cancel();
        self.info_popup.cancel();
        self.solution_open = false;
    }

    fn retag(&mut self) {
        for (index, question) in self.store.canonical_ids().iter().enumerate() {
            let Some(tag) = self.store.find(question).map(Question::tag) else {
                continue;
            };
            if let Err(err) = self.progress.set_tag(index, tag) {
                tracing::warn!(session_id = %self.session_id, %err, "could not tag progress entry");
            }
        }
    }

    fn request_fetch(&mut self, window: FetchWindow) {
        tracing::debug!(
            session_id = %self.session_id,
            start = window.start,
            size = window.size,
            "requesting question batch"
        );
        self.fetch_queue.push_back(window);
        self.signals.push(Signal::FetchRequested(window));
    }

    fn telemetry(&mut self, name: &'static str, kind: TelemetryKind) {
        let position = self.position();
        self.signals.push(Signal::Telemetry {
            name,
            kind,
            position,
        });
    }
}

impl fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationController")
            .field("session_id", &self.session_id)
            .field("page", &self.page)
            .field("questions", &self.store.len())
            .field("loaded", &self.store.loaded_count())
            .field("score", &self.progress.total())
            .field("selection", &self.selection)
            .field("feedback", &self.feedback)
            .field("load_failure", &self.load_failure)
            .finish_non_exhaustive()
    }
}

use api::{ApiError, QuestionApi};
use domain::{Answer, AnswerId, Category, Feedback, Question};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::messages;
use crate::poller::{FeedbackPoller, PollOutcome, PollPolicy};
use crate::task::{BusyFlag, ScopedTask};
use crate::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterviewPhase {
    #[default]
    Idle,
    CategorySelected,
    QuestionLoaded,
    AnswerSubmitted,
    FeedbackPending,
    FeedbackReady,
    FeedbackError,
    FeedbackTimeout,
}

impl InterviewPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InterviewPhase::FeedbackReady
                | InterviewPhase::FeedbackError
                | InterviewPhase::FeedbackTimeout
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterviewState {
    pub phase: InterviewPhase,
    pub category: Option<Category>,
    pub question: Option<Question>,
    pub answer_text: String,
    pub answer: Option<Answer>,
    pub feedback: Option<Feedback>,
    pub error: Option<FlowError>,
}

/// `id` 在每次重启时递增；请求返回后只写入同一轮
#[derive(Default)]
struct Round {
    id: u64,
    poll: Option<ScopedTask>,
}

/// One interview round: category → question → answer → feedback.
pub struct InterviewController {
    api: Arc<dyn QuestionApi>,
    policy: PollPolicy,
    state: Arc<watch::Sender<InterviewState>>,
    busy: BusyFlag,
    round: Mutex<Round>,
}

impl InterviewController {
    pub fn new(api: Arc<dyn QuestionApi>, policy: PollPolicy) -> Self {
        let (state, _) = watch::channel(InterviewState::default());
        Self {
            api,
            policy,
            state: Arc::new(state),
            busy: BusyFlag::default(),
            round: Mutex::new(Round::default()),
        }
    }

    pub fn snapshot(&self) -> InterviewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<InterviewState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn is_polling(&self) -> bool {
        self.lock_round()
            .poll
            .as_ref()
            .is_some_and(ScopedTask::is_running)
    }

    pub fn select_category(&self, category: Category) -> Result<(), FlowError> {
        let phase = self.snapshot().phase;
        if !matches!(phase, InterviewPhase::Idle | InterviewPhase::CategorySelected) {
            return Err(FlowError::unavailable("finish or restart the current round first"));
        }
        self.state.send_modify(|s| {
            s.phase = InterviewPhase::CategorySelected;
            s.category = Some(category);
            s.error = None;
        });
        Ok(())
    }

    /// Asks the server for a question in the selected category.
    pub async fn start(&self) -> Result<Question, FlowError> {
        let (round, current) = self.begin();
        let category = match (current.phase, current.category) {
            (InterviewPhase::CategorySelected, Some(c)) => c,
            _ => return Err(FlowError::unavailable("select a category first")),
        };
        let _guard = self.busy.acquire()?;
        self.state.send_modify(|s| s.error = None);

        let result = self.api.create_question(category).await;
        let _round = self.still_current(round)?;
        match result {
            Ok(question) => {
                info!(question_id = question.id, %category, "question loaded");
                self.state.send_modify(|s| {
                    s.phase = InterviewPhase::QuestionLoaded;
                    s.question = Some(question.clone());
                    s.answer_text.clear();
                    s.answer = None;
                    s.feedback = None;
                });
                Ok(question)
            }
            Err(e) => {
                let err = FlowError::from_api(e, messages::CREATE_QUESTION_FAILED);
                warn!(%category, "question creation failed: {}", err);
                self.state.send_modify(|s| {
                    s.phase = InterviewPhase::CategorySelected;
                    s.error = Some(err.clone());
                });
                Err(err)
            }
        }
    }

    pub fn set_answer(&self, text: &str) -> Result<(), FlowError> {
        if self.snapshot().phase != InterviewPhase::QuestionLoaded {
            return Err(FlowError::unavailable("no question is awaiting an answer"));
        }
        self.state.send_modify(|s| s.answer_text = text.to_string());
        Ok(())
    }

    /// Saves the answer and starts feedback polling in the background.
    pub async fn submit_answer(&self) -> Result<AnswerId, FlowError> {
        let (round, current) = self.begin();
        let question = match (current.phase, current.question) {
            (InterviewPhase::QuestionLoaded, Some(q)) => q,
            _ => return Err(FlowError::unavailable("no question is awaiting an answer")),
        };
        let content = current.answer_text.trim().to_string();
        if content.is_empty() {
            return Err(FlowError::validation(messages::EMPTY_ANSWER));
        }
        let _guard = self.busy.acquire()?;
        self.state.send_modify(|s| {
            s.phase = InterviewPhase::AnswerSubmitted;
            s.error = None;
        });

        let result = self.api.submit_answer(question.id, &content).await;
        let mut slot = self.still_current(round)?;
        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                let err = match e {
                    ApiError::Malformed(reason) => {
                        warn!(question_id = question.id, "answer reply unusable: {}", reason);
                        FlowError::Unexpected(messages::MISSING_ANSWER_ID.into())
                    }
                    e => FlowError::from_api(e, messages::SUBMIT_ANSWER_FAILED),
                };
                warn!(question_id = question.id, "answer submission failed: {}", err);
                self.state.send_modify(|s| {
                    s.phase = InterviewPhase::QuestionLoaded;
                    s.error = Some(err.clone());
                });
                return Err(err);
            }
        };

        let answer_id = answer.answer_id;
        info!(question_id = question.id, answer_id, "answer saved, waiting for feedback");
        self.state.send_modify(|s| {
            s.phase = InterviewPhase::FeedbackPending;
            s.answer = Some(answer);
            s.feedback = None;
        });
        self.spawn_poll(&mut slot, answer_id);
        Ok(answer_id)
    }

    /// Back to category selection. Any outstanding poll is cancelled, and
    /// replies to requests still in flight are discarded.
    pub fn restart(&self) {
        let mut round = self.lock_round();
        round.id += 1;
        round.poll = None;
        self.state.send_replace(InterviewState::default());
        info!(round = round.id, "interview restarted");
    }

    /// Resolves once the round leaves `AnswerSubmitted`/`FeedbackPending`.
    pub async fn wait_for_outcome(&self) -> InterviewState {
        let mut rx = self.state.subscribe();
        let waited = rx
            .wait_for(|s| {
                !matches!(
                    s.phase,
                    InterviewPhase::AnswerSubmitted | InterviewPhase::FeedbackPending
                )
            })
            .await
            .map(|s| s.clone());
        match waited {
            Ok(state) => state,
            Err(_) => self.snapshot(),
        }
    }

    fn begin(&self) -> (u64, InterviewState) {
        let round = self.lock_round();
        (round.id, self.snapshot())
    }

    /// Holds the round lock while a reply is applied.
    fn still_current(&self, id: u64) -> Result<MutexGuard<'_, Round>, FlowError> {
        let round = self.lock_round();
        if round.id != id {
            debug!(stale = id, current = round.id, "dropping reply from a restarted round");
            return Err(FlowError::unavailable(messages::ROUND_RESTARTED));
        }
        Ok(round)
    }

    fn spawn_poll(&self, round: &mut Round, answer_id: AnswerId) {
        let poller = FeedbackPoller::new(self.api.clone(), answer_id, self.policy);
        let state = self.state.clone();
        let task = ScopedTask::spawn(move |token| async move {
            let outcome = poller.run(token.clone()).await;
            apply_outcome(&state, &token, answer_id, outcome);
        });
        // 替换即丢弃旧任务，旧轮询随之取消
        round.poll = Some(task);
    }

    fn lock_round(&self) -> MutexGuard<'_, Round> {
        self.round.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Writes a terminal phase unless the poll was cancelled or superseded.
fn apply_outcome(
    state: &watch::Sender<InterviewState>,
    token: &CancellationToken,
    answer_id: AnswerId,
    outcome: PollOutcome,
) {
    let applied = state.send_if_modified(|s| {
        let current = s.answer.as_ref().map(|a| a.answer_id);
        if token.is_cancelled()
            || s.phase != InterviewPhase::FeedbackPending
            || current != Some(answer_id)
        {
            return false;
        }
        match outcome {
            PollOutcome::Ready(feedback) => {
                s.phase = InterviewPhase::FeedbackReady;
                s.feedback = Some(feedback);
            }
            PollOutcome::Failed(err) => {
                s.phase = InterviewPhase::FeedbackError;
                s.error = Some(err);
            }
            PollOutcome::TimedOut => {
                s.phase = InterviewPhase::FeedbackTimeout;
                s.error = Some(FlowError::Timeout(messages::FEEDBACK_TIMEOUT.into()));
            }
            PollOutcome::Cancelled => return false,
        }
        true
    });
    if applied {
        info!(answer_id, "feedback round finished");
    }
}

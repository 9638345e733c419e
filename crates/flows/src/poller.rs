use api::{FeedbackPoll, QuestionApi};
use domain::{AnswerId, Feedback};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::messages;
use crate::FlowError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Spacing between a "not ready" reply and the next attempt.
    pub interval: Duration,
    /// Ceiling measured from the first attempt.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready(Feedback),
    Failed(FlowError),
    TimedOut,
    Cancelled,
}

/// Retrieves feedback for one answer until it is ready, fails, times out or
/// the token is cancelled.
pub struct FeedbackPoller {
    api: Arc<dyn QuestionApi>,
    answer_id: AnswerId,
    policy: PollPolicy,
}

impl FeedbackPoller {
    pub fn new(api: Arc<dyn QuestionApi>, answer_id: AnswerId, policy: PollPolicy) -> Self {
        Self {
            api,
            answer_id,
            policy,
        }
    }

    pub async fn run(self, cancel: CancellationToken) -> PollOutcome {
        let deadline = Instant::now() + self.policy.timeout;

        let attempts = async {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                match self.api.fetch_feedback(self.answer_id).await {
                    Ok(FeedbackPoll::Ready(feedback)) => {
                        info!(
                            answer_id = self.answer_id,
                            attempt, "feedback ready, score {}", feedback.score
                        );
                        return PollOutcome::Ready(feedback);
                    }
                    Ok(FeedbackPoll::Pending) => {
                        debug!(answer_id = self.answer_id, attempt, "feedback pending");
                        sleep(self.policy.interval).await;
                    }
                    Err(e) => {
                        warn!(answer_id = self.answer_id, attempt, "feedback poll failed: {}", e);
                        return PollOutcome::Failed(FlowError::from_api(
                            e,
                            messages::FEEDBACK_FAILED,
                        ));
                    }
                }
            }
        };

        // 分支顺序有意义：同一时刻取消和超时优先于回复
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(answer_id = self.answer_id, "feedback polling cancelled");
                PollOutcome::Cancelled
            }
            _ = sleep_until(deadline) => {
                warn!(answer_id = self.answer_id, "feedback polling timed out");
                PollOutcome::TimedOut
            }
            outcome = attempts => outcome,
        }
    }
}

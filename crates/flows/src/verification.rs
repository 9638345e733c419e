use api::{AuthApi, EmailChannel, VerifiedEmail};
use domain::{codes, validation};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::errors::messages;
use crate::task::{BusyFlag, ScopedTask};
use crate::FlowError;

pub const VERIFICATION_WINDOW: Duration = Duration::from_secs(600);

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationStatus {
    #[default]
    Idle,
    Sending,
    Sent,
    Verifying,
    Verified,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationState {
    pub email: String,
    pub code: String,
    pub status: VerificationStatus,
    /// Last value published by the countdown; `EmailVerification::seconds_left`
    /// is authoritative.
    pub seconds_left: u64,
    /// Set once a code went out for the current email.
    pub code_sent: bool,
    pub error: Option<FlowError>,
    pub reset_token: Option<String>,
}

/// `round` 每次修改邮箱递增，旧请求的回复据此丢弃
#[derive(Default)]
struct Countdown {
    round: u64,
    deadline: Option<Instant>,
    task: Option<ScopedTask>,
}

impl Countdown {
    fn left(&self) -> u64 {
        self.deadline.map(remaining_secs).unwrap_or(0)
    }

    fn stop(&mut self) {
        self.deadline = None;
        self.task = None;
    }
}

/// Send-code / verify-code exchange with a fixed validity window.
pub struct EmailVerification {
    api: Arc<dyn AuthApi>,
    channel: EmailChannel,
    window: Duration,
    state: Arc<watch::Sender<VerificationState>>,
    busy: BusyFlag,
    countdown: Mutex<Countdown>,
}

impl EmailVerification {
    pub fn new(api: Arc<dyn AuthApi>, channel: EmailChannel, window: Duration) -> Self {
        let (state, _) = watch::channel(VerificationState::default());
        Self {
            api,
            channel,
            window,
            state: Arc::new(state),
            busy: BusyFlag::default(),
            countdown: Mutex::new(Countdown::default()),
        }
    }

    pub fn snapshot(&self) -> VerificationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<VerificationState> {
        self.state.subscribe()
    }

    pub fn is_verified(&self) -> bool {
        self.state.borrow().status == VerificationStatus::Verified
    }

    pub fn code_entry_visible(&self) -> bool {
        self.state.borrow().code_sent
    }

    pub fn email(&self) -> String {
        self.state.borrow().email.clone()
    }

    pub fn reset_token(&self) -> Option<String> {
        self.state.borrow().reset_token.clone()
    }

    /// Whole seconds until the current code expires, rounded up.
    pub fn seconds_left(&self) -> u64 {
        self.lock_countdown().left()
    }

    /// Editing the address discards any code, and any reply, still in flight.
    pub fn set_email(&self, email: &str) -> Result<(), FlowError> {
        let mut countdown = self.lock_countdown();
        if self.is_verified() {
            return Err(FlowError::unavailable(messages::ALREADY_VERIFIED));
        }
        countdown.round += 1;
        countdown.stop();
        self.state.send_modify(|s| {
            *s = VerificationState {
                email: email.trim().to_string(),
                ..VerificationState::default()
            };
        });
        Ok(())
    }

    pub fn set_code(&self, code: &str) -> Result<(), FlowError> {
        if self.is_verified() {
            return Err(FlowError::unavailable(messages::ALREADY_VERIFIED));
        }
        self.state.send_modify(|s| s.code = code.trim().to_string());
        Ok(())
    }

    pub fn can_send(&self) -> bool {
        let state = self.snapshot();
        validation::is_valid_email(&state.email) && self.send_blocker(&state).is_none()
    }

    pub fn can_verify(&self) -> bool {
        let state = self.snapshot();
        state.code_sent
            && validation::is_filled(&state.code)
            && matches!(
                state.status,
                VerificationStatus::Sent | VerificationStatus::Error
            )
    }

    pub async fn send(&self) -> Result<(), FlowError> {
        let (round, current) = self.begin();
        if !validation::is_valid_email(&current.email) {
            return Err(FlowError::validation(messages::INVALID_EMAIL));
        }
        if let Some(blocked) = self.send_blocker(&current) {
            return Err(blocked);
        }
        let _guard = self.busy.acquire()?;
        self.state.send_modify(|s| {
            s.status = VerificationStatus::Sending;
            s.error = None;
        });

        let result = self.api.send_email_code(self.channel, &current.email).await;
        let mut countdown = self.lock_countdown();
        if countdown.round != round {
            debug!("dropping send reply for {}, email was edited", current.email);
            return Err(FlowError::unavailable(messages::EMAIL_CHANGED));
        }
        match result {
            Ok(()) => {
                info!(channel = ?self.channel, "verification code sent to {}", current.email);
                self.start_countdown(&mut countdown);
                self.state.send_modify(|s| {
                    s.status = VerificationStatus::Sent;
                    s.code.clear();
                    s.code_sent = true;
                    s.seconds_left = self.window.as_secs();
                });
                Ok(())
            }
            Err(e) => {
                let fallback = if e.code() == Some(codes::EMAIL_DUPLICATE_ERROR) {
                    messages::EMAIL_TAKEN
                } else {
                    messages::SEND_FAILED
                };
                let status = e.status();
                let err = FlowError::from_api(e, fallback);
                warn!(
                    channel = ?self.channel,
                    ?status,
                    "sending verification code failed: {}",
                    err
                );
                self.fail(countdown.left(), err.clone());
                Err(err)
            }
        }
    }

    pub async fn verify(&self) -> Result<VerifiedEmail, FlowError> {
        let (round, current) = self.begin();
        match current.status {
            VerificationStatus::Verified => {
                return Err(FlowError::unavailable(messages::ALREADY_VERIFIED))
            }
            _ if !current.code_sent => return Err(FlowError::unavailable(messages::CODE_NOT_SENT)),
            VerificationStatus::Sending | VerificationStatus::Verifying => {
                return Err(FlowError::Busy)
            }
            _ => {}
        }
        if !validation::is_filled(&current.code) {
            return Err(FlowError::validation(messages::EMPTY_CODE));
        }
        if self.seconds_left() == 0 {
            let err = FlowError::Expired(messages::CODE_EXPIRED.into());
            debug!("verification blocked locally, code window elapsed");
            self.fail(0, err.clone());
            return Err(err);
        }
        let _guard = self.busy.acquire()?;
        self.state.send_modify(|s| {
            s.status = VerificationStatus::Verifying;
            s.error = None;
        });

        let result = self
            .api
            .verify_email_code(self.channel, &current.email, &current.code)
            .await;
        let mut countdown = self.lock_countdown();
        if countdown.round != round {
            debug!("dropping verify reply for {}, email was edited", current.email);
            return Err(FlowError::unavailable(messages::EMAIL_CHANGED));
        }
        match result {
            Ok(verified) => {
                info!(channel = ?self.channel, "email {} verified", current.email);
                countdown.stop();
                self.state.send_modify(|s| {
                    s.status = VerificationStatus::Verified;
                    s.seconds_left = 0;
                    s.reset_token = verified.reset_token.clone();
                });
                Ok(verified)
            }
            Err(e) if e.code() == Some(codes::EXPIRED_CODE_ERROR) => {
                let message = e
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| messages::CODE_EXPIRED.to_string());
                let err = FlowError::Expired(message);
                warn!("server reports the code as expired");
                countdown.stop();
                self.fail(0, err.clone());
                Err(err)
            }
            Err(e) => {
                let fallback = if e.code() == Some(codes::CODE_NOT_MATCH_ERROR) {
                    messages::CODE_MISMATCH
                } else {
                    messages::VERIFY_FAILED
                };
                let status = e.status();
                let err = FlowError::from_api(e, fallback);
                warn!(?status, "verification failed: {}", err);
                self.fail(countdown.left(), err.clone());
                Err(err)
            }
        }
    }

    /// Round and state read together, so an edit cannot slip in between.
    fn begin(&self) -> (u64, VerificationState) {
        let countdown = self.lock_countdown();
        (countdown.round, self.snapshot())
    }

    fn send_blocker(&self, state: &VerificationState) -> Option<FlowError> {
        match state.status {
            VerificationStatus::Verified => {
                Some(FlowError::unavailable(messages::ALREADY_VERIFIED))
            }
            VerificationStatus::Sending | VerificationStatus::Verifying => Some(FlowError::Busy),
            VerificationStatus::Sent | VerificationStatus::Error if self.seconds_left() > 0 => {
                Some(FlowError::unavailable(messages::RESEND_WAIT))
            }
            _ => None,
        }
    }

    fn fail(&self, left: u64, err: FlowError) {
        self.state.send_modify(|s| {
            s.status = VerificationStatus::Error;
            s.seconds_left = left;
            s.error = Some(err);
        });
    }

    fn start_countdown(&self, countdown: &mut Countdown) {
        let start = Instant::now();
        let deadline = start + self.window;
        let state = self.state.clone();
        let task = ScopedTask::spawn(move |token| async move {
            let mut ticks = interval_at(start + TICK, TICK);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        let left = remaining_secs(deadline);
                        state.send_if_modified(|s| {
                            if token.is_cancelled() || s.seconds_left == left {
                                return false;
                            }
                            s.seconds_left = left;
                            true
                        });
                        if left == 0 {
                            debug!("verification window elapsed");
                            break;
                        }
                    }
                }
            }
        });
        countdown.deadline = Some(deadline);
        countdown.task = Some(task);
    }

    fn lock_countdown(&self) -> std::sync::MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn remaining_secs(deadline: Instant) -> u64 {
    let left = deadline.saturating_duration_since(Instant::now());
    left.as_secs() + u64::from(left.subsec_nanos() > 0)
}

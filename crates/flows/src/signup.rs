use api::{AuthApi, EmailChannel, SignupRequest};
use domain::{codes, validation, Route};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::errors::messages;
use crate::task::BusyFlag;
use crate::verification::EmailVerification;
use crate::FlowError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignupFields {
    pub password: String,
    pub password_confirm: String,
    pub nickname: String,
}

/// Per-requirement status, shown next to the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignupChecks {
    pub verified: bool,
    pub strong_password: bool,
    pub passwords_match: bool,
    pub nickname_filled: bool,
}

impl SignupChecks {
    pub fn all(&self) -> bool {
        self.verified && self.strong_password && self.passwords_match && self.nickname_filled
    }

    /// First unmet requirement, in form order.
    fn first_failure(&self) -> Option<&'static str> {
        if !self.verified {
            Some(messages::NOT_VERIFIED)
        } else if !self.strong_password {
            Some(messages::WEAK_PASSWORD)
        } else if !self.passwords_match {
            Some(messages::PASSWORD_MISMATCH)
        } else if !self.nickname_filled {
            Some(messages::EMPTY_FIELD)
        } else {
            None
        }
    }
}

pub struct SignupForm {
    api: Arc<dyn AuthApi>,
    verification: EmailVerification,
    fields: watch::Sender<SignupFields>,
    busy: BusyFlag,
}

impl SignupForm {
    pub fn new(api: Arc<dyn AuthApi>, window: Duration) -> Self {
        let (fields, _) = watch::channel(SignupFields::default());
        Self {
            verification: EmailVerification::new(api.clone(), EmailChannel::Signup, window),
            api,
            fields,
            busy: BusyFlag::default(),
        }
    }

    pub fn verification(&self) -> &EmailVerification {
        &self.verification
    }

    pub fn fields(&self) -> SignupFields {
        self.fields.borrow().clone()
    }

    pub fn set_password(&self, password: &str) {
        self.fields.send_modify(|f| f.password = password.to_string());
    }

    pub fn set_password_confirm(&self, password: &str) {
        self.fields.send_modify(|f| f.password_confirm = password.to_string());
    }

    pub fn set_nickname(&self, nickname: &str) {
        self.fields.send_modify(|f| f.nickname = nickname.trim().to_string());
    }

    pub fn checks(&self) -> SignupChecks {
        let fields = self.fields.borrow();
        SignupChecks {
            verified: self.verification.is_verified(),
            strong_password: validation::is_strong_password(&fields.password),
            passwords_match: validation::passwords_match(
                &fields.password,
                &fields.password_confirm,
            ),
            nickname_filled: validation::is_filled(&fields.nickname),
        }
    }

    pub fn can_submit(&self) -> bool {
        self.checks().all()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Creates the account; on success the user continues at the login page.
    pub async fn submit(&self) -> Result<Route, FlowError> {
        if let Some(msg) = self.checks().first_failure() {
            return Err(FlowError::validation(msg));
        }
        let _guard = self.busy.acquire()?;

        let fields = self.fields();
        let req = SignupRequest {
            email: self.verification.email(),
            password: fields.password.clone(),
            re_password: fields.password_confirm,
            nickname: fields.nickname,
        };
        match self.api.signup(&req).await {
            Ok(()) => {
                info!("account created for {}", req.email);
                Ok(Route::Login)
            }
            Err(e) => {
                let fallback = match e.code() {
                    Some(codes::EMAIL_VERIFICATION_ERROR) => messages::NOT_VERIFIED,
                    Some(codes::PASSWORD_MATCH_ERROR) => messages::PASSWORD_MISMATCH,
                    _ => messages::SIGNUP_FAILED,
                };
                let err = FlowError::from_api(e, fallback);
                warn!("sign-up failed: {}", err);
                Err(err)
            }
        }
    }
}

use api::{AuthApi, EmailChannel, PasswordResetRequest};
use domain::{validation, Route};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::errors::messages;
use crate::task::BusyFlag;
use crate::verification::EmailVerification;
use crate::FlowError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResetFields {
    pub new_password: String,
    pub confirm_password: String,
}

/// Forgotten-password flow: OTP verification issues a token that authorises
/// the new password.
pub struct PasswordResetForm {
    api: Arc<dyn AuthApi>,
    verification: EmailVerification,
    fields: watch::Sender<ResetFields>,
    busy: BusyFlag,
}

impl PasswordResetForm {
    pub fn new(api: Arc<dyn AuthApi>, window: Duration) -> Self {
        let (fields, _) = watch::channel(ResetFields::default());
        Self {
            verification: EmailVerification::new(
                api.clone(),
                EmailChannel::PasswordReset,
                window,
            ),
            api,
            fields,
            busy: BusyFlag::default(),
        }
    }

    pub fn verification(&self) -> &EmailVerification {
        &self.verification
    }

    pub fn set_new_password(&self, password: &str) {
        self.fields.send_modify(|f| f.new_password = password.to_string());
    }

    pub fn set_confirm_password(&self, password: &str) {
        self.fields.send_modify(|f| f.confirm_password = password.to_string());
    }

    pub fn can_submit(&self) -> bool {
        self.precheck().is_ok()
    }

    fn precheck(&self) -> Result<String, FlowError> {
        if !self.verification.is_verified() {
            return Err(FlowError::validation(messages::NOT_VERIFIED));
        }
        let token = self
            .verification
            .reset_token()
            .filter(|t| validation::is_filled(t))
            .ok_or_else(|| FlowError::validation(messages::RESET_TOKEN_MISSING))?;
        let fields = self.fields.borrow();
        if !validation::is_strong_password(&fields.new_password) {
            return Err(FlowError::validation(messages::WEAK_PASSWORD));
        }
        if !validation::passwords_match(&fields.new_password, &fields.confirm_password) {
            return Err(FlowError::validation(messages::PASSWORD_MISMATCH));
        }
        Ok(token)
    }

    pub async fn submit(&self) -> Result<Route, FlowError> {
        let reset_token = self.precheck()?;
        let _guard = self.busy.acquire()?;

        let fields = self.fields.borrow().clone();
        let req = PasswordResetRequest {
            reset_token,
            new_password: fields.new_password,
            confirm_password: fields.confirm_password,
        };
        match self.api.reset_password(&req).await {
            Ok(()) => {
                info!("password reset for {}", self.verification.email());
                Ok(Route::Login)
            }
            Err(e) => {
                let err = FlowError::from_api(e, messages::RESET_FAILED);
                warn!("password reset failed: {}", err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{unreachable, FakeAuth};
    use crate::verification::VERIFICATION_WINDOW;
    use api::VerifiedEmail;

    async fn verified(api: &Arc<FakeAuth>, token: Option<&str>) -> PasswordResetForm {
        api.verify.push(Ok(VerifiedEmail {
            reset_token: token.map(str::to_string),
        }));
        let form = PasswordResetForm::new(api.clone(), VERIFICATION_WINDOW);
        let v = form.verification();
        v.set_email("me@prep.dev").unwrap();
        v.send().await.unwrap();
        v.set_code("654321").unwrap();
        v.verify().await.unwrap();
        form
    }

    #[tokio::test(start_paused = true)]
    async fn reset_posts_the_issued_token() {
        let api = Arc::new(FakeAuth::default());
        let form = verified(&api, Some("tok-9")).await;
        form.set_new_password("Better#99");
        form.set_confirm_password("Better#99");
        assert!(form.can_submit());

        assert_eq!(form.submit().await, Ok(Route::Login));
        let req = api.last_reset.lock().unwrap().clone().unwrap();
        assert_eq!(req.reset_token, "tok-9");
        assert_eq!(req.confirm_password, "Better#99");
        assert_eq!(
            api.channels.lock().unwrap().first(),
            Some(&EmailChannel::PasswordReset)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_token_blocks_submit() {
        let api = Arc::new(FakeAuth::default());
        let form = verified(&api, None).await;
        form.set_new_password("Better#99");
        form.set_confirm_password("Better#99");
        assert!(!form.can_submit());
        assert_eq!(
            form.submit().await,
            Err(FlowError::validation(messages::RESET_TOKEN_MISSING))
        );
        assert_eq!(api.reset.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unverified_or_weak_is_rejected_locally() {
        let api = Arc::new(FakeAuth::default());
        let form = PasswordResetForm::new(api.clone(), VERIFICATION_WINDOW);
        form.set_new_password("Better#99");
        form.set_confirm_password("Better#99");
        assert_eq!(
            form.submit().await,
            Err(FlowError::validation(messages::NOT_VERIFIED))
        );

        let form = verified(&api, Some("tok")).await;
        form.set_new_password("weak");
        form.set_confirm_password("weak");
        assert_eq!(
            form.submit().await,
            Err(FlowError::validation(messages::WEAK_PASSWORD))
        );

        form.set_new_password("Better#99");
        form.set_confirm_password("Better#99");
        api.reset.push(Err(unreachable()));
        assert_eq!(form.submit().await, Err(FlowError::Unreachable));
    }
}

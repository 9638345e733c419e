use async_trait::async_trait;
use domain::{codes, Session};
use serde_json::json;
use tracing::{info, warn};

use crate::models::{
    LoginRequest, PasswordResetRequest, SignupRequest, VerifiedEmail, WireSession,
};
use crate::transport::decode;
use crate::{ApiClient, ApiError, AuthApi, EmailChannel};

#[async_trait]
impl AuthApi for ApiClient {
    async fn me(&self) -> Result<Session, ApiError> {
        let reply = self.call(self.http.get(self.url("/auth/me"))).await?;
        let wire: WireSession = reply.require_payload()?;
        Ok(wire.into())
    }

    async fn login(&self, req: &LoginRequest) -> Result<Option<Session>, ApiError> {
        let reply = self
            .call(self.http.post(self.url("/auth/login")).json(req))
            .await?;
        let envelope = reply.require_code(codes::LOGIN_SUCCESS)?;
        let session = envelope
            .result
            .filter(|v| v.is_object())
            .and_then(|v| decode::<WireSession>(v).ok())
            .map(Session::from);
        info!("login accepted for {}", req.email);
        Ok(session)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let reply = self.call(self.http.post(self.url("/auth/logout"))).await?;
        reply.require_success()
    }

    async fn send_email_code(&self, channel: EmailChannel, email: &str) -> Result<(), ApiError> {
        let reply = self
            .call(
                self.http
                    .post(self.url(channel.send_path()))
                    .json(&json!({ "email": email })),
            )
            .await?;
        reply.require_code(codes::SEND_EMAIL_SUCCESS).map(|_| ())
    }

    async fn verify_email_code(
        &self,
        channel: EmailChannel,
        email: &str,
        code: &str,
    ) -> Result<VerifiedEmail, ApiError> {
        let reply = self
            .call(
                self.http
                    .post(self.url(channel.verify_path()))
                    .json(&json!({ "email": email, "code": code })),
            )
            .await?;
        let envelope = reply.require_code(codes::VERIFIED_EMAIL_SUCCESS)?;
        let reset_token = envelope.result.as_ref().and_then(|r| {
            r.get("resetToken")
                .or_else(|| r.get("token"))
                .and_then(|t| t.as_str())
                .or_else(|| r.as_str())
                .map(str::to_string)
        });
        if channel == EmailChannel::PasswordReset && reset_token.is_none() {
            warn!("otp verification succeeded without a reset token");
        }
        Ok(VerifiedEmail { reset_token })
    }

    async fn signup(&self, req: &SignupRequest) -> Result<(), ApiError> {
        let reply = self
            .call(self.http.post(self.url("/auth/signup")).json(req))
            .await?;
        reply.require_code(codes::SIGNUP_SUCCESS).map(|_| ())
    }

    async fn reset_password(&self, req: &PasswordResetRequest) -> Result<(), ApiError> {
        let reply = self
            .call(self.http.post(self.url("/auth/password/reset")).json(req))
            .await?;
        reply.require_code(codes::SUCCESS).map(|_| ())
    }
}

mod endpoints;
mod error;
mod models;
mod traits;
mod transport;

pub use error::ApiError;
pub use models::{
    FeedbackPoll, LoginRequest, NewPost, PasswordResetRequest, ReviewQuery, SignupRequest,
    VerifiedEmail, DEFAULT_PAGE_SIZE,
};
pub use traits::{AuthApi, DiscussionApi, EmailChannel, QuestionApi};

use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct ApiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
}

impl ApiClient {
    /// Every request shares one cookie jar, so the session cookie set by
    /// `/auth/login` rides along on later calls.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        info!("API client targeting {}", base_url);
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

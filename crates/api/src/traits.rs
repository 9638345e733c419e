use async_trait::async_trait;
use domain::{
    Answer, AnswerId, Category, Comment, CommentId, Page, Post, PostId, PostStatus, PostSummary,
    Question, QuestionId, ReviewItem, Session,
};

use crate::models::{
    FeedbackPoll, LoginRequest, NewPost, PasswordResetRequest, ReviewQuery, SignupRequest,
    VerifiedEmail,
};
use crate::ApiError;

/// Which verification endpoints a flow talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailChannel {
    Signup,
    PasswordReset,
}

impl EmailChannel {
    pub(crate) fn send_path(&self) -> &'static str {
        match self {
            EmailChannel::Signup => "/auth/sendEmail",
            EmailChannel::PasswordReset => "/auth/otp/sendEmail",
        }
    }

    pub(crate) fn verify_path(&self) -> &'static str {
        match self {
            EmailChannel::Signup => "/auth/verifyEmail",
            EmailChannel::PasswordReset => "/auth/otp/verify",
        }
    }
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn me(&self) -> Result<Session, ApiError>;
    /// `None` when the login reply carries no user payload.
    async fn login(&self, req: &LoginRequest) -> Result<Option<Session>, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    async fn send_email_code(&self, channel: EmailChannel, email: &str) -> Result<(), ApiError>;
    async fn verify_email_code(
        &self,
        channel: EmailChannel,
        email: &str,
        code: &str,
    ) -> Result<VerifiedEmail, ApiError>;
    async fn signup(&self, req: &SignupRequest) -> Result<(), ApiError>;
    async fn reset_password(&self, req: &PasswordResetRequest) -> Result<(), ApiError>;
}

#[async_trait]
pub trait QuestionApi: Send + Sync {
    async fn create_question(&self, category: Category) -> Result<Question, ApiError>;
    async fn submit_answer(&self, question_id: QuestionId, content: &str)
        -> Result<Answer, ApiError>;
    async fn fetch_feedback(&self, answer_id: AnswerId) -> Result<FeedbackPoll, ApiError>;
    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<ReviewItem>, ApiError>;
    async fn delete_review(&self, answer_id: AnswerId) -> Result<(), ApiError>;
}

#[async_trait]
pub trait DiscussionApi: Send + Sync {
    async fn list_posts(
        &self,
        status: Option<PostStatus>,
        page: u32,
    ) -> Result<Page<PostSummary>, ApiError>;
    async fn get_post(&self, id: PostId) -> Result<Post, ApiError>;
    async fn create_post(&self, post: &NewPost) -> Result<PostId, ApiError>;
    async fn resolve_post(&self, id: PostId) -> Result<(), ApiError>;
    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, ApiError>;
    async fn add_comment(&self, post_id: PostId, content: &str) -> Result<Comment, ApiError>;
    async fn edit_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        content: &str,
    ) -> Result<(), ApiError>;
    async fn delete_comment(&self, post_id: PostId, comment_id: CommentId)
        -> Result<(), ApiError>;
}

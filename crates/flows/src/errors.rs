use api::ApiError;

/// Default texts shown when the server gives no message of its own.
pub mod messages {
    pub const UNREACHABLE: &str = "Cannot reach the server. Check your network connection.";
    pub const INVALID_EMAIL: &str = "Enter a valid email address.";
    pub const EMPTY_PASSWORD: &str = "Enter your password.";
    pub const LOGIN_FAILED: &str = "Login failed. Please try again later.";
    pub const BAD_CREDENTIALS: &str = "Email or password is incorrect.";
    pub const LOGOUT_FAILED: &str = "Logout failed.";
    pub const SEND_FAILED: &str = "Failed to send the code. Please try again.";
    pub const EMAIL_TAKEN: &str = "This email is already registered.";
    pub const VERIFY_FAILED: &str = "Verification failed. Please try again.";
    pub const CODE_MISMATCH: &str = "The verification code does not match.";
    pub const CODE_EXPIRED: &str = "The code has expired. Please send a new one.";
    pub const EMPTY_CODE: &str = "Enter the verification code.";
    pub const CODE_NOT_SENT: &str = "Send a verification code first.";
    pub const RESEND_WAIT: &str = "A code was already sent. Wait for it to expire before resending.";
    pub const EMAIL_CHANGED: &str = "The email changed before the server answered.";
    pub const ALREADY_VERIFIED: &str = "The email is already verified.";
    pub const SIGNUP_FAILED: &str = "Sign-up failed.";
    pub const NOT_VERIFIED: &str = "Email verification is not complete.";
    pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";
    pub const WEAK_PASSWORD: &str =
        "Use at least 8 characters with an uppercase letter, a lowercase letter and a special character.";
    pub const RESET_FAILED: &str = "Password reset failed.";
    pub const RESET_TOKEN_MISSING: &str =
        "The reset session is no longer valid. Verify your email again.";
    pub const CREATE_QUESTION_FAILED: &str =
        "Could not create a question. Please try again shortly.";
    pub const SUBMIT_ANSWER_FAILED: &str = "Could not submit your answer. Please try again shortly.";
    pub const MISSING_ANSWER_ID: &str = "The answer id could not be confirmed.";
    pub const ROUND_RESTARTED: &str = "The interview was restarted.";
    pub const EMPTY_ANSWER: &str = "Write an answer first.";
    pub const FEEDBACK_FAILED: &str = "Could not load feedback.";
    pub const FEEDBACK_TIMEOUT: &str = "Feedback took too long. Please try again.";
    pub const LIST_FAILED: &str = "Could not load the list.";
    pub const DELETE_FAILED: &str = "Delete failed. Please try again shortly.";
    pub const POST_FAILED: &str = "Could not load the post.";
    pub const CREATE_POST_FAILED: &str = "Could not publish the post.";
    pub const RESOLVE_FAILED: &str = "Could not mark the post as resolved.";
    pub const COMMENT_FAILED: &str = "Could not save the comment.";
    pub const EMPTY_FIELD: &str = "This field is required.";
    pub const BUSY: &str = "A request is already in progress.";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Client-side check failed; nothing was sent.
    #[error("{0}")]
    Validation(String),

    #[error("{}", messages::UNREACHABLE)]
    Unreachable,

    #[error("{message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// Verification window ran out, locally or per the server.
    #[error("{0}")]
    Expired(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Unexpected(String),

    /// The action is not offered in the current state.
    #[error("{0}")]
    Unavailable(String),

    #[error("{}", messages::BUSY)]
    Busy,
}

impl FlowError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FlowError::Validation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        FlowError::Unavailable(msg.into())
    }

    /// Converts at the call site; `fallback` is used when the server gave no message.
    pub fn from_api(err: ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Unreachable(_) => FlowError::Unreachable,
            ApiError::Rejected { code, message, .. } => FlowError::Rejected {
                code,
                message: message.unwrap_or_else(|| fallback.to_string()),
            },
            ApiError::Malformed(_) | ApiError::Setup(_) => {
                FlowError::Unexpected(fallback.to_string())
            }
        }
    }
}

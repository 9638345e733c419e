use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    pub fn has_code(&self, expected: &str) -> bool {
        self.code.as_deref() == Some(expected)
    }

    /// Server message, ignoring blank strings.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

pub mod codes {
    pub const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";
    pub const LOGIN_FAIL: &str = "LOGIN_FAIL";
    pub const SEND_EMAIL_SUCCESS: &str = "SEND_EMAIL_SUCCESS";
    pub const EMAIL_DUPLICATE_ERROR: &str = "EMAIL_DUPLICATE_ERROR";
    pub const VERIFIED_EMAIL_SUCCESS: &str = "VERIFIED_EMAIL_SUCCESS";
    pub const CODE_NOT_MATCH_ERROR: &str = "CODE_NOT_MATCH_ERROR";
    pub const EXPIRED_CODE_ERROR: &str = "EXPIRED_CODE_ERROR";
    pub const SIGNUP_SUCCESS: &str = "SIGNUP_SUCCESS";
    pub const EMAIL_VERIFICATION_ERROR: &str = "EMAIL_VERIFICATION_ERROR";
    pub const PASSWORD_MATCH_ERROR: &str = "PASSWORD_MATCH_ERROR";
    pub const SUCCESS: &str = "SUCCESS";
    pub const CREATE_QUESTION_SUCCESS: &str = "CREATE_QUESTION_SUCCESS";
    pub const SAVE_ANSWER_SUCCESS: &str = "SAVE_ANSWER_SUCCESS";
    pub const FEEDBACK_PENDING: &str = "FEEDBACK_PENDING";
    pub const GET_QUESTIONS_SUCCESS: &str = "GET_QUESTIONS_SUCCESS";
    pub const DELETE_QUESTION_SUCCESS: &str = "DELETE_QUESTION_SUCCESS";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_tolerates_missing_fields() {
        let env: Envelope = serde_json::from_str(r#"{"code":"FEEDBACK_PENDING"}"#).unwrap();
        assert!(env.has_code(codes::FEEDBACK_PENDING));
        assert!(env.result.is_none());
        assert!(env.message().is_none());

        let env: Envelope = serde_json::from_str(r#"{"message":"   "}"#).unwrap();
        assert!(env.code.is_none());
        assert!(env.message().is_none());
    }
}

use crate::models::{AnswerId, PostId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Signup,
    ForgotPassword,
    Interview,
    Review,
    Discussions,
    DiscussionNew { answer_id: Option<AnswerId> },
    DiscussionDetail(PostId),
    NotFound,
}

impl Route {
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Interview
                | Route::Review
                | Route::Discussions
                | Route::DiscussionNew { .. }
                | Route::DiscussionDetail(_)
        )
    }

    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::ForgotPassword => "/forgot-password".to_string(),
            Route::Interview => "/interview".to_string(),
            Route::Review => "/review".to_string(),
            Route::Discussions => "/discussions".to_string(),
            Route::DiscussionNew { answer_id: Some(id) } => {
                format!("/discussions/new?answerId={}", id)
            }
            Route::DiscussionNew { answer_id: None } => "/discussions/new".to_string(),
            Route::DiscussionDetail(id) => format!("/discussions/{}", id),
            Route::NotFound => "/404".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

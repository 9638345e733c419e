//! Client-side state machines for the prep app: session, route guard,
//! interview feedback polling, email verification and the list/detail views.
//!
//! State lives in `tokio::sync::watch` channels owned by each controller;
//! front-ends read snapshots or subscribe. Timer and poll tasks are bound to
//! their controller and stop when it is dropped.

mod confirm;
mod discussion;
mod errors;
mod guard;
mod interview;
mod password_reset;
mod poller;
mod review;
mod session;
mod signup;
mod task;
mod verification;

#[cfg(test)]
mod testing;

pub use confirm::Confirm;
pub use discussion::{BoardState, DetailState, DiscussionBoard, NewPostForm, PostDetail};
pub use errors::{messages, FlowError};
pub use guard::{guard, post_login_destination, GuardDecision};
pub use interview::{InterviewController, InterviewPhase, InterviewState};
pub use password_reset::{PasswordResetForm, ResetFields};
pub use poller::{
    FeedbackPoller, PollOutcome, PollPolicy, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT,
};
pub use review::{ReviewList, ReviewState};
pub use session::{SessionState, SessionStore};
pub use signup::{SignupChecks, SignupFields, SignupForm};
pub use verification::{
    EmailVerification, VerificationState, VerificationStatus, VERIFICATION_WINDOW,
};

mod models;
pub mod protocol;
mod routes;
pub mod time;
pub mod validation;

pub use models::{
    Answer, AnswerId, Category, Comment, CommentId, Feedback, LinkedAnswer, MemberId, Page, Post,
    PostId, PostStatus, PostSummary, Question, QuestionId, ReviewItem, Session, UnknownCategory,
};
pub use protocol::{codes, Envelope};
pub use routes::Route;

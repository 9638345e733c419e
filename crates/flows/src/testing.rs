//! In-memory backends for driving the flows in tests.

use api::{
    ApiError, AuthApi, DiscussionApi, EmailChannel, FeedbackPoll, LoginRequest, NewPost,
    PasswordResetRequest, QuestionApi, ReviewQuery, SignupRequest, VerifiedEmail,
};
use async_trait::async_trait;
use domain::{
    Answer, AnswerId, Category, Comment, CommentId, Feedback, Page, Post, PostId, PostStatus,
    PostSummary, Question, QuestionId, ReviewItem, Session,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::confirm::Confirm;

/// Scripted replies, consumed in order; falls back to `default` when drained.
pub(crate) struct Script<T> {
    queue: Mutex<VecDeque<Result<T, ApiError>>>,
    calls: AtomicUsize,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<T> Script<T> {
    pub fn push(&self, reply: Result<T, ApiError>) {
        self.queue.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_or(&self, default: impl FnOnce() -> Result<T, ApiError>) -> Result<T, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queue.lock().unwrap().pop_front().unwrap_or_else(default)
    }
}

/// Holds requests in flight until released; open by default.
#[derive(Default)]
pub(crate) struct Gate {
    held: AtomicBool,
    opened: Notify,
}

impl Gate {
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.opened.notify_waiters();
    }

    async fn pass(&self) {
        loop {
            // 先注册再检查，避免错过 release 的唤醒
            let opened = self.opened.notified();
            if !self.held.load(Ordering::SeqCst) {
                return;
            }
            opened.await;
        }
    }
}

pub(crate) fn rejected(status: u16, code: &str, message: Option<&str>) -> ApiError {
    ApiError::Rejected {
        status,
        code: Some(code.to_string()),
        message: message.map(str::to_string),
    }
}

pub(crate) fn unreachable() -> ApiError {
    ApiError::Unreachable("connection refused".into())
}

pub(crate) fn session(id: i64, nickname: &str) -> Session {
    Session {
        member_id: id,
        nickname: nickname.to_string(),
    }
}

pub(crate) fn feedback(score: i32) -> Feedback {
    Feedback {
        score: score.into(),
        improvement: "mention the string pool".into(),
        model_answer: "== compares references, equals compares values".into(),
    }
}

#[derive(Default)]
pub(crate) struct FakeAuth {
    pub me: Script<Session>,
    pub login: Script<Option<Session>>,
    pub logout: Script<()>,
    pub send: Script<()>,
    pub verify: Script<VerifiedEmail>,
    pub signup: Script<()>,
    pub reset: Script<()>,
    /// Applies to send and verify.
    pub gate: Gate,
    pub last_signup: Mutex<Option<SignupRequest>>,
    pub last_reset: Mutex<Option<PasswordResetRequest>>,
    pub channels: Mutex<Vec<EmailChannel>>,
}

#[async_trait]
impl AuthApi for FakeAuth {
    async fn me(&self) -> Result<Session, ApiError> {
        self.me.next_or(|| Err(rejected(401, "UNAUTHORIZED", None)))
    }

    async fn login(&self, _req: &LoginRequest) -> Result<Option<Session>, ApiError> {
        self.login.next_or(|| Ok(None))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout.next_or(|| Ok(()))
    }

    async fn send_email_code(&self, channel: EmailChannel, _email: &str) -> Result<(), ApiError> {
        self.channels.lock().unwrap().push(channel);
        self.gate.pass().await;
        self.send.next_or(|| Ok(()))
    }

    async fn verify_email_code(
        &self,
        channel: EmailChannel,
        _email: &str,
        _code: &str,
    ) -> Result<VerifiedEmail, ApiError> {
        self.channels.lock().unwrap().push(channel);
        self.gate.pass().await;
        self.verify.next_or(|| Ok(VerifiedEmail::default()))
    }

    async fn signup(&self, req: &SignupRequest) -> Result<(), ApiError> {
        *self.last_signup.lock().unwrap() = Some(req.clone());
        self.signup.next_or(|| Ok(()))
    }

    async fn reset_password(&self, req: &PasswordResetRequest) -> Result<(), ApiError> {
        *self.last_reset.lock().unwrap() = Some(req.clone());
        self.reset.next_or(|| Ok(()))
    }
}

#[derive(Default)]
pub(crate) struct FakeQuestions {
    pub create: Script<Question>,
    pub answer: Script<Answer>,
    /// Drained script keeps answering `Pending`.
    pub feedback: Script<FeedbackPoll>,
    pub reviews: Script<Page<ReviewItem>>,
    pub delete: Script<()>,
    /// Applies to create and answer.
    pub gate: Gate,
}

#[async_trait]
impl QuestionApi for FakeQuestions {
    async fn create_question(&self, category: Category) -> Result<Question, ApiError> {
        self.gate.pass().await;
        self.create.next_or(|| {
            Ok(Question {
                id: 42,
                category,
                text: "What is the difference between equals and ==?".into(),
            })
        })
    }

    async fn submit_answer(
        &self,
        _question_id: QuestionId,
        content: &str,
    ) -> Result<Answer, ApiError> {
        self.gate.pass().await;
        self.answer.next_or(|| {
            Ok(Answer {
                answer_id: 7,
                content: content.to_string(),
            })
        })
    }

    async fn fetch_feedback(&self, _answer_id: AnswerId) -> Result<FeedbackPoll, ApiError> {
        self.feedback.next_or(|| Ok(FeedbackPoll::Pending))
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<ReviewItem>, ApiError> {
        self.reviews
            .next_or(|| Ok(Page::empty(query.page, query.size)))
    }

    async fn delete_review(&self, _answer_id: AnswerId) -> Result<(), ApiError> {
        self.delete.next_or(|| Ok(()))
    }
}

#[derive(Default)]
pub(crate) struct FakeDiscussions {
    pub list: Script<Page<PostSummary>>,
    pub get: Script<Post>,
    pub create: Script<PostId>,
    pub resolve: Script<()>,
    pub comments: Script<Vec<Comment>>,
    pub add: Script<Comment>,
    pub edit: Script<()>,
    pub delete: Script<()>,
}

#[async_trait]
impl DiscussionApi for FakeDiscussions {
    async fn list_posts(
        &self,
        _status: Option<PostStatus>,
        page: u32,
    ) -> Result<Page<PostSummary>, ApiError> {
        self.list.next_or(|| Ok(Page::empty(page, 10)))
    }

    async fn get_post(&self, id: PostId) -> Result<Post, ApiError> {
        self.get.next_or(|| Ok(post(id, PostStatus::Open)))
    }

    async fn create_post(&self, _post: &NewPost) -> Result<PostId, ApiError> {
        self.create.next_or(|| Ok(900))
    }

    async fn resolve_post(&self, _id: PostId) -> Result<(), ApiError> {
        self.resolve.next_or(|| Ok(()))
    }

    async fn list_comments(&self, _post_id: PostId) -> Result<Vec<Comment>, ApiError> {
        self.comments.next_or(|| Ok(Vec::new()))
    }

    async fn add_comment(&self, _post_id: PostId, content: &str) -> Result<Comment, ApiError> {
        self.add.next_or(|| Ok(comment(100, content, true)))
    }

    async fn edit_comment(
        &self,
        _post_id: PostId,
        _comment_id: CommentId,
        _content: &str,
    ) -> Result<(), ApiError> {
        self.edit.next_or(|| Ok(()))
    }

    async fn delete_comment(
        &self,
        _post_id: PostId,
        _comment_id: CommentId,
    ) -> Result<(), ApiError> {
        self.delete.next_or(|| Ok(()))
    }
}

pub(crate) fn post(id: PostId, status: PostStatus) -> Post {
    Post {
        id,
        title: "Repeatable Read vs Phantom Read".into(),
        content: "How does MVCC handle it?".into(),
        status,
        author_id: Some(1),
        author_nickname: Some("kim".into()),
        question_id: Some(103),
        linked: None,
        comment_count: 0,
        created_at: None,
    }
}

pub(crate) fn comment(id: CommentId, content: &str, mine: bool) -> Comment {
    Comment {
        id,
        author_id: Some(if mine { 1 } else { 2 }),
        author_nickname: Some(if mine { "me" } else { "lee" }.into()),
        content: content.to_string(),
        created_at: None,
        mine,
    }
}

pub(crate) fn summary(id: PostId, status: PostStatus) -> PostSummary {
    PostSummary {
        id,
        title: format!("post {}", id),
        status,
        created_at: None,
        comment_count: 0,
    }
}

/// Answers every confirmation prompt the same way and counts them.
pub(crate) struct ScriptedConfirm {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedConfirm {
    pub fn yes() -> Self {
        Self {
            answer: true,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn no() -> Self {
        Self {
            answer: false,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

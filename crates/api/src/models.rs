use domain::{
    Answer, AnswerId, Category, Comment, CommentId, Feedback, LinkedAnswer, MemberId, Page, Post,
    PostId, PostStatus, Question, QuestionId, ReviewItem, Session,
};
use serde::{Deserialize, Serialize};

// --- Requests ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub auto_login: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub re_password: String,
    pub nickname: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub reset_token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub answer_id: Option<AnswerId>,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    /// 1-based.
    pub page: u32,
    pub size: u32,
    pub query: Option<String>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;

impl Default for ReviewQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            query: None,
        }
    }
}

impl ReviewQuery {
    /// `size` is omitted when it equals the server default.
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string())];
        if self.size != DEFAULT_PAGE_SIZE {
            params.push(("size", self.size.to_string()));
        }
        if let Some(q) = self.query.as_deref().filter(|q| !q.trim().is_empty()) {
            params.push(("q", q.to_string()));
        }
        params
    }
}

// --- 带标签的结果 ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackPoll {
    Ready(Feedback),
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedEmail {
    /// Only issued on the password-reset channel.
    pub reset_token: Option<String>,
}

// --- Wire 载荷 ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireSession {
    pub member_id: MemberId,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl From<WireSession> for Session {
    fn from(w: WireSession) -> Self {
        Session {
            member_id: w.member_id,
            nickname: w.nickname.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct WireQuestion {
    pub id: QuestionId,
    #[serde(alias = "text")]
    pub content: String,
}

impl WireQuestion {
    pub fn into_question(self, category: Category) -> Question {
        Question {
            id: self.id,
            category,
            text: self.content,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAnswer {
    pub answer_id: AnswerId,
}

impl WireAnswer {
    pub fn into_answer(self, content: &str) -> Answer {
        Answer {
            answer_id: self.answer_id,
            content: content.to_string(),
        }
    }
}

/// Every field is optional on the wire; only a complete triple counts as ready.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireFeedback {
    #[serde(default)]
    pub score: Option<serde_json::Number>,
    #[serde(default)]
    pub improvement: Option<String>,
    #[serde(default)]
    pub model_answer: Option<String>,
}

impl WireFeedback {
    pub fn complete(self) -> Option<Feedback> {
        Some(Feedback {
            score: self.score?,
            improvement: self.improvement?,
            model_answer: self.model_answer?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReviewItem {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(flatten)]
    pub feedback: WireFeedback,
}

impl From<WireReviewItem> for ReviewItem {
    fn from(w: WireReviewItem) -> Self {
        ReviewItem {
            question_id: w.question_id,
            answer_id: w.answer_id,
            category: w.category,
            question: w.question,
            answer: w.answer,
            feedback: w.feedback.complete(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePage<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_elements: Option<u64>,
}

/// Listings arrive either paginated or as a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum WireListing<T> {
    Paged(WirePage<T>),
    Bare(Vec<T>),
}

impl<T> WireListing<T> {
    pub fn into_page<U: From<T>>(self, requested_page: u32, requested_size: u32) -> Page<U> {
        match self {
            WireListing::Paged(p) => Page {
                page: normalize_page(requested_page, p.page),
                size: p.size.unwrap_or(requested_size),
                total_pages: p.total_pages.unwrap_or(1).max(1),
                total_elements: p
                    .total_elements
                    .unwrap_or(p.content.len() as u64),
                content: p.content.into_iter().map(U::from).collect(),
            },
            WireListing::Bare(items) => Page {
                page: requested_page,
                size: requested_size,
                total_pages: 1,
                total_elements: items.len() as u64,
                content: items.into_iter().map(U::from).collect(),
            },
        }
    }
}

/// Maps the server's page index back to 1-based. A server echoing the
/// requested index is 1-based; anything else is taken as 0-based.
pub(crate) fn normalize_page(requested: u32, server_page: Option<u32>) -> u32 {
    match server_page {
        Some(p) if p == requested => p,
        Some(p) => p + 1,
        None => requested,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePostSummary {
    #[serde(alias = "postId")]
    pub id: PostId,
    pub title: String,
    pub status: PostStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub comment_count: u32,
}

impl From<WirePostSummary> for domain::PostSummary {
    fn from(w: WirePostSummary) -> Self {
        domain::PostSummary {
            id: w.id,
            title: w.title,
            status: w.status,
            created_at: w.created_at.as_deref().and_then(domain::time::parse_timestamp),
            comment_count: w.comment_count,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePost {
    #[serde(alias = "postId")]
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub status: PostStatus,
    #[serde(default)]
    pub author_id: Option<MemberId>,
    #[serde(default, alias = "nickname")]
    pub author_nickname: Option<String>,
    #[serde(default)]
    pub question_id: Option<QuestionId>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(flatten)]
    pub feedback: WireFeedback,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<WirePost> for Post {
    fn from(w: WirePost) -> Self {
        let feedback = w.feedback.complete();
        let linked = w.question.map(|question| LinkedAnswer {
            question,
            answer: w.answer,
            feedback,
        });
        Post {
            id: w.id,
            title: w.title,
            content: w.content,
            status: w.status,
            author_id: w.author_id,
            author_nickname: w.author_nickname,
            question_id: w.question_id,
            linked,
            comment_count: w.comment_count,
            created_at: w.created_at.as_deref().and_then(domain::time::parse_timestamp),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCreatedPost {
    pub post_id: PostId,
}

/// Comment creation answers with the stored comment or just its id.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum WireCommentReply {
    Full(Comment),
    Id {
        #[serde(rename = "commentId")]
        comment_id: CommentId,
    },
}

impl WireCommentReply {
    pub fn into_comment(self, content: &str) -> Comment {
        match self {
            WireCommentReply::Full(c) => c,
            WireCommentReply::Id { comment_id } => Comment {
                id: comment_id,
                author_id: None,
                author_nickname: None,
                content: content.to_string(),
                created_at: None,
                mine: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_is_normalized_to_one_based() {
        assert_eq!(normalize_page(1, Some(1)), 1);
        assert_eq!(normalize_page(1, Some(0)), 1);
        assert_eq!(normalize_page(3, Some(2)), 3);
        assert_eq!(normalize_page(2, None), 2);
    }

    #[test]
    fn feedback_needs_every_field() {
        let partial: WireFeedback =
            serde_json::from_value(serde_json::json!({ "score": 8 })).unwrap();
        assert!(partial.complete().is_none());

        let full: WireFeedback = serde_json::from_value(serde_json::json!({
            "feedbackId": 3,
            "score": 8,
            "improvement": "mention GAP locks",
            "modelAnswer": "..."
        }))
        .unwrap();
        assert_eq!(full.complete().map(|f| f.score), Some(serde_json::Number::from(8)));
    }

    #[test]
    fn fractional_score_is_accepted() {
        let half: WireFeedback = serde_json::from_value(serde_json::json!({
            "score": 7.5,
            "improvement": "name the isolation level",
            "modelAnswer": "..."
        }))
        .unwrap();
        let feedback = half.complete().unwrap();
        assert_eq!(feedback.score.as_f64(), Some(7.5));
        assert_eq!(feedback.score.to_string(), "7.5");
    }

    #[test]
    fn review_page_decodes_flat_items() {
        let listing: WireListing<WireReviewItem> = serde_json::from_value(serde_json::json!({
            "content": [{
                "questionId": 42, "answerId": 7, "category": "java",
                "question": "equals vs ==", "answer": "text",
                "score": 8, "improvement": "more detail", "modelAnswer": "model"
            }],
            "page": 0, "size": 10, "totalPages": 3, "totalElements": 21
        }))
        .unwrap();
        let page: Page<ReviewItem> = listing.into_page(1, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.content[0].answer_id, 7);
        assert!(page.content[0].feedback.is_some());
    }

    #[test]
    fn review_query_omits_default_size() {
        let q = ReviewQuery {
            page: 2,
            size: 10,
            query: Some("tx".into()),
        };
        assert_eq!(
            q.params(),
            vec![("page", "2".to_string()), ("q", "tx".to_string())]
        );
        let q = ReviewQuery {
            size: 20,
            ..ReviewQuery::default()
        };
        assert_eq!(
            q.params(),
            vec![("page", "1".to_string()), ("size", "20".to_string())]
        );
    }

    #[test]
    fn comment_reply_accepts_bare_id() {
        let reply: WireCommentReply =
            serde_json::from_value(serde_json::json!({ "commentId": 11 })).unwrap();
        let c = reply.into_comment("agreed");
        assert_eq!(c.id, 11);
        assert!(c.mine);
        assert_eq!(c.content, "agreed");
    }

    #[test]
    fn post_detail_builds_linked_answer() {
        let w: WirePost = serde_json::from_value(serde_json::json!({
            "postId": 501, "title": "Repeatable Read vs Phantom Read", "content": "body",
            "status": "OPEN", "authorId": 3, "questionId": 103,
            "question": "Explain isolation levels", "answer": "RC/RR...",
            "score": 7, "improvement": "add examples", "modelAnswer": "...",
            "commentCount": 2
        }))
        .unwrap();
        let post = Post::from(w);
        assert_eq!(post.id, 501);
        let linked = post.linked.unwrap();
        assert_eq!(linked.answer.as_deref(), Some("RC/RR..."));
        assert_eq!(linked.feedback.map(|f| f.score), Some(serde_json::Number::from(7)));
    }
}

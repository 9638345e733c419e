use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::time::lenient_datetime;

pub type MemberId = i64;
pub type QuestionId = i64;
pub type AnswerId = i64;
pub type PostId = i64;
pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub member_id: MemberId,
    pub nickname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Java,
    Algorithm,
    Database,
    Os,
    Network,
    #[serde(rename = "datastructure")]
    DataStructure,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Java,
        Category::Algorithm,
        Category::Database,
        Category::Os,
        Category::Network,
        Category::DataStructure,
    ];

    /// Path segment used by `POST /question/{category}`.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Java => "java",
            Category::Algorithm => "algorithm",
            Category::Database => "database",
            Category::Os => "os",
            Category::Network => "network",
            Category::DataStructure => "datastructure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Java => "Java",
            Category::Algorithm => "Algorithm",
            Category::Database => "Database",
            Category::Os => "OS",
            Category::Network => "Network",
            Category::DataStructure => "Data Structure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub category: Category,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer_id: AnswerId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// 任意 JSON 数值，可能带小数（如 7.5）
    pub score: serde_json::Number,
    pub improvement: String,
    pub model_answer: String,
}

/// Read-only projection of one past interview round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
    pub category: String,
    pub question: String,
    pub answer: String,
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostStatus {
    Open,
    Resolved,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Open => "OPEN",
            PostStatus::Resolved => "RESOLVED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostStatus::Open => "in discussion",
            PostStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(PostStatus::Open),
            "RESOLVED" => Ok(PostStatus::Resolved),
            other => Err(format!("unknown post status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub status: PostStatus,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub comment_count: u32,
}

/// Question/answer/feedback bundle a discussion post was opened from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAnswer {
    pub question: String,
    pub answer: Option<String>,
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub author_id: Option<MemberId>,
    pub author_nickname: Option<String>,
    pub question_id: Option<QuestionId>,
    pub linked: Option<LinkedAnswer>,
    pub comment_count: u32,
    pub created_at: Option<NaiveDateTime>,
}

impl Post {
    /// Resolution is one-way; once resolved the action is never offered again.
    pub fn mark_resolved(&mut self) {
        self.status = PostStatus::Resolved;
    }

    pub fn is_resolved(&self) -> bool {
        self.status == PostStatus::Resolved
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "commentId")]
    pub id: CommentId,
    #[serde(default)]
    pub author_id: Option<MemberId>,
    #[serde(default, alias = "nickname")]
    pub author_nickname: Option<String>,
    pub content: String,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<NaiveDateTime>,
    /// Server-computed authorship flag; gates edit/delete on the client.
    #[serde(default)]
    pub mine: bool,
}

/// One page of a server-paginated listing, `page` is always 1-based here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn empty(page: u32, size: u32) -> Self {
        Self {
            content: Vec::new(),
            page,
            size,
            total_pages: 1,
            total_elements: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

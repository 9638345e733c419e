use async_trait::async_trait;
use domain::{codes, Answer, AnswerId, Category, Page, Question, QuestionId, ReviewItem};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::StatusCode;
use serde_json::json;
use tracing::debug;

use crate::models::{
    FeedbackPoll, ReviewQuery, WireAnswer, WireFeedback, WireListing, WireQuestion,
    WireReviewItem,
};
use crate::transport::{decode, result_of, Reply};
use crate::{ApiClient, ApiError, QuestionApi};

#[async_trait]
impl QuestionApi for ApiClient {
    async fn create_question(&self, category: Category) -> Result<Question, ApiError> {
        let path = format!("/question/{}", category.key());
        let reply = self.call(self.http.post(self.url(&path))).await?;
        let envelope = reply.require_code(codes::CREATE_QUESTION_SUCCESS)?;
        let wire: WireQuestion = result_of(envelope)?;
        Ok(wire.into_question(category))
    }

    async fn submit_answer(
        &self,
        question_id: QuestionId,
        content: &str,
    ) -> Result<Answer, ApiError> {
        let path = format!("/question/{}/answer", question_id);
        let reply = self
            .call(
                self.http
                    .post(self.url(&path))
                    .json(&json!({ "content": content })),
            )
            .await?;
        let envelope = reply.require_code(codes::SAVE_ANSWER_SUCCESS)?;
        let wire: WireAnswer = result_of(envelope)?;
        Ok(wire.into_answer(content))
    }

    async fn fetch_feedback(&self, answer_id: AnswerId) -> Result<FeedbackPoll, ApiError> {
        let path = format!("/question/{}/feedback", answer_id);
        let reply = self
            .call(
                self.http
                    .post(self.url(&path))
                    .header(CACHE_CONTROL, "no-cache")
                    .header(PRAGMA, "no-cache"),
            )
            .await?;
        interpret_feedback(reply)
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<ReviewItem>, ApiError> {
        let reply = self
            .call(self.http.get(self.url("/question")).query(&query.params()))
            .await?;
        let envelope = reply.require_code(codes::GET_QUESTIONS_SUCCESS)?;
        let listing: WireListing<WireReviewItem> = match envelope.result {
            Some(v) if !v.is_null() => decode(v)?,
            _ => return Ok(Page::empty(query.page, query.size)),
        };
        Ok(listing.into_page(query.page, query.size))
    }

    async fn delete_review(&self, answer_id: AnswerId) -> Result<(), ApiError> {
        let path = format!("/question/{}", answer_id);
        let reply = self.call(self.http.delete(self.url(&path))).await?;
        reply.require_code(codes::DELETE_QUESTION_SUCCESS).map(|_| ())
    }
}

/// 202 must say `FEEDBACK_PENDING`; some servers also send that code with 200.
/// Anything else that is not a complete feedback triple is an error.
pub(crate) fn interpret_feedback(reply: Reply) -> Result<FeedbackPoll, ApiError> {
    if reply.has_code(codes::FEEDBACK_PENDING) && reply.is_success() {
        debug!(status = reply.status.as_u16(), "feedback still pending");
        return Ok(FeedbackPoll::Pending);
    }
    if reply.status == StatusCode::ACCEPTED || !reply.is_success() {
        return Err(reply.rejected());
    }
    let result = reply
        .envelope
        .and_then(|e| e.result)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::Malformed("feedback reply carries no result".into()))?;
    let wire: WireFeedback = decode(result)?;
    wire.complete()
        .map(FeedbackPoll::Ready)
        .ok_or_else(|| ApiError::Malformed("feedback is missing score or narrative".into()))
}

use async_trait::async_trait;
use domain::{codes, Comment, CommentId, Page, Post, PostId, PostStatus, PostSummary};
use serde_json::json;

use crate::models::{
    NewPost, WireCommentReply, WireCreatedPost, WireListing, WirePost, WirePostSummary,
    DEFAULT_PAGE_SIZE,
};
use crate::{ApiClient, ApiError, DiscussionApi};

#[async_trait]
impl DiscussionApi for ApiClient {
    async fn list_posts(
        &self,
        status: Option<PostStatus>,
        page: u32,
    ) -> Result<Page<PostSummary>, ApiError> {
        let mut params = vec![("page", page.to_string())];
        if let Some(s) = status {
            params.push(("status", s.as_str().to_string()));
        }
        let reply = self
            .call(self.http.get(self.url("/post")).query(&params))
            .await?;
        let listing: WireListing<WirePostSummary> = reply.require_result()?;
        Ok(listing.into_page(page, DEFAULT_PAGE_SIZE))
    }

    async fn get_post(&self, id: PostId) -> Result<Post, ApiError> {
        let reply = self
            .call(self.http.get(self.url(&format!("/post/{}", id))))
            .await?;
        let wire: WirePost = reply.require_result()?;
        Ok(wire.into())
    }

    async fn create_post(&self, post: &NewPost) -> Result<PostId, ApiError> {
        let reply = self
            .call(self.http.post(self.url("/post")).json(post))
            .await?;
        let created: WireCreatedPost = reply.require_result()?;
        Ok(created.post_id)
    }

    async fn resolve_post(&self, id: PostId) -> Result<(), ApiError> {
        let reply = self
            .call(self.http.patch(self.url(&format!("/post/{}/resolve", id))))
            .await?;
        reply.require_code(codes::SUCCESS).map(|_| ())
    }

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, ApiError> {
        let reply = self
            .call(
                self.http
                    .get(self.url(&format!("/post/{}/comments", post_id))),
            )
            .await?;
        let listing: WireListing<Comment> = reply.require_result()?;
        let page: Page<Comment> = listing.into_page(1, DEFAULT_PAGE_SIZE);
        Ok(page.content)
    }

    async fn add_comment(&self, post_id: PostId, content: &str) -> Result<Comment, ApiError> {
        let reply = self
            .call(
                self.http
                    .post(self.url(&format!("/post/{}/comments", post_id)))
                    .json(&json!({ "content": content })),
            )
            .await?;
        let created: WireCommentReply = reply.require_result()?;
        Ok(created.into_comment(content))
    }

    async fn edit_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        content: &str,
    ) -> Result<(), ApiError> {
        let reply = self
            .call(
                self.http
                    .put(self.url(&format!("/post/{}/comments/{}", post_id, comment_id)))
                    .json(&json!({ "content": content })),
            )
            .await?;
        reply.require_success()
    }

    async fn delete_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<(), ApiError> {
        let reply = self
            .call(
                self.http
                    .delete(self.url(&format!("/post/{}/comments/{}", post_id, comment_id))),
            )
            .await?;
        reply.require_success()
    }
}

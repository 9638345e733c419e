use api::{DiscussionApi, NewPost, DEFAULT_PAGE_SIZE};
use domain::{
    validation, AnswerId, Comment, CommentId, Page, Post, PostId, PostStatus, PostSummary, Route,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::confirm::Confirm;
use crate::errors::messages;
use crate::task::{BusyFlag, BusySet};
use crate::FlowError;

// --- Board ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    pub filter: Option<PostStatus>,
    pub page: Page<PostSummary>,
    pub error: Option<FlowError>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            filter: None,
            page: Page::empty(1, DEFAULT_PAGE_SIZE),
            error: None,
        }
    }
}

pub struct DiscussionBoard {
    api: Arc<dyn DiscussionApi>,
    state: watch::Sender<BoardState>,
    generation: AtomicU64,
}

impl DiscussionBoard {
    pub fn new(api: Arc<dyn DiscussionApi>) -> Self {
        let (state, _) = watch::channel(BoardState::default());
        Self {
            api,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> BoardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state.subscribe()
    }

    /// The server is asked to filter by status and the reply is filtered again
    /// locally, so a backend ignoring the parameter still shows the right rows.
    pub async fn load(&self, status: Option<PostStatus>, page: u32) -> Result<(), FlowError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.api.list_posts(status, page.max(1)).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(page, "discarding stale post page");
            return Ok(());
        }
        match result {
            Ok(mut listing) => {
                if let Some(wanted) = status {
                    listing.content.retain(|p| p.status == wanted);
                }
                debug!(page = listing.page, posts = listing.content.len(), "posts loaded");
                self.state.send_replace(BoardState {
                    filter: status,
                    page: listing,
                    error: None,
                });
                Ok(())
            }
            Err(e) => {
                let err = FlowError::from_api(e, messages::LIST_FAILED);
                warn!(page, "loading posts failed: {}", err);
                self.state.send_modify(|s| {
                    s.filter = status;
                    s.error = Some(err.clone());
                });
                Err(err)
            }
        }
    }
}

// --- Detail ---

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailState {
    pub post: Option<Post>,
    pub comments: Vec<Comment>,
    pub error: Option<FlowError>,
}

/// One post with its comment thread.
pub struct PostDetail {
    api: Arc<dyn DiscussionApi>,
    state: watch::Sender<DetailState>,
    busy: BusyFlag,
    comment_busy: BusySet<CommentId>,
}

impl PostDetail {
    pub fn new(api: Arc<dyn DiscussionApi>) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            api,
            state,
            busy: BusyFlag::default(),
            comment_busy: BusySet::default(),
        }
    }

    pub fn snapshot(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub async fn load(&self, id: PostId) -> Result<(), FlowError> {
        let (post, comments) = tokio::join!(self.api.get_post(id), self.api.list_comments(id));
        let loaded = post
            .map_err(|e| FlowError::from_api(e, messages::POST_FAILED))
            .and_then(|post| {
                comments
                    .map(|comments| (post, comments))
                    .map_err(|e| FlowError::from_api(e, messages::POST_FAILED))
            });
        match loaded {
            Ok((post, comments)) => {
                debug!(post_id = id, comments = comments.len(), "post loaded");
                self.state.send_replace(DetailState {
                    post: Some(post),
                    comments,
                    error: None,
                });
                Ok(())
            }
            Err(err) => {
                warn!(post_id = id, "loading post failed: {}", err);
                self.state.send_replace(DetailState {
                    error: Some(err.clone()),
                    ..DetailState::default()
                });
                Err(err)
            }
        }
    }

    /// Resolution is offered only while the post is open.
    pub fn can_resolve(&self) -> bool {
        self.state
            .borrow()
            .post
            .as_ref()
            .is_some_and(|p| p.status == PostStatus::Open)
    }

    pub fn can_modify(&self, comment_id: CommentId) -> bool {
        self.find_comment(comment_id).is_some_and(|c| c.mine)
    }

    pub async fn add_comment(&self, content: &str) -> Result<Comment, FlowError> {
        let post_id = self.post_id()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(FlowError::validation(messages::EMPTY_FIELD));
        }
        let _guard = self.busy.acquire()?;

        match self.api.add_comment(post_id, content).await {
            Ok(comment) => {
                info!(post_id, comment_id = comment.id, "comment added");
                self.state.send_modify(|s| {
                    s.comments.push(comment.clone());
                    if let Some(post) = s.post.as_mut() {
                        post.comment_count += 1;
                    }
                    s.error = None;
                });
                Ok(comment)
            }
            Err(e) => Err(self.record(FlowError::from_api(e, messages::COMMENT_FAILED))),
        }
    }

    pub async fn edit_comment(
        &self,
        comment_id: CommentId,
        content: &str,
    ) -> Result<(), FlowError> {
        let post_id = self.post_id()?;
        self.own_comment(comment_id)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(FlowError::validation(messages::EMPTY_FIELD));
        }
        let _guard = self.comment_busy.acquire(comment_id)?;

        match self.api.edit_comment(post_id, comment_id, content).await {
            Ok(()) => {
                info!(post_id, comment_id, "comment edited");
                self.state.send_modify(|s| {
                    if let Some(c) = s.comments.iter_mut().find(|c| c.id == comment_id) {
                        c.content = content.to_string();
                    }
                    s.error = None;
                });
                Ok(())
            }
            Err(e) => Err(self.record(FlowError::from_api(e, messages::COMMENT_FAILED))),
        }
    }

    /// Returns `Ok(false)` when the user declined.
    pub async fn delete_comment(
        &self,
        comment_id: CommentId,
        confirm: &dyn Confirm,
    ) -> Result<bool, FlowError> {
        let post_id = self.post_id()?;
        self.own_comment(comment_id)?;
        let _guard = self.comment_busy.acquire(comment_id)?;
        if !confirm.confirm("Delete this comment?").await {
            return Ok(false);
        }

        match self.api.delete_comment(post_id, comment_id).await {
            Ok(()) => {
                info!(post_id, comment_id, "comment deleted");
                self.state.send_modify(|s| {
                    s.comments.retain(|c| c.id != comment_id);
                    if let Some(post) = s.post.as_mut() {
                        post.comment_count = post.comment_count.saturating_sub(1);
                    }
                    s.error = None;
                });
                Ok(true)
            }
            Err(e) => Err(self.record(FlowError::from_api(e, messages::DELETE_FAILED))),
        }
    }

    /// Marks the post resolved; there is no way back.
    pub async fn resolve(&self, confirm: &dyn Confirm) -> Result<bool, FlowError> {
        let post_id = self.post_id()?;
        if !self.can_resolve() {
            return Err(FlowError::unavailable("this discussion is already resolved"));
        }
        let _guard = self.busy.acquire()?;
        if !confirm
            .confirm("Mark this discussion as resolved? This cannot be undone.")
            .await
        {
            return Ok(false);
        }

        match self.api.resolve_post(post_id).await {
            Ok(()) => {
                info!(post_id, "post resolved");
                self.state.send_modify(|s| {
                    if let Some(post) = s.post.as_mut() {
                        post.mark_resolved();
                    }
                    s.error = None;
                });
                Ok(true)
            }
            Err(e) => Err(self.record(FlowError::from_api(e, messages::RESOLVE_FAILED))),
        }
    }

    fn post_id(&self) -> Result<PostId, FlowError> {
        self.state
            .borrow()
            .post
            .as_ref()
            .map(|p| p.id)
            .ok_or_else(|| FlowError::unavailable(messages::POST_FAILED))
    }

    fn find_comment(&self, comment_id: CommentId) -> Option<Comment> {
        self.state
            .borrow()
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .cloned()
    }

    fn own_comment(&self, comment_id: CommentId) -> Result<(), FlowError> {
        match self.find_comment(comment_id) {
            Some(c) if c.mine => Ok(()),
            Some(_) => Err(FlowError::unavailable("only your own comments can be changed")),
            None => Err(FlowError::unavailable("comment not found")),
        }
    }

    fn record(&self, err: FlowError) -> FlowError {
        warn!("discussion action failed: {}", err);
        self.state.send_modify(|s| s.error = Some(err.clone()));
        err
    }
}

// --- New post ---

pub struct NewPostForm {
    api: Arc<dyn DiscussionApi>,
    answer_id: Option<AnswerId>,
    busy: BusyFlag,
}

impl NewPostForm {
    /// `answer_id` links the post to a reviewed answer.
    pub fn new(api: Arc<dyn DiscussionApi>, answer_id: Option<AnswerId>) -> Self {
        Self {
            api,
            answer_id,
            busy: BusyFlag::default(),
        }
    }

    pub fn answer_id(&self) -> Option<AnswerId> {
        self.answer_id
    }

    pub fn can_submit(title: &str, content: &str) -> bool {
        validation::is_filled(title) && validation::is_filled(content)
    }

    /// Publishes the post and returns its detail route.
    pub async fn submit(&self, title: &str, content: &str) -> Result<Route, FlowError> {
        if !Self::can_submit(title, content) {
            return Err(FlowError::validation(messages::EMPTY_FIELD));
        }
        let _guard = self.busy.acquire()?;
        let post = NewPost {
            answer_id: self.answer_id,
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        };
        match self.api.create_post(&post).await {
            Ok(id) => {
                info!(post_id = id, answer_id = ?self.answer_id, "post created");
                Ok(Route::DiscussionDetail(id))
            }
            Err(e) => {
                let err = FlowError::from_api(e, messages::CREATE_POST_FAILED);
                warn!("creating post failed: {}", err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        comment, post, rejected, summary, unreachable, FakeDiscussions, ScriptedConfirm,
    };

    fn listing(items: Vec<PostSummary>) -> Page<PostSummary> {
        let total = items.len() as u64;
        Page {
            content: items,
            page: 1,
            size: 10,
            total_pages: 1,
            total_elements: total,
        }
    }

    async fn detail(api: &Arc<FakeDiscussions>, status: PostStatus) -> PostDetail {
        api.get.push(Ok(post(5, status)));
        api.comments.push(Ok(vec![
            comment(1, "first", false),
            comment(2, "mine", true),
        ]));
        let d = PostDetail::new(api.clone());
        d.load(5).await.unwrap();
        d
    }

    #[tokio::test]
    async fn board_filters_on_both_sides() {
        let api = Arc::new(FakeDiscussions::default());
        api.list.push(Ok(listing(vec![
            summary(1, PostStatus::Open),
            summary(2, PostStatus::Resolved),
            summary(3, PostStatus::Open),
        ])));
        let board = DiscussionBoard::new(api.clone());
        board.load(Some(PostStatus::Open), 1).await.unwrap();
        let state = board.snapshot();
        assert_eq!(state.filter, Some(PostStatus::Open));
        assert_eq!(
            state.page.content.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![1, 3]
        );

        api.list.push(Err(unreachable()));
        assert_eq!(board.load(None, 1).await, Err(FlowError::Unreachable));
        assert_eq!(board.snapshot().page.content.len(), 2);
    }

    #[tokio::test]
    async fn comments_append_after_success() {
        let api = Arc::new(FakeDiscussions::default());
        let d = detail(&api, PostStatus::Open).await;

        assert_eq!(
            d.add_comment("   ").await,
            Err(FlowError::validation(messages::EMPTY_FIELD))
        );
        api.add.push(Err(rejected(500, "ERROR", None)));
        assert!(d.add_comment("hello").await.is_err());
        assert_eq!(d.snapshot().comments.len(), 2);

        let added = d.add_comment("hello").await.unwrap();
        let state = d.snapshot();
        assert_eq!(state.comments.last(), Some(&added));
        assert_eq!(state.post.map(|p| p.comment_count), Some(1));
        assert_eq!(api.add.calls(), 2);
    }

    #[tokio::test]
    async fn only_own_comments_can_change() {
        let api = Arc::new(FakeDiscussions::default());
        let d = detail(&api, PostStatus::Open).await;
        assert!(!d.can_modify(1));
        assert!(d.can_modify(2));

        assert!(d.edit_comment(1, "edited").await.is_err());
        let confirm = ScriptedConfirm::yes();
        assert!(d.delete_comment(1, &confirm).await.is_err());
        assert_eq!(api.edit.calls() + api.delete.calls(), 0);
        assert_eq!(confirm.asked(), 0);

        d.edit_comment(2, "edited").await.unwrap();
        assert_eq!(d.snapshot().comments[1].content, "edited");
    }

    #[tokio::test]
    async fn comment_delete_is_confirmed_and_applied_after_success() {
        let api = Arc::new(FakeDiscussions::default());
        let d = detail(&api, PostStatus::Open).await;

        assert_eq!(d.delete_comment(2, &ScriptedConfirm::no()).await, Ok(false));
        assert_eq!(api.delete.calls(), 0);

        api.delete.push(Err(unreachable()));
        let yes = ScriptedConfirm::yes();
        assert_eq!(d.delete_comment(2, &yes).await, Err(FlowError::Unreachable));
        assert_eq!(d.snapshot().comments.len(), 2);

        assert_eq!(d.delete_comment(2, &yes).await, Ok(true));
        assert_eq!(
            d.snapshot().comments.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![1]
        );
    }

    #[tokio::test]
    async fn resolve_is_confirmed_and_one_way() {
        let api = Arc::new(FakeDiscussions::default());
        let d = detail(&api, PostStatus::Open).await;
        assert!(d.can_resolve());

        assert_eq!(d.resolve(&ScriptedConfirm::no()).await, Ok(false));
        assert_eq!(api.resolve.calls(), 0);
        assert!(d.can_resolve());

        assert_eq!(d.resolve(&ScriptedConfirm::yes()).await, Ok(true));
        assert!(!d.can_resolve());
        assert!(d.snapshot().post.is_some_and(|p| p.is_resolved()));

        assert!(d.resolve(&ScriptedConfirm::yes()).await.is_err());
        assert_eq!(api.resolve.calls(), 1);

        let resolved = detail(&api, PostStatus::Resolved).await;
        assert!(!resolved.can_resolve());
    }

    #[tokio::test]
    async fn failed_load_clears_the_view() {
        let api = Arc::new(FakeDiscussions::default());
        api.get.push(Err(rejected(404, "NOT_FOUND", Some("no such post"))));
        let d = PostDetail::new(api.clone());
        let err = d.load(99).await.unwrap_err();
        assert_eq!(err.to_string(), "no such post");
        assert_eq!(d.snapshot().post, None);
        assert!(d.add_comment("hi").await.is_err());
    }

    #[tokio::test]
    async fn new_post_requires_title_and_content() {
        let api = Arc::new(FakeDiscussions::default());
        let form = NewPostForm::new(api.clone(), Some(12));
        assert_eq!(
            form.submit(" ", "body").await,
            Err(FlowError::validation(messages::EMPTY_FIELD))
        );
        assert_eq!(api.create.calls(), 0);
        assert_eq!(
            form.submit("Phantom reads", "How does MVCC handle it?").await,
            Ok(Route::DiscussionDetail(900))
        );
    }
}

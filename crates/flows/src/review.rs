use api::{QuestionApi, ReviewQuery};
use domain::{AnswerId, Page, QuestionId, ReviewItem, Route};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::confirm::Confirm;
use crate::errors::messages;
use crate::task::BusySet;
use crate::FlowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewState {
    pub query: ReviewQuery,
    pub page: Page<ReviewItem>,
    /// Question whose answer and feedback are expanded.
    pub open: Option<QuestionId>,
    pub loading: bool,
    pub error: Option<FlowError>,
}

impl Default for ReviewState {
    fn default() -> Self {
        let query = ReviewQuery::default();
        Self {
            page: Page::empty(query.page, query.size),
            query,
            open: None,
            loading: false,
            error: None,
        }
    }
}

/// Paginated history of answered questions.
pub struct ReviewList {
    api: Arc<dyn QuestionApi>,
    state: watch::Sender<ReviewState>,
    generation: AtomicU64,
    deleting: BusySet<AnswerId>,
}

impl ReviewList {
    pub fn new(api: Arc<dyn QuestionApi>) -> Self {
        let (state, _) = watch::channel(ReviewState::default());
        Self {
            api,
            state,
            generation: AtomicU64::new(0),
            deleting: BusySet::default(),
        }
    }

    pub fn snapshot(&self) -> ReviewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReviewState> {
        self.state.subscribe()
    }

    /// Only the most recent load may update the list.
    pub async fn load(&self, query: ReviewQuery) -> Result<(), FlowError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.api.list_reviews(&query).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(page = query.page, "discarding stale review page");
            return Ok(());
        }
        match result {
            Ok(page) => {
                debug!(page = page.page, items = page.content.len(), "review page loaded");
                self.state.send_modify(|s| {
                    s.query = ReviewQuery {
                        page: page.page,
                        ..query
                    };
                    s.page = page;
                    s.open = None;
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                let err = FlowError::from_api(e, messages::LIST_FAILED);
                warn!(page = query.page, "loading reviews failed: {}", err);
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(err.clone());
                });
                Err(err)
            }
        }
    }

    pub async fn reload(&self) -> Result<(), FlowError> {
        let query = self.state.borrow().query.clone();
        self.load(query).await
    }

    /// Returns whether the item is now expanded.
    pub fn toggle(&self, question_id: QuestionId) -> bool {
        let mut opened = false;
        self.state.send_modify(|s| {
            s.open = if s.open == Some(question_id) {
                None
            } else {
                Some(question_id)
            };
            opened = s.open.is_some();
        });
        opened
    }

    pub fn is_deleting(&self, answer_id: AnswerId) -> bool {
        self.deleting.contains(&answer_id)
    }

    /// Returns `Ok(false)` when the user declined.
    pub async fn delete(
        &self,
        answer_id: AnswerId,
        confirm: &dyn Confirm,
    ) -> Result<bool, FlowError> {
        let item = self
            .state
            .borrow()
            .page
            .content
            .iter()
            .find(|i| i.answer_id == answer_id)
            .cloned()
            .ok_or_else(|| FlowError::unavailable(messages::DELETE_FAILED))?;
        let _guard = self.deleting.acquire(answer_id)?;

        let prompt = format!("Delete your answer to \"{}\"?", item.question);
        if !confirm.confirm(&prompt).await {
            debug!(answer_id, "delete declined");
            return Ok(false);
        }

        if let Err(e) = self.api.delete_review(answer_id).await {
            let err = FlowError::from_api(e, messages::DELETE_FAILED);
            warn!(answer_id, "deleting review failed: {}", err);
            self.state.send_modify(|s| s.error = Some(err.clone()));
            return Err(err);
        }

        info!(answer_id, "review deleted");
        self.state.send_modify(|s| {
            let before = s.page.content.len();
            s.page.content.retain(|i| i.answer_id != answer_id);
            if s.page.content.len() < before {
                s.page.total_elements = s.page.total_elements.saturating_sub(1);
            }
            if s.open == Some(item.question_id) {
                s.open = None;
            }
            s.error = None;
        });
        Ok(true)
    }

    /// Where "discuss this answer" leads.
    pub fn discuss(&self, answer_id: AnswerId) -> Route {
        Route::DiscussionNew {
            answer_id: Some(answer_id),
        }
    }
}

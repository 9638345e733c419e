use api::{AuthApi, LoginRequest};
use domain::{codes, validation, Route, Session};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};

use crate::errors::messages;
use crate::guard::post_login_destination;
use crate::task::BusyFlag;
use crate::FlowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Bootstrap check still in flight.
    Loading,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}

/// Owner of the current user; views read or subscribe, only the store writes.
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    state: watch::Sender<SessionState>,
    busy: BusyFlag,
}

impl SessionStore {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            api,
            state,
            busy: BusyFlag::default(),
        }
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn changes(&self) -> WatchStream<SessionState> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Startup check of `/auth/me`; any failure means anonymous.
    pub async fn bootstrap(&self) -> SessionState {
        self.state.send_replace(SessionState::Loading);
        self.reload().await;
        self.current()
    }

    pub async fn reload(&self) -> Option<Session> {
        let next = match self.api.me().await {
            Ok(session) => {
                info!("session restored for member {}", session.member_id);
                SessionState::Authenticated(session)
            }
            Err(e) => {
                if e.is_unreachable() {
                    warn!("session check failed: {}", e);
                }
                SessionState::Anonymous
            }
        };
        self.state.send_replace(next.clone());
        next.session().cloned()
    }

    /// Returns where to go next: the preserved destination, or the landing page.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        auto_login: bool,
        from: Option<Route>,
    ) -> Result<Route, FlowError> {
        if !validation::is_valid_email(email) {
            return Err(FlowError::validation(messages::INVALID_EMAIL));
        }
        if !validation::is_filled(password) {
            return Err(FlowError::validation(messages::EMPTY_PASSWORD));
        }
        let _guard = self.busy.acquire()?;

        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            auto_login,
        };
        let session = match self.api.login(&req).await {
            Ok(Some(session)) => Some(session),
            // 登录回复不带用户信息时，重新拉取会话
            Ok(None) => self.reload().await,
            Err(e) if e.code() == Some(codes::LOGIN_FAIL) => {
                return Err(FlowError::from_api(e, messages::BAD_CREDENTIALS));
            }
            Err(e) => return Err(FlowError::from_api(e, messages::LOGIN_FAILED)),
        };

        match session {
            Some(session) => {
                info!("logged in as {}", session.nickname);
                self.state.send_replace(SessionState::Authenticated(session));
                Ok(post_login_destination(from))
            }
            None => Err(FlowError::Unexpected(messages::LOGIN_FAILED.into())),
        }
    }

    /// The local session is cleared even when the request fails.
    pub async fn logout(&self) -> Result<(), FlowError> {
        let result = self.api.logout().await;
        self.state.send_replace(SessionState::Anonymous);
        match result {
            Ok(()) => {
                info!("logged out");
                Ok(())
            }
            Err(e) => {
                warn!("logout request failed: {}", e);
                Err(FlowError::from_api(e, messages::LOGOUT_FAILED))
            }
        }
    }
}

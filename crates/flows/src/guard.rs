use domain::Route;

use crate::session::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Session check still running; render a placeholder.
    Wait,
    Redirect { to: Route, from: Route },
}

pub fn guard(route: &Route, state: &SessionState) -> GuardDecision {
    if !route.requires_auth() {
        return GuardDecision::Allow;
    }
    match state {
        SessionState::Loading => GuardDecision::Wait,
        SessionState::Authenticated(_) => GuardDecision::Allow,
        SessionState::Anonymous => GuardDecision::Redirect {
            to: Route::Login,
            from: route.clone(),
        },
    }
}

pub fn post_login_destination(from: Option<Route>) -> Route {
    match from {
        Some(Route::Login) | None => Route::Landing,
        Some(route) => route,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;

    #[test]
    fn protected_routes_redirect_with_origin() {
        let decision = guard(&Route::DiscussionDetail(7), &SessionState::Anonymous);
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                to: Route::Login,
                from: Route::DiscussionDetail(7)
            }
        );
        assert_eq!(guard(&Route::Interview, &SessionState::Loading), GuardDecision::Wait);
        assert_eq!(
            guard(
                &Route::Interview,
                &SessionState::Authenticated(session(1, "ferris"))
            ),
            GuardDecision::Allow
        );
    }

    #[test]
    fn public_routes_always_pass() {
        assert_eq!(guard(&Route::Signup, &SessionState::Anonymous), GuardDecision::Allow);
        assert_eq!(guard(&Route::Landing, &SessionState::Loading), GuardDecision::Allow);
    }

    #[test]
    fn destination_falls_back_to_landing() {
        assert_eq!(post_login_destination(None), Route::Landing);
        assert_eq!(post_login_destination(Some(Route::Login)), Route::Landing);
        assert_eq!(post_login_destination(Some(Route::Review)), Route::Review);
    }
}

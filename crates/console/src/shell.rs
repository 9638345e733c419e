use anyhow::{anyhow, bail};
use api::{ApiClient, AuthApi, DiscussionApi, QuestionApi, ReviewQuery};
use clap::{Parser, Subcommand};
use domain::time::format_countdown;
use domain::{AnswerId, Category, CommentId, PostId, PostStatus, QuestionId, Route};
use flows::{
    guard, DiscussionBoard, EmailVerification, FlowError, GuardDecision, InterviewController,
    InterviewPhase, NewPostForm, PasswordResetForm, PostDetail, ReviewList, SessionState,
    SessionStore, SignupForm,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::render;
use crate::terminal::Terminal;

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show who is signed in
    Whoami,
    /// Sign in
    Login {
        email: Option<String>,
        /// Keep the session across restarts
        #[arg(long)]
        remember: bool,
    },
    Logout,
    /// Create an account (email verification first)
    Signup,
    /// Reset a forgotten password
    ResetPassword,
    /// Answer one question and wait for feedback
    Interview { category: Option<String> },
    /// List answered questions
    Review {
        page: Option<u32>,
        query: Option<String>,
    },
    /// Expand or collapse one reviewed question
    ReviewOpen { question_id: QuestionId },
    ReviewDelete { answer_id: AnswerId },
    /// List discussions: all, open or resolved
    Discussions {
        status: Option<String>,
        page: Option<u32>,
    },
    /// Open one discussion
    Post { id: PostId },
    /// Comment on the open discussion
    Comment,
    CommentEdit { id: CommentId },
    CommentDelete { id: CommentId },
    /// Mark the open discussion resolved
    Resolve,
    /// Start a discussion, optionally about a reviewed answer
    NewPost {
        #[arg(long)]
        answer: Option<AnswerId>,
    },
    #[command(alias = "exit")]
    Quit,
}

impl Command {
    /// Page the command belongs to; decides whether sign-in is needed.
    pub fn route(&self, open_post: Option<PostId>) -> Route {
        match self {
            Command::Whoami | Command::Logout | Command::Quit => Route::Landing,
            Command::Login { .. } => Route::Login,
            Command::Signup => Route::Signup,
            Command::ResetPassword => Route::ForgotPassword,
            Command::Interview { .. } => Route::Interview,
            Command::Review { .. } | Command::ReviewOpen { .. } | Command::ReviewDelete { .. } => {
                Route::Review
            }
            Command::Discussions { .. } => Route::Discussions,
            Command::Post { id } => Route::DiscussionDetail(*id),
            Command::Comment
            | Command::CommentEdit { .. }
            | Command::CommentDelete { .. }
            | Command::Resolve => open_post
                .map(Route::DiscussionDetail)
                .unwrap_or(Route::Discussions),
            Command::NewPost { answer } => Route::DiscussionNew { answer_id: *answer },
        }
    }
}

/// `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words).map(|l| Some(l.command))
}

pub struct Shell {
    auth: Arc<dyn AuthApi>,
    discussions: Arc<dyn DiscussionApi>,
    settings: Settings,
    term: Terminal,
    session: SessionStore,
    interview: InterviewController,
    reviews: ReviewList,
    board: DiscussionBoard,
    post: PostDetail,
}

impl Shell {
    pub fn new(client: ApiClient, settings: Settings) -> Self {
        let client = Arc::new(client);
        let auth: Arc<dyn AuthApi> = client.clone();
        let questions: Arc<dyn QuestionApi> = client.clone();
        let discussions: Arc<dyn DiscussionApi> = client;
        Self {
            session: SessionStore::new(auth.clone()),
            interview: InterviewController::new(questions.clone(), settings.poll_policy()),
            reviews: ReviewList::new(questions),
            board: DiscussionBoard::new(discussions.clone()),
            post: PostDetail::new(discussions.clone()),
            auth,
            discussions,
            settings,
            term: Terminal::new(),
        }
    }

    pub async fn bootstrap(&self) {
        match self.session.bootstrap().await {
            SessionState::Authenticated(s) => println!("Signed in as {}.", s.nickname),
            _ => println!("Not signed in. Type `login` or `signup`, `help` for all commands."),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        while let Some(line) = self.term.read_line("prepmate> ").await? {
            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.dispatch(command).await {
                println!("! {}", e);
            }
        }
        info!("shell closed");
        Ok(())
    }

    /// Protected commands first pass the route guard; after a redirect to
    /// login the original command resumes.
    async fn dispatch(&self, command: Command) -> anyhow::Result<()> {
        let route = command.route(self.open_post());
        let mut decision = guard(&route, &self.session.current());
        // 会话尚未确定时先补一次 /auth/me
        if decision == GuardDecision::Wait {
            self.session.bootstrap().await;
            decision = guard(&route, &self.session.current());
        }
        match decision {
            GuardDecision::Allow => self.execute(command).await,
            GuardDecision::Wait => bail!("session is still loading, try again"),
            GuardDecision::Redirect { from, .. } => {
                // 登录成功后回到原命令
                println!("Sign in to continue to {}.", from);
                let destination = self.login(None, false, Some(from.clone())).await?;
                if destination == from {
                    self.execute(command).await
                } else {
                    println!("Now at {}.", destination);
                    Ok(())
                }
            }
        }
    }

    async fn execute(&self, command: Command) -> anyhow::Result<()> {
        debug!(?command, "executing");
        match command {
            Command::Whoami => {
                match self.session.current() {
                    SessionState::Authenticated(s) => {
                        println!("{} (member {})", s.nickname, s.member_id)
                    }
                    _ => println!("Not signed in."),
                }
                Ok(())
            }
            Command::Login { email, remember } => {
                let destination = self.login(email, remember, None).await?;
                println!("Now at {}.", destination);
                Ok(())
            }
            Command::Logout => {
                let result = self.session.logout().await;
                println!("Signed out.");
                Ok(result?)
            }
            Command::Signup => self.signup().await,
            Command::ResetPassword => self.reset_password().await,
            Command::Interview { category } => self.interview(category).await,
            Command::Review { page, query } => {
                self.reviews
                    .load(ReviewQuery {
                        page: page.unwrap_or(1),
                        query,
                        ..ReviewQuery::default()
                    })
                    .await?;
                println!("{}", render::reviews(&self.reviews.snapshot()));
                Ok(())
            }
            Command::ReviewOpen { question_id } => {
                self.reviews.toggle(question_id);
                println!("{}", render::reviews(&self.reviews.snapshot()));
                Ok(())
            }
            Command::ReviewDelete { answer_id } => {
                if self.reviews.delete(answer_id, &self.term).await? {
                    println!("Deleted.");
                } else {
                    println!("Cancelled.");
                }
                Ok(())
            }
            Command::Discussions { status, page } => {
                let status = match status.as_deref() {
                    None | Some("all") => None,
                    Some(s) => Some(s.parse::<PostStatus>().map_err(|e| anyhow!(e))?),
                };
                self.board.load(status, page.unwrap_or(1)).await?;
                println!("{}", render::board(&self.board.snapshot()));
                Ok(())
            }
            Command::Post { id } => self.show_post(id).await,
            Command::Comment => {
                let content = self.term.ask("Comment: ").await?;
                self.post.add_comment(&content).await?;
                println!("{}", render::detail(&self.post.snapshot()));
                Ok(())
            }
            Command::CommentEdit { id } => {
                if !self.post.can_modify(id) {
                    bail!("only your own comments can be edited");
                }
                let content = self.term.ask("New text: ").await?;
                self.post.edit_comment(id, &content).await?;
                println!("{}", render::detail(&self.post.snapshot()));
                Ok(())
            }
            Command::CommentDelete { id } => {
                if self.post.delete_comment(id, &self.term).await? {
                    println!("{}", render::detail(&self.post.snapshot()));
                }
                Ok(())
            }
            Command::Resolve => {
                if self.post.resolve(&self.term).await? {
                    println!("Marked as resolved.");
                }
                Ok(())
            }
            Command::NewPost { answer } => self.new_post(answer).await,
            Command::Quit => Ok(()),
        }
    }

    async fn login(
        &self,
        email: Option<String>,
        remember: bool,
        from: Option<Route>,
    ) -> anyhow::Result<Route> {
        let email = match email {
            Some(e) => e,
            None => self.term.ask("Email: ").await?,
        };
        let password = self.term.ask("Password: ").await?;
        let destination = self.session.login(&email, &password, remember, from).await?;
        if let Some(s) = self.session.current().session() {
            println!("Welcome, {}.", s.nickname);
        }
        Ok(destination)
    }

    async fn signup(&self) -> anyhow::Result<()> {
        let form = SignupForm::new(self.auth.clone(), self.settings.verification_window());
        self.verify_email(form.verification()).await?;
        form.set_password(&self.term.ask("Password: ").await?);
        form.set_password_confirm(&self.term.ask("Repeat password: ").await?);
        form.set_nickname(&self.term.ask("Nickname: ").await?);
        println!("{}", render::signup_checks(&form.checks()));
        form.submit().await?;
        println!("Account created. Sign in with `login`.");
        Ok(())
    }

    async fn reset_password(&self) -> anyhow::Result<()> {
        let form = PasswordResetForm::new(self.auth.clone(), self.settings.verification_window());
        self.verify_email(form.verification()).await?;
        form.set_new_password(&self.term.ask("New password: ").await?);
        form.set_confirm_password(&self.term.ask("Repeat new password: ").await?);
        form.submit().await?;
        println!("Password changed. Sign in with `login`.");
        Ok(())
    }

    /// Send, then ask for the code until it verifies or the user gives up.
    async fn verify_email(&self, v: &EmailVerification) -> anyhow::Result<()> {
        let email = self.term.ask("Email: ").await?;
        v.set_email(&email)?;
        v.send().await?;
        println!(
            "Code sent to {}. It is valid for {}.",
            email,
            format_countdown(v.seconds_left())
        );
        loop {
            let prompt = format!(
                "Code ({} left, empty to resend, q to quit): ",
                format_countdown(v.seconds_left())
            );
            let code = self.term.ask(&prompt).await?;
            match code.as_str() {
                "q" => bail!("verification aborted"),
                "" => {
                    match v.send().await {
                        Ok(()) => println!("A new code was sent."),
                        Err(e) => println!("! {}", e),
                    }
                    continue;
                }
                _ => {}
            }
            v.set_code(&code)?;
            match v.verify().await {
                Ok(_) => {
                    println!("Email verified.");
                    return Ok(());
                }
                Err(e @ FlowError::Unavailable(_)) => return Err(e.into()),
                Err(e) => println!("! {}", e),
            }
        }
    }

    async fn interview(&self, category: Option<String>) -> anyhow::Result<()> {
        let category: Category = match category {
            Some(c) => c.parse()?,
            None => {
                println!("{}", render::categories());
                self.term.ask("Category: ").await?.parse()?
            }
        };
        if self.interview.snapshot().phase != InterviewPhase::Idle {
            self.interview.restart();
        }
        self.interview.select_category(category)?;
        let question = self.interview.start().await?;
        println!("{}", render::question(&question));

        let answer = self.term.ask("Your answer: ").await?;
        self.interview.set_answer(&answer)?;
        let answer_id = self.interview.submit_answer().await?;
        println!("Answer saved. Waiting for feedback...");

        let state = self.interview.wait_for_outcome().await;
        match (state.phase, state.feedback, state.error) {
            (InterviewPhase::FeedbackReady, Some(feedback), _) => {
                println!("{}", render::feedback(&feedback));
                println!("Discuss it with `new-post --answer {}`.", answer_id);
                Ok(())
            }
            (_, _, Some(err)) => Err(err.into()),
            (phase, _, _) => bail!("interview ended in {:?}", phase),
        }
    }

    async fn show_post(&self, id: PostId) -> anyhow::Result<()> {
        self.post.load(id).await?;
        println!("{}", render::detail(&self.post.snapshot()));
        if self.post.can_resolve() {
            println!("(`resolve` marks this discussion resolved)");
        }
        Ok(())
    }

    async fn new_post(&self, answer: Option<AnswerId>) -> anyhow::Result<()> {
        let form = NewPostForm::new(self.discussions.clone(), answer);
        let title = self.term.ask("Title: ").await?;
        let content = self.term.ask("Content: ").await?;
        match form.submit(&title, &content).await? {
            Route::DiscussionDetail(id) => self.show_post(id).await,
            other => {
                println!("Now at {}.", other);
                Ok(())
            }
        }
    }

    fn open_post(&self) -> Option<PostId> {
        self.post.snapshot().post.map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_arguments() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(
            parse_line("review 2 index").unwrap(),
            Some(Command::Review {
                page: Some(2),
                query: Some("index".into())
            })
        );
        assert_eq!(
            parse_line("new-post --answer 12").unwrap(),
            Some(Command::NewPost { answer: Some(12) })
        );
        assert_eq!(parse_line("exit").unwrap(), Some(Command::Quit));
        assert!(parse_line("post abc").is_err());
        assert!(parse_line("dance").is_err());
    }

    #[test]
    fn commands_map_to_guarded_routes() {
        assert_eq!(
            Command::Interview { category: None }.route(None),
            Route::Interview
        );
        assert_eq!(Command::Resolve.route(Some(4)), Route::DiscussionDetail(4));
        assert_eq!(Command::Comment.route(None), Route::Discussions);
        assert!(!Command::Signup.route(None).requires_auth());
        assert!(Command::ReviewDelete { answer_id: 1 }
            .route(None)
            .requires_auth());
    }
}

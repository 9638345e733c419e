use chrono::NaiveDateTime;
use domain::{Category, Comment, Feedback, Page, Post, PostSummary, Question, ReviewItem};
use flows::{BoardState, DetailState, ReviewState, SignupChecks};

pub fn categories() -> String {
    Category::ALL
        .iter()
        .map(|c| format!("  {:<14} {}", c.key(), c.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn question(q: &Question) -> String {
    format!("[{}] Q{}. {}", q.category.label(), q.id, q.text)
}

pub fn feedback(f: &Feedback) -> String {
    format!(
        "Score: {}/10\n\nWhat to improve:\n{}\n\nModel answer:\n{}",
        f.score, f.improvement, f.model_answer
    )
}

fn pager<T>(page: &Page<T>) -> String {
    format!(
        "page {}/{} · {} total{}{}",
        page.page,
        page.total_pages,
        page.total_elements,
        if page.has_prev() { " · [prev]" } else { "" },
        if page.has_next() { " · [next]" } else { "" },
    )
}

pub fn reviews(state: &ReviewState) -> String {
    if state.page.content.is_empty() {
        return "No answered questions yet.".to_string();
    }
    let mut out: Vec<String> = state
        .page
        .content
        .iter()
        .map(|item| review_item(item, state.open == Some(item.question_id)))
        .collect();
    out.push(pager(&state.page));
    out.join("\n")
}

fn review_item(item: &ReviewItem, open: bool) -> String {
    let score = item
        .feedback
        .as_ref()
        .map(|f| format!("{}/10", f.score))
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{} Q{} (answer {}) [{}] {}  score {}",
        if open { "▾" } else { "▸" },
        item.question_id,
        item.answer_id,
        item.category,
        item.question,
        score
    );
    if open {
        line.push_str(&format!("\n    Your answer: {}", item.answer));
        if let Some(f) = &item.feedback {
            for l in feedback(f).lines() {
                line.push_str("\n    ");
                line.push_str(l);
            }
        }
    }
    line
}

pub fn board(state: &BoardState) -> String {
    let filter = state.filter.map(|s| s.label()).unwrap_or("all");
    let mut out = vec![format!("Discussions ({})", filter)];
    if state.page.content.is_empty() {
        out.push("  nothing here yet".to_string());
    }
    out.extend(state.page.content.iter().map(post_line));
    out.push(pager(&state.page));
    out.join("\n")
}

fn post_line(p: &PostSummary) -> String {
    format!(
        "  #{:<5} [{}] {} ({} comments, {})",
        p.id,
        p.status.label(),
        p.title,
        p.comment_count,
        when(p.created_at.as_ref())
    )
}

pub fn detail(state: &DetailState) -> String {
    let Some(post) = &state.post else {
        return "No post loaded.".to_string();
    };
    let mut out = vec![post_header(post)];
    if let Some(linked) = &post.linked {
        out.push(format!("  Question: {}", linked.question));
        if let Some(answer) = &linked.answer {
            out.push(format!("  Answer:   {}", answer));
        }
        if let Some(f) = &linked.feedback {
            out.push(format!("  Score:    {}/10", f.score));
        }
    }
    out.push(String::new());
    out.push(post.content.clone());
    out.push(format!("\n-- {} comment(s) --", state.comments.len()));
    out.extend(state.comments.iter().map(comment_line));
    out.join("\n")
}

fn post_header(post: &Post) -> String {
    format!(
        "#{} {} [{}] by {} · {}",
        post.id,
        post.title,
        post.status.label(),
        post.author_nickname.as_deref().unwrap_or("anonymous"),
        when(post.created_at.as_ref())
    )
}

fn comment_line(c: &Comment) -> String {
    format!(
        "  ({}) {}{}: {}  · {}",
        c.id,
        c.author_nickname.as_deref().unwrap_or("anonymous"),
        if c.mine { " (you)" } else { "" },
        c.content,
        when(c.created_at.as_ref())
    )
}

pub fn signup_checks(checks: &SignupChecks) -> String {
    let mark = |ok: bool| if ok { "✔" } else { "✘" };
    format!(
        "{} email verified\n{} strong password\n{} passwords match\n{} nickname",
        mark(checks.verified),
        mark(checks.strong_password),
        mark(checks.passwords_match),
        mark(checks.nickname_filled)
    )
}

fn when(at: Option<&NaiveDateTime>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PostStatus;

    #[test]
    fn board_lists_filter_and_pager() {
        let state = BoardState {
            filter: Some(PostStatus::Open),
            page: Page {
                content: vec![PostSummary {
                    id: 3,
                    title: "MVCC".into(),
                    status: PostStatus::Open,
                    created_at: None,
                    comment_count: 2,
                }],
                page: 1,
                size: 10,
                total_pages: 2,
                total_elements: 11,
            },
            error: None,
        };
        let out = board(&state);
        assert!(out.starts_with("Discussions (in discussion)"));
        assert!(out.contains("#3"));
        assert!(out.ends_with("page 1/2 · 11 total · [next]"));
    }
}

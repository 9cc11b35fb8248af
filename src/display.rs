//! Plain-text rendering of view state for the terminal.

use crate::api::{Comment, MediaRef, Post, User};
use crate::notice::{Notice, NoticeLevel};
use chrono::{DateTime, Utc};

/// Human relative time: "now", "5m ago", "3h ago", "2d ago", then a date.
pub fn format_relative(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = date else {
        return String::new();
    };
    let secs = now.signed_duration_since(date).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if secs < 60 {
        "now".to_string()
    } else if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        date.format("%B %-d, %Y").to_string()
    }
}

pub fn render_user(user: &User) -> String {
    let mut line = format!(
        "#{} @{}  {} following · {} followers",
        user.id, user.username, user.following_count, user.followers_count
    );
    if user.is_following {
        line.push_str("  [following]");
    }
    if !user.bio.is_empty() {
        line.push_str("\n    ");
        line.push_str(&user.bio);
    }
    line
}

pub fn render_post(post: &Post, width: usize, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "#{} @{}  {}\n",
        post.id,
        post.user.username,
        format_relative(post.created_at, now)
    );
    if !post.content.is_empty() {
        out.push_str(&textwrap::indent(&textwrap::fill(&post.content, width), "  "));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    match post.media() {
        Some(MediaRef::Image(url)) => out.push_str(&format!("  [image] {}\n", url)),
        Some(MediaRef::Video(url)) => out.push_str(&format!("  [video] {}\n", url)),
        None => {}
    }
    out.push_str(&format!(
        "  {} {}  ·  {} comments  ·  {} shares\n",
        if post.liked { "♥" } else { "♡" },
        post.likes_count,
        post.comments_count,
        post.shares_count
    ));

    if post.comments_open {
        if let Some(comments) = &post.comments {
            for comment in comments {
                render_comment(&mut out, comment, 2, width, now);
            }
        }
    }
    out
}

fn render_comment(out: &mut String, comment: &Comment, depth: usize, width: usize, now: DateTime<Utc>) {
    let pad = "  ".repeat(depth);
    out.push_str(&format!(
        "{}↳ #{} @{} {}  ({} likes, {} replies)\n",
        pad,
        comment.id,
        comment.user.username,
        format_relative(comment.created_at, now),
        comment.likes_count,
        comment.reply_count()
    ));
    let body = textwrap::fill(&comment.content, width.saturating_sub(pad.len()).max(20));
    out.push_str(&textwrap::indent(&body, &format!("{}  ", pad)));
    if !out.ends_with('\n') {
        out.push('\n');
    }
    for reply in &comment.replies {
        render_comment(out, reply, depth + 1, width, now);
    }
}

pub fn render_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => notice.text.clone(),
        NoticeLevel::Error => format!("error: {}", notice.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::{comment, post, user};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_format_relative_buckets() {
        let now = now();
        assert_eq!(format_relative(Some(now - Duration::seconds(30)), now), "now");
        assert_eq!(format_relative(Some(now - Duration::minutes(5)), now), "5m ago");
        assert_eq!(format_relative(Some(now - Duration::hours(3)), now), "3h ago");
        assert_eq!(format_relative(Some(now - Duration::days(2)), now), "2d ago");
        assert_eq!(
            format_relative(Some(now - Duration::days(30)), now),
            "February 8, 2026"
        );
    }

    #[test]
    fn test_format_relative_missing_or_future() {
        let now = now();
        assert_eq!(format_relative(None, now), "");
        assert_eq!(format_relative(Some(now + Duration::minutes(5)), now), "now");
    }

    #[test]
    fn test_render_post_wraps_and_counts() {
        let mut p = post(10, user(2, "amal"), "one two three four five six seven");
        p.likes_count = 4;
        p.liked = true;
        let out = render_post(&p, 10, now());
        assert!(out.starts_with("#10 @amal"));
        assert!(out.contains("♥ 4"));
        assert!(out.lines().filter(|l| l.starts_with("  ")).count() >= 3);
    }

    #[test]
    fn test_render_post_shows_open_comments() {
        let mut p = post(10, user(2, "amal"), "body");
        let mut c = comment(5, 10, user(3, "sami"), "top");
        c.replies.push(comment(6, 10, user(2, "amal"), "nested"));
        p.comments = Some(vec![c]);

        assert!(!render_post(&p, 40, now()).contains("@sami"));
        p.comments_open = true;
        let out = render_post(&p, 40, now());
        assert!(out.contains("#5 @sami"));
        assert!(out.contains("1 replies"));
        assert!(out.contains("#6 @amal"));
    }

    #[test]
    fn test_render_user_marks_following() {
        let mut u = user(2, "amal");
        u.is_following = true;
        assert!(render_user(&u).contains("[following]"));
    }
}

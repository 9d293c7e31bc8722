//! Splits oversized response bodies into size-bounded pages.
//!
//! Lengths are measured in characters. Pages are cut at whitespace, preferring
//! a line break, and a single token longer than a page is hard-cut.

use serde::{Deserialize, Serialize};

use crate::{error::PaginationError, models::Choice, models::Status};

/// Rendered pages of one screen response, cached in the session so page
/// navigation never re-runs screen logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCache {
    /// Status the screen finished with.
    pub status: Status,
    /// Pages exactly as emitted, controls included.
    pub pages: Vec<String>,
    /// Zero-based index of the page last shown.
    pub current: usize,
}

impl PageCache {
    /// Cache `pages`, positioned on the first one.
    pub fn new(status: Status, pages: Vec<String>) -> Self {
        Self {
            status,
            pages,
            current: 0,
        }
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when nothing was cached.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// True when page codes can move between pages.
    pub fn is_paginated(&self) -> bool {
        self.pages.len() > 1
    }

    /// Page at the current index.
    pub fn current_page(&self) -> &str {
        self.pages
            .get(self.current)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Status to emit with the current page.
    ///
    /// An ending response only ends on its last page; earlier pages keep the
    /// session open so the subscriber can still page forward.
    pub fn current_status(&self) -> Status {
        match self.status {
            Status::End if self.current + 1 < self.pages.len() => Status::Continue,
            status => status,
        }
    }

    /// Advance one page; stays on the last page.
    pub fn next(&mut self) -> &str {
        if self.current + 1 < self.pages.len() {
            self.current += 1;
        }
        self.current_page()
    }

    /// Go back one page; stays on the first page.
    pub fn previous(&mut self) -> &str {
        self.current = self.current.saturating_sub(1);
        self.current_page()
    }
}

/// Split `body` into pages of at most `page_size` characters.
///
/// The first page carries `footer` with the `next` control inserted after its
/// first line, interior pages carry `prev` and `next`, the last page carries
/// `prev` only. A body that fits is returned as one page with the footer.
pub fn paginate(
    body: &str,
    page_size: usize,
    next: &Choice,
    prev: &Choice,
    footer: &[String],
) -> Result<Vec<String>, PaginationError> {
    let body = body.trim();
    let footer_text = footer.join("\n");
    let footer_len = if footer.is_empty() {
        0
    } else {
        char_len(&footer_text) + 1
    };

    if char_len(body) + footer_len <= page_size {
        let page = if footer.is_empty() {
            body.to_string()
        } else if body.is_empty() {
            footer_text
        } else {
            format!("{body}\n{footer_text}")
        };
        return Ok(vec![page]);
    }

    let next_len = next.len() + 1;
    let prev_len = prev.len() + 1;
    let first_reserved = footer_len + next_len;
    let interior_reserved = prev_len + next_len;
    for reserved in [first_reserved, interior_reserved] {
        if reserved >= page_size {
            return Err(PaginationError::PageTooSmall {
                page_size,
                reserved,
            });
        }
    }

    let first_footer = first_page_footer(footer, next);
    let mut pages = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        if !pages.is_empty() && char_len(rest) + prev_len <= page_size {
            pages.push(format!("{rest}\n{prev}"));
            break;
        }

        let budget = if pages.is_empty() {
            page_size - first_reserved
        } else {
            page_size - interior_reserved
        };
        let (chunk, remainder) = cut(rest, budget);
        if pages.is_empty() {
            pages.push(format!("{chunk}\n{first_footer}"));
        } else {
            pages.push(format!("{chunk}\n{prev}\n{next}"));
        }
        rest = remainder;
    }

    Ok(pages)
}

/// Bound a single message to one page, cutting at a word boundary.
pub fn truncate(text: &str, page_size: usize) -> String {
    let text = text.trim();
    if char_len(text) <= page_size {
        return text.to_string();
    }
    cut(text, page_size).0.to_string()
}

fn first_page_footer(footer: &[String], next: &Choice) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(footer.len() + 1);
    let mut footer = footer.iter();
    if let Some(first) = footer.next() {
        lines.push(first.clone());
    }
    lines.push(next.to_string());
    lines.extend(footer.cloned());
    lines.join("\n")
}

/// Split `text` into a chunk of at most `budget` characters and the remainder.
///
/// Both halves are trimmed at the cut. `text` must be trimmed and longer than
/// `budget`.
fn cut(text: &str, budget: usize) -> (&str, &str) {
    let window_end = byte_offset(text, budget);
    // A whitespace right after the window means the window ends on a word.
    let boundary_at_end = text[window_end..]
        .chars()
        .next()
        .map(char::is_whitespace)
        .unwrap_or(true);

    let split = if boundary_at_end {
        window_end
    } else {
        let window = &text[..window_end];
        let newline = window.rfind('\n').filter(|at| *at * 2 >= window.len());
        newline
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|at| *at > 0)
            .unwrap_or(window_end)
    };

    (text[..split].trim_end(), text[split..].trim_start())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls() -> (Choice, Choice) {
        (Choice::new("98", "More"), Choice::new("0", "Back"))
    }

    fn nav_footer() -> Vec<String> {
        vec!["97: Previous".to_string(), "99: Home".to_string()]
    }

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("word{i:03}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn strip_controls<'a>(page: &'a str, controls: &[String]) -> Vec<&'a str> {
        page.lines()
            .filter(|line| !controls.iter().any(|c| c == line))
            .collect()
    }

    #[test]
    fn short_body_is_single_page_with_footer() {
        let (next, prev) = controls();
        let pages =
            paginate("  Welcome\n1: Balance\n", 182, &next, &prev, &nav_footer()).unwrap();
        assert_eq!(pages, vec!["Welcome\n1: Balance\n97: Previous\n99: Home"]);

        let pages = paginate("Bye", 182, &next, &prev, &[]).unwrap();
        assert_eq!(pages, vec!["Bye"]);
    }

    #[test]
    fn five_hundred_chars_at_182() {
        let (next, prev) = controls();
        let body: String = words(70).chars().take(500).collect();
        assert_eq!(body.chars().count(), 500);

        let pages = paginate(&body, 182, &next, &prev, &[]).unwrap();
        assert!(pages.len() >= 3, "got {} pages", pages.len());
        for page in &pages {
            assert!(page.chars().count() <= 182, "page too long: {page:?}");
        }
        let first = &pages[0];
        let last = &pages[pages.len() - 1];
        assert!(first.ends_with("\n98: More"));
        assert!(!first.contains("0: Back"));
        assert!(last.ends_with("\n0: Back"));
        assert!(!last.contains("98: More"));
        for page in &pages[1..pages.len() - 1] {
            assert!(page.ends_with("\n0: Back\n98: More"));
        }
    }

    #[test]
    fn pages_reconstruct_body_modulo_whitespace() {
        let (next, prev) = controls();
        let control_lines = vec![
            next.to_string(),
            prev.to_string(),
            "97: Previous".to_string(),
            "99: Home".to_string(),
        ];
        let bodies = [
            words(120),
            (1..40)
                .map(|i| format!("{i}: Option number {i}"))
                .collect::<Vec<_>>()
                .join("\n"),
            format!("{} tail", "x".repeat(400)),
        ];

        for body in &bodies {
            for page_size in [40usize, 64, 100, 160, 182] {
                let pages = paginate(body, page_size, &next, &prev, &nav_footer()).unwrap();
                let mut text = String::new();
                for page in &pages {
                    assert!(page.chars().count() <= page_size);
                    for line in strip_controls(page, &control_lines) {
                        text.push_str(line);
                        text.push(' ');
                    }
                }
                let normalize = |s: &str| s.split_whitespace().collect::<String>();
                assert_eq!(normalize(&text), normalize(body), "page size {page_size}");
            }
        }
    }

    #[test]
    fn never_splits_words_when_a_boundary_exists() {
        let (next, prev) = controls();
        let body = words(80);
        let pages = paginate(&body, 60, &next, &prev, &[]).unwrap();
        for page in &pages {
            let content = page.lines().next().unwrap();
            for word in content.split_whitespace() {
                assert_eq!(word.len(), 7, "split word {word:?} in {page:?}");
            }
        }
    }

    #[test]
    fn first_page_footer_interleaves_more_control() {
        let (next, prev) = controls();
        let pages = paginate(&words(60), 120, &next, &prev, &nav_footer()).unwrap();
        assert!(pages[0].ends_with("\n97: Previous\n98: More\n99: Home"));
        assert!(pages[1..].iter().all(|page| !page.contains("97: Previous")));
    }

    #[test]
    fn rejects_page_size_without_room_for_content() {
        let (next, prev) = controls();
        let err = paginate(&words(10), 12, &next, &prev, &nav_footer()).unwrap_err();
        assert!(matches!(err, PaginationError::PageTooSmall { .. }));
    }

    #[test]
    fn cache_navigation_clamps() {
        let mut cache = PageCache::new(Status::Continue, vec!["a".into(), "b".into()]);
        assert_eq!(cache.previous(), "a");
        assert_eq!(cache.next(), "b");
        assert_eq!(cache.next(), "b");
        assert_eq!(cache.current, 1);
        assert_eq!(cache.previous(), "a");
        assert_eq!(cache.previous(), "a");
        assert_eq!(cache.current, 0);
    }

    #[test]
    fn truncate_bounds_messages() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a fairly long message", 10), "a fairly");
        assert_eq!(truncate("abcdefghijkl", 5), "abcde");
    }
}

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Page(usize),
    Ellipsis,
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageToken::Page(n) => write!(f, "{n}"),
            PageToken::Ellipsis => write!(f, "…"),
        }
    }
}

/// A previous/next control. `target` is where it leads when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavControl {
    pub target: usize,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub previous: NavControl,
    pub tokens: Vec<PageToken>,
    pub next: NavControl,
    pub current: usize,
}

impl PageWindow {
    pub fn is_current(&self, token: PageToken) -> bool {
        token == PageToken::Page(self.current)
    }
}

/// Page numbers around `current`, with the first and last page always reachable
/// and skipped ranges collapsed into an ellipsis.
pub fn select_window(current: usize, total: usize, window_size: usize) -> Vec<PageToken> {
    if total <= window_size {
        return (1..=total).map(PageToken::Page).collect();
    }

    let half = window_size / 2;
    let start = current.saturating_sub(half).max(1);
    let end = current.saturating_add(half).min(total);

    let mut tokens = Vec::with_capacity(window_size + 4);
    if start > 1 {
        tokens.push(PageToken::Page(1));
        if start > 2 {
            tokens.push(PageToken::Ellipsis);
        }
    }
    tokens.extend((start..=end).map(PageToken::Page));
    if end < total {
        if end < total - 1 {
            tokens.push(PageToken::Ellipsis);
        }
        tokens.push(PageToken::Page(total));
    }
    tokens
}

/// Window tokens bracketed by previous/next controls, disabled at the boundaries.
pub fn page_window(current: usize, total: usize, window_size: usize) -> PageWindow {
    PageWindow {
        previous: NavControl {
            target: current.saturating_sub(1).min(total).max(1),
            enabled: current > 1,
        },
        tokens: select_window(current, total, window_size),
        next: NavControl {
            target: current.saturating_add(1),
            enabled: current < total,
        },
        current,
    }
}

#[cfg(test)]
mod tests {
    use super::PageToken::{Ellipsis, Page};
    use super::*;

    #[test]
    fn middle_page_has_ellipses_on_both_sides() {
        assert_eq!(
            select_window(5, 10, 3),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn small_totals_list_every_page() {
        assert_eq!(select_window(1, 2, 3), vec![Page(1), Page(2)]);
        assert_eq!(select_window(2, 3, 3), vec![Page(1), Page(2), Page(3)]);
        assert!(select_window(1, 0, 3).is_empty());
    }

    #[test]
    fn first_page_has_no_leading_ellipsis() {
        assert_eq!(
            select_window(1, 10, 3),
            vec![Page(1), Page(2), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn last_page_has_no_trailing_ellipsis() {
        assert_eq!(
            select_window(10, 10, 3),
            vec![Page(1), Ellipsis, Page(9), Page(10)]
        );
    }

    #[test]
    fn ellipsis_is_suppressed_next_to_the_edges() {
        assert_eq!(
            select_window(3, 5, 3),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5)]
        );
        assert_eq!(
            select_window(2, 6, 3),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(6)]
        );
    }

    #[test]
    fn wider_windows() {
        assert_eq!(
            select_window(6, 20, 5),
            vec![
                Page(1),
                Ellipsis,
                Page(4),
                Page(5),
                Page(6),
                Page(7),
                Page(8),
                Ellipsis,
                Page(20)
            ]
        );
    }

    #[test]
    fn page_beyond_total_does_not_panic() {
        assert_eq!(select_window(15, 10, 3), vec![Page(1), Ellipsis]);
    }

    #[test]
    fn window_is_idempotent() {
        assert_eq!(page_window(4, 9, 3), page_window(4, 9, 3));
    }

    #[test]
    fn navigation_is_disabled_at_the_boundaries() {
        let w = page_window(1, 10, 3);
        assert!(!w.previous.enabled);
        assert!(w.next.enabled);
        assert_eq!(w.next.target, 2);

        let w = page_window(10, 10, 3);
        assert!(w.previous.enabled);
        assert_eq!(w.previous.target, 9);
        assert!(!w.next.enabled);

        let w = page_window(1, 0, 3);
        assert!(!w.previous.enabled);
        assert!(!w.next.enabled);
    }

    #[test]
    fn previous_targets_the_last_page_when_past_the_end() {
        let w = page_window(5, 2, 3);
        assert!(w.previous.enabled);
        assert_eq!(w.previous.target, 2);
        assert!(!w.next.enabled);

        let w = page_window(3, 0, 3);
        assert_eq!(w.previous.target, 1);
    }

    #[test]
    fn current_page_is_marked() {
        let w = page_window(5, 10, 3);
        assert!(w.is_current(Page(5)));
        assert!(!w.is_current(Page(4)));
        assert!(!w.is_current(Ellipsis));
    }
}

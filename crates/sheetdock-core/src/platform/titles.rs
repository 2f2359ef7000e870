/// Window-title matching — pure, testable, and explicitly heuristic.
///
/// Documents are matched to OS windows by substring containment of the
/// display name in the window title, preferring an exact trailing-suffix
/// match (`"<name> - Excel"`) when several candidates share a prefix.
/// Two open documents with the same display name (same filename from two
/// folders) cannot be told apart by title; the tie-break is window z-order
/// (front-most at enumeration time wins), and every handle is assigned at
/// most once per scan so the loser falls through to the next candidate.
use std::collections::HashSet;

/// One top-level window as captured during enumeration. The position in the
/// enumeration vec is the z-order: index 0 is the front-most window.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub handle: isize,
    pub title: String,
}

/// Pick the window for `display_name`, skipping handles already assigned to
/// another document in this scan.
pub fn match_window(
    display_name: &str,
    windows: &[WindowInfo],
    taken: &HashSet<isize>,
    suffix: &str,
) -> Option<isize> {
    if display_name.is_empty() {
        return None;
    }

    let exact = format!("{display_name}{suffix}");

    // First pass: exact "<name><suffix>" titles, front-most first.
    if let Some(w) = windows
        .iter()
        .find(|w| !taken.contains(&w.handle) && w.title == exact)
    {
        return Some(w.handle);
    }

    // Second pass: plain substring containment, front-most first.
    windows
        .iter()
        .find(|w| !taken.contains(&w.handle) && w.title.contains(display_name))
        .map(|w| w.handle)
}

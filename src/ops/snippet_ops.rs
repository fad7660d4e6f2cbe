use crate::types::snippet::{Snippet, SnippetId};

/// Cuts a snippet at the given tick, returning the two halves if the cut is valid.
/// The left half keeps the original id; the right half takes `right_id`.
/// Returns None if the tick is not strictly inside the snippet.
pub fn cut_snippet_at(snippet: &Snippet, tick: i32, right_id: SnippetId) -> Option<(Snippet, Snippet)> {
    if tick <= snippet.start_tick || tick >= snippet.end_tick() {
        return None;
    }

    let offset = (tick - snippet.start_tick) as usize;
    let mut left = snippet.clone();
    let tail = left.split_off_inputs(offset);

    let mut right = Snippet::from_inputs(right_id, tick, tail);
    right.is_active = snippet.is_active;
    right.layer = snippet.layer;

    Some((left, right))
}

/// Selected snippets on one track sorted by start tick, grouped into runs of
/// exactly adjacent snippets. Runs of one are dropped.
pub fn adjacent_runs(mut snippets: Vec<&Snippet>) -> Vec<Vec<SnippetId>> {
    snippets.sort_by_key(|s| (s.start_tick, s.id));
    let mut runs: Vec<Vec<SnippetId>> = Vec::new();
    let mut current: Vec<SnippetId> = Vec::new();
    let mut end = None;
    for s in snippets {
        if end == Some(s.start_tick) {
            current.push(s.id);
        } else {
            if current.len() > 1 {
                runs.push(std::mem::take(&mut current));
            }
            current = vec![s.id];
        }
        end = Some(s.end_tick());
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}

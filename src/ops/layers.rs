use log::warn;

use crate::types::snippet::{MAX_SNIPPET_LAYERS, Snippet, SnippetId};

/// Anything that occupies a tick range on a track and can be stacked.
pub trait LayerSpan {
    fn span_id(&self) -> SnippetId;
    fn span_start(&self) -> i32;
    fn span_end(&self) -> i32;
    fn span_layer(&self) -> u8;
    fn set_span_layer(&mut self, layer: u8);
}

impl LayerSpan for Snippet {
    fn span_id(&self) -> SnippetId {
        self.id
    }
    fn span_start(&self) -> i32 {
        self.start_tick
    }
    fn span_end(&self) -> i32 {
        self.end_tick()
    }
    fn span_layer(&self) -> u8 {
        self.layer
    }
    fn set_span_layer(&mut self, layer: u8) {
        self.layer = layer;
    }
}

/// Lightweight stand-in for a snippet, used for drag previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanPreview {
    pub id: SnippetId,
    pub start: i32,
    pub end: i32,
    pub layer: u8,
}

impl SpanPreview {
    pub fn of(snippet: &Snippet) -> Self {
        SpanPreview {
            id: snippet.id,
            start: snippet.start_tick,
            end: snippet.end_tick(),
            layer: snippet.layer,
        }
    }
}

impl LayerSpan for SpanPreview {
    fn span_id(&self) -> SnippetId {
        self.id
    }
    fn span_start(&self) -> i32 {
        self.start
    }
    fn span_end(&self) -> i32 {
        self.end
    }
    fn span_layer(&self) -> u8 {
        self.layer
    }
    fn set_span_layer(&mut self, layer: u8) {
        self.layer = layer;
    }
}

fn spans_overlap<S: LayerSpan>(a: &S, b: &S) -> bool {
    a.span_start() < b.span_end() && b.span_start() < a.span_end()
}

/// Greedy interval colouring: walk spans by start tick and give each the lowest
/// layer not used by an overlapping span already placed. Uses exactly as many
/// layers as the deepest overlap.
///
/// Ties on start tick are broken by id so repeated calls over differently ordered
/// slices agree. The slice itself is not reordered.
pub fn solve_snippet_layers<S: LayerSpan>(spans: &mut [S]) {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by_key(|&i| (spans[i].span_start(), spans[i].span_id()));

    let mut placed: Vec<usize> = Vec::with_capacity(spans.len());
    for &i in &order {
        let mut used: Vec<u8> = placed
            .iter()
            .filter(|&&j| spans_overlap(&spans[i], &spans[j]))
            .map(|&j| spans[j].span_layer())
            .collect();
        used.sort_unstable();
        used.dedup();

        let mut layer = 0u8;
        for u in used {
            if u == layer {
                layer += 1;
            } else if u > layer {
                break;
            }
        }
        if layer >= MAX_SNIPPET_LAYERS {
            warn!(
                "snippet {} stacked on layer {} (max {})",
                spans[i].span_id(),
                layer,
                MAX_SNIPPET_LAYERS
            );
        }
        spans[i].set_span_layer(layer);
        placed.push(i);
    }
}

/// Lowest layer free over `[start, end)` among `spans`, ignoring `exclude`.
pub fn find_available_layer<S: LayerSpan>(
    spans: &[S],
    start: i32,
    end: i32,
    exclude: Option<SnippetId>,
) -> Option<u8> {
    (0..MAX_SNIPPET_LAYERS).find(|&layer| {
        !spans.iter().any(|s| {
            Some(s.span_id()) != exclude
                && s.span_layer() == layer
                && s.span_start() < end
                && start < s.span_end()
        })
    })
}

/// Number of visual sub-lanes needed for `[start, end)`: one more than the highest
/// layer of any overlapping snippet, and at least one.
pub fn stack_size(snippets: &[Snippet], start: i32, end: i32) -> usize {
    snippets
        .iter()
        .filter(|s| s.overlaps(start, end))
        .map(|s| s.layer as usize + 1)
        .max()
        .unwrap_or(1)
}

/// True if no two overlapping spans share a layer.
pub fn layers_are_disjoint<S: LayerSpan>(spans: &[S]) -> bool {
    spans.iter().enumerate().all(|(i, a)| {
        spans[i + 1..]
            .iter()
            .all(|b| a.span_layer() != b.span_layer() || !spans_overlap(a, b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn span(id: u32, start: i32, end: i32) -> SpanPreview {
        SpanPreview {
            id: SnippetId(id),
            start,
            end,
            layer: 0,
        }
    }

    #[test]
    fn test_three_overlapping_use_three_layers() {
        let mut spans = vec![span(1, 50, 150), span(2, 90, 110), span(3, 100, 101)];
        solve_snippet_layers(&mut spans);
        let mut layers: Vec<u8> = spans.iter().map(|s| s.layer).collect();
        layers.sort();
        assert_eq!(layers, vec![0, 1, 2]);
    }

    #[test]
    fn test_adjacent_spans_share_layer() {
        let mut spans = vec![span(2, 100, 200), span(1, 0, 100)];
        solve_snippet_layers(&mut spans);
        assert_eq!(spans[0].layer, 0);
        assert_eq!(spans[1].layer, 0);
    }

    #[test]
    fn test_gap_is_reused() {
        // 1 and 2 overlap, 3 starts after 1 ends but overlaps 2.
        let mut spans = vec![span(1, 0, 10), span(2, 5, 30), span(3, 12, 20)];
        solve_snippet_layers(&mut spans);
        assert_eq!(spans[0].layer, 0);
        assert_eq!(spans[1].layer, 1);
        assert_eq!(spans[2].layer, 0);
    }

    #[test]
    fn test_ties_broken_by_id_regardless_of_slice_order() {
        let mut a = vec![span(1, 0, 10), span(2, 0, 10)];
        let mut b = vec![span(2, 0, 10), span(1, 0, 10)];
        solve_snippet_layers(&mut a);
        solve_snippet_layers(&mut b);
        assert_eq!(a[0].layer, b[1].layer);
        assert_eq!(a[1].layer, b[0].layer);
        assert_eq!(a[0].layer, 0);
    }

    #[test]
    fn test_find_available_layer_exhaustion() {
        let snippets: Vec<Snippet> = (0..MAX_SNIPPET_LAYERS)
            .map(|layer| {
                let mut s = Snippet::new(SnippetId(layer as u32 + 1), 0, 100);
                s.layer = layer;
                s
            })
            .collect();
        assert_eq!(find_available_layer(&snippets, 10, 20, None), None);
        assert_eq!(find_available_layer(&snippets, 100, 120, None), Some(0));
        assert_eq!(
            find_available_layer(&snippets, 10, 20, Some(SnippetId(4))),
            Some(3)
        );
    }

    #[test]
    fn test_stack_size() {
        let mut a = Snippet::new(SnippetId(1), 0, 100);
        a.layer = 0;
        let mut b = Snippet::new(SnippetId(2), 50, 100);
        b.layer = 2;
        let snippets = vec![a, b];
        assert_eq!(stack_size(&snippets, 0, 40), 1);
        assert_eq!(stack_size(&snippets, 0, 60), 3);
        assert_eq!(stack_size(&snippets, 500, 600), 1);
    }

    proptest! {
        #[test]
        fn prop_solver_is_disjoint_and_minimal(
            ranges in prop::collection::vec((0i32..300, 1i32..80), 0..24)
        ) {
            let mut spans: Vec<SpanPreview> = ranges
                .iter()
                .enumerate()
                .map(|(i, &(start, len))| span(i as u32, start, start + len))
                .collect();
            solve_snippet_layers(&mut spans);
            prop_assert!(layers_are_disjoint(&spans));

            let depth = (0..400)
                .map(|t| spans.iter().filter(|s| s.start <= t && t < s.end).count())
                .max()
                .unwrap_or(0);
            let used = spans.iter().map(|s| s.layer as usize + 1).max().unwrap_or(0);
            prop_assert_eq!(used, depth);
        }
    }
}

/// Candidate selection strategies.
///
/// A selector only chooses an index; callers bounds-check the result, so a
/// selector returning something outside `0..count` means "no candidate".

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::node::ValueCandidate;

/// Picks one of `count` candidates.
pub trait CandidateSelector {
    fn pick(&mut self, count: usize, rng: &mut StdRng) -> usize;
}

/// Shared handle to a selector. Cloning shares the selector state, so a
/// shuffle-bag keeps its position no matter which copy of a node picks.
#[derive(Clone)]
pub struct Selector(Rc<RefCell<dyn CandidateSelector>>);

impl Selector {
    pub fn new<S: CandidateSelector + 'static>(selector: S) -> Self {
        Selector(Rc::new(RefCell::new(selector)))
    }

    /// Wrap a selector the host keeps a handle to, e.g. to inspect its state.
    pub fn shared<S: CandidateSelector + 'static>(selector: Rc<RefCell<S>>) -> Self {
        Selector(selector)
    }

    pub fn pick(&self, count: usize, rng: &mut StdRng) -> usize {
        self.0.borrow_mut().pick(count, rng)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Selector")
    }
}

/// Selectors carry runtime state, not structure; node equality ignores them.
impl PartialEq for Selector {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Always the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickFirst;

impl CandidateSelector for PickFirst {
    fn pick(&mut self, _count: usize, _rng: &mut StdRng) -> usize {
        0
    }
}

/// Shuffle-bag: every index is handed out exactly once per `count` picks.
#[derive(Debug, Clone, Default)]
pub struct UniformSelector {
    order: Vec<usize>,
    cursor: usize,
}

impl UniformSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CandidateSelector for UniformSelector {
    fn pick(&mut self, count: usize, rng: &mut StdRng) -> usize {
        if count == 0 {
            return 0;
        }
        if self.order.len() != count || self.cursor >= self.order.len() {
            self.order = (0..count).collect();
            self.order.shuffle(rng);
            self.cursor = 0;
        }
        let index = self.order[self.cursor];
        self.cursor += 1;
        index
    }
}

/// Samples in proportion to integer weights.
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    index: Option<WeightedIndex<u32>>,
}

impl WeightedSelector {
    /// All-zero or empty weights produce a selector that never picks.
    pub fn new(weights: &[u32]) -> Self {
        Self {
            index: WeightedIndex::new(weights.iter().copied()).ok(),
        }
    }
}

impl CandidateSelector for WeightedSelector {
    fn pick(&mut self, count: usize, rng: &mut StdRng) -> usize {
        match &self.index {
            Some(index) => index.sample(rng),
            None => count,
        }
    }
}

/// The default selector for a candidate list.
pub fn selector_for(values: &[ValueCandidate]) -> Selector {
    if values.len() == 1 {
        Selector::new(PickFirst)
    } else if values.iter().any(ValueCandidate::has_weight) {
        let weights: Vec<u32> = values.iter().map(ValueCandidate::weight).collect();
        Selector::new(WeightedSelector::new(&weights))
    } else {
        Selector::new(UniformSelector::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::Node;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn pick_first_is_zero() {
        let mut rng = rng();
        assert_eq!(PickFirst.pick(5, &mut rng), 0);
    }

    #[test]
    fn shuffle_bag_covers_every_index_per_block() {
        let mut rng = rng();
        let mut selector = UniformSelector::new();
        for _ in 0..10 {
            let mut block: Vec<usize> = (0..4).map(|_| selector.pick(4, &mut rng)).collect();
            block.sort();
            assert_eq!(block, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn shuffle_bag_resets_when_count_changes() {
        let mut rng = rng();
        let mut selector = UniformSelector::new();
        selector.pick(3, &mut rng);
        for _ in 0..20 {
            assert!(selector.pick(2, &mut rng) < 2);
        }
    }

    #[test]
    fn weighted_never_picks_zero_weight() {
        let mut rng = rng();
        let mut selector = WeightedSelector::new(&[0, 3, 0]);
        for _ in 0..100 {
            assert_eq!(selector.pick(3, &mut rng), 1);
        }
    }

    #[test]
    fn all_zero_weights_pick_out_of_range() {
        let mut rng = rng();
        let mut selector = WeightedSelector::new(&[0, 0]);
        assert_eq!(selector.pick(2, &mut rng), 2);
    }

    #[test]
    fn shared_handle_keeps_state() {
        let mut rng = rng();
        let selector = Selector::new(UniformSelector::new());
        let copy = selector.clone();
        let mut seen = vec![selector.pick(2, &mut rng), copy.pick(2, &mut rng)];
        seen.sort();
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn default_selector_choice() {
        let mut rng = rng();
        let single = vec![ValueCandidate::new(vec![Node::text("a")])];
        assert_eq!(selector_for(&single).pick(1, &mut rng), 0);

        let weighted = vec![
            ValueCandidate::new(vec![Node::text("a"), Node::Weight(0)]),
            ValueCandidate::new(vec![Node::text("b")]),
        ];
        let selector = selector_for(&weighted);
        for _ in 0..50 {
            assert_eq!(selector.pick(2, &mut rng), 1);
        }
    }
}

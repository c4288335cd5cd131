//! Fixed-capacity record streams and the filter / map / reduce stages over them.
//!
//! A stream always holds exactly `N` slots. Real entries and padding differ only in their
//! liveness flag, and every stage touches every slot: control flow never depends on how many
//! slots are live. Dead slots are handled by selection (`live ? new : old`), the same way the
//! circuit in [`crate::circuit`] handles them.

use crate::errors::StreamError;
use crate::field::Uint248;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataStream<T, const N: usize> {
    slots: Vec<T>,
    live: Vec<bool>,
}

impl<T, const N: usize> DataStream<T, N> {
    /// Build from exactly `N` slots and their liveness flags.
    pub fn new(slots: Vec<T>, live: Vec<bool>) -> Result<Self, StreamError> {
        if slots.len() != N {
            return Err(StreamError::LengthMismatch { expected: N, got: slots.len() });
        }
        if live.len() != N {
            return Err(StreamError::LengthMismatch { expected: N, got: live.len() });
        }
        Ok(Self { slots, live })
    }

    /// Live records first, then default padding marked dead.
    pub fn from_live(records: Vec<T>) -> Result<Self, StreamError>
    where
        T: Default,
    {
        let got = records.len();
        if got > N {
            return Err(StreamError::CapacityExceeded { capacity: N, got });
        }
        let mut slots = records;
        slots.resize_with(N, T::default);
        let live = (0..N).map(|i| i < got).collect();
        Ok(Self { slots, live })
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn get(&self, index: usize) -> Option<(&T, bool)> {
        self.slots.get(index).map(|slot| (slot, self.live[index]))
    }

    /// Slots in order, paired with their liveness.
    pub fn iter(&self) -> impl Iterator<Item = (&T, bool)> {
        self.slots.iter().zip(self.live.iter().copied())
    }

    pub fn slots(&self) -> &[T] {
        &self.slots
    }

    pub fn liveness(&self) -> &[bool] {
        &self.live
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }

    /// New liveness = old liveness AND predicate. Length and order are preserved and liveness
    /// can only narrow.
    pub fn filter(self, predicate: impl Fn(&T) -> Uint248) -> Self {
        let live = self
            .slots
            .iter()
            .zip(self.live.iter())
            .map(|(slot, live)| Uint248::and(&[Uint248::from_bool(*live), predicate(slot)]).is_true())
            .collect();
        Self { slots: self.slots, live }
    }

    /// Per-slot projection. Dead slots project to `U::default()` so they stay inert in any
    /// later fold.
    pub fn map<U: Default>(&self, transform: impl Fn(&T) -> U) -> DataStream<U, N> {
        let slots = self
            .iter()
            .map(|(slot, live)| {
                let projected = transform(slot);
                if live { projected } else { U::default() }
            })
            .collect();
        DataStream { slots, live: self.live.clone() }
    }

    /// Fold in slot order. The step runs on every slot; its result, error included, is kept only
    /// for live slots.
    pub fn reduce<A, E>(&self, init: A, step: impl Fn(&A, &T) -> Result<A, E>) -> Result<A, E> {
        let mut acc = init;
        for (slot, live) in self.iter() {
            let next = step(&acc, slot);
            if live {
                acc = next?;
            }
        }
        Ok(acc)
    }

    /// Infallible [`DataStream::reduce`].
    pub fn fold<A>(&self, init: A, step: impl Fn(&A, &T) -> A) -> A {
        let mut acc = init;
        for (slot, live) in self.iter() {
            let next = step(&acc, slot);
            if live {
                acc = next;
            }
        }
        acc
    }
}

impl<const N: usize> DataStream<Uint248, N> {
    /// Number of live slots, computed as a fold of the constant 1.
    pub fn count(&self) -> Uint248 {
        self.map(|_| Uint248::one()).fold(Uint248::zero(), |acc, one| acc.add(*one))
    }

    pub fn sum(&self) -> Uint248 {
        self.fold(Uint248::zero(), |acc, v| acc.add(*v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn values<const N: usize>(vals: &[u64]) -> DataStream<Uint248, N> {
        DataStream::from_live(vals.iter().map(|v| Uint248::from_u64(*v)).collect()).unwrap()
    }

    #[test]
    fn from_live_pads_and_rejects_overflow() {
        let s = values::<4>(&[1, 2]);
        assert_eq!(s.capacity(), 4);
        assert_eq!(s.liveness(), &[true, true, false, false]);
        assert_eq!(s.get(3), Some((&Uint248::zero(), false)));

        let err = DataStream::<Uint248, 2>::from_live(vec![Uint248::one(); 3]).unwrap_err();
        assert_eq!(err, StreamError::CapacityExceeded { capacity: 2, got: 3 });
    }

    #[test]
    fn new_checks_lengths() {
        assert!(DataStream::<u8, 2>::new(vec![1, 2], vec![true]).is_err());
        assert!(DataStream::<u8, 2>::new(vec![1], vec![true, true]).is_err());
    }

    #[test]
    fn map_zeroes_dead_slots() {
        let s = DataStream::<Uint248, 3>::new(
            vec![Uint248::from_u64(4), Uint248::from_u64(5), Uint248::from_u64(6)],
            vec![true, false, true],
        )
        .unwrap();
        let doubled = s.map(|v| v.mul(Uint248::from_u64(2)));
        assert_eq!(doubled.slots()[1], Uint248::zero());
        assert_eq!(doubled.slots()[2], Uint248::from_u64(12));
        assert_eq!(doubled.sum(), Uint248::from_u64(20));
        assert_eq!(doubled.count(), Uint248::from_u64(2));
    }

    #[test]
    fn reduce_skips_dead_slots() {
        let s = DataStream::<Uint248, 3>::new(
            vec![Uint248::from_u64(1), Uint248::from_u64(100), Uint248::from_u64(2)],
            vec![true, false, true],
        )
        .unwrap();
        let r: Result<Uint248, ()> = s.reduce(Uint248::zero(), |acc, v| Ok(acc.add(*v)));
        assert_eq!(r.unwrap(), Uint248::from_u64(3));
    }

    #[test]
    fn reduce_ignores_errors_from_dead_slots() {
        let s = DataStream::<u64, 3>::new(vec![1, 0, 2], vec![true, false, true]).unwrap();
        let step = |acc: &u64, v: &u64| if *v == 0 { Err("zero") } else { Ok(acc + v) };
        assert_eq!(s.reduce(0, step), Ok(3));

        let s = DataStream::<u64, 3>::new(vec![1, 0, 2], vec![true, true, true]).unwrap();
        assert_eq!(s.reduce(0, step), Err("zero"));
    }

    proptest! {
        #[test]
        fn filter_never_widens_liveness(
            vals in prop::collection::vec(0u64..50, 8),
            live in prop::collection::vec(any::<bool>(), 8),
            threshold in 0u64..50,
        ) {
            let slots = vals.iter().map(|v| Uint248::from_u64(*v)).collect();
            let s = DataStream::<Uint248, 8>::new(slots, live.clone()).unwrap();
            let filtered = s.filter(|v| Uint248::from_bool(v.to_u64().unwrap_or(0) >= threshold));
            prop_assert_eq!(filtered.capacity(), 8);
            for (before, after) in live.iter().zip(filtered.liveness()) {
                prop_assert!(!*after || *before);
            }
        }
    }
}

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

/// Source of randomness for game generation, reply selection and nudges.
pub trait Dice: Send + Sync {
    /// Uniform index in `0..len`. `len` is never zero.
    fn index(&self, len: usize) -> usize;

    /// Uniform integer in `lo..=hi`.
    fn between(&self, lo: i64, hi: i64) -> i64;

    /// True with probability `p`.
    fn chance(&self, p: f64) -> bool;
}

/// Thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDice;

impl Dice for ThreadDice {
    fn index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }

    fn between(&self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        rand::thread_rng().gen_range(lo..=hi)
    }

    fn chance(&self, p: f64) -> bool {
        rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Replays a fixed sequence of values, for reproducible conversations.
///
/// Every call consumes the next value. `between` returns it verbatim
/// (no clamping, so callers can force any operand), `index` reduces it
/// modulo `len`, and `chance` is true for any non-zero value. Once the
/// sequence is exhausted: `index` gives 0, `between` gives `lo`, `chance`
/// gives false.
#[derive(Debug, Default)]
pub struct SequenceDice {
    values: Mutex<VecDeque<i64>>,
}

impl SequenceDice {
    pub fn new(values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn next(&self) -> Option<i64> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

impl Dice for SequenceDice {
    fn index(&self, len: usize) -> usize {
        match self.next() {
            Some(v) if len > 0 => v.rem_euclid(len as i64) as usize,
            _ => 0,
        }
    }

    fn between(&self, lo: i64, _hi: i64) -> i64 {
        self.next().unwrap_or(lo)
    }

    fn chance(&self, _p: f64) -> bool {
        self.next().map(|v| v != 0).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_dice_stays_in_range() {
        let dice = ThreadDice;
        for _ in 0..200 {
            let v = dice.between(10, 99);
            assert!((10..=99).contains(&v));
            assert!(dice.index(3) < 3);
        }
        assert!(!dice.chance(0.0));
        assert!(dice.chance(1.0));
    }

    #[test]
    fn sequence_dice_replays_in_order() {
        let dice = SequenceDice::new([100, 71, 4, 1]);
        assert_eq!(dice.between(10, 99), 100);
        assert_eq!(dice.between(10, 99), 71);
        assert_eq!(dice.index(3), 1);
        assert!(dice.chance(0.2));
        assert_eq!(dice.remaining(), 0);
        assert_eq!(dice.between(1, 10), 1);
        assert_eq!(dice.index(5), 0);
        assert!(!dice.chance(0.9));
    }
}

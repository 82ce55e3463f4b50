//! Clamped numeric controls.
//!
//! Every user-adjustable setting (velocity, measure counts, subdivision,
//! tempo) lives inside one of these wrappers. Out-of-range requests clamp to
//! the nearest bound instead of failing or wrapping.

use serde::{Deserialize, Serialize};

/// An integer setting confined to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedInt {
    value: i32,
    min: i32,
    max: i32,
    default: i32,
}

impl BoundedInt {
    /// Creates a control. The starting value is clamped and remembered as
    /// the value `reset` returns to.
    pub fn new(value: i32, min: i32, max: i32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let value = value.clamp(min, max);
        Self {
            value,
            min,
            max,
            default: value,
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn set(&mut self, value: i32) -> i32 {
        self.value = value.clamp(self.min, self.max);
        self.value
    }

    pub fn add(&mut self, amount: i32) -> i32 {
        self.set(self.value.saturating_add(amount))
    }

    pub fn subtract(&mut self, amount: i32) -> i32 {
        self.set(self.value.saturating_sub(amount))
    }

    pub fn times_two(&mut self) -> i32 {
        self.set(self.value.saturating_mul(2))
    }

    pub fn div_two(&mut self) -> i32 {
        self.set(self.value / 2)
    }

    /// Steps by `amount` in the direction of `delta` (positive adds).
    pub fn step(&mut self, delta: i32, amount: i32) -> i32 {
        if delta > 0 {
            self.add(amount)
        } else if delta < 0 {
            self.subtract(amount)
        } else {
            self.value
        }
    }

    pub fn reset(&mut self) {
        self.value = self.default;
    }
}

/// A floating-point setting confined to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedFloat {
    value: f32,
    min: f32,
    max: f32,
    default: f32,
}

impl BoundedFloat {
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let value = value.clamp(min, max);
        Self {
            value,
            min,
            max,
            default: value,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set(&mut self, value: f32) -> f32 {
        self.value = value.clamp(self.min, self.max);
        self.value
    }

    pub fn add(&mut self, amount: f32) -> f32 {
        self.set(self.value + amount)
    }

    pub fn subtract(&mut self, amount: f32) -> f32 {
        self.set(self.value - amount)
    }

    pub fn reset(&mut self) {
        self.value = self.default;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_clamps_at_max() {
        let mut velocity = BoundedInt::new(125, 1, 127);
        assert_eq!(velocity.add(10), 127);
        assert_eq!(velocity.value(), 127);
    }

    #[test]
    fn test_subtract_clamps_at_min() {
        let mut count = BoundedInt::new(2, 1, 100);
        assert_eq!(count.subtract(5), 1);
    }

    #[test]
    fn test_doubling_and_halving() {
        let mut subdivision = BoundedInt::new(16, 4, 64);
        assert_eq!(subdivision.times_two(), 32);
        assert_eq!(subdivision.times_two(), 64);
        assert_eq!(subdivision.times_two(), 64);
        subdivision.set(5);
        assert_eq!(subdivision.div_two(), 4);
    }

    #[test]
    fn test_reset_and_initial_clamp() {
        let mut tempo = BoundedInt::new(400, 20, 300);
        assert_eq!(tempo.value(), 300);
        tempo.subtract(100);
        tempo.reset();
        assert_eq!(tempo.value(), 300);
    }

    #[test]
    fn test_float_clamps() {
        let mut saturation = BoundedFloat::new(0.95, 0.0, 1.0);
        assert_eq!(saturation.add(0.1), 1.0);
        assert_eq!(saturation.set(-3.0), 0.0);
        saturation.reset();
        assert!((saturation.value() - 0.95).abs() < f32::EPSILON);
    }
}

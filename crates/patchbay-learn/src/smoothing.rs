//! One-pole smoothing for mapped controller values.

/// Smooths a stream of mapped values with a [`CCMapping::smoothing`](crate::CCMapping) factor.
///
/// `factor = 0` passes values through; values close to 1 react slowly.
#[derive(Debug, Clone, Copy)]
pub struct ValueSmoother {
    factor: f32,
    current: Option<f32>,
}

impl ValueSmoother {
    pub fn new(factor: f32) -> Self {
        Self {
            factor: factor.clamp(0.0, 0.999),
            current: None,
        }
    }

    /// Feeds a target value and returns the smoothed output. The first value
    /// is passed through unchanged.
    #[inline]
    pub fn next(&mut self, target: f32) -> f32 {
        let value = match self.current {
            Some(current) => current + (1.0 - self.factor) * (target - current),
            None => target,
        };
        self.current = Some(value);
        value
    }

    pub fn current(&self) -> Option<f32> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

//! Volatility forecast over the most recent proven std values.
//!
//! A fixed linear model: `|Σ coef_i · history_i| / TICK_SCALE`, history oldest first. Until the
//! window was already full before an observation arrives, that observation is echoed back, so the
//! model first applies on the `FORECAST_WINDOW + 1`-th push.

use crate::constants::{FORECAST_COEFFICIENTS, FORECAST_WINDOW, TICK_SCALE};
use crate::errors::ArithmeticError;
use crate::field::Uint248;
use num_bigint::{BigInt, Sign};
use std::collections::VecDeque;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VolatilityForecaster {
    history: VecDeque<Uint248>,
}

impl VolatilityForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored observations, oldest first. Only the last window is kept.
    pub fn from_history(values: impl IntoIterator<Item = Uint248>) -> Self {
        let mut f = Self::new();
        for v in values {
            f.observe(v);
        }
        f
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn observe(&mut self, std: Uint248) {
        if self.history.len() == FORECAST_WINDOW {
            self.history.pop_front();
        }
        self.history.push_back(std);
    }

    /// Record `std` and return the forecast including it, or `std` itself while the window
    /// is still filling.
    pub fn push(&mut self, std: Uint248) -> Result<Uint248, ArithmeticError> {
        let was_full = self.history.len() == FORECAST_WINDOW;
        self.observe(std);
        if !was_full {
            return Ok(std);
        }
        self.forecast().map(|f| f.unwrap_or(std))
    }

    pub fn forecast(&self) -> Result<Option<Uint248>, ArithmeticError> {
        let Some(newest) = self.history.back() else {
            return Ok(None);
        };
        if self.history.len() < FORECAST_WINDOW {
            return Ok(Some(*newest));
        }

        let prediction: BigInt = self
            .history
            .iter()
            .zip(FORECAST_COEFFICIENTS)
            .map(|(v, coef)| BigInt::from(coef) * BigInt::from_biguint(Sign::Plus, v.to_biguint()))
            .sum();
        let scaled = prediction.magnitude() / TICK_SCALE;
        Uint248::from_be_bytes(&scaled.to_bytes_be()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_until_window_full() {
        let mut f = VolatilityForecaster::new();
        assert_eq!(f.forecast().unwrap(), None);
        for i in 1..FORECAST_WINDOW as u64 {
            assert_eq!(f.push(Uint248::from_u64(i * 10)).unwrap(), Uint248::from_u64(i * 10));
        }
    }

    #[test]
    fn model_starts_after_the_window_fills() {
        let mut f = VolatilityForecaster::new();
        let mut last = Uint248::zero();
        for i in 1..=FORECAST_WINDOW as u64 {
            last = f.push(Uint248::from_u64(i * 1000)).unwrap();
        }
        assert_eq!(f.len(), FORECAST_WINDOW);
        assert_eq!(last, Uint248::from_u64(FORECAST_WINDOW as u64 * 1000));

        let next = Uint248::from_u64((FORECAST_WINDOW as u64 + 1) * 1000);
        let predicted = f.push(next).unwrap();
        assert_eq!(Some(predicted), f.forecast().unwrap());
    }

    #[test]
    fn applies_linear_model_once_full() {
        let f = VolatilityForecaster::from_history((0..FORECAST_WINDOW).map(|_| Uint248::from_u64(TICK_SCALE)));
        let expected: i64 = FORECAST_COEFFICIENTS.iter().sum();
        assert_eq!(f.len(), FORECAST_WINDOW);
        assert_eq!(f.forecast().unwrap(), Some(Uint248::from_u64(expected.unsigned_abs())));
    }

    #[test]
    fn keeps_only_the_last_window() {
        let f = VolatilityForecaster::from_history((0..50u64).map(Uint248::from_u64));
        assert_eq!(f.len(), FORECAST_WINDOW);
        assert_eq!(f.history.front(), Some(&Uint248::from_u64(30)));
    }
}

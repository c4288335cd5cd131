//! Ordered, width-tagged outputs handed to the proof system.
//!
//! The order of pushes and each value's width are the public interface of a circuit.

use crate::errors::PipelineError;
use crate::field::Uint248;
use crate::types::OutputValue;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputSink {
    values: Vec<OutputValue>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` with a `bits`-wide public slot. Rejects values that do not fit.
    pub fn output_uint(&mut self, bits: u16, value: Uint248) -> Result<(), PipelineError> {
        if !value.fits_bits(bits as usize) {
            return Err(PipelineError::OutputOverflow { index: self.values.len(), bits });
        }
        self.values.push(OutputValue { value, bits });
        Ok(())
    }

    pub fn values(&self) -> &[OutputValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<OutputValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_rejects_wide_values() {
        let mut sink = OutputSink::new();
        sink.output_uint(248, Uint248::from_u64(3)).unwrap();
        sink.output_uint(64, Uint248::from_u64(u64::MAX)).unwrap();
        let too_wide = Uint248::from_u64(u64::MAX).add(Uint248::one());
        assert_eq!(
            sink.output_uint(64, too_wide),
            Err(PipelineError::OutputOverflow { index: 2, bits: 64 })
        );
        let bits: Vec<u16> = sink.values().iter().map(|v| v.bits).collect();
        assert_eq!(bits, vec![248, 64]);
        assert_eq!(sink.into_values()[0].value, Uint248::from_u64(3));
    }
}

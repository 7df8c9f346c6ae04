use std::sync::Arc;

// -------------------------------------------------------------------------------------------------

/// A single-cycle wavetable oscillator with fractional-index linear interpolation.
///
/// Oscillators share their waveform table via an `Arc`, so an entire bank reading the
/// same loaded recording costs one table. The fractional read index advances by
/// `hz * table_len / sample_rate` per sample and wraps by subtraction, which keeps the
/// fractional remainder intact across cycles.
#[derive(Debug, Clone)]
pub struct WavetableOscillator {
    table: Arc<Vec<f32>>,
    phase: f64,
    increment: f64,
}

impl WavetableOscillator {
    /// Create a new oscillator reading from the given shared table.
    ///
    /// The oscillator is silent (holds a value) until a frequency is set.
    pub fn new(table: Arc<Vec<f32>>) -> Self {
        Self {
            table,
            phase: 0.0,
            increment: 0.0,
        }
    }

    /// Number of samples in the oscillator's waveform table.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Set the oscillator's frequency for the given output sample rate.
    ///
    /// A frequency of 0 Hz degenerates to holding the current table value.
    pub fn set_frequency(&mut self, hz: f32, sample_rate: u32) {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        self.increment = hz as f64 * self.table.len() as f64 / sample_rate as f64;
    }

    /// Produce the next output sample and advance the read index.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let table_len = self.table.len();
        if table_len == 0 {
            return 0.0;
        }

        let index = self.phase as usize;
        let fraction = (self.phase - index as f64) as f32;
        let current = self.table[index];
        // the bracketing entry wraps around to the table start at the boundary
        let next = if index + 1 < table_len {
            self.table[index + 1]
        } else {
            self.table[0]
        };
        let output = current + fraction * (next - current);

        self.phase += self.increment;
        let len = table_len as f64;
        if self.phase >= len {
            // one subtraction covers all increments below the table length; larger
            // increments (frequencies past the table rate) wrap with a modulo so the
            // deadline path never loops
            self.phase -= len;
            if self.phase >= len {
                self.phase %= len;
            }
        }

        output
    }
}

// -------------------------------------------------------------------------------------------------

//! Brown noise generation
//!
//! White noise is run through a first-order leaky integrator, which tilts the
//! spectrum down by roughly 6 dB per octave. The integrator loses a lot of
//! energy on the way, so the result is multiplied by a fixed makeup gain to
//! land at about the same perceived loudness as the white noise it came from.
//!
//! ```text
//! state[i] = (state[i-1] + k * white[i]) / (1 + k)
//! out[i]   = state[i] * MAKEUP_GAIN
//! ```
//!
//! The recurrence is stateful, so samples are produced strictly in order.

use std::sync::Arc;

use rand::Rng;

use super::AudioError;

/// Leaky integrator coefficient
pub const LEAK_COEFFICIENT: f64 = 0.02;

/// Makeup gain applied after filtering
pub const MAKEUP_GAIN: f64 = 3.5;

/// An immutable block of mono noise samples
///
/// Shared read-only with the audio thread through an `Arc`, and never
/// written to after generation.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl NoiseBuffer {
    /// The samples, in playback order
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate the buffer was generated for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Buffer length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Generate `duration_secs` of brown noise at `sample_rate`
///
/// # Arguments
/// * `sample_rate` - Must match the output device, otherwise playback is resampled
/// * `duration_secs` - Buffer length, must be finite and greater than zero
/// * `rng` - Uniform white noise source; a seeded source gives bit-identical output
///
/// # Errors
/// `AudioError::InvalidBuffer` when the rate or duration is unusable.
pub fn generate_buffer<R: Rng + ?Sized>(
    sample_rate: u32,
    duration_secs: f64,
    rng: &mut R,
) -> Result<NoiseBuffer, AudioError> {
    if sample_rate == 0 {
        return Err(AudioError::InvalidBuffer("sample rate is zero".to_string()));
    }
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(AudioError::InvalidBuffer(format!(
            "duration must be positive, got {}",
            duration_secs
        )));
    }

    let len = (sample_rate as f64 * duration_secs).round() as usize;
    if len == 0 {
        return Err(AudioError::InvalidBuffer(format!(
            "{}s at {}Hz is shorter than one sample",
            duration_secs, sample_rate
        )));
    }

    let mut samples = Vec::with_capacity(len);
    let mut state = 0.0f64;
    for _ in 0..len {
        let white: f64 = rng.random_range(-1.0..=1.0);
        state = (state + LEAK_COEFFICIENT * white) / (1.0 + LEAK_COEFFICIENT);
        samples.push((state * MAKEUP_GAIN) as f32);
    }

    log::debug!("Generated {} noise samples at {}Hz", len, sample_rate);

    Ok(NoiseBuffer {
        samples: samples.into(),
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_length_follows_rate_and_duration() {
        let mut rng = StdRng::seed_from_u64(1);
        let buffer = generate_buffer(48000, 2.0, &mut rng).unwrap();
        assert_eq!(buffer.len(), 96000);
        assert_eq!(buffer.sample_rate(), 48000);
        assert!((buffer.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_samples_stay_bounded() {
        // |state| can never exceed 1, so output never exceeds the makeup gain
        let mut rng = StdRng::seed_from_u64(7);
        let buffer = generate_buffer(44100, 10.0, &mut rng).unwrap();
        let limit = MAKEUP_GAIN as f32;
        assert!(buffer
            .samples()
            .iter()
            .all(|s| s.is_finite() && s.abs() <= limit));
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let a = generate_buffer(22050, 1.0, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = generate_buffer(22050, 1.0, &mut StdRng::seed_from_u64(42)).unwrap();
        let c = generate_buffer(22050, 1.0, &mut StdRng::seed_from_u64(43)).unwrap();

        let bits = |buf: &NoiseBuffer| buf.samples().iter().map(|s| s.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_ne!(bits(&a), bits(&c));
    }

    #[test]
    fn test_first_sample_follows_recurrence() {
        let mut reference = StdRng::seed_from_u64(9);
        let white: f64 = reference.random_range(-1.0..=1.0);
        let expected = (LEAK_COEFFICIENT * white / (1.0 + LEAK_COEFFICIENT) * MAKEUP_GAIN) as f32;

        let buffer = generate_buffer(8000, 0.5, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(buffer.samples()[0], expected);
    }

    #[test]
    fn test_spectrum_is_low_frequency_heavy() {
        // Neighbouring samples of brown noise are strongly correlated
        let buffer = generate_buffer(48000, 2.0, &mut StdRng::seed_from_u64(3)).unwrap();
        let s = buffer.samples();
        let mean = s.iter().map(|&x| x as f64).sum::<f64>() / s.len() as f64;
        let var: f64 = s.iter().map(|&x| (x as f64 - mean).powi(2)).sum();
        let cov: f64 = s
            .windows(2)
            .map(|w| (w[0] as f64 - mean) * (w[1] as f64 - mean))
            .sum();
        assert!(cov / var > 0.9);
    }

    #[test]
    fn test_rejects_bad_durations() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_buffer(48000, 0.0, &mut rng).is_err());
        assert!(generate_buffer(48000, -1.0, &mut rng).is_err());
        assert!(generate_buffer(48000, f64::NAN, &mut rng).is_err());
        assert!(generate_buffer(0, 1.0, &mut rng).is_err());
        assert!(generate_buffer(100, 0.001, &mut rng).is_err());
    }
}

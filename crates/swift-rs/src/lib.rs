//! # SWIFT-RS
//!
//! Sliding windowed infinite Fourier transform in Rust.
//!
//! ## Background
//!
//! The SWIFT represents the Fourier coefficient at sample `n` as a function
//! of the coefficient at sample `n-1`, under an exponentially decaying
//! window of time constant `tau`:
//!
//! ```text
//! Xf[n] = e * Xf[n-1] + x[n],    e = exp(2*pi*j*f/fs) * exp(-1/(tau*fs))
//! ```
//!
//! Each update costs one complex multiply-add, whatever the window length.
//! Since `|e| < 1` the accumulator stays bounded for any positive `tau`,
//! `f` and `fs`.
//!
//! The aSWIFT (alpha SWIFT) subtracts a fast SWIFT from a slow one. The
//! difference of the two exponential windows approximates a finite,
//! band-limited window of effective length `tau_s - tau_f`, which is what
//! the phase-locked stimulation controller tracks.

use bgtcs_core::{BgtcsError, Frequency, Result, Time};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

fn check_positive(name: &str, value: f64) -> Result<()> {
    // also rejects NaN
    if !(value > 0.0) || !value.is_finite() {
        return Err(BgtcsError::InvalidParameter(format!(
            "{} must be > 0 (got {})",
            name, value
        )));
    }
    Ok(())
}

/// Single exponential-window SWIFT accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swift {
    /// Window time constant (s)
    tau: Time,
    /// Center frequency (Hz)
    f: Frequency,
    /// Sampling frequency (Hz)
    fs: Frequency,
    /// Time constant in samples
    ntau: f64,
    /// Per-sample rotation and decay
    e: Complex64,
    /// Accumulator
    xf: Complex64,
}

impl Swift {
    /// Create a new SWIFT at center frequency `f`
    pub fn new(tau: Time, f: Frequency, fs: Frequency) -> Result<Self> {
        check_positive("fs", fs)?;
        check_positive("tau", tau)?;
        check_positive("f", f)?;

        let ntau = tau * fs;
        let e = Complex64::from_polar(1.0, 2.0 * PI * f / fs) * (-1.0 / ntau).exp();

        Ok(Self {
            tau,
            f,
            fs,
            ntau,
            e,
            xf: Complex64::new(0.0, 0.0),
        })
    }

    /// Slide forward one sample
    #[inline]
    pub fn slide<X: Into<Complex64>>(&mut self, x: X) -> Complex64 {
        self.xf = self.e * self.xf + x.into();
        self.xf
    }

    /// Current accumulator value
    pub fn xf(&self) -> Complex64 {
        self.xf
    }

    /// Clear the accumulator
    pub fn reset(&mut self) {
        self.xf = Complex64::new(0.0, 0.0);
    }

    /// Steady-state gain of the window, `tau * fs`
    pub fn window_gain(&self) -> f64 {
        self.ntau
    }

    pub fn tau(&self) -> Time {
        self.tau
    }

    pub fn f(&self) -> Frequency {
        self.f
    }

    pub fn fs(&self) -> Frequency {
        self.fs
    }

    /// Per-sample update factor
    pub fn kernel(&self) -> Complex64 {
        self.e
    }
}

/// Amplitude and phase derived from one aSWIFT update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralSample {
    /// Raw phasor `Xf_slow - Xf_fast`
    pub phasor: Complex64,
    /// Normalized power (dB); zero amplitude gives -inf
    pub amplitude_db: f64,
    /// Phase (rad) in (-pi, pi]
    pub phase: f64,
}

impl SpectralSample {
    /// Derive amplitude and phase from a phasor and the window normalization
    pub fn from_phasor(phasor: Complex64, normalization: f64) -> Self {
        let amp = phasor.norm() / normalization;
        let amplitude_db = 10.0 * (amp * amp).log10();

        Self {
            phasor,
            amplitude_db,
            phase: principal_angle(phasor),
        }
    }
}

/// `arg(z)` mapped to (-pi, pi]
fn principal_angle(z: Complex64) -> f64 {
    let phase = z.arg();
    if phase <= -PI {
        PI
    } else {
        phase
    }
}

/// Difference of a slow and a fast SWIFT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aswift {
    slow: Swift,
    fast: Swift,
}

impl Aswift {
    /// Create an aSWIFT; requires `0 < tau_f < tau_s`
    pub fn new(tau_s: Time, tau_f: Time, f: Frequency, fs: Frequency) -> Result<Self> {
        let slow = Swift::new(tau_s, f, fs)?;
        let fast = Swift::new(tau_f, f, fs)?;

        if tau_f >= tau_s {
            return Err(BgtcsError::InvalidParameter(format!(
                "tau_f ({}) must be smaller than tau_s ({})",
                tau_f, tau_s
            )));
        }

        Ok(Self { slow, fast })
    }

    /// Slide forward one sample and return `Xf_slow - Xf_fast`
    #[inline]
    pub fn slide<X: Into<Complex64> + Copy>(&mut self, x: X) -> Complex64 {
        self.slow.slide(x) - self.fast.slide(x)
    }

    /// Slide forward one sample and derive amplitude and phase
    pub fn estimate(&mut self, x: f64) -> SpectralSample {
        let phasor = self.slide(x);
        SpectralSample::from_phasor(phasor, self.normalization())
    }

    /// Current phasor without advancing
    pub fn phasor(&self) -> Complex64 {
        self.slow.xf() - self.fast.xf()
    }

    /// Effective window length in samples, `(tau_s - tau_f) * fs`
    pub fn normalization(&self) -> f64 {
        (self.slow.tau() - self.fast.tau()) * self.slow.fs()
    }

    pub fn reset(&mut self) {
        self.slow.reset();
        self.fast.reset();
    }

    pub fn slow(&self) -> &Swift {
        &self.slow
    }

    pub fn fast(&self) -> &Swift {
        &self.fast
    }

    pub fn tau_s(&self) -> Time {
        self.slow.tau()
    }

    pub fn tau_f(&self) -> Time {
        self.fast.tau()
    }

    pub fn f(&self) -> Frequency {
        self.slow.f()
    }

    pub fn fs(&self) -> Frequency {
        self.slow.fs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wrap(x: f64) -> f64 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(Swift::new(0.0, 29.0, 1000.0).is_err());
        assert!(Swift::new(0.1, -29.0, 1000.0).is_err());
        assert!(Swift::new(0.1, 29.0, 0.0).is_err());
        assert!(Swift::new(f64::NAN, 29.0, 1000.0).is_err());
        assert!(Swift::new(0.1, 29.0, 1000.0).is_ok());
    }

    #[test]
    fn test_kernel_is_contractive() {
        let swift = Swift::new(0.05, 29.0, 1000.0).unwrap();
        assert!(swift.kernel().norm() < 1.0);
        assert_relative_eq!(swift.window_gain(), 50.0);
    }

    #[test]
    fn test_converges_to_window_gain() {
        let (tau, f, fs) = (0.1, 29.0, 1000.0);
        let mut swift = Swift::new(tau, f, fs).unwrap();

        let w = 2.0 * PI * f / fs;
        for n in 0..5000 {
            swift.slide(Complex64::from_polar(1.0, w * n as f64));
        }

        // 1 / (1 - exp(-1/ntau)) = ntau + 1/2 + O(1/ntau)
        assert_relative_eq!(swift.xf().norm(), tau * fs, max_relative = 0.01);
    }

    #[test]
    fn test_reset() {
        let mut swift = Swift::new(0.1, 29.0, 1000.0).unwrap();
        for x in [1.0, 2.0, 3.0] {
            swift.slide(x);
        }
        assert!(swift.xf().norm() > 0.0);
        swift.reset();
        assert_eq!(swift.xf(), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_aswift_requires_fast_below_slow() {
        assert!(Aswift::new(0.2397, 0.2397, 29.0, 1000.0).is_err());
        assert!(Aswift::new(0.05, 0.2, 29.0, 1000.0).is_err());
        assert!(Aswift::new(0.2397, 0.2397 / 5.0, 29.0, 1000.0).is_ok());
    }

    #[test]
    fn test_zero_input_is_negative_infinity_db() {
        let mut aswift = Aswift::new(0.2, 0.04, 29.0, 1000.0).unwrap();
        let sample = aswift.estimate(0.0);
        assert_eq!(sample.amplitude_db, f64::NEG_INFINITY);
        assert!(sample.amplitude_db < -1000.0);
    }

    #[test]
    fn test_aswift_tracks_sinusoid() {
        let (f, fs) = (29.0, 1000.0);
        let mut aswift = Aswift::new(0.2397, 0.2397 / 5.0, f, fs).unwrap();
        let w = 2.0 * PI * f / fs;

        let mut last = None;
        for n in 0..5000 {
            // amplitude 2 -> positive-frequency component of magnitude 1
            last = Some((n, aswift.estimate(2.0 * (w * n as f64).cos())));
        }
        let (n, sample) = last.unwrap();

        assert!(sample.amplitude_db.abs() < 0.5, "got {} dB", sample.amplitude_db);
        assert!(wrap(sample.phase - w * n as f64).abs() < 0.1);
        assert!(sample.phase > -PI && sample.phase <= PI);
        assert_eq!(sample.phasor, aswift.phasor());
    }
}

//! Convolution Reverb - Partitioned FFT Convolution
//!
//! Convolving with a 2 second impulse at 48kHz means 96,000 multiply-adds per
//! output sample when done directly. Instead the impulse is cut into equal
//! partitions and each partition is applied in the frequency domain.
//!
//! # Uniformly Partitioned Overlap-Save
//!
//! ```text
//! impulse:  [ h0 | h1 | h2 | ... | hK-1 ]      each B samples, FFT'd once (size 2B)
//!
//! input blocks arrive every B samples:
//!
//!   X_n = FFT([block n-1 | block n])
//!
//!   Y_n = X_n·H0 + X_(n-1)·H1 + X_(n-2)·H2 + ...      (frequency-domain delay line)
//!
//!   y   = last B samples of IFFT(Y_n)                 (the first B are wrapped garbage)
//! ```
//!
//! Output lags input by one partition (B samples). For a reverb tail that
//! reads as a touch of pre-delay.
//!
//! All buffers and FFT plans are created up front; [`Convolver::process`] never
//! allocates.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::audio::ImpulseResponse;

/// Partition length used for voice reverbs.
pub const PARTITION_SIZE: usize = 512;

pub struct Convolver {
    block: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Spectra of the impulse partitions
    partitions: Vec<Vec<Complex<f32>>>,
    /// Spectra of the most recent input blocks, newest at `history_pos`
    history: Vec<Vec<Complex<f32>>>,
    history_pos: usize,
    /// [previous block | current block]
    input: Vec<f32>,
    /// Output of the last completed block
    output: Vec<f32>,
    fill: usize,
    spectrum: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    /// Convolver for a raw impulse with the given partition length.
    pub fn new(impulse: &[f32], block: usize) -> Self {
        let block = block.max(1);
        let size = block * 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![Complex::default(); scratch_len];

        let partitions: Vec<Vec<Complex<f32>>> = impulse
            .chunks(block)
            .map(|chunk| {
                let mut spectrum = vec![Complex::default(); size];
                for (bin, &h) in spectrum.iter_mut().zip(chunk) {
                    bin.re = h;
                }
                fft.process_with_scratch(&mut spectrum, &mut scratch);
                spectrum
            })
            .collect();

        let history = vec![vec![Complex::default(); size]; partitions.len()];

        Self {
            block,
            fft,
            ifft,
            partitions,
            history,
            history_pos: 0,
            input: vec![0.0; size],
            output: vec![0.0; block],
            fill: 0,
            spectrum: vec![Complex::default(); size],
            accum: vec![Complex::default(); size],
            scratch,
        }
    }

    /// Convolver for a reverb impulse, loudness-normalized.
    pub fn from_impulse(impulse: &ImpulseResponse) -> Self {
        let gain = impulse.normalization_gain();
        let scaled: Vec<f32> = impulse.samples().iter().map(|h| h * gain).collect();
        Self::new(&scaled, PARTITION_SIZE)
    }

    /// Processing latency in samples.
    pub fn latency(&self) -> usize {
        self.block
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.input[self.block + self.fill] = input;
        let out = self.output[self.fill];

        self.fill += 1;
        if self.fill == self.block {
            self.process_block();
            self.fill = 0;
        }

        out
    }

    pub fn render(&mut self, input: &[f32], out: &mut [f32]) {
        for (o, &x) in out.iter_mut().zip(input) {
            *o = self.process(x);
        }
    }

    fn process_block(&mut self) {
        let count = self.partitions.len();
        if count == 0 {
            self.output.fill(0.0);
            return;
        }

        for (bin, &x) in self.spectrum.iter_mut().zip(&self.input) {
            *bin = Complex::new(x, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        self.history_pos = (self.history_pos + count - 1) % count;
        self.history[self.history_pos].copy_from_slice(&self.spectrum);

        self.accum.fill(Complex::default());
        for (k, partition) in self.partitions.iter().enumerate() {
            let past = &self.history[(self.history_pos + k) % count];
            for ((acc, &x), &h) in self.accum.iter_mut().zip(past).zip(partition) {
                *acc += x * h;
            }
        }
        self.ifft.process_with_scratch(&mut self.accum, &mut self.scratch);

        let scale = 1.0 / (2 * self.block) as f32;
        for (out, bin) in self.output.iter_mut().zip(&self.accum[self.block..]) {
            *out = bin.re * scale;
        }

        self.input.copy_within(self.block.., 0);
    }
}

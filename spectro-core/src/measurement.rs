//! Decoded spectrum data.
//!
//! A [`Reply`] is the raw serde view of one wire record; a
//! [`Measurement`] pairs the decoded samples with the command that
//! produced them. Measurements are immutable after construction and
//! delivered whole or not at all.

use serde::{Deserialize, Serialize};

use crate::command::Command;

// ── Reply ────────────────────────────────────────────────────────

/// One server reply as it appears on the wire: a status field plus
/// parallel wavelength/intensity arrays.
///
/// Unknown fields are ignored; array-length agreement is enforced by the
/// codec, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Server-reported status text (`"ok"` on success).
    pub status: String,
    /// Wavelengths in nanometres.
    pub wavelength: Vec<f64>,
    /// Intensities, one per wavelength, in instrument counts.
    pub intensity: Vec<f64>,
}

// ── Sample ───────────────────────────────────────────────────────

/// A single (wavelength, intensity) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Wavelength in nanometres.
    pub wavelength: f64,
    /// Intensity in instrument counts.
    pub intensity: f64,
}

// ── Measurement ──────────────────────────────────────────────────

/// A decoded spectrum plus the command that produced it.
///
/// No unit conversion or value validation happens here: NaN and
/// infinite values pass through unchanged, and judging them is the
/// consumer's business.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    command: Command,
    samples: Vec<Sample>,
    status: String,
}

impl Measurement {
    /// Build a measurement from a decoded reply.
    ///
    /// The codec guarantees the reply's arrays are the same length by
    /// the time it gets here; any surplus in one array would have been
    /// rejected as malformed.
    pub fn from_reply(command: Command, reply: Reply) -> Self {
        let samples = reply
            .wavelength
            .into_iter()
            .zip(reply.intensity)
            .map(|(wavelength, intensity)| Sample {
                wavelength,
                intensity,
            })
            .collect();
        Self {
            command,
            samples,
            status: reply.status,
        }
    }

    /// The command that produced this spectrum.
    pub fn command(&self) -> Command {
        self.command
    }

    /// The decoded samples, in wire order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples in the spectrum.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if the server returned an empty spectrum.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Server-reported status text.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The sample with the highest intensity, if any.
    pub fn peak(&self) -> Option<Sample> {
        self.samples
            .iter()
            .copied()
            .max_by(|a, b| a.intensity.total_cmp(&b.intensity))
    }

    /// The (lowest, highest) wavelength covered by the spectrum.
    pub fn wavelength_span(&self) -> Option<(f64, f64)> {
        let first = self.samples.first()?.wavelength;
        let span = self.samples.iter().fold((first, first), |(lo, hi), s| {
            (lo.min(s.wavelength), hi.max(s.wavelength))
        });
        Some(span)
    }
}

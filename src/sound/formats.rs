//! Frame-level audio format information
//!
//! Describes the sample layout a decoded clip carries: channel count, bits
//! per sample and sample rate.

/// Frame-level information about a clip
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Number of bits used to represent a single sample
    pub bit_depth: u16,
    /// Number of sample frames played each second
    pub sample_rate: u32,
}

impl FrameInfo {
    /// Create frame info from its three components
    pub fn new(channels: u16, bit_depth: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            bit_depth,
            sample_rate,
        }
    }

    /// Returns the number of bytes used by one sample, rounded up
    pub fn bytes_per_sample(&self) -> usize {
        (self.bit_depth as usize + 7) / 8
    }

    /// Returns the number of bytes in one sample frame (all channels)
    pub fn block_align(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// Returns true if this is a stereo layout
    pub fn is_stereo(&self) -> bool {
        self.channels == 2
    }
}

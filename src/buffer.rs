/// Samples for a window, one row per requested channel.
///
/// Rows are stored back to back, each `samples` long and in time order.
/// The channel order is the order the caller asked for them in.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledBuffer {
    channels: Vec<u32>,
    samples: usize,
    data: Vec<f32>,
}

impl AssembledBuffer {
    pub(crate) fn zeroed(channels: &[u32], samples: usize) -> Self {
        Self {
            channels: channels.to_vec(),
            samples,
            data: vec![0f32; channels.len() * samples],
        }
    }

    /// The channels in row order.
    #[must_use]
    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// Row `index` of the buffer (not the channel number).
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.samples)?;
        self.data.get(start..start + self.samples)
    }

    /// Row of a channel by its number.
    #[must_use]
    pub fn channel(&self, channel: u32) -> Option<&[f32]> {
        let index = self.channels.iter().position(|c| *c == channel)?;
        self.row(index)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.samples.max(1)).take(self.channels.len())
    }

    /// `range` of row `index`, `None` if it does not fit.
    pub(crate) fn row_slice_mut(
        &mut self,
        index: usize,
        range: std::ops::Range<usize>,
    ) -> Option<&mut [f32]> {
        if range.end > self.samples || index >= self.channels.len() {
            return None;
        }
        let offset = index * self.samples;
        self.data.get_mut(offset + range.start..offset + range.end)
    }

    /// All rows back to back.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

use std::sync::Arc;

use super::{check_channels, check_sampling_rate, Error, Reader};
use crate::index::FileSetIndex;
use crate::template::FilenameTemplate;
use crate::trace::{ByteOrder, TraceLayout};
use crate::window::LeapSecond;

/// Configures a [`Reader`]. A template and sampling rate must be set before
/// [`build`](ReaderBuilder::build) becomes available.
pub struct ReaderBuilder<I, const TEMPLATE_SET: bool, const RATE_SET: bool> {
    index: I,
    template: Option<Arc<FilenameTemplate>>,
    channels: Vec<u32>,
    sampling_rate: f64,
    layout: TraceLayout,
    byte_order: ByteOrder,
    leap_second: Option<LeapSecond>,
}

impl<I: FileSetIndex> ReaderBuilder<I, false, false> {
    pub(crate) fn new(index: I) -> Self {
        ReaderBuilder {
            index,
            template: None,
            channels: Vec::new(),
            sampling_rate: 0.0,
            layout: TraceLayout::default(),
            byte_order: ByteOrder::default(),
            leap_second: None,
        }
    }
}

impl<I: FileSetIndex, const TEMPLATE_SET: bool, const RATE_SET: bool>
    ReaderBuilder<I, TEMPLATE_SET, RATE_SET>
{
    /// Template the catalogued file sets were named with.
    pub fn template(
        self,
        template: impl Into<Arc<FilenameTemplate>>,
    ) -> ReaderBuilder<I, true, RATE_SET> {
        ReaderBuilder {
            index: self.index,
            template: Some(template.into()),
            channels: self.channels,
            sampling_rate: self.sampling_rate,
            layout: self.layout,
            byte_order: self.byte_order,
            leap_second: self.leap_second,
        }
    }

    /// Samples per second every file must be recorded at.
    pub fn sampling_rate(self, sampling_rate: f64) -> ReaderBuilder<I, TEMPLATE_SET, true> {
        ReaderBuilder {
            index: self.index,
            template: self.template,
            channels: self.channels,
            sampling_rate,
            layout: self.layout,
            byte_order: self.byte_order,
            leap_second: self.leap_second,
        }
    }

    /// Trace numbers to read, starting at 1. Rows of the returned buffers
    /// follow this order.
    #[must_use]
    pub fn channels(mut self, channels: impl IntoIterator<Item = u32>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    /// Header sizes, the default is 3200 text, 400 binary and 240 bytes
    /// per trace.
    #[must_use]
    pub fn layout(mut self, layout: TraceLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Default is big endian.
    #[must_use]
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Correct caller supplied times after `leap` before comparing them with
    /// the catalog. Off by default.
    #[must_use]
    pub fn leap_second(mut self, leap: Option<LeapSecond>) -> Self {
        self.leap_second = leap;
        self
    }
}

impl<I: FileSetIndex> ReaderBuilder<I, true, true> {
    /// # Errors
    /// If no channels are set, a channel is zero or the sampling rate is not
    /// a positive finite number whose sample interval fits the binary header.
    pub fn build(self) -> Result<Reader<I>, Error> {
        check_channels(&self.channels)?;
        check_sampling_rate(self.sampling_rate)?;
        let template = self
            .template
            .expect("TEMPLATE_SET is only true once a template is set");

        Ok(Reader {
            index: self.index,
            template,
            channels: self.channels,
            sampling_rate: self.sampling_rate,
            layout: self.layout,
            byte_order: self.byte_order,
            leap_second: self.leap_second,
        })
    }
}

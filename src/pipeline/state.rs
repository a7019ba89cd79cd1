use crate::audio::frame::FrameSource;
use crate::encode::sink::AudioEncodeSink;
use crate::error::WaveformError;
use crate::waveform::aggregate::ColumnAggregator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    InputOpened,
    OutputOpened,
    AggregatorReady,
    Streaming,
    Flushing,
    Finalized,
    Failed,
}

/// Everything one `generate` call holds open.
///
/// Handles are acquired in the order input, output, aggregators and released
/// in reverse by `teardown`, which also runs on drop so every exit path goes
/// through it exactly once.
pub struct PipelineState {
    stage: PipelineStage,
    pub(crate) input: Option<Box<dyn FrameSource>>,
    pub(crate) output: Option<AudioEncodeSink>,
    pub(crate) aggregators: Vec<ColumnAggregator>,
    last_error: Option<String>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
            input: None,
            output: None,
            aggregators: Vec::new(),
            last_error: None,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn enter(&mut self, stage: PipelineStage) {
        log::debug!("Pipeline {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    pub fn attach_input(&mut self, input: Box<dyn FrameSource>) {
        self.input = Some(input);
        self.enter(PipelineStage::InputOpened);
    }

    pub fn attach_output(&mut self, output: AudioEncodeSink) {
        self.output = Some(output);
        self.enter(PipelineStage::OutputOpened);
    }

    /// Record `err` (only the first one sticks) and move to `Failed`.
    pub(crate) fn fail(&mut self, err: &WaveformError) {
        if self.last_error.is_none() {
            self.last_error = Some(err.to_string());
        }
        if self.stage != PipelineStage::Failed {
            log::error!("Pipeline failed in {:?}: {}", self.stage, err);
            self.stage = PipelineStage::Failed;
        }
    }

    pub fn holds_handles(&self) -> bool {
        self.input.is_some() || self.output.is_some() || !self.aggregators.is_empty()
    }

    /// Release every held handle, newest first. Idempotent.
    pub fn teardown(&mut self) {
        if !self.holds_handles() {
            return;
        }
        log::debug!("Tearing down pipeline in {:?}", self.stage);
        self.aggregators.clear();
        // An output that never reached finalize discards its partial file on drop.
        drop(self.output.take());
        drop(self.input.take());
    }
}

impl Drop for PipelineState {
    fn drop(&mut self) {
        self.teardown();
    }
}

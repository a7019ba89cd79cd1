use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use super::progress::ProgressObserver;
use super::state::{PipelineStage, PipelineState};
use crate::audio::decode::SampleSource;
use crate::audio::frame::{AudioTrackDescriptor, FrameSource};
use crate::encode::{self, EncodeOptions};
use crate::error::{set_last_error, WaveformError, WaveformResult};
use crate::waveform::aggregate::ColumnAggregator;
use crate::waveform::WaveformImage;

/// Narrower images would need an unreasonably large per-column fold.
pub const MIN_WIDTH: usize = 10;

#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub input: PathBuf,
    /// Re-encode the audio into this file when set.
    pub output: Option<PathBuf>,
    /// One waveform is produced per entry, in this order.
    pub widths: Vec<usize>,
    pub encode: EncodeOptions,
}

#[derive(Debug)]
pub struct GenerateOutcome {
    pub track: AudioTrackDescriptor,
    pub images: Vec<WaveformImage>,
}

pub fn validate_widths(widths: &[usize]) -> WaveformResult<()> {
    if widths.is_empty() {
        return Err(WaveformError::invalid_width("no widths requested"));
    }
    if let Some(w) = widths.iter().find(|&&w| w < MIN_WIDTH) {
        return Err(WaveformError::invalid_width(format!(
            "{} is below the minimum of {}",
            w, MIN_WIDTH
        )));
    }
    Ok(())
}

/// Decode `request.input` once, producing a waveform for every requested
/// width and optionally a re-encoded copy of the audio.
///
/// Not reentrant with respect to the last-error slot; all handles live in a
/// per-call `PipelineState`.
pub fn generate(
    request: &GenerateRequest,
    progress: &mut dyn ProgressObserver,
    abort: Option<&AtomicBool>,
) -> WaveformResult<GenerateOutcome> {
    let mut state = PipelineState::new();
    let result = open_and_run(&mut state, request, progress, abort);
    if let Err(err) = &result {
        state.fail(err);
        set_last_error(state.last_error().map(str::to_string));
    }
    log::debug!("generate ended in {:?}", state.stage());
    result
}

fn open_and_run(
    state: &mut PipelineState,
    request: &GenerateRequest,
    progress: &mut dyn ProgressObserver,
    abort: Option<&AtomicBool>,
) -> WaveformResult<GenerateOutcome> {
    validate_widths(&request.widths)?;

    let source = SampleSource::open(&request.input)?;
    let track = source.descriptor().clone();
    state.attach_input(Box::new(source));

    if let Some(path) = &request.output {
        state.attach_output(encode::open_output(path, &track, &request.encode)?);
    }

    let images = state.run(&request.widths, progress, abort)?;
    Ok(GenerateOutcome { track, images })
}

impl PipelineState {
    /// Drive an attached input (and output, if any) to completion.
    ///
    /// On error the state is left in `Failed` with every partial column
    /// discarded; handles are released by `teardown`.
    pub fn run(
        &mut self,
        widths: &[usize],
        progress: &mut dyn ProgressObserver,
        abort: Option<&AtomicBool>,
    ) -> WaveformResult<Vec<WaveformImage>> {
        let result = self.stream(widths, progress, abort);
        match &result {
            Ok(_) => {
                self.enter(PipelineStage::Finalized);
                progress.finish();
            }
            Err(err) => {
                self.fail(err);
                progress.abandon();
            }
        }
        result
    }

    fn stream(
        &mut self,
        widths: &[usize],
        progress: &mut dyn ProgressObserver,
        abort: Option<&AtomicBool>,
    ) -> WaveformResult<Vec<WaveformImage>> {
        let track = self
            .input
            .as_ref()
            .ok_or_else(|| WaveformError::open("pipeline has no input"))?
            .descriptor()
            .clone();

        for &width in widths {
            let agg = ColumnAggregator::new(track.total_samples, width)?;
            log::debug!(
                "Width {}: {} samples per column",
                width,
                agg.samples_per_column()
            );
            self.aggregators.push(agg);
        }
        self.enter(PipelineStage::AggregatorReady);

        progress.start(&track);
        self.enter(PipelineStage::Streaming);

        let input = self
            .input
            .as_mut()
            .ok_or_else(|| WaveformError::open("pipeline has no input"))?;
        let mut position = 0u64;
        loop {
            if abort.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(WaveformError::Aborted(position));
            }

            let Some(frame) = input.next_frame()? else {
                break;
            };
            if frame.is_empty() {
                continue;
            }

            for agg in self.aggregators.iter_mut() {
                agg.push(&frame);
            }
            if let Some(output) = self.output.as_mut() {
                output.write_frame(&frame)?;
            }

            position += frame.len() as u64;
            progress.advance(position);
        }

        self.enter(PipelineStage::Flushing);
        log::debug!("End of stream after {} samples", position);
        for agg in &self.aggregators {
            log::debug!(
                "Width {}: {} columns closed, {} samples folded",
                agg.width(),
                agg.columns().len(),
                agg.position()
            );
        }

        let images = self
            .aggregators
            .drain(..)
            .map(|agg| agg.finish(track.sample_rate))
            .collect();

        if let Some(output) = self.output.as_mut() {
            output.finalize()?;
            log::info!("Re-encoded {} sample frames", output.frames_written());
        }

        Ok(images)
    }
}

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use super::packetizer::EncodedUnit;
use super::sink::Muxer;
use super::OutputFormat;
use crate::error::{WaveformError, WaveformResult};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Hidden sibling of `out` that receives the container until it is complete.
fn temp_path_for(out: &Path) -> PathBuf {
    let name = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    out.with_file_name(format!(".{}.part", name))
}

/// Muxes raw f32 units into a container file through an `ffmpeg` child.
///
/// The child writes to a temporary file which replaces the output path only
/// in `finalize`. Dropping an unfinalized muxer kills the child and removes
/// the temporary file.
pub struct FfmpegMuxer {
    child: Child,
    stdin: Option<ChildStdin>,
    temp_path: PathBuf,
    out_path: PathBuf,
    finalized: bool,
}

impl FfmpegMuxer {
    pub fn new(
        out_path: &Path,
        format: OutputFormat,
        sample_rate: u32,
        channels: usize,
        codec: Option<&str>,
        bitrate: Option<&str>,
    ) -> WaveformResult<Self> {
        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                WaveformError::open(format!("creating {}: {}", parent.display(), e))
            })?;
        }

        if !is_ffmpeg_on_path() {
            return Err(WaveformError::open(
                "ffmpeg is required for re-encoding, but was not found on PATH",
            ));
        }

        let temp_path = temp_path_for(out_path);

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "f32le",
            "-ar",
            &sample_rate.to_string(),
            "-ac",
            &channels.to_string(),
            "-i",
            "pipe:0",
            "-c:a",
            codec.unwrap_or(format.default_codec()),
        ]);
        if let Some(br) = bitrate {
            cmd.args(["-b:a", br]);
        }
        cmd.args(["-f", format.muxer_name()]).arg(&temp_path);

        let mut child = cmd.spawn().map_err(|e| {
            WaveformError::open(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {}",
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WaveformError::open("ffmpeg stdin not available"))?;

        log::info!(
            "Encoding {} via ffmpeg: {}Hz, {} channel(s), codec={}",
            out_path.display(),
            sample_rate,
            channels,
            codec.unwrap_or(format.default_codec())
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            temp_path,
            out_path: out_path.to_path_buf(),
            finalized: false,
        })
    }

    fn stderr_text(&mut self) -> String {
        let mut text = String::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            let _ = stderr.read_to_string(&mut text);
        }
        text.trim().to_string()
    }
}

impl Muxer for FfmpegMuxer {
    fn write_unit(&mut self, unit: &EncodedUnit) -> WaveformResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(WaveformError::write("muxer is already finalized"));
        };
        stdin
            .write_all(&unit.data)
            .map_err(|e| WaveformError::write(format!("unit at {}: {}", unit.pts, e)))
    }

    fn finalize(&mut self) -> WaveformResult<()> {
        // EOF on stdin makes ffmpeg flush its encoder and write the trailer.
        drop(self.stdin.take());

        let stderr = self.stderr_text();
        let status = self
            .child
            .wait()
            .map_err(|e| WaveformError::finalize(format!("waiting for ffmpeg: {}", e)))?;
        if !status.success() {
            return Err(WaveformError::finalize(format!(
                "ffmpeg exited with {}: {}",
                status, stderr
            )));
        }

        std::fs::rename(&self.temp_path, &self.out_path).map_err(|e| {
            WaveformError::finalize(format!("moving output into place: {}", e))
        })?;
        self.finalized = true;
        log::info!("Encoding complete: {}", self.out_path.display());
        Ok(())
    }
}

impl Drop for FfmpegMuxer {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if std::fs::remove_file(&self.temp_path).is_ok() {
            log::warn!("Discarded incomplete output {}", self.temp_path.display());
        }
    }
}

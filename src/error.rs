use std::sync::Mutex;

pub type WaveformResult<T> = Result<T, WaveformError>;

#[derive(thiserror::Error, Debug)]
pub enum WaveformError {
    #[error("cannot open input: {0}")]
    OpenFailed(String),

    #[error("no audio track found in {0}")]
    NoAudioTrack(String),

    #[error("decoder unavailable: {0}")]
    DecoderUnavailable(String),

    #[error("decoding failed: {0}")]
    DecodeFailed(String),

    #[error("encoding failed: {0}")]
    EncodeFailed(String),

    #[error("writing output failed: {0}")]
    WriteFailed(String),

    #[error("finalizing output failed: {0}")]
    FinalizeFailed(String),

    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("invalid width: {0}")]
    InvalidWidth(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("aborted after {0} samples")]
    Aborted(u64),

    #[error("configuration error: {0}")]
    Config(String),
}

impl WaveformError {
    pub fn open(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailed(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailed(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    pub fn finalize(msg: impl Into<String>) -> Self {
        Self::FinalizeFailed(msg.into())
    }

    pub fn invalid_width(msg: impl Into<String>) -> Self {
        Self::InvalidWidth(msg.into())
    }
}

static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

/// Message of the most recent failed `generate` call, if any.
pub fn last_error_message() -> Option<String> {
    LAST_ERROR.lock().ok().and_then(|slot| slot.clone())
}

pub(crate) fn set_last_error(message: Option<String>) {
    if let Ok(mut slot) = LAST_ERROR.lock() {
        *slot = message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(WaveformError::open("x").to_string().starts_with("cannot open input:"));
        assert!(WaveformError::decode("x").to_string().starts_with("decoding failed:"));
        assert!(WaveformError::encode("x").to_string().starts_with("encoding failed:"));
        assert!(WaveformError::write("x").to_string().starts_with("writing output failed:"));
        assert!(WaveformError::finalize("x").to_string().contains("finalizing"));
        assert!(WaveformError::invalid_width("x").to_string().starts_with("invalid width:"));
        assert_eq!(WaveformError::Aborted(42).to_string(), "aborted after 42 samples");
    }
}

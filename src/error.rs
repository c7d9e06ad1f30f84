use thiserror::Error;

/// Failures of the PCM / base64 transcoding helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("channel count must be at least 1")]
    ZeroChannels,

    #[error("PCM16 payload of {len} bytes is not a multiple of {frame} bytes")]
    MisalignedPcm { len: usize, frame: usize },
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("service returned no audio")]
    EmptyResponse,

    #[error("audio decode error: {0}")]
    Decode(#[from] CodecError),

    #[error("synthesis timed out after {0} ms")]
    Timeout(u128),

    #[error("audio output error: {0}")]
    Output(String),

    #[error("audio output is suspended")]
    OutputSuspended,
}

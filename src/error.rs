use thiserror::Error;

// ---------------------------------------------------------------------------
// MaskError – everything that can stop a run
// ---------------------------------------------------------------------------

/// Errors raised while decoding, transforming, rendering or publishing masks.
///
/// None of these are recovered where they are detected: the first error
/// aborts the current file (and, for publishing, every region after it).
#[derive(Debug, Error)]
pub enum MaskError {
    /// A path or attribute is missing from the store, or has the wrong kind.
    #[error("store: {0}")]
    Store(String),

    /// Region metadata is malformed or cannot be resolved.
    #[error("decode: {0}")]
    Decode(String),

    /// Depth-range data cannot be paired into `(start, stop)` ranges.
    #[error(
        "malformed mask in region {region_id}, ping {ping_index}: \
         depth list has {len} values, expected an even count"
    )]
    MalformedMask {
        region_id: i64,
        ping_index: usize,
        len: usize,
    },

    /// Mask times and depth lists are not parallel.
    #[error("malformed mask in region {region_id}: {times} times but {depths} depth lists")]
    MisalignedMask {
        region_id: i64,
        times: usize,
        depths: usize,
    },

    /// The remote service answered with anything other than 200 or 204.
    #[error("{url} returned status code {status}: {text}")]
    RemoteRejected {
        url: String,
        status: u16,
        text: String,
    },

    /// The request never produced a usable response.
    #[error("transport: {0}")]
    Transport(String),

    /// Drawing or encoding the plot failed.
    #[error("render: {0}")]
    Render(String),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MaskError>;

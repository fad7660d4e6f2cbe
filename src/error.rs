use thiserror::Error;

use crate::types::snippet::SnippetId;

/// Reasons a timeline operation was refused. A refused operation never leaves a
/// partial mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("no free layer for ticks {start}..{end} on track {track}")]
    NoFreeLayer { track: usize, start: i32, end: i32 },

    #[error("snippet {0} not found")]
    SnippetNotFound(SnippetId),

    #[error("track {index} out of range ({count} tracks)")]
    TrackOutOfRange { index: usize, count: usize },

    #[error("invalid snippet duration {0}")]
    InvalidDuration(i32),

    #[error("input range {offset}..{end} outside snippet of length {len}")]
    InputRange { offset: usize, end: usize, len: usize },

    #[error("nothing selected")]
    NothingSelected,

    #[error("no adjacent selected snippets to merge")]
    NothingToMerge,

    #[error("no selected snippet spans tick {0}")]
    NothingToSplit(i32),

    #[error("no active snippet at tick {tick} on track {track}")]
    NoSnippetAtTick { track: usize, tick: i32 },

    #[error("not recording")]
    NotRecording,

    #[error("already recording")]
    AlreadyRecording,

    #[error("no track selected for recording")]
    NoRecordingTarget,

    #[error("physics world refused {0} new characters")]
    CharacterLimit(usize),
}

pub type TimelineResult<T> = Result<T, TimelineError>;

/// Errors raised while reading or writing project and config files.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a tasline project (magic {0:?})")]
    BadMagic([u8; 4]),

    #[error("unsupported project version {0}")]
    UnsupportedVersion(u32),

    #[error("project data truncated while reading {0}")]
    Truncated(&'static str),

    #[error("corrupt project: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

pub type ProjectResult<T> = Result<T, ProjectError>;

//! Capture archive recording and playback
//!
//! An archive holds a device configuration, tags, named attachments (such as
//! calibration blobs) and two time-ordered streams: IMU samples and image
//! captures.
//!
//! # File Format
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Preamble (8 bytes)                               │
//! │ - Magic: "DCAP" (4 bytes)                        │
//! │ - Version: u16                                   │
//! │ - Flags: u16                                     │
//! ├──────────────────────────────────────────────────┤
//! │ Record Stream                                    │
//! │ [kind:u8][len:u32][bincode payload]...           │
//! │ Header, then IMU / Capture records, then Footer  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The footer is only written by [`SessionRecorder::flush`]; the player refuses
//! archives without one.

pub mod player;
pub mod recorder;
pub mod types;

pub use player::SessionPlayer;
pub use recorder::SessionRecorder;
pub use types::{
    ArchiveFooter, ArchiveHeader, Attachment, RecorderState, SessionSummary, TrackKind,
    CALIBRATION_ATTACHMENT, DEPTH_CALIBRATION_ATTACHMENT, IR_MODE_ACTIVE, IR_MODE_PASSIVE,
    IR_MODE_RAW, TAG_COLOR_MODE, TAG_DEPTH_MODE, TAG_IMU_MODE, TAG_IR_MODE,
};

//! Voice Batcher - turns dropped voice clips into cloned voice models
//!
//! A game mod drops short `.wav` clips into a folder. This crate watches
//! that folder, and once enough audio has accumulated it stitches the clips
//! together, converts the result to 16 kHz mono and submits it to the
//! Fish Audio voice model API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            Monitored folder (*.wav)           │
//! └──────────────────────┬───────────────────────┘
//!                        │ scan
//! ┌──────────────────────▼───────────────────────┐
//! │                 BatchMonitor                  │
//! │  Tracker  │  Stitch  │  Normalize  │  Clear   │
//! └──────────────────────┬───────────────────────┘
//!                        │ upload
//! ┌──────────────────────▼───────────────────────┐
//! │          Uploader (Fish Audio / off)          │
//! └──────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod monitor;
pub mod upload;
pub mod workdir;

pub use audio::{AudioClip, AudioFormat};
pub use config::{ClearPolicy, Config, ConfigOverrides, MonitorConfig, StitchOrder, UploadConfig};
pub use error::{Error, Result};
pub use monitor::{BatchMonitor, BatchOutcome, CycleReport, MonitorPhase, Tracker};
pub use upload::{DisabledUploader, FishAudioClient, UploadOutcome, Uploader};
pub use workdir::WorkDir;

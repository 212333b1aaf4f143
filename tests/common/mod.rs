//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use voice_batcher::audio::{AudioClip, AudioFormat, read_clip, write_wav};
use voice_batcher::{
    BatchMonitor, ClearPolicy, MonitorConfig, Result, StitchOrder, UploadOutcome, Uploader,
};

/// Write a 220 Hz tone of `secs` seconds
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn write_tone(path: &Path, secs: f32, format: AudioFormat) {
    let frames = (secs * format.sample_rate as f32) as usize;
    let channels = usize::from(format.channels);
    let samples = (0..frames * channels)
        .map(|i| {
            let t = (i / channels) as f32 / format.sample_rate as f32;
            0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
        })
        .collect();
    let clip = AudioClip::new(samples, format).expect("valid clip");
    write_wav(&clip, path).expect("failed to write fixture");
}

/// One call received by [`ScriptedUploader`]
#[derive(Debug, Clone)]
pub struct UploadCall {
    pub title: String,
    pub artifact: PathBuf,
    /// Duration of the artifact at the moment it was uploaded
    pub duration_ms: u64,
}

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<UploadOutcome>>,
    calls: Vec<UploadCall>,
}

/// Uploader that records calls and replays queued responses
///
/// Once the queue is empty every upload succeeds with a generated id.
#[derive(Clone, Default)]
pub struct ScriptedUploader {
    script: Arc<Mutex<Script>>,
}

impl ScriptedUploader {
    pub fn respond(&self, response: Result<UploadOutcome>) {
        self.script.lock().unwrap().responses.push_back(response);
    }

    pub fn calls(&self) -> Vec<UploadCall> {
        self.script.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn upload(&self, artifact: &Path, title: &str) -> Result<UploadOutcome> {
        let duration_ms = read_clip(artifact)?.duration_ms();
        let mut script = self.script.lock().unwrap();
        script.calls.push(UploadCall {
            title: title.to_string(),
            artifact: artifact.to_path_buf(),
            duration_ms,
        });
        let n = script.calls.len();
        script.responses.pop_front().unwrap_or_else(|| {
            Ok(UploadOutcome::Created {
                id: format!("model-{n}"),
            })
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Temporary drop and work folders plus a monitor wired to them
pub struct Harness {
    _root: TempDir,
    pub drop_dir: PathBuf,
    pub work_dir: PathBuf,
    pub uploader: ScriptedUploader,
}

impl Harness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let drop_dir = root.path().join("drop");
        let work_dir = root.path().join("work");
        std::fs::create_dir_all(&drop_dir).unwrap();
        std::fs::create_dir_all(&work_dir).unwrap();

        Self {
            _root: root,
            drop_dir,
            work_dir,
            uploader: ScriptedUploader::default(),
        }
    }

    pub fn config(&self, threshold_secs: u64, clear_policy: ClearPolicy) -> MonitorConfig {
        MonitorConfig {
            monitor_dir: self.drop_dir.clone(),
            work_dir: self.work_dir.clone(),
            threshold: Duration::from_secs(threshold_secs),
            poll_interval: Duration::from_millis(10),
            stitch_order: StitchOrder::Lexical,
            clear_policy,
            ..MonitorConfig::default()
        }
    }

    pub fn monitor(&self, threshold_secs: u64, clear_policy: ClearPolicy) -> BatchMonitor {
        BatchMonitor::new(
            self.config(threshold_secs, clear_policy),
            Box::new(self.uploader.clone()),
        )
    }

    pub fn drop_clip(&self, name: &str, secs: f32) -> PathBuf {
        let path = self.drop_dir.join(name);
        write_tone(&path, secs, AudioFormat::default());
        path
    }

    pub fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }
}

//! Batch monitor loop
//!
//! Each cycle scans the monitored folder for new `.wav` clips, stitches the
//! tracked clips into one artifact once their total duration reaches the
//! threshold, uploads it, then clears the folder.

mod tracker;

pub use tracker::{Batch, TrackedFile, Tracker};

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::audio::{normalize, read_complete_clip, stitch_files, write_wav};
use crate::config::{ClearPolicy, MonitorConfig};
use crate::upload::{UploadOutcome, Uploader};
use crate::Result;

/// Prefix of generated model titles when none is configured
pub const DEFAULT_TITLE_PREFIX: &str = "Batch";

/// Step of the monitor cycle currently executing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonitorPhase {
    #[default]
    Scanning,
    Stitching,
    Normalizing,
    Uploading,
    Clearing,
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scanning => "scanning",
            Self::Stitching => "stitching",
            Self::Normalizing => "normalizing",
            Self::Uploading => "uploading",
            Self::Clearing => "clearing",
        };
        f.write_str(name)
    }
}

/// How a batch attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A clip could not be loaded; the batch stays tracked
    StitchFailed,
    /// Conversion or export failed; the artifact was discarded
    NormalizeFailed,
    /// The upload was rejected or never arrived; the batch stays tracked
    UploadFailed,
    Uploaded(UploadOutcome),
}

impl BatchOutcome {
    /// Whether the batch advanced to the processed set
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Uploaded(_))
    }
}

/// Summary of one monitor cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Clips tracked for the first time
    pub new_files: usize,
    /// Clips whose duration could not be read
    pub skipped_files: usize,
    /// Set when the threshold was met and a batch was attempted
    pub batch: Option<BatchOutcome>,
    /// Files deleted by the end-of-cycle clear
    pub cleared_files: usize,
}

#[derive(Debug, Default)]
struct ScanSummary {
    new_files: usize,
    skipped_files: usize,
}

/// Owns all loop state: configuration, uploader and clip bookkeeping
pub struct BatchMonitor {
    config: MonitorConfig,
    uploader: Box<dyn Uploader>,
    title_prefix: String,
    tracker: Tracker,
    phase: MonitorPhase,
    sequence: u64,
}

impl BatchMonitor {
    #[must_use]
    pub fn new(config: MonitorConfig, uploader: Box<dyn Uploader>) -> Self {
        Self {
            config,
            uploader,
            title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
            tracker: Tracker::new(),
            phase: MonitorPhase::default(),
            sequence: 0,
        }
    }

    #[must_use]
    pub fn with_title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.title_prefix = prefix.into();
        self
    }

    #[must_use]
    pub const fn phase(&self) -> MonitorPhase {
        self.phase
    }

    #[must_use]
    pub const fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run cycles until `shutdown` resolves
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            monitor_dir = %self.config.monitor_dir.display(),
            threshold_secs = self.config.threshold.as_secs_f64(),
            poll_interval_secs = self.config.poll_interval.as_secs_f64(),
            uploader = self.uploader.name(),
            "monitoring for voice clips"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                () = self.cycle_then_sleep() => {}
            }
        }
    }

    async fn cycle_then_sleep(&mut self) {
        let report = self.run_cycle().await;
        tracing::debug!(
            new_files = report.new_files,
            skipped_files = report.skipped_files,
            cleared_files = report.cleared_files,
            tracked = self.tracker.len(),
            tracked_ms = self.tracker.total_ms(),
            "cycle complete"
        );
        tokio::time::sleep(self.config.poll_interval).await;
    }

    /// Run one scan, batch and clear cycle
    ///
    /// Never fails: every error is logged and reflected in the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.set_phase(MonitorPhase::Scanning);
        let mut report = CycleReport::default();

        match self.scan() {
            Ok(scan) => {
                report.new_files = scan.new_files;
                report.skipped_files = scan.skipped_files;
            }
            Err(e) => {
                tracing::error!(
                    dir = %self.config.monitor_dir.display(),
                    error = %e,
                    "failed to list monitored folder, skipping cycle"
                );
                return report;
            }
        }

        if self.tracker.threshold_met(self.threshold_ms()) {
            report.batch = Some(self.process_batch().await);
        }

        self.set_phase(MonitorPhase::Clearing);
        report.cleared_files = self.clear();
        self.set_phase(MonitorPhase::Scanning);

        report
    }

    fn set_phase(&mut self, phase: MonitorPhase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "monitor phase");
            self.phase = phase;
        }
    }

    fn threshold_ms(&self) -> u64 {
        u64::try_from(self.config.threshold.as_millis()).unwrap_or(u64::MAX)
    }

    /// Regular files in the monitored folder, sorted by path
    fn list_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.config.monitor_dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn scan(&mut self) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();

        for path in self.list_files()? {
            if !is_wav(&path) || self.tracker.is_known(&path) {
                continue;
            }

            // Fully decoded so clips still being written are retried later
            match read_complete_clip(&path).map(|clip| clip.duration_ms()) {
                Ok(duration_ms) => {
                    tracing::info!(
                        file = %path.display(),
                        duration_ms,
                        "new voice clip"
                    );
                    self.tracker.track(path, duration_ms);
                    summary.new_files += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping unreadable clip");
                    summary.skipped_files += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn process_batch(&mut self) -> BatchOutcome {
        let batch = self.tracker.batch(self.config.stitch_order);
        tracing::info!(
            files = batch.len(),
            total_ms = batch.total_ms(),
            "threshold reached, processing batch"
        );

        self.set_phase(MonitorPhase::Stitching);
        let stitched = match stitch_files(&batch.paths()) {
            Ok(clip) => clip,
            Err(e) => {
                tracing::error!(error = %e, "stitching failed, batch stays tracked");
                return BatchOutcome::StitchFailed;
            }
        };

        self.set_phase(MonitorPhase::Normalizing);
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.sequence += 1;
        let artifact = self
            .config
            .work_dir
            .join(format!("stitched_batch_{stamp}_{}.wav", self.sequence));

        let exported = normalize(stitched, self.config.target).and_then(|normalized| {
            tracing::debug!(
                converted = normalized.converted,
                duration_ms = normalized.clip.duration_ms(),
                "normalized batch audio"
            );
            write_wav(&normalized.clip, &artifact)
        });
        if let Err(e) = exported {
            tracing::error!(
                artifact = %artifact.display(),
                error = %e,
                "normalization failed, dropping batch for this cycle"
            );
            remove_artifact(&artifact);
            return BatchOutcome::NormalizeFailed;
        }

        self.set_phase(MonitorPhase::Uploading);
        let title = format!("{}_{stamp}_{}", self.title_prefix, self.sequence);
        match self.uploader.upload(&artifact, &title).await {
            Ok(outcome) => {
                tracing::info!(
                    title = %title,
                    files = batch.len(),
                    outcome = %outcome,
                    "batch uploaded"
                );
                self.tracker.mark_processed(&batch);
                if !outcome.keeps_artifact() {
                    remove_artifact(&artifact);
                }
                BatchOutcome::Uploaded(outcome)
            }
            Err(e) => {
                tracing::error!(
                    title = %title,
                    uploader = self.uploader.name(),
                    error = %e,
                    "upload failed, batch stays tracked"
                );
                remove_artifact(&artifact);
                BatchOutcome::UploadFailed
            }
        }
    }

    /// Delete files from the monitored folder according to the clear policy
    fn clear(&mut self) -> usize {
        let files = match self.list_files() {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(
                    dir = %self.config.monitor_dir.display(),
                    error = %e,
                    "failed to list monitored folder for clearing"
                );
                return 0;
            }
        };

        let mut cleared = 0;
        for path in files {
            if self.config.clear_policy == ClearPolicy::RetainPending
                && self.tracker.is_tracked(&path)
            {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    self.tracker.forget(&path);
                    cleared += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "failed to delete file");
                }
            }
        }

        if cleared > 0 {
            tracing::info!(
                cleared,
                dir = %self.config.monitor_dir.display(),
                "cleared monitored folder"
            );
        }
        cleared
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(artifact = %path.display(), "removed artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(artifact = %path.display(), error = %e, "failed to remove artifact");
        }
    }
}

//! Streaming-service device-id detector

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vdd_driver::VirtualDisplay;
use vdd_types::StreamingDeviceRecord;

use crate::log_scan::{self, DEFAULT_PAIR_WINDOW};
use crate::{DisplayCensus, ServerRestarter};

/// Detector configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Streaming server log file
    pub log_path: PathBuf,
    /// Upper bound on waiting for the post-restart log
    pub settle_timeout: Duration,
    pub poll_interval: Duration,
    /// Lines after a `device_id` searched for its `display_name`
    pub pair_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(r"C:\Program Files\Sunshine\config\sunshine.log"),
            settle_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            pair_window: DEFAULT_PAIR_WINDOW,
        }
    }
}

/// Size and mtime of the log before the restart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LogMark {
    len: Option<u64>,
    modified: Option<SystemTime>,
}

impl LogMark {
    async fn capture(path: &Path) -> Self {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Self {
                len: Some(meta.len()),
                modified: meta.modified().ok(),
            },
            Err(_) => Self {
                len: None,
                modified: None,
            },
        }
    }
}

/// One-shot probe for the streaming server's id of the virtual display
///
/// The display is enabled for the probe and disabled again afterwards;
/// callers that want it on must enable it themselves. Concurrent detections
/// run one after the other.
pub struct DeviceIdDetector {
    config: DetectorConfig,
    running: Mutex<()>,
    display: Arc<dyn VirtualDisplay>,
    restarter: Option<Arc<dyn ServerRestarter>>,
    census: Option<Arc<dyn DisplayCensus>>,
}

impl DeviceIdDetector {
    pub fn new(config: DetectorConfig, display: Arc<dyn VirtualDisplay>) -> Self {
        Self {
            config,
            running: Mutex::new(()),
            display,
            restarter: None,
            census: None,
        }
    }

    pub fn with_restarter(mut self, restarter: Arc<dyn ServerRestarter>) -> Self {
        self.restarter = Some(restarter);
        self
    }

    pub fn with_census(mut self, census: Arc<dyn DisplayCensus>) -> Self {
        self.census = Some(census);
        self
    }

    /// Run the detection sequence once
    ///
    /// Never fails: every problem is logged and yields `None`. Once the
    /// display has been enabled it is disabled exactly once before returning.
    pub async fn detect(&self) -> Option<String> {
        let _running = self.running.lock().await;

        if let Some(census) = &self.census {
            match census.physical_display_count().await {
                Ok(count) => info!("{} physical displays before detection", count),
                Err(e) => debug!("Physical display count unavailable: {}", e),
            }
        }

        if let Err(e) = self.display.enable().await {
            warn!("Detection aborted, virtual display not enabled: {}", e);
            return None;
        }

        let mark = LogMark::capture(&self.config.log_path).await;
        self.restart_server().await;

        let records = self.wait_for_records(mark).await;
        let selected = log_scan::select_highest(&records).cloned();

        match &selected {
            Some(record) => info!(
                "Streaming server device id {} ({})",
                record.device_id,
                log_scan::normalize_display_name(&record.display_name)
                    .unwrap_or_else(|| record.display_name.clone())
            ),
            None => warn!("No display device entries in {}", self.config.log_path.display()),
        }

        if let Err(e) = self.display.disable().await {
            warn!("Failed to disable virtual display after detection: {}", e);
        }

        selected.map(|record| record.device_id)
    }

    async fn restart_server(&self) {
        let Some(restarter) = &self.restarter else {
            warn!("No restart callback, reading existing log");
            return;
        };

        let outcome = restarter.restart().await;
        if outcome.success {
            debug!("Streaming server restarted");
        } else {
            warn!("Streaming server restart failed, reading existing log");
        }
    }

    /// Poll until the log has new device entries, or time out
    async fn wait_for_records(&self, mark: LogMark) -> Vec<StreamingDeviceRecord> {
        let deadline = Instant::now() + self.config.settle_timeout;

        loop {
            let changed = LogMark::capture(&self.config.log_path).await != mark;
            if changed {
                let records = self.read_records(mark).await;
                if !records.is_empty() {
                    debug!("Found {} device entries in log", records.len());
                    return records;
                }
            }

            if Instant::now() >= deadline {
                warn!(
                    "Log did not settle within {:?}, using current contents",
                    self.config.settle_timeout
                );
                return self.read_records(mark).await;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Records written since `mark`
    ///
    /// The log is append-only: a grown file is read from the old length on,
    /// so earlier sessions cannot compete. An untouched file (no restart
    /// happened) or a rewritten one is read whole.
    async fn read_records(&self, mark: LogMark) -> Vec<StreamingDeviceRecord> {
        let bytes = match tokio::fs::read(&self.config.log_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Cannot read {}: {}", self.config.log_path.display(), e);
                return Vec::new();
            }
        };

        let unchanged = LogMark::capture(&self.config.log_path).await == mark;
        let start = match mark.len.and_then(|len| usize::try_from(len).ok()) {
            Some(len) if !unchanged && len < bytes.len() => len,
            _ => 0,
        };
        if start > 0 {
            debug!("Reading {} appended log bytes", bytes.len() - start);
        }

        log_scan::parse_records(
            &String::from_utf8_lossy(&bytes[start..]),
            self.config.pair_window,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use vdd_types::{DriverStatus, VddError, VddResult};

    use super::*;
    use crate::RestartOutcome;

    const LOG_TWO_DISPLAYS: &str = "\
Info: Currently available display devices:
  \"device_id\": \"{AAAAAAAA-1111-2222-3333-444444444444}\",
  \"display_name\": \"\\\\\\\\.\\\\DISPLAY2\",
  \"device_id\": \"{BBBBBBBB-1111-2222-3333-444444444444}\",
  \"display_name\": \"\\\\\\\\.\\\\DISPLAY3\",
";

    #[derive(Default)]
    struct CountingDisplay {
        fail_enable: bool,
        enables: AtomicUsize,
        disables: AtomicUsize,
        enabled_now: AtomicUsize,
        max_enabled: AtomicUsize,
    }

    #[async_trait]
    impl VirtualDisplay for CountingDisplay {
        async fn enable(&self) -> VddResult<()> {
            self.enables.fetch_add(1, Ordering::SeqCst);
            if self.fail_enable {
                return Err(VddError::NotInstalled);
            }
            let now = self.enabled_now.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_enabled.fetch_max(now, Ordering::SeqCst);
            Ok(())
        }

        async fn disable(&self) -> VddResult<()> {
            self.disables.fetch_add(1, Ordering::SeqCst);
            self.enabled_now.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn status(&self) -> DriverStatus {
            DriverStatus::Disabled
        }
    }

    /// Writes `log` (if any) to the log path and reports `success`
    struct FakeServer {
        log_path: PathBuf,
        log: Option<&'static str>,
        success: bool,
        restarted: AtomicBool,
    }

    #[async_trait]
    impl ServerRestarter for FakeServer {
        async fn restart(&self) -> RestartOutcome {
            self.restarted.store(true, Ordering::SeqCst);
            if let Some(log) = self.log {
                tokio::fs::write(&self.log_path, log).await.unwrap();
            }
            RestartOutcome {
                success: self.success,
            }
        }
    }

    fn config(dir: &tempfile::TempDir) -> DetectorConfig {
        DetectorConfig {
            log_path: dir.path().join("sunshine.log"),
            settle_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_highest_display_selected_and_disabled_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let display = Arc::new(CountingDisplay::default());
        let server = Arc::new(FakeServer {
            log_path: config.log_path.clone(),
            log: Some(LOG_TWO_DISPLAYS),
            success: true,
            restarted: AtomicBool::new(false),
        });

        let detector = DeviceIdDetector::new(config, display.clone()).with_restarter(server);
        let id = detector.detect().await;

        assert_eq!(id.as_deref(), Some("{BBBBBBBB-1111-2222-3333-444444444444}"));
        assert_eq!(display.enables.load(Ordering::SeqCst), 1);
        assert_eq!(display.disables.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disable_exactly_once_for_every_outcome() {
        for restart_ok in [true, false] {
            for log in [Some(LOG_TWO_DISPLAYS), Some("Info: nothing useful\n"), None] {
                let dir = tempfile::tempdir().unwrap();
                let config = config(&dir);
                let display = Arc::new(CountingDisplay::default());
                let server = Arc::new(FakeServer {
                    log_path: config.log_path.clone(),
                    log,
                    success: restart_ok,
                    restarted: AtomicBool::new(false),
                });

                let detector =
                    DeviceIdDetector::new(config, display.clone()).with_restarter(server);
                let id = detector.detect().await;

                assert_eq!(id.is_some(), log == Some(LOG_TWO_DISPLAYS));
                assert_eq!(
                    display.disables.load(Ordering::SeqCst),
                    1,
                    "restart_ok={restart_ok} log={log:?}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_enable_failure_aborts_without_disable() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let display = Arc::new(CountingDisplay {
            fail_enable: true,
            ..Default::default()
        });
        let server = Arc::new(FakeServer {
            log_path: config.log_path.clone(),
            log: Some(LOG_TWO_DISPLAYS),
            success: true,
            restarted: AtomicBool::new(false),
        });

        let detector =
            DeviceIdDetector::new(config, display.clone()).with_restarter(server.clone());
        assert!(detector.detect().await.is_none());
        assert_eq!(display.disables.load(Ordering::SeqCst), 0);
        assert!(!server.restarted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_only_entries_appended_after_restart_compete() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        std::fs::write(
            &config.log_path,
            "\
Info: Currently available display devices:
  \"device_id\": \"{EEEEEEEE-0000-0000-0000-000000000005}\",
  \"display_name\": \"\\\\\\\\.\\\\DISPLAY5\",
",
        )
        .unwrap();

        struct AppendingServer {
            log_path: PathBuf,
        }

        #[async_trait]
        impl ServerRestarter for AppendingServer {
            async fn restart(&self) -> RestartOutcome {
                let mut log = tokio::fs::read_to_string(&self.log_path).await.unwrap();
                log.push_str(LOG_TWO_DISPLAYS);
                tokio::fs::write(&self.log_path, log).await.unwrap();
                RestartOutcome { success: true }
            }
        }

        let display = Arc::new(CountingDisplay::default());
        let server = Arc::new(AppendingServer {
            log_path: config.log_path.clone(),
        });
        let detector = DeviceIdDetector::new(config, display.clone()).with_restarter(server);

        assert_eq!(
            detector.detect().await.as_deref(),
            Some("{BBBBBBBB-1111-2222-3333-444444444444}")
        );
        assert_eq!(display.disables.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_detections_do_not_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let display = Arc::new(CountingDisplay::default());
        let server = Arc::new(FakeServer {
            log_path: config.log_path.clone(),
            log: Some(LOG_TWO_DISPLAYS),
            success: true,
            restarted: AtomicBool::new(false),
        });
        let detector = DeviceIdDetector::new(config, display.clone()).with_restarter(server);

        let (first, second) = tokio::join!(detector.detect(), detector.detect());
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(display.enables.load(Ordering::SeqCst), 2);
        assert_eq!(display.max_enabled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_without_restarter_reads_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        std::fs::write(&config.log_path, LOG_TWO_DISPLAYS).unwrap();
        let display = Arc::new(CountingDisplay::default());

        let detector = DeviceIdDetector::new(config, display.clone());
        let id = detector.detect().await;

        assert_eq!(id.as_deref(), Some("{BBBBBBBB-1111-2222-3333-444444444444}"));
        assert_eq!(display.disables.load(Ordering::SeqCst), 1);
    }
}

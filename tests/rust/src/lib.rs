//! Shared test utilities and fixtures for Blog integration tests.

pub use blog_core::{Config, ConfigUpdate, ConsoleSink, Level, LogEvent, Logger, LATEST_LOG};

/// Console capture
pub mod console {
    use blog_core::ConsoleSink;
    use std::io::Write;
    use std::sync::{Arc, Condvar, Mutex};

    /// In-memory console that can be read back after the engine wrote to it
    #[derive(Clone, Default)]
    pub struct CapturedConsole {
        bytes: Arc<Mutex<Vec<u8>>>,
    }

    impl CapturedConsole {
        pub fn new() -> Self {
            Self::default()
        }

        /// A sink writing into this capture
        pub fn sink(&self) -> ConsoleSink {
            ConsoleSink::from_writer(self.clone())
        }

        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedConsole {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Console whose writes block until [`GatedConsole::open`] is called.
    ///
    /// Stalls the coordinator on its first console line so tests can fill the
    /// command channel. Needs a multi-threaded runtime.
    #[derive(Clone, Default)]
    pub struct GatedConsole {
        gate: Arc<(Mutex<bool>, Condvar)>,
        inner: CapturedConsole,
    }

    impl GatedConsole {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sink(&self) -> ConsoleSink {
            ConsoleSink::from_writer(self.clone())
        }

        pub fn open(&self) {
            let (open, opened) = &*self.gate;
            *open.lock().unwrap() = true;
            opened.notify_all();
        }

        pub fn contents(&self) -> String {
            self.inner.contents()
        }
    }

    impl Write for GatedConsole {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let (open, opened) = &*self.gate;
            let mut is_open = open.lock().unwrap();
            while !*is_open {
                is_open = opened.wait(is_open).unwrap();
            }
            drop(is_open);
            self.inner.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}

/// Log directory inspection
pub mod files {
    use blog_core::LATEST_LOG;
    use std::path::Path;

    /// File names in `dir`, sorted
    pub fn list(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("Failed to read log directory")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Rotated (timestamped) files in `dir`
    pub fn rotated(dir: &Path) -> Vec<String> {
        list(dir)
            .into_iter()
            .filter(|name| name != LATEST_LOG && name.ends_with(".log"))
            .collect()
    }

    /// Contents of `latest.log`, or an empty string if it does not exist yet
    pub fn latest(dir: &Path) -> String {
        std::fs::read_to_string(dir.join(LATEST_LOG)).unwrap_or_default()
    }

    /// Message part of each line in `latest.log`
    pub fn latest_messages(dir: &Path) -> Vec<String> {
        latest(dir).lines().map(message_of).collect()
    }

    /// Strip the padded `[date,time,LEVEL]` prefix and any `[file:line]` location.
    pub fn message_of(line: &str) -> String {
        let rest = line.get(blog_core::event::PREFIX_WIDTH..).unwrap_or_default();
        match rest.strip_prefix('[').and_then(|r| r.split_once("] ")) {
            Some((location, message)) if location.contains(".rs:") => message.to_string(),
            _ => rest.to_string(),
        }
    }
}

/// Logger construction helpers
pub mod harness {
    use crate::console::CapturedConsole;
    use blog_core::{Config, Logger, DEFAULT_CHANNEL_CAPACITY};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// A logger writing into a temporary directory with a captured console.
    ///
    /// Periodic flushing is off unless a test turns it on, so file contents
    /// only change on explicit flushes or buffer overflow.
    pub struct TestLogger {
        pub logger: Logger,
        pub dir: TempDir,
        pub console: CapturedConsole,
        /// Exit codes passed to the exit hook
        pub exits: Arc<Mutex<Vec<i32>>>,
    }

    impl TestLogger {
        pub fn new() -> Self {
            Self::with_config(|_| {})
        }

        /// Start from the test defaults and let the caller adjust the config.
        pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
            Self::with_capacity(DEFAULT_CHANNEL_CAPACITY, adjust)
        }

        /// Like [`TestLogger::with_config`] with a custom command channel capacity.
        pub fn with_capacity(capacity: usize, adjust: impl FnOnce(&mut Config)) -> Self {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let console = CapturedConsole::new();
            let mut config = Config {
                directory: dir.path().to_path_buf(),
                flush_interval: Duration::ZERO,
                console: Some(console.sink()),
                ..Config::default()
            };
            adjust(&mut config);

            let exits = Arc::new(Mutex::new(Vec::new()));
            let recorded = exits.clone();
            let logger = Logger::builder()
                .channel_capacity(capacity)
                .exit_hook(move |code| recorded.lock().unwrap().push(code))
                .build(config)
                .expect("Failed to start logger");

            Self {
                logger,
                dir,
                console,
                exits,
            }
        }

        pub fn path(&self) -> &std::path::Path {
            self.dir.path()
        }

        pub async fn sync_flush(&self) {
            self.logger
                .sync_flush(Duration::from_secs(1))
                .await
                .expect("sync flush failed");
        }
    }

    /// Poll `condition` every 20ms until it holds or `timeout` elapses.
    pub async fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !condition() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }

    impl Default for TestLogger {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Install a test-friendly tracing subscriber once per test binary.
///
/// Honours `RUST_LOG`; output goes through the test harness capture.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

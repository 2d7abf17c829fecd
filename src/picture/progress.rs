use crate::global::console::Console;

/// Callbacks for a single download: `start`, any number of `update`s, `done`.
/// `done` is only reported for downloads that completed.
pub trait DownloadProgress: Send + Sync {
    fn start(&self, url: &str);
    fn update(&self, url: &str, fraction: f64, bytes_read: u64, total_bytes: u64);
    fn done(&self, url: &str);
}

/// Prints a dot per received chunk and a cheer per finished file
pub struct DotProgress {
    console: Console,
}

impl DotProgress {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

impl DownloadProgress for DotProgress {
    fn start(&self, url: &str) {
        tracing::debug!(url = %url, "Download started");
    }

    fn update(&self, _url: &str, _fraction: f64, _bytes_read: u64, _total_bytes: u64) {
        self.console.print(".");
    }

    fn done(&self, url: &str) {
        tracing::debug!(url = %url, "Download finished");
        self.console.print("\\o/");
    }
}

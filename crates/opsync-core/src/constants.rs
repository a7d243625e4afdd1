use once_cell::sync::Lazy;

/// User agent sent on every outbound request to the tracking service.
pub const USER_AGENT: &str = concat!("opsync/", env!("CARGO_PKG_VERSION"));

/// Page size used when a backend record does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Job queue buffer size - configurable via OPSYNC_QUEUE_BUFFER environment variable
pub static QUEUE_BUFFER: Lazy<usize> = Lazy::new(|| {
    std::env::var("OPSYNC_QUEUE_BUFFER")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(256)
});

//! Shared constants

/// File extensions accepted for evidence and media files when none are configured.
pub const DEFAULT_ALLOWED_FILE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "aac", "mp4", "mpeg4"];

/// Pattern a single cell tower descriptor in metadata must match.
pub const CELLS_PATTERN: &str = "^[0-9a-zA-Z:, -]+$";

/// Default bind address; the service normally sits behind a reverse proxy.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 9000;

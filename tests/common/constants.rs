//! Shared constants for end-to-end tests

use music_lister_server::Backend;

/// Every storage backend; behavioral tests run once per entry.
pub const ALL_BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

pub const TEST_USER_NAME: &str = "Test User";
pub const TEST_USER_EMAIL: &str = "testuser@example.com";

pub const OTHER_USER_NAME: &str = "Other User";
pub const OTHER_USER_EMAIL: &str = "other@example.com";

pub const WELCOME_MESSAGE: &str = "welcome to the Music API";
pub const PLAYLIST_DELETED_MESSAGE: &str = "Playlist deleted successfully";

// ============================================================================
// Timeouts
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

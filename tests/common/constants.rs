//! Shared constants for end-to-end tests

pub const TEST_USER: &str = "test_user";
pub const TEST_PASS: &str = "test_password";

pub const OTHER_USER: &str = "other_user";
pub const OTHER_PASS: &str = "other_password";

/// Song ids created by the fixture, in insertion order.
pub const SONG_PUBLIC_1: i64 = 1;
pub const SONG_PUBLIC_2: i64 = 2;
pub const SONG_PUBLIC_3: i64 = 3;
pub const SONG_PENDING: i64 = 4;

pub const MISSING_SONG_ID: i64 = 999999;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;

//! Tests against a real CDC-ACM echo device.
//!
//! Ignored by default; set `TEST_PORT` to the device's port and run with the
//! `--ignored` flag.

//! CLI Exit Code Registry
//!
//! Single source of truth for `ofdconv` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | General error (settings file unreadable or invalid)        |
//! | 2    | Usage error (bad arguments; emitted by clap)               |
//! | 3    | Input fault: the upload is wrong (status 400)              |
//! | 4    | Pipeline fault: conversion or packaging failed (status 500) |
//!
//! New codes go in this table and get a constant below.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - settings could not be loaded.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Wrong file type, empty or unreadable file, missing columns, bad values,
/// undecodable or malformed XML.
pub const EXIT_INPUT: u8 = 3;

/// Zero outputs, archive write or verification failure, scratch area failure.
pub const EXIT_PIPELINE: u8 = 4;

/// Map a boundary status to its exit code.
pub fn status_exit_code(status: u16) -> u8 {
    match status {
        200..=299 => EXIT_SUCCESS,
        400..=499 => EXIT_INPUT,
        _ => EXIT_PIPELINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_codes() {
        assert_eq!(status_exit_code(200), EXIT_SUCCESS);
        assert_eq!(status_exit_code(400), EXIT_INPUT);
        assert_eq!(status_exit_code(500), EXIT_PIPELINE);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_INPUT, EXIT_PIPELINE];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

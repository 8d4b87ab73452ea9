// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role-specific output truncation.

use pim_core::TruncationLimits;

/// Marker appended when output is cut.
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Apply byte and line caps. Returns the (possibly cut) output and whether
/// either bound was exceeded.
pub fn truncate_output(output: &str, limits: TruncationLimits) -> (String, bool) {
    let mut truncated = false;
    let mut out = output;

    if out.lines().count() > limits.lines {
        let mut end = 0;
        for (n, line) in out.lines().enumerate() {
            if n == limits.lines {
                break;
            }
            // line offset within the original slice
            end = line.as_ptr() as usize - out.as_ptr() as usize + line.len();
        }
        out = &out[..end];
        truncated = true;
    }

    let mut owned = if out.len() > limits.bytes {
        let mut end = limits.bytes;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        truncated = true;
        out[..end].to_string()
    } else {
        out.to_string()
    };

    if truncated {
        owned.push_str(TRUNCATION_MARKER);
    }
    (owned, truncated)
}

#[cfg(test)]
#[path = "truncate_tests.rs"]
mod tests;

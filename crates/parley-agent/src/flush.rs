// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token batching heuristic for streamed replies.

use parley_config::model::StreamingConfig;

/// Thresholds for [`should_flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Flush every `batch_size` tokens.
    pub batch_size: usize,
    /// Flush once the unsent buffer is longer than this many characters.
    pub buffer_threshold: usize,
    /// Always flush on multiples of this token count.
    pub forced_interval: usize,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            batch_size: 2,
            buffer_threshold: 15,
            forced_interval: 10,
        }
    }
}

impl From<&StreamingConfig> for FlushPolicy {
    fn from(config: &StreamingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            buffer_threshold: config.buffer_threshold,
            forced_interval: config.forced_interval.max(1),
        }
    }
}

fn ends_clause(token: &str) -> bool {
    if token.ends_with('\n') {
        return true;
    }
    matches!(
        token.trim_end().chars().last(),
        Some('.' | '!' | '?' | ',' | ';' | ':')
    )
}

/// Whether the pending buffer should be sent after the `token_count`-th token.
///
/// `token_count` is 1-based; `buffer_len` is the unsent buffer length in
/// characters including `token`.
pub fn should_flush(token_count: usize, token: &str, buffer_len: usize, policy: &FlushPolicy) -> bool {
    token_count % policy.batch_size == 0
        || ends_clause(token)
        || buffer_len > policy.buffer_threshold
        || token_count % policy.forced_interval == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> FlushPolicy {
        FlushPolicy::default()
    }

    #[test]
    fn even_counts_flush() {
        assert!(!should_flush(1, "hello", 5, &policy()));
        assert!(should_flush(2, "there", 10, &policy()));
    }

    #[test]
    fn punctuation_flushes_odd_counts() {
        assert!(should_flush(1, "Hi.", 3, &policy()));
        assert!(should_flush(3, "well, ", 6, &policy()));
        assert!(should_flush(5, "line\n", 5, &policy()));
        assert!(!should_flush(5, "word ", 5, &policy()));
    }

    #[test]
    fn long_buffer_flushes() {
        assert!(!should_flush(3, "ab", 15, &policy()));
        assert!(should_flush(3, "ab", 16, &policy()));
    }

    #[test]
    fn forced_interval_applies_with_large_batches() {
        let policy = FlushPolicy {
            batch_size: 7,
            buffer_threshold: 1000,
            forced_interval: 10,
        };
        assert!(!should_flush(9, "x", 1, &policy));
        assert!(should_flush(10, "x", 1, &policy));
        assert!(should_flush(14, "x", 1, &policy));
    }

    #[test]
    fn config_zeroes_are_clamped() {
        let policy = FlushPolicy::from(&StreamingConfig {
            batch_size: 0,
            forced_interval: 0,
            ..StreamingConfig::default()
        });
        assert_eq!(policy.batch_size, 1);
        assert_eq!(policy.forced_interval, 1);
    }

    proptest! {
        #[test]
        fn never_more_than_one_batch_unflushed(tokens in prop::collection::vec("[a-z]{1,4}", 1..80)) {
            let policy = policy();
            let mut pending = 0usize;
            let mut buffer = 0usize;
            for (i, token) in tokens.iter().enumerate() {
                pending += 1;
                buffer += token.len();
                if should_flush(i + 1, token, buffer, &policy) {
                    pending = 0;
                    buffer = 0;
                }
                prop_assert!(pending < policy.batch_size);
            }
        }
    }
}

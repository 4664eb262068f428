//! Credit pricing for generation work.
//!
//! Cost is linear in clip duration. The per-second rate comes from
//! configuration; the helpers here keep the arithmetic in one place so the
//! single and batch flows can never disagree.

/// Clip durations the provider accepts, in seconds.
pub const ALLOWED_SECONDS: [i64; 3] = [4, 8, 12];

/// Whether `seconds` is a duration the service accepts.
pub fn is_allowed_duration(seconds: i64) -> bool {
    ALLOWED_SECONDS.contains(&seconds)
}

/// Credits charged for a single clip.
pub fn clip_cost(seconds: i64, credits_per_second: i64) -> i64 {
    seconds * credits_per_second
}

/// Credits needed up front for a batch of `style_count` clips.
pub fn batch_cost(style_count: usize, seconds: i64, credits_per_second: i64) -> i64 {
    style_count as i64 * clip_cost(seconds, credits_per_second)
}

//! Window planning shared by every strategy

use crate::types::Message;

/// Which messages survive verbatim
#[derive(Debug, Clone)]
pub(crate) struct WindowPlan {
    pub keep: Vec<bool>,
    pub retained_tokens: usize,
    /// Indices of removed messages, oldest first
    pub dropped: Vec<usize>,
}

impl WindowPlan {
    pub fn kept<'a>(&'a self, messages: &'a [Message]) -> impl Iterator<Item = &'a Message> + 'a {
        messages
            .iter()
            .zip(self.keep.iter())
            .filter_map(|(m, keep)| keep.then_some(m))
    }
}

/// Smallest token count that satisfies the retention floor
pub(crate) fn retention_floor(original_tokens: usize) -> usize {
    // ceil(original * 0.3) without float rounding
    (original_tokens * 3).div_ceil(10)
}

/// Keep every user message, then the newest contiguous run of other
/// messages that fits in `preserve_recent`. If that leaves less than the
/// retention floor, the run is widened backwards until the floor holds.
pub(crate) fn plan_window(messages: &[Message], costs: &[usize], preserve_recent: usize) -> WindowPlan {
    let original: usize = costs.iter().sum();
    let mut keep: Vec<bool> = messages.iter().map(Message::is_protected).collect();
    let mut retained: usize = costs
        .iter()
        .zip(keep.iter())
        .filter_map(|(c, k)| k.then_some(*c))
        .sum();

    let candidates: Vec<usize> = (0..messages.len()).filter(|&i| !keep[i]).collect();
    // candidates[boundary..] are kept
    let mut boundary = candidates.len();

    let mut window = 0usize;
    while boundary > 0 {
        let cost = costs[candidates[boundary - 1]];
        if window + cost > preserve_recent {
            break;
        }
        window += cost;
        boundary -= 1;
        keep[candidates[boundary]] = true;
    }
    retained += window;

    let floor = retention_floor(original);
    while retained < floor && boundary > 0 {
        boundary -= 1;
        let idx = candidates[boundary];
        keep[idx] = true;
        retained += costs[idx];
    }

    WindowPlan {
        keep,
        retained_tokens: retained,
        dropped: candidates[..boundary].to_vec(),
    }
}

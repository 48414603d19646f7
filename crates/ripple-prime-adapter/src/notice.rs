/*
[INPUT]:  First client or stream construction in the process
[OUTPUT]: One-time licensing notice on the warn log level
[POS]:    Crate utility - process-wide notice
[UPDATE]: When the license terms change
*/

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

pub const LICENSING_NOTICE: &str = "This adapter is licensed under the Business Source License 1.1 (BSL 1.1). \
Use by for-profit organizations in production environments requires a commercial license from Velocity BPA. \
See https://velobpa.com/licensing or contact licensing@velobpa.com.";

static NOTICE_EMITTED: AtomicBool = AtomicBool::new(false);

/// Log the licensing notice; returns true only for the call that logged it
pub fn emit_licensing_notice() -> bool {
    if NOTICE_EMITTED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return false;
    }
    warn!(notice = LICENSING_NOTICE, "licensing notice");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_emitted_at_most_once() {
        let first = emit_licensing_notice();
        let second = emit_licensing_notice();
        assert!(!second);
        // another test in this process may have already emitted it
        assert!(first || NOTICE_EMITTED.load(Ordering::Acquire));
    }
}

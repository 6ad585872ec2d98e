//! Send/suppress policy

use check_result::CheckResult;

/// Decides which results are worth a notification.
///
/// Failures always notify; passing results are dropped unless the
/// operator opted into success or recovery notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyPolicy {
    /// Also notify on plain passing results
    pub send_success: bool,

    /// Also notify on recovery transitions
    pub send_recovered: bool,
}

impl NotifyPolicy {
    pub fn should_send(&self, result: &CheckResult) -> bool {
        if result.is_failure() {
            return true;
        }
        self.send_success || (self.send_recovered && result.recovered)
    }
}

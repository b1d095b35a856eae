use super::repo_types::ReminderStatus;
use crate::care::CareError;

impl ReminderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Upcoming => "upcoming",
            ReminderStatus::Completed => "completed",
            ReminderStatus::Missed => "missed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ReminderStatus::Upcoming)
    }
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only an upcoming reminder can move, and only to a terminal status.
pub fn transition(from: ReminderStatus, to: ReminderStatus) -> Result<ReminderStatus, CareError> {
    if from.is_terminal() {
        return Err(CareError::invalid(
            "status",
            format!("reminder is already {from}"),
        ));
    }
    if !to.is_terminal() {
        return Err(CareError::invalid("status", format!("cannot change a reminder to {to}")));
    }
    Ok(to)
}

use std::fmt;

/// Session clock: counts down for timed assignments, up otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Countdown { remaining_secs: u64 },
    Countup { elapsed_secs: u64 },
}

/// One-time advisory raised as a countdown nears zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerWarning {
    FiveMinutes,
    OneMinute,
}

impl TimerWarning {
    pub const ALL: [TimerWarning; 2] = [TimerWarning::FiveMinutes, TimerWarning::OneMinute];

    /// Remaining seconds at which the warning fires.
    #[must_use]
    pub fn threshold_secs(self) -> u64 {
        match self {
            Self::FiveMinutes => 300,
            Self::OneMinute => 60,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::FiveMinutes => "5 minutes remaining",
            Self::OneMinute => "1 minute remaining",
        }
    }
}

/// What a single one-second step of the timer produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerStep {
    /// Threshold crossed by this step, if any.
    pub crossed: Option<TimerWarning>,
    /// The countdown went from 1 to 0 on this step.
    pub ran_out: bool,
}

impl Timer {
    /// Countdown for timed assignments, count-up from zero otherwise.
    #[must_use]
    pub fn for_limit(limit_secs: Option<u64>) -> Self {
        match limit_secs {
            Some(remaining_secs) => Self::Countdown { remaining_secs },
            None => Self::Countup { elapsed_secs: 0 },
        }
    }

    #[must_use]
    pub fn is_countdown(&self) -> bool {
        matches!(self, Self::Countdown { .. })
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Self::Countdown { remaining_secs } => Some(*remaining_secs),
            Self::Countup { .. } => None,
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> Option<u64> {
        match self {
            Self::Countup { elapsed_secs } => Some(*elapsed_secs),
            Self::Countdown { .. } => None,
        }
    }

    /// `MM:SS` rendering; minutes are not wrapped into hours.
    #[must_use]
    pub fn display(&self) -> String {
        let secs = match self {
            Self::Countdown { remaining_secs } => *remaining_secs,
            Self::Countup { elapsed_secs } => *elapsed_secs,
        };
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    pub(crate) fn step(&mut self) -> TimerStep {
        match self {
            Self::Countup { elapsed_secs } => {
                *elapsed_secs = elapsed_secs.saturating_add(1);
                TimerStep {
                    crossed: None,
                    ran_out: false,
                }
            }
            Self::Countdown { remaining_secs } => {
                let before = *remaining_secs;
                let after = before.saturating_sub(1);
                *remaining_secs = after;
                let crossed = TimerWarning::ALL
                    .into_iter()
                    .find(|w| before > w.threshold_secs() && after <= w.threshold_secs());
                TimerStep {
                    crossed,
                    ran_out: before == 1 && after == 0,
                }
            }
        }
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_reports_thresholds_once() {
        let mut timer = Timer::Countdown { remaining_secs: 301 };
        assert_eq!(timer.step().crossed, Some(TimerWarning::FiveMinutes));
        assert_eq!(timer.step().crossed, None);
    }

    #[test]
    fn countdown_runs_out_only_on_one_to_zero() {
        let mut timer = Timer::Countdown { remaining_secs: 2 };
        assert!(!timer.step().ran_out);
        assert!(timer.step().ran_out);
        assert!(!timer.step().ran_out);
        assert_eq!(timer.remaining_secs(), Some(0));
    }

    #[test]
    fn countup_has_no_ceiling() {
        let mut timer = Timer::Countup { elapsed_secs: 3599 };
        timer.step();
        assert_eq!(timer.display(), "60:00");
    }

    #[test]
    fn limit_selects_mode() {
        assert_eq!(
            Timer::for_limit(Some(60)),
            Timer::Countdown { remaining_secs: 60 }
        );
        assert_eq!(Timer::for_limit(None), Timer::Countup { elapsed_secs: 0 });
    }
}

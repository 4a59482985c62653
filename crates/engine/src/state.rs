//! The four-phase connection state every role (generator, sender,
//! receiver) independently steps through as a transfer winds down.

/// `TRANSFER -> TEARDOWN_1 -> TEARDOWN_2 -> STOPPED`, advanced one phase
/// at a time by [`ConnectionState::step_teardown`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectionState {
    #[default]
    Transfer,
    Teardown1,
    Teardown2,
    Stopped,
}

impl ConnectionState {
    /// Advances one phase towards `Stopped`. Calling this on `Stopped`
    /// leaves it unchanged.
    pub fn step_teardown(&mut self) {
        *self = match self {
            Self::Transfer => Self::Teardown1,
            Self::Teardown1 => Self::Teardown2,
            Self::Teardown2 | Self::Stopped => Self::Stopped,
        };
    }

    #[must_use]
    pub const fn is_transfer(self) -> bool {
        matches!(self, Self::Transfer)
    }

    #[must_use]
    pub const fn is_tearing_down(self) -> bool {
        matches!(self, Self::Teardown1 | Self::Teardown2)
    }

    #[must_use]
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_through_every_phase_in_order() {
        let mut state = ConnectionState::default();
        assert!(state.is_transfer());

        state.step_teardown();
        assert_eq!(state, ConnectionState::Teardown1);
        assert!(state.is_tearing_down());

        state.step_teardown();
        assert_eq!(state, ConnectionState::Teardown2);
        assert!(state.is_tearing_down());

        state.step_teardown();
        assert_eq!(state, ConnectionState::Stopped);
        assert!(state.is_stopped());

        state.step_teardown();
        assert_eq!(state, ConnectionState::Stopped);
    }
}

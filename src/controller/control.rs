//! Control intents and validated mutation

use std::str::FromStr;

use crate::net::protocol::InputFlags;

/// The seven recognized control intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlIntent {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sneak,
    Sprint,
}

impl ControlIntent {
    pub const ALL: [ControlIntent; 7] = [
        Self::Forward,
        Self::Back,
        Self::Left,
        Self::Right,
        Self::Jump,
        Self::Sneak,
        Self::Sprint,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
            Self::Jump => "jump",
            Self::Sneak => "sneak",
            Self::Sprint => "sprint",
        }
    }
}

impl FromStr for ControlIntent {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Self::Forward),
            "back" => Ok(Self::Back),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "jump" => Ok(Self::Jump),
            "sneak" => Ok(Self::Sneak),
            "sprint" => Ok(Self::Sprint),
            other => Err(ControlError::UnknownIntent(other.to_string())),
        }
    }
}

/// Current control intents plus the one-shot jump request.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    flags: InputFlags,
    jump_queued: bool,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a control intent. No-op if the value is unchanged; setting `jump`
    /// to true raises the one-shot jump request.
    pub fn set(&mut self, intent: ControlIntent, active: bool) {
        if *self.flag_mut(intent) == active {
            return;
        }
        *self.flag_mut(intent) = active;
        if intent == ControlIntent::Jump && active {
            self.jump_queued = true;
        }
    }

    /// String boundary for untrusted intent names.
    pub fn set_by_name(&mut self, name: &str, active: bool) -> Result<(), ControlError> {
        let intent = name.parse()?;
        self.set(intent, active);
        Ok(())
    }

    pub fn get(&self, intent: ControlIntent) -> bool {
        match intent {
            ControlIntent::Forward => self.flags.forward,
            ControlIntent::Back => self.flags.back,
            ControlIntent::Left => self.flags.left,
            ControlIntent::Right => self.flags.right,
            ControlIntent::Jump => self.flags.jump,
            ControlIntent::Sneak => self.flags.sneak,
            ControlIntent::Sprint => self.flags.sprint,
        }
    }

    /// Direct write for trusted internal callers; bypasses jump bookkeeping.
    pub fn spoof_set(&mut self, intent: ControlIntent, active: bool) {
        *self.flag_mut(intent) = active;
    }

    /// Release every intent through the validated path.
    pub fn clear_all(&mut self) {
        for intent in ControlIntent::ALL {
            self.set(intent, false);
        }
    }

    /// Hard reset used on lifecycle transitions; drops any queued jump.
    pub fn force_reset(&mut self) {
        self.flags = InputFlags::default();
        self.jump_queued = false;
    }

    /// The full intent vector as transmitted on the wire.
    pub fn flags(&self) -> InputFlags {
        self.flags
    }

    /// Consume the one-shot jump request.
    pub fn take_jump_request(&mut self) -> bool {
        std::mem::take(&mut self.jump_queued)
    }

    fn flag_mut(&mut self, intent: ControlIntent) -> &mut bool {
        match intent {
            ControlIntent::Forward => &mut self.flags.forward,
            ControlIntent::Back => &mut self.flags.back,
            ControlIntent::Left => &mut self.flags.left,
            ControlIntent::Right => &mut self.flags.right,
            ControlIntent::Jump => &mut self.flags.jump,
            ControlIntent::Sneak => &mut self.flags.sneak,
            ControlIntent::Sprint => &mut self.flags.sprint,
        }
    }
}

/// Control validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("unrecognized control intent: {0}")]
    UnknownIntent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_reflects_most_recent_set() {
        let mut controls = ControlState::new();
        controls.set(ControlIntent::Forward, true);
        assert!(controls.get(ControlIntent::Forward));
        controls.set(ControlIntent::Forward, false);
        assert!(!controls.get(ControlIntent::Forward));
    }

    #[test]
    fn unknown_intent_fails_without_mutation() {
        let mut controls = ControlState::new();
        let err = controls.set_by_name("strafe", true).unwrap_err();
        assert_eq!(err, ControlError::UnknownIntent("strafe".to_string()));
        assert_eq!(controls.flags(), InputFlags::default());
    }

    #[test]
    fn jump_request_is_one_shot() {
        let mut controls = ControlState::new();
        controls.set(ControlIntent::Jump, true);
        assert!(controls.take_jump_request());
        assert!(!controls.take_jump_request());

        // re-setting an already-held jump does not re-queue
        controls.set(ControlIntent::Jump, true);
        assert!(!controls.take_jump_request());
    }

    #[test]
    fn spoof_set_skips_jump_bookkeeping() {
        let mut controls = ControlState::new();
        controls.spoof_set(ControlIntent::Jump, true);
        assert!(controls.get(ControlIntent::Jump));
        assert!(!controls.take_jump_request());
    }

    #[test]
    fn clear_all_releases_everything() {
        let mut controls = ControlState::new();
        for intent in ControlIntent::ALL {
            controls.set(intent, true);
        }
        controls.clear_all();
        assert_eq!(controls.flags(), InputFlags::default());
    }
}

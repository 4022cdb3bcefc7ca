use crate::{DeviceState, DigitalState, InputError};

/// Button id that marks a matcher as not configured.
pub const UNCONFIGURED: i32 = -1;

/// A configured set of wand buttons tested together against one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatcher {
    buttons: Vec<i32>,
}

impl Default for CommandMatcher {
    fn default() -> Self {
        Self {
            buttons: vec![UNCONFIGURED],
        }
    }
}

impl CommandMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_buttons(buttons: impl Into<Vec<i32>>) -> Self {
        Self {
            buttons: buttons.into(),
        }
    }

    /// Parse a comma- and/or whitespace-separated list of button ids,
    /// replacing the current list. On error the matcher is left unchanged.
    pub fn configure(&mut self, list: &str) -> Result<(), InputError> {
        let buttons = list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<i32>()
                    .map_err(|_| InputError::MalformedButtonList {
                        input: list.to_string(),
                        token: t.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(?buttons, "command configured");
        self.buttons = buttons;
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.buttons.iter().any(|&b| b != UNCONFIGURED)
    }

    pub fn buttons(&self) -> &[i32] {
        &self.buttons
    }

    /// True iff every configured button is currently in `target`.
    pub fn test(&self, device: &dyn DeviceState, target: DigitalState) -> bool {
        self.is_configured() && self.buttons.iter().all(|&b| device.button(b) == target)
    }
}

impl std::fmt::Display for CommandMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.buttons.iter().map(i32::to_string).collect();
        write!(f, "{}", ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WandState;

    fn pressed(buttons: &[i32]) -> WandState {
        let mut wand = WandState::new(4, 0);
        wand.begin_frame();
        wand.hold_only(buttons).unwrap();
        wand
    }

    #[test]
    fn default_holds_sentinel() {
        let m = CommandMatcher::new();
        assert_eq!(m.buttons(), &[UNCONFIGURED]);
        assert!(!m.is_configured());
    }

    #[test]
    fn unconfigured_never_matches() {
        let wand = pressed(&[]);
        let m = CommandMatcher::new();
        assert!(!m.test(&wand, DigitalState::Off));
        assert!(!m.test(&wand, DigitalState::ToggleOn));

        let empty = CommandMatcher::from_buttons(Vec::new());
        assert!(!empty.is_configured());
        assert!(!empty.test(&wand, DigitalState::Off));
    }

    #[test]
    fn configure_trims_and_splits() {
        let mut m = CommandMatcher::new();
        m.configure(" 1, 3 ,2 ").unwrap();
        assert_eq!(m.buttons(), &[1, 3, 2]);
        m.configure("0 1").unwrap();
        assert_eq!(m.buttons(), &[0, 1]);
        assert_eq!(m.to_string(), "0, 1");
    }

    #[test]
    fn malformed_token_is_rejected() {
        let mut m = CommandMatcher::from_buttons(vec![2]);
        let err = m.configure("1, x").unwrap_err();
        assert!(matches!(
            err,
            InputError::MalformedButtonList { ref token, .. } if token == "x"
        ));
        assert_eq!(m.buttons(), &[2]);
    }

    #[test]
    fn all_buttons_must_match() {
        let m = CommandMatcher::from_buttons(vec![0, 1]);
        assert!(m.test(&pressed(&[0, 1]), DigitalState::ToggleOn));
        assert!(!m.test(&pressed(&[0]), DigitalState::ToggleOn));
    }

    #[test]
    fn equality_compares_lists() {
        let a = CommandMatcher::from_buttons(vec![0]);
        let mut b = CommandMatcher::new();
        b.configure("0").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, CommandMatcher::from_buttons(vec![1]));
    }
}

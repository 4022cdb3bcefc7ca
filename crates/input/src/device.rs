use glam::Mat4;

use crate::InputError;

/// Per-frame state of a digital button.
///
/// `ToggleOn` is reported only on the frame the button went down and
/// `ToggleOff` only on the frame it came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigitalState {
    #[default]
    Off,
    On,
    ToggleOn,
    ToggleOff,
}

impl DigitalState {
    /// Edge state from the raw level on the previous and current frame.
    pub fn from_levels(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, false) => Self::Off,
            (false, true) => Self::ToggleOn,
            (true, true) => Self::On,
            (true, false) => Self::ToggleOff,
        }
    }

    /// True for `On` and `ToggleOn`.
    pub fn is_down(self) -> bool {
        matches!(self, Self::On | Self::ToggleOn)
    }
}

/// Read-only view of a tracked wand for the current frame.
///
/// Out-of-range indices return `DigitalState::Off` and `0.0`.
pub trait DeviceState {
    fn button(&self, index: i32) -> DigitalState;
    fn analog(&self, index: i32) -> f32;
    /// Wand pose in world coordinates.
    fn pose(&self) -> Mat4;
}

/// In-memory wand fed by the host loop (or a scripted scenario).
#[derive(Debug, Clone)]
pub struct WandState {
    previous: Vec<bool>,
    current: Vec<bool>,
    analogs: Vec<f32>,
    pose: Mat4,
}

impl WandState {
    pub fn new(buttons: usize, analogs: usize) -> Self {
        Self {
            previous: vec![false; buttons],
            current: vec![false; buttons],
            analogs: vec![0.0; analogs],
            pose: Mat4::IDENTITY,
        }
    }

    pub fn button_count(&self) -> usize {
        self.current.len()
    }

    pub fn analog_count(&self) -> usize {
        self.analogs.len()
    }

    /// Latch this frame's button levels so the next frame's edges are
    /// computed against them. Call once before applying new input.
    pub fn begin_frame(&mut self) {
        self.previous.copy_from_slice(&self.current);
    }

    pub fn set_button(&mut self, index: i32, down: bool) -> Result<(), InputError> {
        let i = slot(index, self.current.len(), "button")?;
        self.current[i] = down;
        Ok(())
    }

    /// Hold exactly the listed buttons, releasing every other one.
    pub fn hold_only(&mut self, held: &[i32]) -> Result<(), InputError> {
        self.current.iter_mut().for_each(|b| *b = false);
        for &index in held {
            self.set_button(index, true)?;
        }
        Ok(())
    }

    pub fn set_analog(&mut self, index: i32, value: f32) -> Result<(), InputError> {
        let i = slot(index, self.analogs.len(), "analog")?;
        self.analogs[i] = value;
        Ok(())
    }

    pub fn set_pose(&mut self, pose: Mat4) {
        self.pose = pose;
    }

    pub fn checked_button(&self, index: i32) -> Result<DigitalState, InputError> {
        let i = slot(index, self.current.len(), "button")?;
        Ok(DigitalState::from_levels(self.previous[i], self.current[i]))
    }

    pub fn checked_analog(&self, index: i32) -> Result<f32, InputError> {
        let i = slot(index, self.analogs.len(), "analog")?;
        Ok(self.analogs[i])
    }
}

fn slot(index: i32, len: usize, kind: &'static str) -> Result<usize, InputError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(InputError::InvalidIndex { kind, index, len })
}

impl DeviceState for WandState {
    fn button(&self, index: i32) -> DigitalState {
        self.checked_button(index).unwrap_or_default()
    }

    fn analog(&self, index: i32) -> f32 {
        self.checked_analog(index).unwrap_or(0.0)
    }

    fn pose(&self) -> Mat4 {
        self.pose
    }
}

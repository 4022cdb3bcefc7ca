use grasp_common::ObjectId;
use grasp_input::{CommandMatcher, DigitalState};

use super::{GrabCallbacks, GrabStrategy, Inputs};
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "single_object_grab_strategy";

/// Grabs the intersected object on the grab button's press.
///
/// Released by the release button's press, or by letting go of the grab
/// button when no release button is configured.
pub struct SingleObjectGrab {
    grab: CommandMatcher,
    release: CommandMatcher,
    inputs: Inputs,
    grabbed: Option<ObjectId>,
    focused: bool,
    callbacks: GrabCallbacks,
}

impl SingleObjectGrab {
    pub fn new(grab: CommandMatcher, release: CommandMatcher) -> Self {
        Self {
            grab,
            release,
            inputs: Inputs::default(),
            grabbed: None,
            focused: true,
            callbacks: GrabCallbacks::default(),
        }
    }

    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        let e = element.ok_or_else(|| ManipError::config(ELEMENT, "element is required"))?;
        e.require_version(1)?;
        let grab = e.buttons("grab_button_nums")?;
        if !grab.is_configured() {
            return Err(ManipError::config(ELEMENT, "grab_button_nums is empty"));
        }
        Ok(Self::new(grab, e.buttons_or_unset("release_button_nums")?))
    }

    fn release_pressed(&self, ctx: &Context<'_>) -> bool {
        if self.release.is_configured() {
            self.release.test(ctx.device, DigitalState::ToggleOn)
        } else {
            self.grab.test(ctx.device, DigitalState::ToggleOff)
        }
    }

    fn release(&mut self) {
        if let Some(object) = self.grabbed.take() {
            tracing::info!(%object, "released");
            self.callbacks.released(&[object]);
        }
    }
}

impl GrabStrategy for SingleObjectGrab {
    fn name(&self) -> &str {
        "SingleObjectGrab"
    }

    fn init(&mut self, ctx: &Context<'_>, callbacks: GrabCallbacks) -> Result<(), ManipError> {
        self.inputs.connect(ctx, true);
        self.callbacks = callbacks;
        tracing::debug!(grab = %self.grab, release = %self.release, "single grab ready");
        Ok(())
    }

    fn set_focus(&mut self, active: bool) {
        self.focused = active;
    }

    fn update(&mut self, ctx: &Context<'_>) {
        self.inputs.poll_intersections();
        let cleared = self.inputs.cleared_grabbables();
        if self.grabbed.is_some_and(|o| cleared.contains(&o)) {
            self.release();
        }
        if !self.focused {
            return;
        }

        match self.grabbed {
            None => {
                if !self.grab.test(ctx.device, DigitalState::ToggleOn) {
                    return;
                }
                if let Some((object, point)) = self.inputs.current {
                    if ctx.scene.is_grabbable(object) {
                        tracing::info!(%object, "grabbed");
                        self.grabbed = Some(object);
                        self.callbacks.grabbed(&[object], point);
                    }
                }
            }
            Some(_) => {
                if self.release_pressed(ctx) {
                    self.release();
                }
            }
        }
    }

    fn grabbed_objects(&self) -> Vec<ObjectId> {
        self.grabbed.into_iter().collect()
    }

    fn release_objects(&mut self, _ctx: &Context<'_>, objects: &[ObjectId]) {
        if self.grabbed.is_some_and(|o| objects.contains(&o)) {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, CallLog, Rig, recorder};
    use grasp_scene::ObjectDesc;

    fn strategy(rig: &Rig, grab: &[i32], release: &[i32]) -> (SingleObjectGrab, CallLog) {
        let release = if release.is_empty() {
            CommandMatcher::new()
        } else {
            CommandMatcher::from_buttons(release.to_vec())
        };
        let mut s = SingleObjectGrab::new(CommandMatcher::from_buttons(grab.to_vec()), release);
        let (callbacks, log) = recorder();
        s.init(&rig.ctx(), callbacks).unwrap();
        (s, log)
    }

    #[test]
    fn momentary_grab_and_release() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o"));
        let (mut s, log) = strategy(&rig, &[0], &[]);

        rig.intersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        assert_eq!(s.grabbed_objects(), vec![o]);

        rig.frame(&[]);
        s.update(&rig.ctx());
        assert!(s.grabbed_objects().is_empty());
        assert_eq!(
            *log.borrow(),
            vec![Call::Grab(vec![o]), Call::Release(vec![o])]
        );
    }

    #[test]
    fn separate_release_button() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o"));
        let (mut s, log) = strategy(&rig, &[0], &[1]);

        rig.intersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        rig.frame(&[]);
        s.update(&rig.ctx());
        assert_eq!(s.grabbed_objects(), vec![o]);

        rig.frame(&[1]);
        s.update(&rig.ctx());
        assert!(s.grabbed_objects().is_empty());
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn press_without_intersection_does_nothing() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o"));
        let (mut s, log) = strategy(&rig, &[0], &[]);

        rig.intersect(o);
        rig.deintersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        assert!(s.grabbed_objects().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn losing_intersection_keeps_grab() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o"));
        let other = rig.scene.spawn(ObjectDesc::new("other"));
        let (mut s, _log) = strategy(&rig, &[0], &[1]);

        rig.intersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        rig.deintersect(o);
        rig.intersect(other);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        assert_eq!(s.grabbed_objects(), vec![o]);
    }

    #[test]
    fn cleared_grabbable_releases() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o"));
        let (mut s, log) = strategy(&rig, &[0], &[1]);

        rig.intersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        rig.scene.set_grabbable(o, false);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        assert!(s.grabbed_objects().is_empty());
        assert_eq!(log.borrow().last(), Some(&Call::Release(vec![o])));
    }

    #[test]
    fn non_grabbable_is_not_grabbed() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o").grabbable(false));
        let (mut s, _log) = strategy(&rig, &[0], &[]);
        rig.intersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        assert!(s.grabbed_objects().is_empty());
    }

    #[test]
    fn unfocused_ignores_buttons() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o"));
        let (mut s, _log) = strategy(&rig, &[0], &[]);
        s.set_focus(false);
        rig.intersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        assert!(s.grabbed_objects().is_empty());
    }

    #[test]
    fn forced_release_is_idempotent() {
        let mut rig = Rig::new();
        let o = rig.scene.spawn(ObjectDesc::new("o"));
        let (mut s, log) = strategy(&rig, &[0], &[1]);
        s.release_objects(&rig.ctx(), &[o]);
        assert!(log.borrow().is_empty());

        rig.intersect(o);
        rig.frame(&[0]);
        s.update(&rig.ctx());
        s.release_objects(&rig.ctx(), &[o]);
        s.release_objects(&rig.ctx(), &[o]);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn config_requires_grab_buttons() {
        assert!(SingleObjectGrab::from_config(None).is_err());
        let e = ConfigElement::new(ELEMENT);
        assert!(SingleObjectGrab::from_config(Some(&e)).is_err());
        let e = e.with("grab_button_nums", "0");
        let s = SingleObjectGrab::from_config(Some(&e)).unwrap();
        assert!(!s.release.is_configured());
    }
}

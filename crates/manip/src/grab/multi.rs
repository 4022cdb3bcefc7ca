use glam::Vec3;
use grasp_common::ObjectId;
use grasp_input::{CommandMatcher, DigitalState};

use super::{GrabCallbacks, GrabStrategy, Inputs, take_present};
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "multi_object_grab_strategy";

/// Builds a chosen set with the choose button, then grabs and releases it
/// as a whole.
pub struct MultiObjectGrab {
    choose: CommandMatcher,
    grab: CommandMatcher,
    release: CommandMatcher,
    inputs: Inputs,
    chosen: Vec<ObjectId>,
    grabbed: Vec<ObjectId>,
    focused: bool,
    callbacks: GrabCallbacks,
}

impl MultiObjectGrab {
    pub fn new(choose: CommandMatcher, grab: CommandMatcher, release: CommandMatcher) -> Self {
        Self {
            choose,
            grab,
            release,
            inputs: Inputs::default(),
            chosen: Vec::new(),
            grabbed: Vec::new(),
            focused: true,
            callbacks: GrabCallbacks::default(),
        }
    }

    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        let e = element.ok_or_else(|| ManipError::config(ELEMENT, "element is required"))?;
        e.require_version(1)?;
        Ok(Self::new(
            e.buttons("choose_button_nums")?,
            e.buttons("grab_button_nums")?,
            e.buttons("release_button_nums")?,
        ))
    }

    /// Objects waiting to be grabbed, in the order they were chosen.
    pub fn chosen_objects(&self) -> &[ObjectId] {
        &self.chosen
    }

    fn toggle_chosen(&mut self, ctx: &Context<'_>, object: ObjectId) {
        if let Some(pos) = self.chosen.iter().position(|o| *o == object) {
            self.chosen.remove(pos);
            tracing::debug!(%object, "unchosen");
            ctx.bus.selection_list_reduced.publish(vec![object]);
        } else {
            self.chosen.push(object);
            tracing::debug!(%object, "chosen");
            ctx.bus.selection_list_expanded.publish(vec![object]);
        }
    }

    fn evict(&mut self, ctx: &Context<'_>, objects: &[ObjectId]) {
        let unchosen = take_present(&mut self.chosen, objects);
        if !unchosen.is_empty() {
            ctx.bus.selection_list_reduced.publish(unchosen);
        }
        let released = take_present(&mut self.grabbed, objects);
        if !released.is_empty() {
            tracing::info!(count = released.len(), "released");
            self.callbacks.released(&released);
        }
    }
}

impl GrabStrategy for MultiObjectGrab {
    fn name(&self) -> &str {
        "MultiObjectGrab"
    }

    fn init(&mut self, ctx: &Context<'_>, callbacks: GrabCallbacks) -> Result<(), ManipError> {
        self.inputs.connect(ctx, true);
        self.callbacks = callbacks;
        Ok(())
    }

    fn set_focus(&mut self, active: bool) {
        self.focused = active;
    }

    fn update(&mut self, ctx: &Context<'_>) {
        self.inputs.poll_intersections();
        let cleared = self.inputs.cleared_grabbables();
        if !cleared.is_empty() {
            self.evict(ctx, &cleared);
        }
        if !self.focused {
            return;
        }

        // At most one of choose, release and grab per frame.
        if self.choose.test(ctx.device, DigitalState::ToggleOn) {
            if let Some((object, _)) = self.inputs.current {
                if ctx.scene.is_grabbable(object) && !self.grabbed.contains(&object) {
                    self.toggle_chosen(ctx, object);
                }
            }
        } else if !self.grabbed.is_empty() && self.release.test(ctx.device, DigitalState::ToggleOn)
        {
            let released = std::mem::take(&mut self.grabbed);
            tracing::info!(count = released.len(), "released");
            self.callbacks.released(&released);
        } else if !self.chosen.is_empty() && self.grab.test(ctx.device, DigitalState::ToggleOn) {
            let objects = std::mem::take(&mut self.chosen);
            let point = self
                .inputs
                .current
                .map(|(_, p)| p)
                .unwrap_or_else(|| ctx.device.pose().transform_point3(Vec3::ZERO));
            ctx.bus.selection_list_reduced.publish(objects.clone());
            self.grabbed.extend(&objects);
            tracing::info!(count = objects.len(), "grabbed");
            self.callbacks.grabbed(&objects, point);
        }
    }

    fn grabbed_objects(&self) -> Vec<ObjectId> {
        self.grabbed.clone()
    }

    fn release_objects(&mut self, ctx: &Context<'_>, objects: &[ObjectId]) {
        self.evict(ctx, objects);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, CallLog, Rig, recorder};
    use grasp_scene::ObjectDesc;

    const CHOOSE: i32 = 2;
    const GRAB: i32 = 0;
    const RELEASE: i32 = 1;

    fn strategy(rig: &Rig) -> (MultiObjectGrab, CallLog) {
        let mut s = MultiObjectGrab::new(
            CommandMatcher::from_buttons(vec![CHOOSE]),
            CommandMatcher::from_buttons(vec![GRAB]),
            CommandMatcher::from_buttons(vec![RELEASE]),
        );
        let (callbacks, log) = recorder();
        s.init(&rig.ctx(), callbacks).unwrap();
        (s, log)
    }

    /// One press of `button` followed by a frame with nothing held.
    fn press(rig: &mut Rig, s: &mut MultiObjectGrab, button: i32) {
        rig.frame(&[button]);
        s.update(&rig.ctx());
        rig.frame(&[]);
        s.update(&rig.ctx());
    }

    #[test]
    fn choose_toggles_then_grab_takes_whole_set() {
        let mut rig = Rig::new();
        let a = rig.scene.spawn(ObjectDesc::new("a"));
        let b = rig.scene.spawn(ObjectDesc::new("b"));
        let c = rig.scene.spawn(ObjectDesc::new("c"));
        let (mut s, log) = strategy(&rig);

        rig.intersect(a);
        press(&mut rig, &mut s, CHOOSE);
        assert_eq!(s.chosen_objects(), &[a]);
        press(&mut rig, &mut s, CHOOSE);
        assert!(s.chosen_objects().is_empty());

        rig.intersect(b);
        press(&mut rig, &mut s, CHOOSE);
        rig.intersect(c);
        press(&mut rig, &mut s, CHOOSE);
        assert_eq!(s.chosen_objects(), &[b, c]);

        press(&mut rig, &mut s, GRAB);
        assert_eq!(*log.borrow(), vec![Call::Grab(vec![b, c])]);
        assert!(s.chosen_objects().is_empty());
        assert_eq!(s.grabbed_objects(), vec![b, c]);

        press(&mut rig, &mut s, RELEASE);
        assert_eq!(log.borrow().last(), Some(&Call::Release(vec![b, c])));
        assert!(s.grabbed_objects().is_empty());
    }

    #[test]
    fn selection_list_events() {
        let mut rig = Rig::new();
        let a = rig.scene.spawn(ObjectDesc::new("a"));
        let expanded = rig.bus.selection_list_expanded.subscribe();
        let reduced = rig.bus.selection_list_reduced.subscribe();
        let (mut s, _log) = strategy(&rig);

        rig.intersect(a);
        press(&mut rig, &mut s, CHOOSE);
        assert_eq!(expanded.drain(), vec![vec![a]]);
        press(&mut rig, &mut s, GRAB);
        assert_eq!(reduced.drain(), vec![vec![a]]);
    }

    #[test]
    fn choose_and_grab_in_one_frame_only_chooses() {
        let mut rig = Rig::new();
        let a = rig.scene.spawn(ObjectDesc::new("a"));
        let (mut s, log) = strategy(&rig);
        rig.intersect(a);

        rig.frame(&[CHOOSE, GRAB]);
        s.update(&rig.ctx());
        assert_eq!(s.chosen_objects(), &[a]);
        assert!(s.grabbed_objects().is_empty());
        assert!(log.borrow().is_empty());

        rig.frame(&[]);
        s.update(&rig.ctx());
        press(&mut rig, &mut s, GRAB);
        assert_eq!(*log.borrow(), vec![Call::Grab(vec![a])]);
    }

    #[test]
    fn grab_with_empty_chosen_set_does_nothing() {
        let mut rig = Rig::new();
        let a = rig.scene.spawn(ObjectDesc::new("a"));
        let (mut s, log) = strategy(&rig);
        rig.intersect(a);
        press(&mut rig, &mut s, GRAB);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn cleared_grabbable_evicts_from_both_sets() {
        let mut rig = Rig::new();
        let a = rig.scene.spawn(ObjectDesc::new("a"));
        let b = rig.scene.spawn(ObjectDesc::new("b"));
        let (mut s, log) = strategy(&rig);

        rig.intersect(a);
        press(&mut rig, &mut s, CHOOSE);
        press(&mut rig, &mut s, GRAB);
        rig.intersect(b);
        press(&mut rig, &mut s, CHOOSE);

        rig.scene.set_grabbable(a, false);
        rig.scene.set_grabbable(b, false);
        rig.frame(&[]);
        s.update(&rig.ctx());
        assert!(s.grabbed_objects().is_empty());
        assert!(s.chosen_objects().is_empty());
        assert_eq!(log.borrow().last(), Some(&Call::Release(vec![a])));
    }

    #[test]
    fn forced_release_of_unknown_object_is_silent() {
        let mut rig = Rig::new();
        let a = rig.scene.spawn(ObjectDesc::new("a"));
        let (mut s, log) = strategy(&rig);
        rig.intersect(a);
        press(&mut rig, &mut s, CHOOSE);
        press(&mut rig, &mut s, GRAB);

        s.release_objects(&rig.ctx(), &[ObjectId::new()]);
        assert_eq!(log.borrow().len(), 1);
        s.release_objects(&rig.ctx(), &[a]);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn config_requires_all_buttons() {
        let e = ConfigElement::new(ELEMENT)
            .with("choose_button_nums", "2")
            .with("grab_button_nums", "0");
        assert!(MultiObjectGrab::from_config(Some(&e)).is_err());
        let e = e.with("release_button_nums", "1");
        assert!(MultiObjectGrab::from_config(Some(&e)).is_ok());
    }
}

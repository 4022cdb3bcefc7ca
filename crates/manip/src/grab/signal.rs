use glam::Vec3;
use grasp_common::{ObjectId, Subscription};
use grasp_input::{CommandMatcher, DigitalState};

use super::{GrabCallbacks, GrabStrategy, Inputs, take_present};
use crate::{
    ConfigElement, Context, EventBus, GrabAnswer, GrabSignalSlot, IntersectionEvent, ManipError,
};

pub const ELEMENT: &str = "signal_grab_strategy";

/// Raises choose/grab/release signals on the bus and grabs whatever the
/// connected slots answer. Never looks at intersections itself.
///
/// When the grab and release commands are the same, the button toggles:
/// a press grabs if nothing is held and releases otherwise.
pub struct SignalGrab {
    choose: CommandMatcher,
    grab: CommandMatcher,
    release: CommandMatcher,
    inputs: Inputs,
    async_release: Option<Subscription<Vec<ObjectId>>>,
    grabbed: Vec<ObjectId>,
    focused: bool,
    callbacks: GrabCallbacks,
}

impl SignalGrab {
    pub fn new(choose: CommandMatcher, grab: CommandMatcher, release: CommandMatcher) -> Self {
        Self {
            choose,
            grab,
            release,
            inputs: Inputs::default(),
            async_release: None,
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

    pub fn is_toggle(&self) -> bool {
        self.grab == self.release
    }

    fn grab_answers(&mut self, ctx: &Context<'_>) {
        for GrabAnswer { objects, point } in ctx.bus.grab_signals.grab(ctx) {
            let mut fresh: Vec<ObjectId> = Vec::new();
            for object in objects {
                if ctx.scene.is_grabbable(object)
                    && !self.grabbed.contains(&object)
                    && !fresh.contains(&object)
                {
                    fresh.push(object);
                }
            }
            if fresh.is_empty() {
                continue;
            }
            self.grabbed.extend(&fresh);
            tracing::info!(count = fresh.len(), "grabbed");
            self.callbacks.grabbed(&fresh, point);
        }
    }

    fn release_answers(&mut self, ctx: &Context<'_>) {
        let answered = ctx.bus.grab_signals.release(ctx);
        self.release_listed(&answered);
    }

    fn release_listed(&mut self, objects: &[ObjectId]) {
        let released = take_present(&mut self.grabbed, objects);
        if !released.is_empty() {
            tracing::info!(count = released.len(), "released");
            self.callbacks.released(&released);
        }
    }
}

impl GrabStrategy for SignalGrab {
    fn name(&self) -> &str {
        "SignalGrab"
    }

    fn init(&mut self, ctx: &Context<'_>, callbacks: GrabCallbacks) -> Result<(), ManipError> {
        self.inputs.connect(ctx, false);
        self.async_release = Some(ctx.bus.grab_signals.async_release.subscribe());
        self.callbacks = callbacks;
        tracing::debug!(toggle = self.is_toggle(), "signal grab ready");
        Ok(())
    }

    fn set_focus(&mut self, active: bool) {
        self.focused = active;
    }

    fn update(&mut self, ctx: &Context<'_>) {
        let mut evicted: Vec<ObjectId> = self
            .async_release
            .as_ref()
            .map(|s| s.drain().into_iter().flatten().collect())
            .unwrap_or_default();
        evicted.extend(self.inputs.cleared_grabbables());
        self.release_listed(&evicted);
        ctx.bus.grab_signals.refresh(ctx, &evicted);
        if !self.focused {
            return;
        }

        // At most one signal per frame, in this priority order.
        let pressed = |m: &CommandMatcher| m.test(ctx.device, DigitalState::ToggleOn);
        if pressed(&self.choose) {
            ctx.bus.grab_signals.choose(ctx);
        } else if self.is_toggle() {
            if pressed(&self.grab) {
                if self.grabbed.is_empty() {
                    self.grab_answers(ctx);
                } else {
                    self.release_answers(ctx);
                }
            }
        } else if pressed(&self.grab) {
            self.grab_answers(ctx);
        } else if pressed(&self.release) {
            self.release_answers(ctx);
        }
    }

    fn grabbed_objects(&self) -> Vec<ObjectId> {
        self.grabbed.clone()
    }

    fn release_objects(&mut self, _ctx: &Context<'_>, objects: &[ObjectId]) {
        self.release_listed(objects);
    }
}

/// Slot that answers grab signals from intersection events: `choose`
/// toggles the intersected object in a chosen list, `grab` hands over the
/// chosen list (or the intersected object when nothing is chosen) and
/// `release` returns everything it handed over.
///
/// Objects that are despawned, stop being grabbable or are evicted by the
/// grab leave both lists on the next refresh.
pub struct SelectionListSlot {
    intersections: Subscription<IntersectionEvent>,
    current: Option<(ObjectId, Vec3)>,
    chosen: Vec<ObjectId>,
    handed_out: Vec<ObjectId>,
}

impl SelectionListSlot {
    pub fn new(bus: &EventBus) -> Self {
        Self {
            intersections: bus.intersection.subscribe(),
            current: None,
            chosen: Vec::new(),
            handed_out: Vec::new(),
        }
    }

    pub fn chosen(&self) -> &[ObjectId] {
        &self.chosen
    }

    pub fn handed_out(&self) -> &[ObjectId] {
        &self.handed_out
    }

    fn poll(&mut self) {
        for event in self.intersections.drain() {
            match event {
                IntersectionEvent::Intersected { object, point } => {
                    self.current = Some((object, point));
                }
                IntersectionEvent::Deintersected { object } => {
                    if self.current.is_some_and(|(o, _)| o == object) {
                        self.current = None;
                    }
                }
            }
        }
    }
}

impl GrabSignalSlot for SelectionListSlot {
    fn choose(&mut self, ctx: &Context<'_>) {
        self.poll();
        let Some((object, _)) = self.current else {
            return;
        };
        if !ctx.scene.is_grabbable(object) {
            return;
        }
        if let Some(pos) = self.chosen.iter().position(|o| *o == object) {
            self.chosen.remove(pos);
            ctx.bus.selection_list_reduced.publish(vec![object]);
        } else {
            self.chosen.push(object);
            ctx.bus.selection_list_expanded.publish(vec![object]);
        }
    }

    fn grab(&mut self, ctx: &Context<'_>) -> Option<GrabAnswer> {
        self.poll();
        let point = self
            .current
            .map(|(_, p)| p)
            .unwrap_or_else(|| ctx.device.pose().transform_point3(Vec3::ZERO));
        let objects = if self.chosen.is_empty() {
            vec![self.current?.0]
        } else {
            let objects = std::mem::take(&mut self.chosen);
            ctx.bus.selection_list_reduced.publish(objects.clone());
            objects
        };
        self.handed_out.extend(&objects);
        Some(GrabAnswer { objects, point })
    }

    fn release(&mut self, _ctx: &Context<'_>) -> Vec<ObjectId> {
        self.poll();
        std::mem::take(&mut self.handed_out)
    }

    fn refresh(&mut self, ctx: &Context<'_>, evicted: &[ObjectId]) {
        self.poll();
        let stale = |o: &ObjectId| evicted.contains(o) || !ctx.scene.is_grabbable(*o);
        if self.current.is_some_and(|(o, _)| !ctx.scene.contains(o)) {
            self.current = None;
        }
        self.handed_out.retain(|o| !stale(o));
        let (dropped, kept): (Vec<ObjectId>, Vec<ObjectId>) =
            self.chosen.iter().copied().partition(|o| stale(o));
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "dropping stale selections");
            self.chosen = kept;
            ctx.bus.selection_list_reduced.publish(dropped);
        }
    }
}

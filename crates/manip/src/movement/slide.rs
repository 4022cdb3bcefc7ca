use glam::{Mat4, Vec3};
use grasp_common::{ObjectId, rigid_inverse};
use std::collections::BTreeMap;

use super::MoveStrategy;
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "simple_slide_move_strategy";

/// Slides grabbed objects along the wand's forward axis by a distance
/// integrated from one analog axis.
///
/// Each frame the analog value (zeroed inside the dead zone, negated when
/// forward is reversed) times the multiplier is added to a per-object
/// distance. The wand's absolute motion is ignored.
#[derive(Debug)]
pub struct SimpleSlideMove {
    /// −1 disables sliding.
    analog: i32,
    forward: bool,
    epsilon: f32,
    multiplier: f32,
    distances: BTreeMap<ObjectId, f32>,
}

impl Default for SimpleSlideMove {
    fn default() -> Self {
        Self {
            analog: 0,
            forward: true,
            epsilon: 0.1,
            multiplier: 0.2,
            distances: BTreeMap::new(),
        }
    }
}

impl SimpleSlideMove {
    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        let Some(e) = element else {
            return Ok(Self::default());
        };
        e.require_version(1)?;

        let analog = e.int_or("analog_input", 0)?;
        if !(-1..=3).contains(&analog) {
            return Err(ManipError::config(ELEMENT, "analog_input must be -1 or 0..=3"));
        }
        let forward = match e.int_or("forward_slide_value", 1)? {
            0 => false,
            1 => true,
            _ => return Err(ManipError::config(ELEMENT, "forward_slide_value must be 0 or 1")),
        };
        let epsilon = e.float_or("slide_epsilon", 0.1)?;
        if epsilon < 0.0 {
            return Err(ManipError::config(ELEMENT, "slide_epsilon must not be negative"));
        }
        let multiplier = e.float_or("slide_multiplier", 0.2)?;
        if multiplier <= 0.0 {
            return Err(ManipError::config(ELEMENT, "slide_multiplier must be positive"));
        }

        Ok(Self {
            analog: analog as i32,
            forward,
            epsilon,
            multiplier,
            distances: BTreeMap::new(),
        })
    }

    /// Accumulated slide distance for `object`.
    pub fn distance(&self, object: ObjectId) -> f32 {
        self.distances.get(&object).copied().unwrap_or(0.0)
    }

    fn increment(&self, ctx: &Context<'_>) -> f32 {
        if self.analog < 0 {
            return 0.0;
        }
        let value = ctx.device.analog(self.analog);
        if value.abs() < self.epsilon {
            return 0.0;
        }
        let value = if self.forward { value } else { -value };
        value * self.multiplier
    }
}

impl MoveStrategy for SimpleSlideMove {
    fn name(&self) -> &str {
        "SimpleSlideMove"
    }

    fn objects_grabbed(
        &mut self,
        _ctx: &Context<'_>,
        objects: &[ObjectId],
        _point: Vec3,
        _wand: Mat4,
    ) {
        for &object in objects {
            self.distances.insert(object, 0.0);
        }
    }

    fn objects_released(&mut self, _ctx: &Context<'_>, objects: &[ObjectId]) {
        for object in objects {
            self.distances.remove(object);
        }
    }

    fn compute_move(
        &mut self,
        ctx: &Context<'_>,
        object: ObjectId,
        wand: Mat4,
        previous: Mat4,
    ) -> Mat4 {
        let step = self.increment(ctx);
        let Some(distance) = self.distances.get_mut(&object) else {
            return previous;
        };
        *distance += step;

        // Translation along the wand's local −Z, taken into parent space.
        let forward = wand.transform_vector3(Vec3::NEG_Z);
        let parent_inv = rigid_inverse(&ctx.scene.parent_world_transform(object));
        let slide = parent_inv.transform_vector3(forward * *distance);
        Mat4::from_translation(slide) * previous
    }

    fn tracked(&self) -> usize {
        self.distances.len()
    }
}

use glam::{Mat4, Quat, Vec3};
use grasp_common::{Aabb, Channel, ObjectId, Subscription, Triangle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a node carries its own local transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Transform,
    /// Grouping node; its local transform is always identity.
    Group,
}

/// An event record produced by every mutation to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    Spawned {
        id: ObjectId,
        parent: Option<ObjectId>,
    },
    Despawned {
        id: ObjectId,
    },
    TransformUpdated {
        id: ObjectId,
        old: Mat4,
        new: Mat4,
    },
    GrabbableChanged {
        id: ObjectId,
        grabbable: bool,
    },
}

/// Notification sent when an object's `grabbable` flag changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabbableChanged {
    pub object: ObjectId,
    pub grabbable: bool,
}

/// Visitor verdict for [`SceneStore::traverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traverse {
    /// Visit this node's children.
    Continue,
    /// Do not descend below this node.
    Skip,
    /// Abort the walk.
    Stop,
}

/// Per-object data stored in the scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    name: String,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    kind: NodeKind,
    local: Mat4,
    bounds: Aabb,
    triangles: Vec<Triangle>,
    grabbable: bool,
    intersectable: bool,
}

impl SceneObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Transform relative to the parent.
    pub fn local(&self) -> Mat4 {
        self.local
    }

    /// Bounding box in the object's local frame.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Triangles in the object's local frame, for exact ray tests.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn is_grabbable(&self) -> bool {
        self.grabbable
    }

    pub fn is_intersectable(&self) -> bool {
        self.intersectable
    }
}

/// Builder for objects passed to [`SceneStore::spawn`].
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    name: String,
    kind: NodeKind,
    local: Mat4,
    bounds: Aabb,
    triangles: Vec<Triangle>,
    grabbable: bool,
    intersectable: bool,
}

impl ObjectDesc {
    /// A unit cube at the parent's origin, grabbable and intersectable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Transform,
            local: Mat4::IDENTITY,
            bounds: Aabb::default(),
            triangles: Vec::new(),
            grabbable: true,
            intersectable: true,
        }
    }

    /// A group node. Groups are never grabbable.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Group,
            grabbable: false,
            ..Self::new(name)
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.local.w_axis = position.extend(1.0);
        self
    }

    pub fn pose(mut self, position: Vec3, rotation: Quat) -> Self {
        self.local = Mat4::from_rotation_translation(rotation, position);
        self
    }

    pub fn half_extents(mut self, half: Vec3) -> Self {
        self.bounds = Aabb::from_half_extents(Vec3::ZERO, half);
        self
    }

    pub fn bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn triangles(mut self, triangles: Vec<Triangle>) -> Self {
        self.triangles = triangles;
        self
    }

    pub fn grabbable(mut self, flag: bool) -> Self {
        self.grabbable = flag;
        self
    }

    pub fn intersectable(mut self, flag: bool) -> Self {
        self.intersectable = flag;
        self
    }
}

/// The authoritative store of scene objects.
///
/// Objects are addressed by `ObjectId`; a handle to a removed object simply
/// finds nothing. Uses `BTreeMap` for deterministic iteration.
///
/// The event log is only emptied by [`SceneStore::drain_events`]; a host that
/// moves objects every frame must drain it once per frame.
#[derive(Debug, Default)]
pub struct SceneStore {
    objects: BTreeMap<ObjectId, SceneObject>,
    roots: Vec<ObjectId>,
    grabbable_changed: Channel<GrabbableChanged>,
    /// Append-only event log of all mutations.
    event_log: Vec<SceneEvent>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Subscribe to `grabbable` flag changes.
    pub fn subscribe_grabbable(&self) -> Subscription<GrabbableChanged> {
        self.grabbable_changed.subscribe()
    }

    /// Add a root object.
    pub fn spawn(&mut self, desc: ObjectDesc) -> ObjectId {
        let id = ObjectId::new();
        self.insert(id, None, desc);
        self.roots.push(id);
        id
    }

    /// Add an object under `parent`. Returns `None` if the parent is unknown.
    pub fn spawn_child(&mut self, parent: ObjectId, desc: ObjectDesc) -> Option<ObjectId> {
        let id = ObjectId::new();
        self.objects.get_mut(&parent)?.children.push(id);
        self.insert(id, Some(parent), desc);
        Some(id)
    }

    fn insert(&mut self, id: ObjectId, parent: Option<ObjectId>, desc: ObjectDesc) {
        let local = match desc.kind {
            NodeKind::Transform => desc.local,
            NodeKind::Group => Mat4::IDENTITY,
        };
        tracing::debug!(object = %id, name = %desc.name, "spawned");
        self.objects.insert(
            id,
            SceneObject {
                name: desc.name,
                parent,
                children: Vec::new(),
                kind: desc.kind,
                local,
                bounds: desc.bounds,
                triangles: desc.triangles,
                grabbable: desc.grabbable,
                intersectable: desc.intersectable,
            },
        );
        self.event_log.push(SceneEvent::Spawned { id, parent });
    }

    /// Remove an object and its whole subtree. Returns false if unknown.
    pub fn despawn(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.objects.get(&id) else {
            return false;
        };
        let parent = obj.parent;

        let mut doomed = Vec::new();
        self.traverse(&[id], |oid, _| {
            doomed.push(oid);
            Traverse::Continue
        });
        for &oid in &doomed {
            if self.is_grabbable(oid) {
                self.grabbable_changed.publish(GrabbableChanged {
                    object: oid,
                    grabbable: false,
                });
            }
        }

        match parent.and_then(|p| self.objects.get_mut(&p)) {
            Some(p) => p.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
        for oid in doomed {
            self.objects.remove(&oid);
            self.event_log.push(SceneEvent::Despawned { id: oid });
        }
        tracing::debug!(object = %id, "despawned");
        true
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Root objects in spawn order.
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// All objects in `BTreeMap` order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, o)| (*id, o))
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.objects.get(&id).map(|o| o.children()).unwrap_or(&[])
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id).and_then(|o| o.parent)
    }

    /// First object with the given name, in `BTreeMap` order.
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| *id)
    }

    /// Local transform, or `None` for an unknown id.
    pub fn transform(&self, id: ObjectId) -> Option<Mat4> {
        self.objects.get(&id).map(|o| o.local)
    }

    /// Replace an object's local transform and log the change.
    ///
    /// Returns false for unknown ids and for group nodes.
    pub fn set_transform(&mut self, id: ObjectId, new: Mat4) -> bool {
        let Some(obj) = self.objects.get_mut(&id) else {
            return false;
        };
        if obj.kind == NodeKind::Group {
            tracing::warn!(object = %id, "ignoring transform on group node");
            return false;
        }
        let old = obj.local;
        obj.local = new;
        self.event_log
            .push(SceneEvent::TransformUpdated { id, old, new });
        true
    }

    /// Product of the ancestors' local transforms, excluding the object's
    /// own. Identity for roots and unknown ids.
    pub fn parent_world_transform(&self, id: ObjectId) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            let Some(obj) = self.objects.get(&p) else {
                break;
            };
            m = obj.local * m;
            cursor = obj.parent;
        }
        m
    }

    pub fn world_transform(&self, id: ObjectId) -> Mat4 {
        let local = self.transform(id).unwrap_or(Mat4::IDENTITY);
        self.parent_world_transform(id) * local
    }

    /// The object's own box united with every descendant's, in the
    /// object's local frame. `None` for unknown ids.
    pub fn subtree_bounds(&self, id: ObjectId) -> Option<Aabb> {
        let obj = self.objects.get(&id)?;
        let mut bounds = obj.bounds;
        for &child in &obj.children {
            let (Some(child_bounds), Some(local)) =
                (self.subtree_bounds(child), self.transform(child))
            else {
                continue;
            };
            bounds = bounds.union(&child_bounds.transformed(&local));
        }
        Some(bounds)
    }

    /// False for unknown ids.
    pub fn is_grabbable(&self, id: ObjectId) -> bool {
        self.objects.get(&id).is_some_and(|o| o.grabbable)
    }

    /// Set the `grabbable` flag, notifying subscribers only on change.
    pub fn set_grabbable(&mut self, id: ObjectId, grabbable: bool) -> bool {
        let Some(obj) = self.objects.get_mut(&id) else {
            return false;
        };
        if obj.grabbable != grabbable {
            obj.grabbable = grabbable;
            self.event_log
                .push(SceneEvent::GrabbableChanged { id, grabbable });
            self.grabbable_changed.publish(GrabbableChanged {
                object: id,
                grabbable,
            });
        }
        true
    }

    pub fn set_intersectable(&mut self, id: ObjectId, intersectable: bool) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.intersectable = intersectable;
                true
            }
            None => false,
        }
    }

    /// Depth-first pre-order walk from `roots`, children in insertion order.
    pub fn traverse<F>(&self, roots: &[ObjectId], mut visit: F)
    where
        F: FnMut(ObjectId, &SceneObject) -> Traverse,
    {
        let mut stack: Vec<ObjectId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(obj) = self.objects.get(&id) else {
                continue;
            };
            match visit(id, obj) {
                Traverse::Continue => stack.extend(obj.children.iter().rev()),
                Traverse::Skip => {}
                Traverse::Stop => return,
            }
        }
    }
}

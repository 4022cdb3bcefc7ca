//! Strategy plugin registry.
//!
//! Strategies are registered under a string name together with the config
//! element type they read and the interface version they were written
//! against. The controller picks them by name from its configuration.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::grab::{self, GrabStrategy, MultiObjectGrab, SignalGrab, SingleObjectGrab};
use crate::isect::{self, IntersectionStrategy, PointIntersection, RayIntersection};
use crate::movement::{
    self, BasicMove, CenterPointMove, MoveStrategy, ObjectSpaceMove, SimpleSlideMove,
};
use crate::{ConfigElement, ManipError, ManipulationConfig};

/// Major/minor interface version of a strategy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

pub const ISECT_API: ApiVersion = ApiVersion::new(2, 1);
pub const GRAB_API: ApiVersion = ApiVersion::new(2, 1);
pub const MOVE_API: ApiVersion = ApiVersion::new(2, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StrategyKind {
    Intersection,
    Grab,
    Move,
}

impl StrategyKind {
    pub fn host_version(self) -> ApiVersion {
        match self {
            Self::Intersection => ISECT_API,
            Self::Grab => GRAB_API,
            Self::Move => MOVE_API,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Intersection => "intersection",
            Self::Grab => "grab",
            Self::Move => "move",
        })
    }
}

type Factory<T> = Box<dyn Fn(Option<&ConfigElement>) -> Result<Box<T>, ManipError>>;

struct Registration<T: ?Sized> {
    element_type: String,
    version: ApiVersion,
    factory: Factory<T>,
}

/// Description of one registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyInfo {
    pub kind: StrategyKind,
    pub name: String,
    pub element_type: String,
    pub version: ApiVersion,
}

#[derive(Default)]
pub struct StrategyRegistry {
    isect: BTreeMap<String, Registration<dyn IntersectionStrategy>>,
    grab: BTreeMap<String, Registration<dyn GrabStrategy>>,
    moves: BTreeMap<String, Registration<dyn MoveStrategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("isect", &self.isect.keys().collect::<Vec<_>>())
            .field("grab", &self.grab.keys().collect::<Vec<_>>())
            .field("moves", &self.moves.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn insert<T: ?Sized>(
    map: &mut BTreeMap<String, Registration<T>>,
    kind: StrategyKind,
    name: &str,
    registration: Registration<T>,
) -> Result<(), ManipError> {
    let expected = kind.host_version();
    let found = registration.version;
    if found.major != expected.major {
        return Err(ManipError::InterfaceVersion {
            kind,
            name: name.to_string(),
            found,
            expected,
        });
    }
    if found.minor > expected.minor {
        tracing::warn!(%kind, name, %found, %expected, "strategy targets a newer minor version");
    }
    if map.insert(name.to_string(), registration).is_some() {
        tracing::info!(%kind, name, "replaced registered strategy");
    }
    Ok(())
}

fn build<T: ?Sized>(
    map: &BTreeMap<String, Registration<T>>,
    kind: StrategyKind,
    name: &str,
    config: &ManipulationConfig,
) -> Result<Box<T>, ManipError> {
    let registration = map.get(name).ok_or_else(|| ManipError::UnknownStrategy {
        kind,
        name: name.to_string(),
    })?;
    let element = config.element(&registration.element_type);
    let strategy = (registration.factory)(element.as_ref())?;
    tracing::info!(%kind, name, "strategy constructed");
    Ok(strategy)
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every strategy this crate ships.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        let results = [
            r.register_isect(
                "RayIntersection",
                isect::ray::ELEMENT,
                ISECT_API,
                RayIntersection::from_config,
            ),
            r.register_isect(
                "PointIntersection",
                isect::point::ELEMENT,
                ISECT_API,
                PointIntersection::from_config,
            ),
            r.register_grab(
                "SingleObjectGrab",
                grab::single::ELEMENT,
                GRAB_API,
                SingleObjectGrab::from_config,
            ),
            r.register_grab(
                "MultiObjectGrab",
                grab::multi::ELEMENT,
                GRAB_API,
                MultiObjectGrab::from_config,
            ),
            r.register_grab(
                "SignalGrab",
                grab::signal::ELEMENT,
                GRAB_API,
                SignalGrab::from_config,
            ),
            r.register_move(
                "BasicMove",
                movement::basic::ELEMENT,
                MOVE_API,
                BasicMove::from_config,
            ),
            r.register_move(
                "CenterPointMove",
                movement::center_point::ELEMENT,
                MOVE_API,
                CenterPointMove::from_config,
            ),
            r.register_move(
                "ObjectSpaceMove",
                movement::object_space::ELEMENT,
                MOVE_API,
                ObjectSpaceMove::from_config,
            ),
            r.register_move(
                "SimpleSlideMove",
                movement::slide::ELEMENT,
                MOVE_API,
                SimpleSlideMove::from_config,
            ),
        ];
        for err in results.into_iter().filter_map(Result::err) {
            tracing::error!(%err, "built-in strategy failed to register");
        }
        r
    }

    pub fn register_isect<S, F>(
        &mut self,
        name: &str,
        element_type: &str,
        version: ApiVersion,
        factory: F,
    ) -> Result<(), ManipError>
    where
        S: IntersectionStrategy + 'static,
        F: Fn(Option<&ConfigElement>) -> Result<S, ManipError> + 'static,
    {
        let registration = Registration {
            element_type: element_type.to_string(),
            version,
            factory: Box::new(move |e: Option<&ConfigElement>| {
                factory(e).map(|s| Box::new(s) as Box<dyn IntersectionStrategy>)
            }),
        };
        insert(&mut self.isect, StrategyKind::Intersection, name, registration)
    }

    pub fn register_grab<S, F>(
        &mut self,
        name: &str,
        element_type: &str,
        version: ApiVersion,
        factory: F,
    ) -> Result<(), ManipError>
    where
        S: GrabStrategy + 'static,
        F: Fn(Option<&ConfigElement>) -> Result<S, ManipError> + 'static,
    {
        let registration = Registration {
            element_type: element_type.to_string(),
            version,
            factory: Box::new(move |e: Option<&ConfigElement>| {
                factory(e).map(|s| Box::new(s) as Box<dyn GrabStrategy>)
            }),
        };
        insert(&mut self.grab, StrategyKind::Grab, name, registration)
    }

    pub fn register_move<S, F>(
        &mut self,
        name: &str,
        element_type: &str,
        version: ApiVersion,
        factory: F,
    ) -> Result<(), ManipError>
    where
        S: MoveStrategy + 'static,
        F: Fn(Option<&ConfigElement>) -> Result<S, ManipError> + 'static,
    {
        let registration = Registration {
            element_type: element_type.to_string(),
            version,
            factory: Box::new(move |e: Option<&ConfigElement>| {
                factory(e).map(|s| Box::new(s) as Box<dyn MoveStrategy>)
            }),
        };
        insert(&mut self.moves, StrategyKind::Move, name, registration)
    }

    pub fn make_isect(
        &self,
        name: &str,
        config: &ManipulationConfig,
    ) -> Result<Box<dyn IntersectionStrategy>, ManipError> {
        build(&self.isect, StrategyKind::Intersection, name, config)
    }

    pub fn make_grab(
        &self,
        name: &str,
        config: &ManipulationConfig,
    ) -> Result<Box<dyn GrabStrategy>, ManipError> {
        build(&self.grab, StrategyKind::Grab, name, config)
    }

    pub fn make_move(
        &self,
        name: &str,
        config: &ManipulationConfig,
    ) -> Result<Box<dyn MoveStrategy>, ManipError> {
        build(&self.moves, StrategyKind::Move, name, config)
    }

    /// Every registration, intersection first, then grab, then move; names
    /// sorted within each kind.
    pub fn strategies(&self) -> Vec<StrategyInfo> {
        fn describe<T: ?Sized>(
            out: &mut Vec<StrategyInfo>,
            kind: StrategyKind,
            map: &BTreeMap<String, Registration<T>>,
        ) {
            out.extend(map.iter().map(|(name, r)| StrategyInfo {
                kind,
                name: name.clone(),
                element_type: r.element_type.clone(),
                version: r.version,
            }));
        }
        let mut out = Vec::new();
        describe(&mut out, StrategyKind::Intersection, &self.isect);
        describe(&mut out, StrategyKind::Grab, &self.grab);
        describe(&mut out, StrategyKind::Move, &self.moves);
        out
    }
}

//! Read-once strategy configuration.
//!
//! A [`ManipulationConfig`] names the strategies to build and carries one
//! [`ConfigElement`] per strategy element type. Elements are plain property
//! bags; each strategy pulls what it needs at construction and fails with
//! [`ManipError::Configuration`] if something is missing or malformed.

use grasp_input::CommandMatcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ManipError;

/// A single property value as written in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Text(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

fn default_version() -> u32 {
    1
}

/// Versioned property bag for one strategy element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigElement {
    /// Element type, filled in from the key the element was stored under.
    #[serde(skip)]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(flatten)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ConfigElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    fn error(&self, message: impl Into<String>) -> ManipError {
        ManipError::config(&self.name, message)
    }

    fn malformed(&self, key: &str, expected: &str) -> ManipError {
        self.error(format!("property {key:?} is not {expected}"))
    }

    pub fn require_version(&self, min: u32) -> Result<(), ManipError> {
        if self.version < min {
            return Err(self.error(format!(
                "element version {} is older than required version {min}",
                self.version
            )));
        }
        Ok(())
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ManipError> {
        match self.get(key) {
            Some(PropertyValue::Text(s)) => Ok(s),
            Some(_) => Err(self.malformed(key, "a string")),
            None => Err(self.error(format!("missing required property {key:?}"))),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ManipError> {
        self.get(key).map_or(Ok(default), |v| {
            v.as_bool().ok_or_else(|| self.malformed(key, "a boolean"))
        })
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, ManipError> {
        self.get(key).map_or(Ok(default), |v| {
            v.as_i64().ok_or_else(|| self.malformed(key, "an integer"))
        })
    }

    pub fn float_or(&self, key: &str, default: f32) -> Result<f32, ManipError> {
        self.get(key).map_or(Ok(default), |v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| self.malformed(key, "a number"))
        })
    }

    /// Button list under `key`, as a string ("0, 1"), one integer or a list
    /// of integers. Missing is an error.
    pub fn buttons(&self, key: &str) -> Result<CommandMatcher, ManipError> {
        match self.get(key) {
            Some(value) => self.parse_buttons(key, value),
            None => Err(self.error(format!("missing required property {key:?}"))),
        }
    }

    /// Like [`buttons`](Self::buttons) but an absent key yields the
    /// unconfigured matcher.
    pub fn buttons_or_unset(&self, key: &str) -> Result<CommandMatcher, ManipError> {
        match self.get(key) {
            Some(value) => self.parse_buttons(key, value),
            None => Ok(CommandMatcher::new()),
        }
    }

    fn parse_buttons(&self, key: &str, value: &PropertyValue) -> Result<CommandMatcher, ManipError> {
        let to_id = |i: i64| i32::try_from(i).map_err(|_| self.malformed(key, "a button id"));
        match value {
            PropertyValue::Text(s) => {
                let mut matcher = CommandMatcher::new();
                matcher.configure(s)?;
                Ok(matcher)
            }
            PropertyValue::Int(i) => Ok(CommandMatcher::from_buttons(vec![to_id(*i)?])),
            PropertyValue::List(items) => {
                let ids = items
                    .iter()
                    .map(|v| match v {
                        PropertyValue::Int(i) => to_id(*i),
                        _ => Err(self.malformed(key, "a list of button ids")),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CommandMatcher::from_buttons(ids))
            }
            _ => Err(self.malformed(key, "a button list")),
        }
    }
}

fn default_move_strategies() -> Vec<String> {
    vec!["BasicMove".to_string()]
}

/// Which strategies to build, plus their elements keyed by element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulationConfig {
    pub isect_strategy: String,
    pub grab_strategy: String,
    /// Applied in order; each strategy's output feeds the next.
    #[serde(default = "default_move_strategies")]
    pub move_strategies: Vec<String>,
    #[serde(default)]
    pub elements: BTreeMap<String, ConfigElement>,
}

impl ManipulationConfig {
    pub fn new(isect: &str, grab: &str, moves: &[&str]) -> Self {
        Self {
            isect_strategy: isect.to_string(),
            grab_strategy: grab.to_string(),
            move_strategies: moves.iter().map(|m| m.to_string()).collect(),
            elements: BTreeMap::new(),
        }
    }

    /// Add an element, keyed by its name.
    pub fn with_element(mut self, element: ConfigElement) -> Self {
        self.elements.insert(element.name.clone(), element);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ManipError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ManipError::config("manipulation config", e.to_string()))
    }

    /// The element stored under `element_type`, with its name filled in.
    pub fn element(&self, element_type: &str) -> Option<ConfigElement> {
        self.elements.get(element_type).map(|e| ConfigElement {
            name: element_type.to_string(),
            ..e.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
isect_strategy: RayIntersection
grab_strategy: MultiObjectGrab
move_strategies: [ObjectSpaceMove, SimpleSlideMove]
elements:
  multi_object_grab_strategy:
    choose_button_nums: "2"
    grab_button_nums: 0
    release_button_nums: [1, 3]
  simple_slide_move_strategy:
    version: 2
    slide_multiplier: 0.5
    forward_slide_value: "0"
"#;

    #[test]
    fn parses_yaml_and_names_elements() {
        let cfg = ManipulationConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(cfg.move_strategies, vec!["ObjectSpaceMove", "SimpleSlideMove"]);

        let grab = cfg.element("multi_object_grab_strategy").unwrap();
        assert_eq!(grab.name, "multi_object_grab_strategy");
        assert_eq!(grab.version, 1);
        assert_eq!(grab.buttons("choose_button_nums").unwrap().buttons(), &[2]);
        assert_eq!(grab.buttons("grab_button_nums").unwrap().buttons(), &[0]);
        assert_eq!(grab.buttons("release_button_nums").unwrap().buttons(), &[1, 3]);

        let slide = cfg.element("simple_slide_move_strategy").unwrap();
        assert_eq!(slide.version, 2);
        assert_eq!(slide.float_or("slide_multiplier", 0.2).unwrap(), 0.5);
        assert_eq!(slide.int_or("forward_slide_value", 1).unwrap(), 0);
        assert_eq!(slide.float_or("slide_epsilon", 0.1).unwrap(), 0.1);
    }

    #[test]
    fn default_move_chain_is_basic() {
        let cfg =
            ManipulationConfig::from_yaml_str("isect_strategy: a\ngrab_strategy: b\n").unwrap();
        assert_eq!(cfg.move_strategies, vec!["BasicMove"]);
        assert!(cfg.elements.is_empty());
    }

    #[test]
    fn missing_required_property_names_element() {
        let e = ConfigElement::new("single_object_grab_strategy");
        let err = e.buttons("grab_button_nums").unwrap_err();
        assert!(err.to_string().contains("single_object_grab_strategy"));
        assert!(err.to_string().contains("grab_button_nums"));
        assert!(!e.buttons_or_unset("release_button_nums").unwrap().is_configured());
    }

    #[test]
    fn malformed_values_are_errors() {
        let e = ConfigElement::new("x")
            .with("flag", "maybe")
            .with("list", "1, two");
        assert!(matches!(
            e.bool_or("flag", false),
            Err(ManipError::Configuration { .. })
        ));
        assert!(matches!(e.buttons("list"), Err(ManipError::Input(_))));
    }

    #[test]
    fn version_check() {
        let e = ConfigElement::new("ray_intersection_strategy");
        assert!(e.require_version(1).is_ok());
        assert!(e.require_version(2).is_err());
        assert!(e.with_version(2).require_version(2).is_ok());
    }
}

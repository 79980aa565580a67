//! The camera's own property surface: `brightness`, `contrast`, and
//! `exposure`, each exposing read-only `:min`/`:max`/`:default`
//! subproperties alongside the base, writable
//! value. Backs the `/camera/config` and `/camera/properties` handlers
//!.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::core::property::{is_subproperty, PropertyError, PropertySurface};

struct NumericProperty {
    value: AtomicI64,
    min: i64,
    max: i64,
    default: i64,
}

impl NumericProperty {
    fn new(default: i64, min: i64, max: i64) -> Self {
        NumericProperty {
            value: AtomicI64::new(default),
            min,
            max,
            default,
        }
    }
}

/// In-memory camera property surface. Concrete backends would push hardware-read values in; this rewrite keeps the values
/// purely in memory and lets `set` validate against `[min, max]`.
pub struct CameraProperties {
    brightness: NumericProperty,
    contrast: NumericProperty,
    exposure: NumericProperty,
}

impl CameraProperties {
    pub fn new() -> Self {
        CameraProperties {
            brightness: NumericProperty::new(50, 0, 100),
            contrast: NumericProperty::new(50, 0, 100),
            exposure: NumericProperty::new(0, -10, 10),
        }
    }

    fn property(&self, base: &str) -> Option<&NumericProperty> {
        match base {
            "brightness" => Some(&self.brightness),
            "contrast" => Some(&self.contrast),
            "exposure" => Some(&self.exposure),
            _ => None,
        }
    }
}

impl Default for CameraProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySurface for CameraProperties {
    fn get(&self, name: &str) -> Result<String, PropertyError> {
        if let Some((base, sub)) = name.split_once(':') {
            let prop = self.property(base).ok_or(PropertyError::UnknownProperty)?;
            return match sub {
                "min" => Ok(prop.min.to_string()),
                "max" => Ok(prop.max.to_string()),
                "default" => Ok(prop.default.to_string()),
                _ => Err(PropertyError::UnknownProperty),
            };
        }
        let prop = self.property(name).ok_or(PropertyError::UnknownProperty)?;
        Ok(prop.value.load(Ordering::SeqCst).to_string())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), PropertyError> {
        if is_subproperty(name) {
            return Err(PropertyError::ReadOnlyProperty);
        }
        let prop = self.property(name).ok_or(PropertyError::UnknownProperty)?;
        let parsed: i64 = value
            .parse()
            .map_err(|_| PropertyError::InvalidPropertyValue)?;
        if parsed < prop.min || parsed > prop.max {
            return Err(PropertyError::InvalidPropertyValue);
        }
        prop.value.store(parsed, Ordering::SeqCst);
        Ok(())
    }

    fn enumerate_all(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (name, prop) in [
            ("brightness", &self.brightness),
            ("contrast", &self.contrast),
            ("exposure", &self.exposure),
        ] {
            out.insert(name.to_string(), prop.value.load(Ordering::SeqCst).to_string());
            out.insert(format!("{name}:min"), prop.min.to_string());
            out.insert(format!("{name}:max"), prop.max.to_string());
            out.insert(format!("{name}:default"), prop.default.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set_round_trip() {
        let props = CameraProperties::new();
        props.set("brightness", "70").unwrap();
        assert_eq!(props.get("brightness").unwrap(), "70");
    }

    #[test]
    fn rejects_out_of_range_value() {
        let props = CameraProperties::new();
        assert_eq!(
            props.set("brightness", "1000").unwrap_err(),
            PropertyError::InvalidPropertyValue
        );
    }

    #[test]
    fn rejects_unknown_property() {
        let props = CameraProperties::new();
        assert_eq!(
            props.set("nosuch", "1").unwrap_err(),
            PropertyError::UnknownProperty
        );
    }

    #[test]
    fn subproperties_are_read_only() {
        let props = CameraProperties::new();
        assert_eq!(
            props.set("brightness:min", "5").unwrap_err(),
            PropertyError::ReadOnlyProperty
        );
        assert_eq!(props.get("brightness:min").unwrap(), "0");
    }
}

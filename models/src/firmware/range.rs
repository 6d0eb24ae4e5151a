//! Per-device-generation firmware windows.

use crate::FirmwareVersion;

use serde::{Deserialize, Serialize};

/// Outcome of matching a device's firmware against a [`FirmwareBounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareCheck {
    Supported,
    /// Device firmware is older than `min`.
    Outdated,
    /// The method is disabled for this generation, the window is empty,
    /// or the device firmware is newer than `max`.
    NotSupported,
}

/// `{min, max}` window for one device generation.
///
/// `min == "0"` disables the method for the generation. `max == "0"` means
/// there is no upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareBounds {
    pub min: FirmwareVersion,
    pub max: FirmwareVersion,
}

impl FirmwareBounds {
    pub fn new(min: FirmwareVersion, max: FirmwareVersion) -> Self {
        Self { min, max }
    }

    pub fn unsupported() -> Self {
        Self::new(FirmwareVersion::zero(), FirmwareVersion::zero())
    }

    pub fn is_disabled(&self) -> bool {
        self.min.is_zero()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max.is_zero()
    }

    /// True when at least one firmware version satisfies the window.
    pub fn is_satisfiable(&self) -> bool {
        !self.is_disabled() && (self.is_unbounded() || self.min <= self.max)
    }

    /// Tighten the window. `min` can only go up and `max` can only go down.
    ///
    /// A `"0"` floor disables the window for good; a `"0"` ceiling adds no
    /// constraint.
    pub fn narrow(&self, min: Option<&FirmwareVersion>, max: Option<&FirmwareVersion>) -> Self {
        let next_min = match min {
            _ if self.is_disabled() => FirmwareVersion::zero(),
            Some(floor) if floor.is_zero() => FirmwareVersion::zero(),
            Some(floor) => std::cmp::max(&self.min, floor).clone(),
            None => self.min.clone(),
        };

        let next_max = match max {
            Some(ceiling) if ceiling.is_zero() => self.max.clone(),
            Some(ceiling) if self.is_unbounded() => ceiling.clone(),
            Some(ceiling) => std::cmp::min(&self.max, ceiling).clone(),
            None => self.max.clone(),
        };

        Self::new(next_min, next_max)
    }

    pub fn check(&self, version: &FirmwareVersion) -> FirmwareCheck {
        if !self.is_satisfiable() {
            return FirmwareCheck::NotSupported;
        }
        if version < &self.min {
            return FirmwareCheck::Outdated;
        }
        if !self.is_unbounded() && version > &self.max {
            return FirmwareCheck::NotSupported;
        }
        FirmwareCheck::Supported
    }
}

/// Mapping `{1: {min, max}, 2: {min, max}}` from device generation to window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareRange {
    #[serde(rename = "1")]
    pub t1: FirmwareBounds,
    #[serde(rename = "2")]
    pub t2: FirmwareBounds,
}

impl FirmwareRange {
    pub fn new(t1: FirmwareBounds, t2: FirmwareBounds) -> Self {
        Self { t1, t2 }
    }

    /// `"0"`/`"0"` on both generations: the method is a stub everywhere.
    pub fn unsupported() -> Self {
        Self::new(FirmwareBounds::unsupported(), FirmwareBounds::unsupported())
    }

    pub fn get(&self, major_version: u32) -> Option<&FirmwareBounds> {
        match major_version {
            1 => Some(&self.t1),
            2 => Some(&self.t2),
            _ => None,
        }
    }

    /// True when `self` is contained in `other` for both generations.
    pub fn is_within(&self, other: &FirmwareRange) -> bool {
        bounds_within(&self.t1, &other.t1) && bounds_within(&self.t2, &other.t2)
    }
}

impl Default for FirmwareRange {
    fn default() -> Self {
        Self::new(
            FirmwareBounds::new(FirmwareVersion::new(1, 0, 0), FirmwareVersion::zero()),
            FirmwareBounds::new(FirmwareVersion::new(2, 0, 0), FirmwareVersion::zero()),
        )
    }
}

fn bounds_within(inner: &FirmwareBounds, outer: &FirmwareBounds) -> bool {
    if inner.is_disabled() {
        return true;
    }
    if outer.is_disabled() {
        return false;
    }
    let floor_ok = inner.min >= outer.min;
    let ceiling_ok = match (inner.is_unbounded(), outer.is_unbounded()) {
        (_, true) => true,
        (true, false) => false,
        (false, false) => inner.max <= outer.max,
    };
    floor_ok && ceiling_ok
}

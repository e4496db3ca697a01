//! Capability bitmasks
//!
//! A store declares which mutations it supports through a
//! [`ModificationFlags`] mask and which visibility toggles it supports
//! through a [`VisibilityFlags`] mask. Per-feature bits embed the
//! feature-set scope bit so a single `contains` check covers both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Mutations a store accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModificationFlags(u32);

impl ModificationFlags {
    pub const NONE: Self = Self(0);
    pub const FEATURESET_INSERT: Self = Self(0x0000_0001);
    pub const FEATURESET_UPDATE: Self = Self(0x0000_0002);
    pub const FEATURESET_DELETE: Self = Self(0x0000_0004);
    pub const BULK_MODIFICATIONS: Self = Self(0x0000_0008);
    pub const FEATURESET_FEATURE_INSERT: Self = Self(0x0001_0001);
    pub const FEATURESET_FEATURE_UPDATE: Self = Self(0x0001_0002);
    pub const FEATURESET_FEATURE_DELETE: Self = Self(0x0001_0004);
    pub const FEATURESET_NAME: Self = Self(0x0001_0008);
    pub const FEATURESET_DISPLAY_THRESHOLDS: Self = Self(0x0001_0010);
    pub const FEATURE_NAME: Self = Self(0x0002_0001);
    pub const FEATURE_GEOMETRY: Self = Self(0x0002_0002);
    pub const FEATURE_STYLE: Self = Self(0x0002_0004);
    pub const FEATURE_ATTRIBUTES: Self = Self(0x0002_0008);
    pub const FEATURESET_READONLY: Self = Self(0x0004_0001);

    /// Every modification the in-memory store supports
    pub const ALL: Self = Self(
        Self::FEATURESET_INSERT.0
            | Self::FEATURESET_UPDATE.0
            | Self::FEATURESET_DELETE.0
            | Self::BULK_MODIFICATIONS.0
            | Self::FEATURESET_FEATURE_INSERT.0
            | Self::FEATURESET_FEATURE_UPDATE.0
            | Self::FEATURESET_FEATURE_DELETE.0
            | Self::FEATURESET_NAME.0
            | Self::FEATURESET_DISPLAY_THRESHOLDS.0
            | Self::FEATURE_NAME.0
            | Self::FEATURE_GEOMETRY.0
            | Self::FEATURE_STYLE.0
            | Self::FEATURE_ATTRIBUTES.0
            | Self::FEATURESET_READONLY.0,
    );

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `required` is present
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for ModificationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ModificationFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ModificationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

/// Visibility toggles a store accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityFlags(u32);

impl VisibilityFlags {
    pub const NONE: Self = Self(0);
    pub const FEATURE: Self = Self(0x1);
    pub const FEATURESET: Self = Self(0x2);
    pub const ALL: Self = Self(Self::FEATURE.0 | Self::FEATURESET.0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }
}

impl BitOr for VisibilityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for VisibilityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

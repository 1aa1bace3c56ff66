//! Asset classes and enum-indexed storage
//!
//! The simulator's inner loop touches every class every month, so per-class
//! values live in a fixed `[T; 8]` indexed by [`AssetClass`] rather than in a
//! hash map keyed by name.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed set of asset classes tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    UsStock,
    IntlStock,
    Bonds,
    Reit,
    Cash,
    RealEstate,
    Crypto,
    Gold,
}

impl AssetClass {
    pub const COUNT: usize = 8;

    /// Canonical iteration order. Output ordering follows this array.
    pub const ALL: [AssetClass; AssetClass::COUNT] = [
        AssetClass::UsStock,
        AssetClass::IntlStock,
        AssetClass::Bonds,
        AssetClass::Reit,
        AssetClass::Cash,
        AssetClass::RealEstate,
        AssetClass::Crypto,
        AssetClass::Gold,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AssetClass::UsStock => "US_STOCK",
            AssetClass::IntlStock => "INTL_STOCK",
            AssetClass::Bonds => "BONDS",
            AssetClass::Reit => "REIT",
            AssetClass::Cash => "CASH",
            AssetClass::RealEstate => "REAL_ESTATE",
            AssetClass::Crypto => "CRYPTO",
            AssetClass::Gold => "GOLD",
        }
    }

    /// Class for a `SCREAMING_SNAKE_CASE` label, if it names one.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        AssetClass::ALL.into_iter().find(|class| class.label() == label)
    }
}

/// Fixed-size per-class storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetArray<T>(pub [T; AssetClass::COUNT]);

impl<T: Copy> AssetArray<T> {
    #[must_use]
    pub const fn splat(value: T) -> Self {
        Self([value; AssetClass::COUNT])
    }
}

impl<T> AssetArray<T> {
    /// Build an array by evaluating `f` for each class in canonical order.
    pub fn from_fn(mut f: impl FnMut(AssetClass) -> T) -> Self {
        Self(std::array::from_fn(|i| f(AssetClass::ALL[i])))
    }

    /// Iterate `(class, &value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, &T)> {
        AssetClass::ALL.iter().copied().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AssetClass, &mut T)> {
        AssetClass::ALL.iter().copied().zip(self.0.iter_mut())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl AssetArray<f64> {
    #[inline]
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl<T: Default> Default for AssetArray<T> {
    fn default() -> Self {
        Self(std::array::from_fn(|_| T::default()))
    }
}

impl<T> Index<AssetClass> for AssetArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, class: AssetClass) -> &T {
        &self.0[class.index()]
    }
}

impl<T> IndexMut<AssetClass> for AssetArray<T> {
    #[inline]
    fn index_mut(&mut self, class: AssetClass) -> &mut T {
        &mut self.0[class.index()]
    }
}

impl<T: Serialize> Serialize for AssetArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de, T: Deserialize<'de> + Default> Deserialize<'de> for AssetArray<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = BTreeMap::<AssetClass, T>::deserialize(deserializer)?;
        Ok(Self::from_fn(|class| map.remove(&class).unwrap_or_default()))
    }
}

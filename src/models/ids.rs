//! Newtype wrappers for record keys.
//!
//! These keep terminal keys and user names from being mixed up with
//! arbitrary integers and strings.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Macro to define a newtype key wrapping a `Copy` inner type.
macro_rules! define_copy_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new key from the given value.
            #[inline]
            #[must_use]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the inner value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

/// Macro to define a newtype key wrapping a `String` inner type.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new key from the given string.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl core::borrow::Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_copy_id! {
    /// Unique key of a terminal record (historically "ShopID").
    ///
    /// `0` is a sentinel asking the store to assign the next free key.
    ShopId(u32)
}

define_string_id! {
    /// Login name of a user account.
    Username
}

#[allow(
    clippy::multiple_inherent_impl,
    reason = "the macro-generated impl carries the shared accessors"
)]
impl ShopId {
    /// Sentinel key requesting automatic assignment on insertion.
    pub const AUTO: Self = Self(0);

    /// Returns `true` if this is the auto-assignment sentinel.
    #[inline]
    #[must_use]
    pub const fn is_auto(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for ShopId {
    type Error = ValidationError;

    #[inline]
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(ValidationError::NegativeShopId(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_overflow| ValidationError::ShopIdOutOfRange(value))
    }
}

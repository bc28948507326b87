use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an opaque string identifier into the catalog.
///
/// Identifiers are stored verbatim in save files, so they must stay stable
/// for the lifetime of a save.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifies a material (scrap, rubber, ...) in the catalog.
    MaterialId
}

string_id! {
    /// Identifies a part definition in the catalog.
    PartId
}

string_id! {
    /// Identifies an area in the catalog.
    AreaId
}

string_id! {
    /// Identifies a technology in the catalog.
    TechId
}

//! Domain identifier newtypes: DealId, UserId, TargetId, CategoryId.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create an id from a string.
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Generate a fresh random id.
            pub fn generate() -> Self {
                $name(Uuid::new_v4().to_string())
            }

            /// Get the id as a string reference.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier for a deal.
    DealId
);
id_newtype!(
    /// Identifier for a sales rep (the owning user of deals and targets).
    UserId
);
id_newtype!(
    /// Identifier for a quota target.
    TargetId
);
id_newtype!(
    /// Identifier for a product category.
    CategoryId
);

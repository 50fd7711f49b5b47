use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Prefix shared by every locally minted, not-yet-confirmed identifier.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

static PLACEHOLDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

// Macro keeps both ID wrappers structurally identical, so backend ids and placeholders
// follow one set of rules.
macro_rules! define_gateway_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Mints a transient id shaped `temp-<unix-millis>-<sequence>`.
            pub fn placeholder() -> Self {
                Self(mint_placeholder())
            }

            pub fn is_placeholder(&self) -> bool {
                self.0.starts_with(PLACEHOLDER_PREFIX)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_gateway_id!(ConversationId);
define_gateway_id!(MessageId);

fn mint_placeholder() -> String {
    // The sequence keeps two sends issued inside the same millisecond apart.
    let sequence = PLACEHOLDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{PLACEHOLDER_PREFIX}{}-{sequence}",
        chrono::Utc::now().timestamp_millis()
    )
}

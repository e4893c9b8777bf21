//! Backend DTOs as the console sees them.
//!
//! Everything here is a snapshot owned by the backend. Status strings go
//! through [`status_enum!`] so that aliases are resolved in one place and an
//! unknown value survives as `Other` instead of failing deserialization.

/// Declares a status enum parsed case-insensitively from a string.
///
/// Each variant lists its accepted spellings; the first one is canonical and
/// is what gets serialized back. Anything else lands in `Other(raw)`.
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident => [$canonical:literal $(, $alias:literal)* $(,)?] ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $variant, )+
            Other(String),
        }

        impl $name {
            /// Accepted spellings (lowercase) and the variant each maps to.
            pub const ALIASES: &'static [(&'static str, $name)] = &[
                $( ($canonical, $name::$variant), $( ($alias, $name::$variant), )* )+
            ];

            pub fn as_str(&self) -> &str {
                match self {
                    $( $name::$variant => $canonical, )+
                    $name::Other(raw) => raw.as_str(),
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Other(_))
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                let key = raw.trim().to_ascii_lowercase();
                Self::ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, status)| status.clone())
                    .unwrap_or_else(|| $name::Other(raw.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                $name::from(raw.as_str())
            }
        }

        impl From<$name> for String {
            fn from(status: $name) -> Self {
                status.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod ban;
pub mod log;
pub mod server;
pub mod user;
pub mod verification;
pub mod whitelist;

/// Treats empty and whitespace-only identifiers as absent.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

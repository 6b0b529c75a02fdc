use serde::{Deserialize, Serialize};

/// A named operation, the wildcard `any`, or the reserved privilege that no
/// permission (wildcards included) ever satisfies.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Privilege {
    Any,
    Forbidden,
    Named(String),
}

/// The class a permission applies to, either a named base class or `any`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceClass {
    Any,
    Named(String),
}

/// Whether `s` can name a privilege, class or column: an ASCII letter or
/// underscore followed by ASCII alphanumerics or underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl Privilege {
    pub const ANY: &'static str = "any";
    pub const FORBIDDEN: &'static str = "forbidden_operation";

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => Self::ANY,
            Self::Forbidden => Self::FORBIDDEN,
            Self::Named(s) => s,
        }
    }
}

impl ResourceClass {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => Privilege::ANY,
            Self::Named(s) => s,
        }
    }

    /// Whether this class covers objects whose base class is `base`.
    pub fn covers(&self, base: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Named(s) => s == base,
        }
    }
}

mod impls;

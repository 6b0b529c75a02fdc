use std::fmt;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    AuthorizationDenied(#[from] Denial),
    #[error("no user bound while checking for privilege {privilege}")]
    UnresolvedUser {
        privilege: String,
    },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    InvalidScope(#[from] ScopeError),
}

/// A failed imperative access check.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("not authorized to {privilege} {target}")]
pub struct Denial {
    pub privilege: String,
    pub target: Target,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub class_name: String,
    pub id: TargetId,
    pub name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TargetId {
    Saved(i64),
    Unsaved,
    /// The object the privilege should have been checked against was absent.
    Missing,
}

#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("class {0} declared more than once")]
    DuplicateClass(String),
    #[error("unknown class {0}")]
    UnknownClass(String),
    #[error("class {class_name} has no association {association}")]
    UnknownAssociation {
        class_name: String,
        association: String,
    },
    #[error("privilege {privilege} is not declared for class {class_name}")]
    UndeclaredPrivilege {
        class_name: String,
        privilege: String,
    },
    #[error("implication {privilege} => {implies} references an undeclared privilege of {class_name}")]
    UndeclaredImplication {
        class_name: String,
        privilege: String,
        implies: String,
    },
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("malformed declarations: {0}")]
    Malformed(String),
}

#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScopeError {
    #[error("{0} is not an access controlled class")]
    UnknownClass(String),
    #[error("permission class {class_name} must be its base class {base}")]
    SpecializedClass {
        class_name: String,
        base: String,
    },
    #[error("{key} is not an access control key of {class_name}")]
    UndeclaredKey {
        class_name: String,
        key: String,
    },
    #[error("grant option set on a permission that is not a grant")]
    GrantOptionWithoutGrant,
    #[error("the forbidden operation may not be permitted")]
    ForbiddenPrivilege,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.id, &self.name) {
            (TargetId::Missing, _) => write!(f, "MISSING {}", self.class_name),
            (TargetId::Unsaved, _) => write!(f, "{} UNSAVED", self.class_name),
            (TargetId::Saved(id), Some(name)) => write!(f, "{} {name} ({id})", self.class_name),
            (TargetId::Saved(id), None) => write!(f, "{} ({id})", self.class_name),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn denial_message() {
        let mut denial = Denial {
            privilege: "post".to_string(),
            target: Target {
                class_name: "Blog".to_string(),
                id: TargetId::Saved(3),
                name: Some("mertz blog".to_string()),
            },
        };
        assert_eq!(denial.to_string(), "not authorized to post Blog mertz blog (3)");
        denial.target.id = TargetId::Unsaved;
        assert_eq!(denial.to_string(), "not authorized to post Blog UNSAVED");
        denial.target.id = TargetId::Missing;
        assert_eq!(
            Error::from(denial).to_string(),
            "not authorized to post MISSING Blog",
        );
    }
}

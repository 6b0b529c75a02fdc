use std::{
    fmt,
    str::FromStr,
};
use crate::error::ValueError;
use super::{
    is_identifier,
    Privilege,
    ResourceClass,
};

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Privilege::ANY => Ok(Privilege::Any),
            Privilege::FORBIDDEN => Ok(Privilege::Forbidden),
            s if is_identifier(s) => Ok(Privilege::Named(s.to_string())),
            s => Err(ValueError::InvalidIdentifier(s.to_string())),
        }
    }
}

impl FromStr for ResourceClass {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Privilege::ANY => Ok(ResourceClass::Any),
            s if is_identifier(s) => Ok(ResourceClass::Named(s.to_string())),
            s => Err(ValueError::InvalidIdentifier(s.to_string())),
        }
    }
}

impl TryFrom<String> for Privilege {
    type Error = ValueError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Privilege::from_str(&s)
    }
}

impl TryFrom<String> for ResourceClass {
    type Error = ValueError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ResourceClass::from_str(&s)
    }
}

impl From<Privilege> for String {
    fn from(v: Privilege) -> Self {
        v.to_string()
    }
}

impl From<ResourceClass> for String {
    fn from(v: ResourceClass) -> Self {
        v.to_string()
    }
}

// Conversions for literals only; names read from declarations, storage or
// the command line go through `FromStr`, and a literal naming nothing
// valid is rejected when the permission or catalog is validated.
impl From<&str> for Privilege {
    fn from(s: &str) -> Self {
        match s {
            Privilege::ANY => Privilege::Any,
            Privilege::FORBIDDEN => Privilege::Forbidden,
            s => Privilege::Named(s.to_string()),
        }
    }
}

impl From<&str> for ResourceClass {
    fn from(s: &str) -> Self {
        match s {
            Privilege::ANY => ResourceClass::Any,
            s => ResourceClass::Named(s.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use crate::error::ValueError;
    use super::{
        Privilege,
        ResourceClass,
    };

    #[test]
    fn smoke() -> anyhow::Result<()> {
        assert_eq!(Privilege::from_str("any")?, Privilege::Any);
        assert_eq!(Privilege::from_str("post")?, Privilege::named("post"));
        assert_eq!(Privilege::from_str("forbidden_operation")?, Privilege::Forbidden);
        assert_eq!(Privilege::named("post").to_string(), "post");
        assert_eq!(ResourceClass::from_str("any")?, ResourceClass::Any);
        assert_eq!(ResourceClass::from("Blog"), ResourceClass::named("Blog"));
        assert!(matches!(
            Privilege::from_str("").expect_err("should be an error"),
            ValueError::InvalidIdentifier(s) if s.is_empty(),
        ));
        assert_eq!(
            Privilege::from_str("add post"),
            Err(ValueError::InvalidIdentifier("add post".to_string())),
        );
        assert!(ResourceClass::from_str("9Blog").is_err());
        // literals keep their text rather than becoming another privilege
        assert_eq!(Privilege::from(""), Privilege::named(""));
        assert_eq!(Privilege::from("forbidden_operation"), Privilege::Forbidden);
        Ok(())
    }

    #[test]
    fn serde() -> anyhow::Result<()> {
        let privilege: Privilege = serde_json::from_str(r#""any""#)?;
        assert_eq!(privilege, Privilege::Any);
        assert_eq!(serde_json::to_string(&ResourceClass::named("Blog"))?, r#""Blog""#);
        assert!(serde_json::from_str::<Privilege>(r#""""#).is_err());
        assert!(serde_json::from_str::<Privilege>(r#""drop table""#).is_err());
        Ok(())
    }

    #[test]
    fn covers() {
        assert!(ResourceClass::Any.covers("Blog"));
        assert!(ResourceClass::named("Blog").covers("Blog"));
        assert!(!ResourceClass::named("Blog").covers("Entry"));
    }
}

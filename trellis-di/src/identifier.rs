//! [Identifier]s name the capabilities requested from an
//! [Environment](crate::environment::Environment). An identifier is made of a type descriptor and
//! an optional qualifier, which makes it possible to declare multiple instances of the same type:
//!
//! ```
//! use trellis_di::identifier::Identifier;
//!
//! struct ConnectionPool;
//!
//! let primary = Identifier::of::<ConnectionPool>();
//! let replica = Identifier::named::<ConnectionPool>("replica");
//!
//! assert_ne!(primary, replica);
//! assert!(replica.is::<ConnectionPool>());
//! assert_eq!(replica.qualifier(), Some("replica"));
//! ```

use std::any::{type_name, TypeId};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Qualifier attached to an [Identifier].
pub type Qualifier = Cow<'static, str>;

/// Key used to look up a declaration. Equality is structural over the type descriptor and the
/// qualifier; the type name is kept only for diagnostics.
#[derive(Clone, Debug)]
pub struct Identifier {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<Qualifier>,
}

impl Identifier {
    /// Creates an unqualified identifier for `T`. `T` can also be an unsized type, e.g.
    /// `dyn Trait + Send + Sync`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            qualifier: None,
        }
    }

    /// Creates an identifier for `T` with given qualifier.
    pub fn named<T: ?Sized + 'static>(qualifier: impl Into<Qualifier>) -> Self {
        Self::of::<T>().with_qualifier(qualifier)
    }

    /// Returns the same kind of identifier, but with given qualifier.
    pub fn with_qualifier(mut self, qualifier: impl Into<Qualifier>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Returns the same kind of identifier without a qualifier.
    pub fn unqualified(mut self) -> Self {
        self.qualifier = None;
        self
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Checks if this identifier refers to `T`, regardless of the qualifier.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{} ({})", self.type_name, qualifier),
            None => f.write_str(self.type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::identifier::Identifier;
    use fxhash::FxHashSet;

    trait TestTrait {}

    struct TestType;

    #[test]
    fn should_compare_structurally() {
        assert_eq!(Identifier::of::<TestType>(), Identifier::of::<TestType>());
        assert_eq!(
            Identifier::named::<TestType>("a"),
            Identifier::of::<TestType>().with_qualifier("a".to_string())
        );
        assert_ne!(Identifier::of::<TestType>(), Identifier::of::<i8>());
        assert_ne!(
            Identifier::named::<TestType>("a"),
            Identifier::named::<TestType>("b")
        );
    }

    #[test]
    fn should_hash_consistently_with_equality() {
        let identifiers: FxHashSet<_> = [
            Identifier::of::<TestType>(),
            Identifier::of::<TestType>(),
            Identifier::named::<TestType>("a"),
            Identifier::of::<dyn TestTrait + Send + Sync>(),
        ]
        .into_iter()
        .collect();

        assert_eq!(identifiers.len(), 3);
    }

    #[test]
    fn should_display_qualifier() {
        let identifier = Identifier::named::<i8>("answer");
        assert_eq!(identifier.to_string(), "i8 (answer)");
        assert_eq!(identifier.unqualified().to_string(), "i8");
    }

    #[test]
    fn should_match_kind_regardless_of_qualifier() {
        let identifier = Identifier::named::<TestType>("a");
        assert!(identifier.is::<TestType>());
        assert!(!identifier.is::<i8>());
    }
}

//! Lookup keys for bindable dependencies.
//!
//! A [`Key`] combines an opaque type descriptor ([`TypeTag`]) with an
//! optional qualifier string. Keys are the only identity the runtime ever
//! inspects: equality and hashing are structural, and the descriptor is
//! never examined beyond comparison. This keeps the core independent of
//! any particular reflection or metadata scheme — callers mint tags from
//! concrete Rust types, the runtime just routes them.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

/// Opaque type descriptor: a `TypeId` plus a display name.
///
/// The name exists purely for diagnostics; identity is the `TypeId` alone.
/// Two tags minted from the same type in different crates compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Mint a tag for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The display name recorded when the tag was minted.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Strip module paths for readability; diagnostics want `Engine`,
        // not `my_app::parts::engine::Engine`.
        let short = self.name.rsplit("::").next().unwrap_or(self.name);
        f.write_str(short)
    }
}

/// Unique lookup key for a bindable dependency.
///
/// Immutable and cheap to clone. Created once when a binding is declared
/// or a dependency is requested, then compared and hashed everywhere.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Key {
    tag: TypeTag,
    qualifier: Option<Cow<'static, str>>,
}

impl Key {
    /// Key for the unqualified type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            qualifier: None,
        }
    }

    /// Key for `T` qualified by `name`.
    ///
    /// `Key::qualified::<T>("primary")` and `Key::of::<T>()` are distinct
    /// keys and resolve independently.
    pub fn qualified<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            qualifier: Some(name.into()),
        }
    }

    /// Key for an already-minted tag.
    pub fn from_tag(tag: TypeTag, qualifier: Option<Cow<'static, str>>) -> Self {
        Self { tag, qualifier }
    }

    #[inline]
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    #[inline]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}@{q}", self.tag),
            None => write!(f, "{}", self.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    trait Service {}

    #[test]
    fn keys_are_structural() {
        assert_eq!(Key::of::<String>(), Key::of::<String>());
        assert_ne!(Key::of::<String>(), Key::of::<u32>());
        assert_ne!(Key::of::<String>(), Key::qualified::<String>("primary"));
        assert_eq!(
            Key::qualified::<String>("primary"),
            Key::qualified::<String>("primary".to_string()),
        );
    }

    #[test]
    fn trait_object_keys() {
        let a = Key::of::<dyn Service>();
        let b = Key::of::<dyn Service>();
        assert_eq!(a, b);
        assert_ne!(a, Key::of::<String>());
    }

    #[test]
    fn keys_hash_into_sets() {
        let mut set = FxHashSet::default();
        set.insert(Key::of::<String>());
        set.insert(Key::of::<String>());
        set.insert(Key::qualified::<String>("a"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_strips_module_path() {
        let key = Key::qualified::<String>("primary");
        assert_eq!(key.to_string(), "String@primary");
        assert_eq!(Key::of::<String>().to_string(), "String");
    }
}

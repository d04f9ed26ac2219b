//! Identity registry.
//!
//! Every entity of the object model is identified by an ordered tuple of
//! immutable constructor arguments, its *identity key*. The registry maps
//! keys to live instances so that, for types configured with
//! [`IdentityMode::SharedInstance`], two references to the same remote
//! resource are the same local object.
//!
//! Construction always runs: the constructor closure (which usually talks
//! to the server) is evaluated on every call. When an instance already
//! exists for the key, the freshly built value is folded into it through
//! [`Identity::refresh_from`] and the existing reference is returned.

use crate::error::ClientResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// How instances of an entity type relate to their identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityMode {
    /// One shared instance per key within a session.
    SharedInstance,
    /// A new instance per construction; instances with equal keys compare
    /// equal but are distinct references.
    ValueEqualityOnly,
}

/// A key tuple that can be rendered component by component.
pub trait IdentityKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Canonical representation of each component, in order.
    fn components(&self) -> Vec<String>;
}

impl IdentityKey for String {
    fn components(&self) -> Vec<String> {
        vec![format!("{self:?}")]
    }
}

impl<A, B> IdentityKey for (A, B)
where
    A: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    B: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    fn components(&self) -> Vec<String> {
        vec![format!("{:?}", self.0), format!("{:?}", self.1)]
    }
}

/// An entity with a natural identity.
pub trait Identity: Send + Sync + Sized + 'static {
    /// The identity key tuple.
    type Key: IdentityKey;

    /// Namespace shown in the canonical representation.
    const NAMESPACE: &'static str;

    /// Type name shown in the canonical representation.
    const TYPE_NAME: &'static str;

    /// Returns this entity's identity key.
    fn identity_key(&self) -> Self::Key;

    /// Folds the state of a freshly constructed value with the same key
    /// into this instance.
    fn refresh_from(&self, fresh: Self);
}

/// Renders `namespace.TypeName(component, ...)` for an entity.
pub fn canonical_repr<T: Identity>(entity: &T) -> String {
    format!(
        "{}.{}({})",
        T::NAMESPACE,
        T::TYPE_NAME,
        entity.identity_key().components().join(", ")
    )
}

/// Implements key-based equality, hashing and the canonical `Debug`
/// representation for an [`Identity`] type.
macro_rules! identity_semantics {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::registry::Identity::identity_key(self)
                    == $crate::registry::Identity::identity_key(other)
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash(&$crate::registry::Identity::identity_key(self), state);
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&$crate::registry::canonical_repr(self))
            }
        }
    };
}

pub(crate) use identity_semantics;

/// Keyed store of live entity instances.
pub struct Registry<T: Identity> {
    mode: IdentityMode,
    instances: Mutex<HashMap<T::Key, Arc<T>>>,
    closed: AtomicBool,
}

impl<T: Identity> Registry<T> {
    /// Creates an empty registry with the given policy.
    pub fn new(mode: IdentityMode) -> Self {
        Self {
            mode,
            instances: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the identity policy.
    pub fn mode(&self) -> IdentityMode {
        self.mode
    }

    /// Constructs an entity and resolves it against the registry.
    ///
    /// `construct` runs on every call. With [`IdentityMode::SharedInstance`]
    /// the result is either registered under `key` or, if an instance is
    /// already registered, folded into it; lookup and insertion happen
    /// under one lock. A failing constructor leaves the registry untouched.
    pub fn get_or_create<F>(&self, key: T::Key, construct: F) -> ClientResult<Arc<T>>
    where
        F: FnOnce() -> ClientResult<T>,
    {
        let fresh = construct()?;
        Ok(self.resolve(key, fresh))
    }

    /// Resolves an already constructed value against the registry.
    pub fn resolve(&self, key: T::Key, fresh: T) -> Arc<T> {
        if self.mode == IdentityMode::ValueEqualityOnly {
            return Arc::new(fresh);
        }

        let mut instances = self.instances.lock();
        if let Some(existing) = instances.get(&key) {
            trace!(key = ?key, "refreshing shared {}", T::TYPE_NAME);
            existing.refresh_from(fresh);
            return Arc::clone(existing);
        }

        let instance = Arc::new(fresh);
        if !self.closed.load(Ordering::SeqCst) {
            trace!(key = ?key, "registering shared {}", T::TYPE_NAME);
            instances.insert(key, Arc::clone(&instance));
        }
        instance
    }

    /// Returns the registered instance for `key`, if any.
    pub fn get(&self, key: &T::Key) -> Option<Arc<T>> {
        self.instances.lock().get(key).cloned()
    }

    /// Checks whether an instance is registered for `key`.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.instances.lock().contains_key(key)
    }

    /// Returns the number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }

    /// Forgets every registered instance.
    ///
    /// Outstanding references stay valid; later constructions build new
    /// shared instances.
    pub fn clear(&self) {
        self.instances.lock().clear();
    }

    /// Clears the registry and stops registering new instances.
    pub fn close(&self) -> Vec<Arc<T>> {
        self.closed.store(true, Ordering::SeqCst);
        self.instances.lock().drain().map(|(_, v)| v).collect()
    }
}

impl<T: Identity> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("type", &T::TYPE_NAME)
            .field("mode", &self.mode)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

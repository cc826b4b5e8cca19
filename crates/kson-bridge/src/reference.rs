//! Local and pinned references
//!
//! A [`LocalRef`] lives inside one attachment scope and is deleted when it
//! drops. Pinning turns it into a [`GlobalRef`], which keeps the object alive
//! across scopes and threads until the owning wrapper drops it.

use crate::attach::Env;
use crate::error::{BridgeError, BridgeResult};
use crate::runtime::Runtime;
use crate::vm::{JValue, RawObject};

/// Transient reference, valid inside one attachment scope
pub struct LocalRef<'a> {
    env: Env<'a>,
    raw: RawObject,
}

impl<'a> LocalRef<'a> {
    /// Take ownership of a local reference returned by the runtime
    #[inline]
    pub(crate) fn from_raw(env: Env<'a>, raw: RawObject) -> Self {
        LocalRef { env, raw }
    }

    /// A null reference, e.g. for an absent optional argument
    #[inline]
    pub fn null(env: Env<'a>) -> Self {
        LocalRef {
            env,
            raw: RawObject::NULL,
        }
    }

    #[inline]
    pub fn env(&self) -> Env<'a> {
        self.env
    }

    #[inline]
    pub fn as_raw(&self) -> RawObject {
        self.raw
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// This reference as a call argument
    #[inline]
    pub fn as_arg(&self) -> JValue {
        JValue::Object(self.raw)
    }

    /// Promote to a pinned reference, deleting the local one
    pub fn pin(self) -> BridgeResult<GlobalRef> {
        self.env.runtime().ensure_available()?;
        if self.is_null() {
            return Err(BridgeError::invocation(
                "NewGlobalRef",
                "cannot pin a null reference",
            ));
        }
        let runtime = self.env.runtime();
        let global = self.env.vm().new_global_ref(self.env.raw(), self.raw);
        if global.is_null() {
            return Err(BridgeError::invocation(
                "NewGlobalRef",
                "runtime returned a null global reference",
            ));
        }
        runtime.pinned_inc();
        log::trace!("pinned {:?}", global);
        Ok(GlobalRef {
            runtime: runtime.clone(),
            raw: global,
        })
    }
}

impl Drop for LocalRef<'_> {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            self.env.vm().delete_local_ref(self.env.raw(), self.raw);
        }
    }
}

impl std::fmt::Debug for LocalRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LocalRef").field(&self.raw).finish()
    }
}

/// Pinned reference owned by exactly one host value.
///
/// Move-only: the runtime object is released exactly once, when this value
/// drops. Dropping attaches the thread if needed and detaches it again
/// afterwards; after runtime shutdown dropping does nothing.
pub struct GlobalRef {
    runtime: Runtime,
    raw: RawObject,
}

impl GlobalRef {
    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[inline]
    pub fn as_raw(&self) -> RawObject {
        self.raw
    }

    /// This reference as a call argument
    #[inline]
    pub fn as_arg(&self) -> JValue {
        JValue::Object(self.raw)
    }

    /// A local reference to the same object, for the given scope
    pub fn local<'a>(&self, env: Env<'a>) -> BridgeResult<LocalRef<'a>> {
        if env.runtime().id() != self.runtime.id() {
            return Err(BridgeError::invocation(
                "NewLocalRef",
                "reference belongs to another runtime",
            ));
        }
        env.runtime().ensure_available()?;
        let local = env.vm().new_local_ref(env.raw(), self.raw);
        if local.is_null() {
            return Err(BridgeError::invocation(
                "NewLocalRef",
                "runtime returned a null local reference",
            ));
        }
        Ok(LocalRef::from_raw(env, local))
    }

    /// Pin the same object a second time, independently owned
    pub fn try_clone(&self) -> BridgeResult<GlobalRef> {
        self.runtime
            .with_attachment(|env| self.local(env)?.pin())
    }
}

impl Drop for GlobalRef {
    fn drop(&mut self) {
        if !self.runtime.is_available() {
            log::trace!("runtime gone, not releasing {:?}", self.raw);
            return;
        }
        // Shutdown cannot start while the scope is held
        match self.runtime.attach() {
            Ok(guard) => {
                self.runtime
                    .vm()
                    .delete_global_ref(guard.env().raw(), self.raw);
                self.runtime.pinned_dec();
                log::trace!("released {:?}", self.raw);
            }
            Err(BridgeError::RuntimeNotAvailable) => {
                log::trace!("runtime shut down first, not releasing {:?}", self.raw);
            }
            Err(err) => log::warn!("could not release {:?}: {}", self.raw, err),
        }
    }
}

impl std::fmt::Debug for GlobalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GlobalRef").field(&self.raw).finish()
    }
}

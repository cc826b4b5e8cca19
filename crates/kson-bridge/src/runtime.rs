//! Runtime lifecycle
//!
//! A [`Runtime`] owns one embedded runtime instance together with the
//! per-runtime symbol caches. It is a cheap handle; clones share the same
//! instance, which lets pinned references reach their runtime on release.

use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::attach::is_attached;
use crate::error::{BridgeError, BridgeResult, InitError};
use crate::jni::JniVm;
use crate::options::RuntimeOptions;
use crate::vm::{EmbeddedVm, MemberId, MemberKind, RawObject};

/// Unique runtime identifier, used to key per-thread attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(u64);

impl RuntimeId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        RuntimeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

pub(crate) type MemberKey = (&'static CStr, &'static CStr, &'static CStr, MemberKind);

pub(crate) struct RuntimeInner {
    id: RuntimeId,
    vm: Box<dyn EmbeddedVm>,
    alive: AtomicBool,
    /// Live `GlobalRef`s created through this runtime
    pinned: AtomicUsize,
    /// Resolved classes, held as global references until shutdown
    classes: RwLock<FxHashMap<&'static CStr, RawObject>>,
    members: RwLock<FxHashMap<MemberKey, MemberId>>,
    /// Read by every attachment scope, written by shutdown
    lifecycle: RwLock<()>,
}

/// Handle to an embedded runtime instance
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Load the KSON library named by `options` and start its runtime.
    ///
    /// Only one runtime can exist per process with the real library; use
    /// [`global`] unless the process manages the instance itself.
    pub fn initialize(options: &RuntimeOptions) -> BridgeResult<Runtime> {
        let vm = JniVm::create(options)?;
        Ok(Runtime::with_vm(Box::new(vm)))
    }

    /// Wrap an already running backend
    pub fn with_vm(vm: Box<dyn EmbeddedVm>) -> Runtime {
        let id = RuntimeId::next();
        log::debug!("runtime {} available", id.as_u64());
        Runtime {
            inner: Arc::new(RuntimeInner {
                id,
                vm,
                alive: AtomicBool::new(true),
                pinned: AtomicUsize::new(0),
                classes: RwLock::new(FxHashMap::default()),
                members: RwLock::new(FxHashMap::default()),
                lifecycle: RwLock::new(()),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> RuntimeId {
        self.inner.id
    }

    /// Whether [`shutdown`](Self::shutdown) has not run yet
    #[inline]
    pub fn is_available(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Fail with `RuntimeNotAvailable` after shutdown
    pub fn ensure_available(&self) -> BridgeResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BridgeError::RuntimeNotAvailable)
        }
    }

    /// Number of pinned references currently alive
    pub fn pinned_references(&self) -> usize {
        self.inner.pinned.load(Ordering::Acquire)
    }

    /// Number of classes resolved and cached so far
    pub fn cached_classes(&self) -> usize {
        self.inner.classes.read().len()
    }

    /// Release cached symbols and destroy the runtime.
    ///
    /// Waits for attachment scopes on other threads to end. Every later
    /// operation on this runtime, including a second shutdown, fails with
    /// `RuntimeNotAvailable`. Pinned references that are still alive become
    /// inert: dropping them does nothing.
    ///
    /// Fails with `ShutdownWhileAttached` when the calling thread is inside
    /// an attachment scope of this runtime; the runtime stays usable.
    pub fn shutdown(&self) -> BridgeResult<()> {
        if is_attached(self) {
            return Err(BridgeError::ShutdownWhileAttached);
        }
        let _exclusive = self.inner.lifecycle.write();
        self.ensure_available()?;

        let env = self
            .inner
            .vm
            .attach_current_thread()
            .map_err(|code| BridgeError::Attachment { code })?;
        let classes = std::mem::take(&mut *self.inner.classes.write());
        for class in classes.into_values() {
            self.inner.vm.delete_global_ref(env, class);
        }
        self.inner.members.write().clear();
        if let Err(code) = self.inner.vm.detach_current_thread() {
            log::warn!(
                "failed to detach thread from runtime {} (status {})",
                self.id().as_u64(),
                code
            );
        }

        self.inner.alive.store(false, Ordering::Release);
        let outstanding = self.pinned_references();
        if outstanding > 0 {
            log::debug!(
                "runtime {} shutting down with {} pinned references",
                self.id().as_u64(),
                outstanding
            );
        }

        self.inner
            .vm
            .destroy()
            .map_err(|code| BridgeError::invocation("DestroyJavaVM", format!("status {}", code)))?;
        log::info!("runtime {} shut down", self.id().as_u64());
        Ok(())
    }

    // ========================================================================
    // Crate internals
    // ========================================================================

    #[inline]
    pub(crate) fn vm(&self) -> &dyn EmbeddedVm {
        self.inner.vm.as_ref()
    }

    #[inline]
    pub(crate) fn lifecycle(&self) -> &RwLock<()> {
        &self.inner.lifecycle
    }

    pub(crate) fn pinned_inc(&self) {
        self.inner.pinned.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn pinned_dec(&self) {
        self.inner.pinned.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn cached_class(&self, name: &'static CStr) -> Option<RawObject> {
        self.inner.classes.read().get(name).copied()
    }

    /// Cache a class global reference; returns the one that ends up cached
    /// and whether `class` was the one stored.
    pub(crate) fn cache_class(&self, name: &'static CStr, class: RawObject) -> (RawObject, bool) {
        let mut classes = self.inner.classes.write();
        match classes.get(name) {
            Some(existing) => (*existing, false),
            None => {
                classes.insert(name, class);
                (class, true)
            }
        }
    }

    pub(crate) fn cached_member(&self, key: &MemberKey) -> Option<MemberId> {
        self.inner.members.read().get(key).copied()
    }

    pub(crate) fn cache_member(&self, key: MemberKey, id: MemberId) {
        self.inner.members.write().insert(key, id);
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id().as_u64())
            .field("available", &self.is_available())
            .field("pinned", &self.pinned_references())
            .finish()
    }
}

// ============================================================================
// Process-wide runtime
// ============================================================================

static GLOBAL: OnceCell<Runtime> = OnceCell::new();

/// The process-wide runtime, started from [`RuntimeOptions::from_env`] on
/// first use.
pub fn global() -> BridgeResult<&'static Runtime> {
    GLOBAL.get_or_try_init(|| {
        let options = RuntimeOptions::from_env();
        log::debug!("starting global runtime with {:?}", options);
        Runtime::initialize(&options)
    })
}

/// Install `runtime` as the process-wide runtime.
///
/// Fails with `AlreadyInitialized` if one is already installed or was
/// started by [`global`].
pub fn install_global(runtime: Runtime) -> BridgeResult<&'static Runtime> {
    let mut installed = false;
    let global = GLOBAL.get_or_init(|| {
        installed = true;
        runtime
    });
    if installed {
        Ok(global)
    } else {
        Err(InitError::AlreadyInitialized.into())
    }
}

//! Thread attachment
//!
//! Every call into the runtime happens on an attached thread. Attachments are
//! counted per thread and per runtime: every guard adds one scope, and the
//! thread is detached when the last scope on it ends, whatever the drop order.
//! Each scope also holds the runtime's lifecycle gate, so shutdown waits for
//! scopes on other threads to finish.

use std::cell::RefCell;
use std::marker::PhantomData;

use parking_lot::RwLockReadGuard;

use crate::error::{BridgeError, BridgeResult};
use crate::runtime::{Runtime, RuntimeId};
use crate::vm::{EmbeddedVm, RawEnv};

struct Attachment {
    runtime: RuntimeId,
    env: RawEnv,
    /// Live guards on this thread
    depth: usize,
}

thread_local! {
    /// Attachments held by this thread
    static ATTACHMENTS: RefCell<Vec<Attachment>> = const { RefCell::new(Vec::new()) };
}

fn current_env(id: RuntimeId) -> Option<RawEnv> {
    ATTACHMENTS
        .try_with(|attachments| {
            attachments
                .borrow()
                .iter()
                .find(|attachment| attachment.runtime == id)
                .map(|attachment| attachment.env)
        })
        .ok()
        .flatten()
}

/// Add a scope to an existing attachment
fn enter(id: RuntimeId) -> Option<RawEnv> {
    ATTACHMENTS
        .try_with(|attachments| {
            attachments
                .borrow_mut()
                .iter_mut()
                .find(|attachment| attachment.runtime == id)
                .map(|attachment| {
                    attachment.depth += 1;
                    attachment.env
                })
        })
        .ok()
        .flatten()
}

/// Record a physical attachment; false if thread-local storage is gone
fn remember(id: RuntimeId, env: RawEnv) -> bool {
    ATTACHMENTS
        .try_with(|attachments| {
            attachments.borrow_mut().push(Attachment {
                runtime: id,
                env,
                depth: 1,
            })
        })
        .is_ok()
}

/// End a scope; true when it was the last one and the thread must detach
fn leave(id: RuntimeId) -> bool {
    ATTACHMENTS
        .try_with(|attachments| {
            let mut attachments = attachments.borrow_mut();
            let Some(index) = attachments.iter().position(|a| a.runtime == id) else {
                // Never recorded: the guard that attached is the only one
                return true;
            };
            attachments[index].depth -= 1;
            if attachments[index].depth == 0 {
                attachments.swap_remove(index);
                true
            } else {
                false
            }
        })
        .unwrap_or(true)
}

/// Whether the calling thread currently holds an attachment to `runtime`
pub fn is_attached(runtime: &Runtime) -> bool {
    current_env(runtime.id()).is_some()
}

/// Number of live attachment scopes the calling thread holds on `runtime`
pub fn attachment_depth(runtime: &Runtime) -> usize {
    ATTACHMENTS
        .try_with(|attachments| {
            attachments
                .borrow()
                .iter()
                .find(|attachment| attachment.runtime == runtime.id())
                .map_or(0, |attachment| attachment.depth)
        })
        .unwrap_or(0)
}

/// Scope of an attachment to the runtime.
///
/// Created by [`Runtime::attach`]. Guards on one thread share a single
/// physical attachment, which is released when the last of them drops.
pub struct AttachGuard<'rt> {
    runtime: &'rt Runtime,
    env: RawEnv,
    attached_here: bool,
    _not_send: PhantomData<*const ()>,
    // Dropped after `Drop::drop` has detached
    _lifecycle: RwLockReadGuard<'rt, ()>,
}

impl<'rt> AttachGuard<'rt> {
    /// Environment for calls made inside this scope
    #[inline]
    pub fn env(&self) -> Env<'_> {
        Env::new(self.runtime, self.env)
    }

    /// Whether this guard performed the physical attach
    #[inline]
    pub fn owns_attachment(&self) -> bool {
        self.attached_here
    }
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        let id = self.runtime.id();
        if !leave(id) {
            return;
        }
        match self.runtime.vm().detach_current_thread() {
            Ok(()) => log::debug!("thread detached from runtime {}", id.as_u64()),
            Err(code) => log::warn!(
                "failed to detach thread from runtime {} (status {})",
                id.as_u64(),
                code
            ),
        }
    }
}

impl Runtime {
    /// Attach the calling thread, or add a scope to its existing attachment
    pub fn attach(&self) -> BridgeResult<AttachGuard<'_>> {
        // An outer scope already holds the gate; a plain read could queue
        // behind a waiting shutdown and deadlock
        let lifecycle = if is_attached(self) {
            self.lifecycle().read_recursive()
        } else {
            self.lifecycle().read()
        };
        self.ensure_available()?;

        if let Some(env) = enter(self.id()) {
            return Ok(AttachGuard {
                runtime: self,
                env,
                attached_here: false,
                _not_send: PhantomData,
                _lifecycle: lifecycle,
            });
        }

        let env = self
            .vm()
            .attach_current_thread()
            .map_err(|code| BridgeError::Attachment { code })?;
        if !remember(self.id(), env) {
            log::trace!("attachment to runtime {} not cached: thread is exiting", self.id().as_u64());
        }
        log::debug!("thread attached to runtime {}", self.id().as_u64());

        Ok(AttachGuard {
            runtime: self,
            env,
            attached_here: true,
            _not_send: PhantomData,
            _lifecycle: lifecycle,
        })
    }

    /// Run `f` with the calling thread attached.
    ///
    /// The attachment is released on every exit path, including errors and
    /// panics, and nested calls never detach the outer attachment.
    pub fn with_attachment<R>(
        &self,
        f: impl for<'e> FnOnce(Env<'e>) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        let guard = self.attach()?;
        f(guard.env())
    }
}

/// Environment of an attached thread.
///
/// Borrowed from an [`AttachGuard`]; anything created through it (local
/// references in particular) cannot outlive the attachment.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    runtime: &'a Runtime,
    raw: RawEnv,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Env<'a> {
    pub(crate) fn new(runtime: &'a Runtime, raw: RawEnv) -> Self {
        Env {
            runtime,
            raw,
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    #[inline]
    pub fn raw(&self) -> RawEnv {
        self.raw
    }

    #[inline]
    pub(crate) fn vm(&self) -> &'a dyn EmbeddedVm {
        self.runtime.vm()
    }
}

impl std::fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("runtime", &self.runtime.id().as_u64())
            .finish()
    }
}

//! EmbeddedVm trait: raw embedding operations
//!
//! The bridge programs against this trait only. The JNI backend implements it
//! over the function tables exported by the runtime library; the in-memory
//! runtime in [`testing`](crate::testing) implements it for tests.
//!
//! Every method is a thin wrapper over one embedding call. None of them check
//! for pending exceptions; the call invoker does that after each call.

use std::ffi::{c_void, CStr};

/// Opaque handle to an object in the runtime heap (local or global reference).
/// May be null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawObject(*mut c_void);

// Handles are plain tokens; the runtime decides which threads may use them.
unsafe impl Send for RawObject {}
unsafe impl Sync for RawObject {}

impl RawObject {
    /// The null reference
    pub const NULL: RawObject = RawObject(std::ptr::null_mut());

    /// Wrap a raw handle
    #[inline]
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        RawObject(ptr)
    }

    /// Raw handle
    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// Resolved method or field id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MemberId(*mut c_void);

unsafe impl Send for MemberId {}
unsafe impl Sync for MemberId {}

impl MemberId {
    #[inline]
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        MemberId(ptr)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// Per-thread environment handed out by an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct RawEnv(*mut c_void);

impl RawEnv {
    #[inline]
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        RawEnv(ptr)
    }

    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }
}

/// How a member is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Instance method or constructor
    Method,
    /// Static method
    StaticMethod,
    /// Static field
    StaticField,
}

/// Declared return type of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    Void,
    Boolean,
    Int,
    Long,
    Double,
    Object,
}

/// Argument passed by value to a call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JValue {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Object(RawObject),
}

/// Value produced by a call, before exception checking
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawReturn {
    Void,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    /// Local reference, possibly null
    Object(RawObject),
}

/// Raw embedding operations.
///
/// Implementations must be callable from any thread; `RawEnv` values are only
/// ever used on the thread they were issued to.
pub trait EmbeddedVm: Send + Sync {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Attach the calling thread, returning its environment or a status code
    fn attach_current_thread(&self) -> Result<RawEnv, i32>;

    /// Detach the calling thread
    fn detach_current_thread(&self) -> Result<(), i32>;

    /// Tear the runtime down
    fn destroy(&self) -> Result<(), i32>;

    // ========================================================================
    // Symbol Resolution
    // ========================================================================

    /// Find a class by slash-separated name; null if missing (exception pending)
    fn find_class(&self, env: RawEnv, name: &CStr) -> RawObject;

    /// Resolve a member of a class; `None` if missing (exception pending)
    fn member_id(
        &self,
        env: RawEnv,
        class: RawObject,
        name: &CStr,
        signature: &CStr,
        kind: MemberKind,
    ) -> Option<MemberId>;

    // ========================================================================
    // Calls
    // ========================================================================

    /// Allocate an object and run a constructor
    fn new_object(&self, env: RawEnv, class: RawObject, ctor: MemberId, args: &[JValue]) -> RawObject;

    /// Call an instance method with virtual dispatch
    fn call_method(
        &self,
        env: RawEnv,
        receiver: RawObject,
        method: MemberId,
        ret: ReturnKind,
        args: &[JValue],
    ) -> RawReturn;

    /// Call a static method
    fn call_static_method(
        &self,
        env: RawEnv,
        class: RawObject,
        method: MemberId,
        ret: ReturnKind,
        args: &[JValue],
    ) -> RawReturn;

    /// Read an object-typed static field
    fn static_object_field(&self, env: RawEnv, class: RawObject, field: MemberId) -> RawObject;

    // ========================================================================
    // References
    // ========================================================================

    fn new_global_ref(&self, env: RawEnv, obj: RawObject) -> RawObject;

    fn delete_global_ref(&self, env: RawEnv, obj: RawObject);

    fn new_local_ref(&self, env: RawEnv, obj: RawObject) -> RawObject;

    fn delete_local_ref(&self, env: RawEnv, obj: RawObject);

    // ========================================================================
    // Strings
    // ========================================================================

    /// Create a string from UTF-16 code units
    fn new_string(&self, env: RawEnv, units: &[u16]) -> RawObject;

    /// Copy out the UTF-16 code units of a string
    fn string_units(&self, env: RawEnv, string: RawObject) -> Vec<u16>;

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Whether an exception is pending on this thread
    fn exception_check(&self, env: RawEnv) -> bool;

    /// Take the pending exception (a local reference) and clear it
    fn exception_take(&self, env: RawEnv) -> RawObject;
}

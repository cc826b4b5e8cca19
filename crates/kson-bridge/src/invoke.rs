//! Descriptor-driven calls
//!
//! A [`Descriptor`] names one member of one class: the class, the member name,
//! its signature and how it is called. Resolution is cached per runtime, and
//! every call is followed by an exception check, so a pending exception is
//! never left behind on the thread.

use std::ffi::CStr;

use crate::attach::Env;
use crate::error::{BridgeError, BridgeResult};
use crate::reference::LocalRef;
use crate::vm::{JValue, MemberId, MemberKind, RawObject, RawReturn, ReturnKind};
use crate::well_known;

/// How a described member is called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `<init>`; produces a new object
    Constructor,
    /// Instance method with virtual dispatch
    Method(ReturnKind),
    StaticMethod(ReturnKind),
    /// Object-typed static field, e.g. a singleton `INSTANCE`
    StaticField,
}

/// Name, signature and call form of a class member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor {
    /// Slash-separated class name, e.g. `java/util/List`
    pub class: &'static CStr,
    pub member: &'static CStr,
    /// Type signature, e.g. `(Ljava/lang/Object;)Z`
    pub signature: &'static CStr,
    pub kind: CallKind,
}

impl Descriptor {
    pub const fn constructor(class: &'static CStr, signature: &'static CStr) -> Self {
        Descriptor {
            class,
            member: c"<init>",
            signature,
            kind: CallKind::Constructor,
        }
    }

    pub const fn method(
        class: &'static CStr,
        member: &'static CStr,
        signature: &'static CStr,
        ret: ReturnKind,
    ) -> Self {
        Descriptor {
            class,
            member,
            signature,
            kind: CallKind::Method(ret),
        }
    }

    pub const fn static_method(
        class: &'static CStr,
        member: &'static CStr,
        signature: &'static CStr,
        ret: ReturnKind,
    ) -> Self {
        Descriptor {
            class,
            member,
            signature,
            kind: CallKind::StaticMethod(ret),
        }
    }

    pub const fn static_field(
        class: &'static CStr,
        member: &'static CStr,
        signature: &'static CStr,
    ) -> Self {
        Descriptor {
            class,
            member,
            signature,
            kind: CallKind::StaticField,
        }
    }

    /// `class.member`, for diagnostics
    pub fn display_name(&self) -> String {
        format!(
            "{}.{}",
            self.class.to_string_lossy(),
            self.member.to_string_lossy()
        )
    }

    fn member_kind(&self) -> MemberKind {
        match self.kind {
            CallKind::Constructor | CallKind::Method(_) => MemberKind::Method,
            CallKind::StaticMethod(_) => MemberKind::StaticMethod,
            CallKind::StaticField => MemberKind::StaticField,
        }
    }

    fn symbol_not_found(&self) -> BridgeError {
        BridgeError::SymbolNotFound {
            class: self.class.to_string_lossy().into_owned(),
            member: self.member.to_string_lossy().into_owned(),
            signature: self.signature.to_string_lossy().into_owned(),
        }
    }

    /// Return kind declared by the signature; `None` if it does not parse
    pub fn declared_return(&self) -> Option<ReturnKind> {
        let bytes = self.signature.to_bytes();
        let ret = match self.kind {
            CallKind::StaticField => bytes,
            _ => {
                let close = bytes.iter().position(|b| *b == b')')?;
                &bytes[close + 1..]
            }
        };
        match ret.first()? {
            b'V' => Some(ReturnKind::Void),
            b'Z' => Some(ReturnKind::Boolean),
            b'I' => Some(ReturnKind::Int),
            b'J' => Some(ReturnKind::Long),
            b'D' => Some(ReturnKind::Double),
            b'L' | b'[' => Some(ReturnKind::Object),
            _ => None,
        }
    }

    /// Number of parameters in the signature; `None` if it does not parse
    pub fn parameter_count(&self) -> Option<usize> {
        if self.kind == CallKind::StaticField {
            return Some(0);
        }
        let bytes = self.signature.to_bytes();
        if bytes.first() != Some(&b'(') {
            return None;
        }
        let mut count = 0;
        let mut i = 1;
        loop {
            match *bytes.get(i)? {
                b')' => return Some(count),
                b'[' => {
                    i += 1;
                    continue;
                }
                b'L' => {
                    let end = bytes[i..].iter().position(|b| *b == b';')?;
                    i += end;
                }
                b'Z' | b'B' | b'C' | b'S' | b'I' | b'J' | b'F' | b'D' => {}
                _ => return None,
            }
            count += 1;
            i += 1;
        }
    }

    /// Whether the call kind agrees with what the signature declares
    pub fn is_consistent(&self) -> bool {
        let declared = self.declared_return();
        match self.kind {
            CallKind::Constructor => declared == Some(ReturnKind::Void),
            CallKind::Method(ret) | CallKind::StaticMethod(ret) => declared == Some(ret),
            CallKind::StaticField => declared == Some(ReturnKind::Object),
        }
    }
}

/// Result of an invocation, exception-checked
#[derive(Debug)]
pub enum Returned<'a> {
    Void,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    /// Object result; `None` for null
    Object(Option<LocalRef<'a>>),
}

impl<'a> Env<'a> {
    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a class, caching it as a pinned class reference
    pub fn class(&self, name: &'static CStr) -> BridgeResult<RawObject> {
        let runtime = self.runtime();
        runtime.ensure_available()?;
        if let Some(class) = runtime.cached_class(name) {
            return Ok(class);
        }

        let local = self.vm().find_class(self.raw(), name);
        if local.is_null() {
            self.discard_exception();
            return Err(BridgeError::SymbolNotFound {
                class: name.to_string_lossy().into_owned(),
                member: String::new(),
                signature: String::new(),
            });
        }
        let local = LocalRef::from_raw(*self, local);
        let global = self.vm().new_global_ref(self.raw(), local.as_raw());
        if global.is_null() {
            return Err(BridgeError::invocation(
                "NewGlobalRef",
                format!("could not pin class {}", name.to_string_lossy()),
            ));
        }
        let (class, stored) = runtime.cache_class(name, global);
        if !stored {
            // Lost a race with another thread resolving the same class
            self.vm().delete_global_ref(self.raw(), global);
        }
        Ok(class)
    }

    /// Resolve the class and member named by a descriptor
    pub fn resolve(&self, desc: &Descriptor) -> BridgeResult<(RawObject, MemberId)> {
        let class = self.class(desc.class)?;
        let key = (desc.class, desc.member, desc.signature, desc.member_kind());
        if let Some(id) = self.runtime().cached_member(&key) {
            return Ok((class, id));
        }

        match self
            .vm()
            .member_id(self.raw(), class, desc.member, desc.signature, desc.member_kind())
        {
            Some(id) => {
                self.runtime().cache_member(key, id);
                Ok((class, id))
            }
            None => {
                self.discard_exception();
                Err(desc.symbol_not_found())
            }
        }
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Invoke a described member.
    ///
    /// `receiver` is required for instance methods and ignored otherwise.
    pub fn invoke(
        &self,
        desc: &Descriptor,
        receiver: Option<RawObject>,
        args: &[JValue],
    ) -> BridgeResult<Returned<'a>> {
        debug_assert_eq!(
            desc.parameter_count(),
            Some(args.len()),
            "argument count for {}",
            desc.display_name()
        );
        self.runtime().ensure_available()?;
        let (class, id) = self.resolve(desc)?;
        let vm = self.vm();
        let env = self.raw();

        let raw = match desc.kind {
            CallKind::Constructor => RawReturn::Object(vm.new_object(env, class, id, args)),
            CallKind::Method(ret) => {
                let receiver = receiver.filter(|r| !r.is_null()).ok_or_else(|| {
                    BridgeError::invocation(desc.display_name(), "null receiver")
                })?;
                vm.call_method(env, receiver, id, ret, args)
            }
            CallKind::StaticMethod(ret) => vm.call_static_method(env, class, id, ret, args),
            CallKind::StaticField => RawReturn::Object(vm.static_object_field(env, class, id)),
        };

        if vm.exception_check(env) {
            // A local returned alongside an exception is meaningless
            if let RawReturn::Object(obj) = raw {
                if !obj.is_null() {
                    vm.delete_local_ref(env, obj);
                }
            }
            return Err(self.take_exception(desc));
        }

        Ok(match raw {
            RawReturn::Void => Returned::Void,
            RawReturn::Boolean(b) => Returned::Boolean(b),
            RawReturn::Int(i) => Returned::Int(i),
            RawReturn::Long(l) => Returned::Long(l),
            RawReturn::Double(d) => Returned::Double(d),
            RawReturn::Object(obj) if obj.is_null() => Returned::Object(None),
            RawReturn::Object(obj) => Returned::Object(Some(LocalRef::from_raw(*self, obj))),
        })
    }

    /// Run a constructor
    pub fn new_object(&self, desc: &Descriptor, args: &[JValue]) -> BridgeResult<LocalRef<'a>> {
        self.invoke(desc, None, args)?.into_object(desc)
    }

    /// Call a method that must return a non-null object
    pub fn call_object(
        &self,
        desc: &Descriptor,
        receiver: RawObject,
        args: &[JValue],
    ) -> BridgeResult<LocalRef<'a>> {
        self.invoke(desc, Some(receiver), args)?.into_object(desc)
    }

    /// Call a method that may return null
    pub fn call_nullable(
        &self,
        desc: &Descriptor,
        receiver: RawObject,
        args: &[JValue],
    ) -> BridgeResult<Option<LocalRef<'a>>> {
        match self.invoke(desc, Some(receiver), args)? {
            Returned::Object(obj) => Ok(obj),
            other => Err(unexpected(desc, &other)),
        }
    }

    pub fn call_bool(&self, desc: &Descriptor, receiver: RawObject, args: &[JValue]) -> BridgeResult<bool> {
        match self.invoke(desc, Some(receiver), args)? {
            Returned::Boolean(b) => Ok(b),
            other => Err(unexpected(desc, &other)),
        }
    }

    pub fn call_int(&self, desc: &Descriptor, receiver: RawObject, args: &[JValue]) -> BridgeResult<i32> {
        match self.invoke(desc, Some(receiver), args)? {
            Returned::Int(i) => Ok(i),
            other => Err(unexpected(desc, &other)),
        }
    }

    pub fn call_long(&self, desc: &Descriptor, receiver: RawObject, args: &[JValue]) -> BridgeResult<i64> {
        match self.invoke(desc, Some(receiver), args)? {
            Returned::Long(l) => Ok(l),
            other => Err(unexpected(desc, &other)),
        }
    }

    pub fn call_double(&self, desc: &Descriptor, receiver: RawObject, args: &[JValue]) -> BridgeResult<f64> {
        match self.invoke(desc, Some(receiver), args)? {
            Returned::Double(d) => Ok(d),
            other => Err(unexpected(desc, &other)),
        }
    }

    pub fn call_void(&self, desc: &Descriptor, receiver: RawObject, args: &[JValue]) -> BridgeResult<()> {
        match self.invoke(desc, Some(receiver), args)? {
            Returned::Void => Ok(()),
            other => Err(unexpected(desc, &other)),
        }
    }

    /// Read a non-null static object field
    pub fn static_field(&self, desc: &Descriptor) -> BridgeResult<LocalRef<'a>> {
        self.invoke(desc, None, &[])?.into_object(desc)
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Clear a pending exception without looking at it
    pub(crate) fn discard_exception(&self) {
        let vm = self.vm();
        if vm.exception_check(self.raw()) {
            let throwable = vm.exception_take(self.raw());
            if !throwable.is_null() {
                vm.delete_local_ref(self.raw(), throwable);
            }
        }
    }

    /// Clear the pending exception and turn it into an error
    fn take_exception(&self, desc: &Descriptor) -> BridgeError {
        let vm = self.vm();
        let throwable = vm.exception_take(self.raw());
        if throwable.is_null() {
            return BridgeError::invocation(desc.display_name(), "unknown exception");
        }
        let throwable = LocalRef::from_raw(*self, throwable);
        let message = self
            .describe(throwable.as_raw())
            .unwrap_or_else(|| "<exception could not be rendered>".to_string());
        log::debug!("{} threw: {}", desc.display_name(), message);
        BridgeError::invocation(desc.display_name(), message)
    }

    /// `toString()` of an object, without recursing into exception handling
    fn describe(&self, obj: RawObject) -> Option<String> {
        let desc = &well_known::OBJECT_TO_STRING;
        let (_, id) = self.resolve(desc).ok()?;
        let vm = self.vm();
        let raw = vm.call_method(self.raw(), obj, id, ReturnKind::Object, &[]);
        if vm.exception_check(self.raw()) {
            if let RawReturn::Object(obj) = raw {
                if !obj.is_null() {
                    vm.delete_local_ref(self.raw(), obj);
                }
            }
            self.discard_exception();
            return None;
        }
        match raw {
            RawReturn::Object(text) if !text.is_null() => {
                let text = LocalRef::from_raw(*self, text);
                self.read_string(text.as_raw()).ok()
            }
            _ => None,
        }
    }
}

/// Resolve every descriptor up front, failing on the first that does not exist
pub fn verify_descriptors(env: Env<'_>, descriptors: &[Descriptor]) -> BridgeResult<()> {
    for desc in descriptors {
        env.resolve(desc)?;
    }
    log::debug!("verified {} descriptors", descriptors.len());
    Ok(())
}

impl<'a> Returned<'a> {
    /// The object result; null is an error
    pub fn into_object(self, desc: &Descriptor) -> BridgeResult<LocalRef<'a>> {
        match self {
            Returned::Object(Some(obj)) => Ok(obj),
            Returned::Object(None) => Err(BridgeError::invocation(
                desc.display_name(),
                "unexpected null result",
            )),
            other => Err(unexpected(desc, &other)),
        }
    }
}

fn unexpected(desc: &Descriptor, returned: &Returned<'_>) -> BridgeError {
    BridgeError::invocation(
        desc.display_name(),
        format!("result {:?} does not match the call form {:?}", returned, desc.kind),
    )
}

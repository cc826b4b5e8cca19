//! JNI backend
//!
//! Starts the runtime through the `JNI_CreateJavaVM` entry point exported by
//! the KSON library and implements [`EmbeddedVm`] over the JNI function
//! tables.

use std::ffi::{c_char, c_void, CStr, CString};
use std::mem::ManuallyDrop;
use std::ptr;

use jni_sys::{
    jboolean, jint, jobject, jsize, jvalue, JNIEnv, JavaVM, JavaVMInitArgs, JavaVMOption, JNI_FALSE,
    JNI_OK, JNI_TRUE, JNI_VERSION_1_8,
};

use crate::error::InitError;
use crate::loader::Library;
use crate::options::RuntimeOptions;
use crate::vm::{EmbeddedVm, JValue, MemberId, MemberKind, RawEnv, RawObject, RawReturn, ReturnKind};

const CREATE_VM_SYMBOL: &str = "JNI_CreateJavaVM";

type CreateJavaVm = unsafe extern "system" fn(*mut *mut JavaVM, *mut *mut c_void, *mut c_void) -> jint;

#[cold]
fn missing_function(name: &str) -> ! {
    panic!("JNI function table has no entry for {}", name)
}

/// Call a function from the per-thread JNI table
macro_rules! env_call {
    ($env:expr, $name:ident $(, $arg:expr)*) => {{
        let env = $env.as_ptr() as *mut JNIEnv;
        match (**env).$name {
            Some(f) => f(env $(, $arg)*),
            None => missing_function(stringify!($name)),
        }
    }};
}

/// Call a function from the invocation table
macro_rules! vm_call {
    ($vm:expr, $name:ident $(, $arg:expr)*) => {{
        let vm: *mut JavaVM = $vm;
        match (**vm).$name {
            Some(f) => f(vm $(, $arg)*),
            None => missing_function(stringify!($name)),
        }
    }};
}

/// Runtime reached through the JNI invocation API
pub struct JniVm {
    vm: *mut JavaVM,
    // The runtime cannot be restarted in-process, so the library stays mapped
    library: ManuallyDrop<Library>,
}

// The invocation interface may be used from any thread.
unsafe impl Send for JniVm {}
unsafe impl Sync for JniVm {}

impl JniVm {
    /// Load the library named by `options` and start its runtime
    pub fn create(options: &RuntimeOptions) -> Result<JniVm, InitError> {
        let path = options.resolve_library_path()?;
        let library = Library::open(&path)?;
        let create: CreateJavaVm = unsafe { library.get(CREATE_VM_SYMBOL)? };

        let option_strings = options
            .vm_options
            .iter()
            .map(|option| {
                CString::new(option.as_str())
                    .map_err(|_| InitError::InvalidOption(option.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut vm_options: Vec<JavaVMOption> = option_strings
            .iter()
            .map(|option| JavaVMOption {
                optionString: option.as_ptr() as *mut c_char,
                extraInfo: ptr::null_mut(),
            })
            .collect();
        let mut args = JavaVMInitArgs {
            version: JNI_VERSION_1_8,
            nOptions: vm_options.len() as jint,
            options: vm_options.as_mut_ptr(),
            ignoreUnrecognized: if options.strict_options { JNI_FALSE } else { JNI_TRUE },
        };

        let mut vm: *mut JavaVM = ptr::null_mut();
        let mut env: *mut c_void = ptr::null_mut();
        let status = unsafe { create(&mut vm, &mut env, &mut args as *mut JavaVMInitArgs as *mut c_void) };
        if status != JNI_OK || vm.is_null() {
            return Err(InitError::StartFailed { code: status });
        }
        log::info!("embedded runtime started from {}", library.path());

        let jvm = JniVm {
            vm,
            library: ManuallyDrop::new(library),
        };
        // The creating thread comes back attached; start from a clean slate
        if let Err(code) = jvm.detach_current_thread() {
            log::warn!("could not detach the creating thread (status {})", code);
        }
        Ok(jvm)
    }

    /// Path of the loaded library
    pub fn library_path(&self) -> &str {
        self.library.path()
    }
}

fn to_jvalues(args: &[JValue]) -> Vec<jvalue> {
    args.iter()
        .map(|arg| match *arg {
            JValue::Boolean(b) => jvalue {
                z: if b { JNI_TRUE } else { JNI_FALSE },
            },
            JValue::Int(i) => jvalue { i },
            JValue::Long(j) => jvalue { j },
            JValue::Double(d) => jvalue { d },
            JValue::Object(obj) => jvalue {
                l: obj.as_ptr() as jobject,
            },
        })
        .collect()
}

#[inline]
fn raw(obj: jobject) -> RawObject {
    RawObject::from_ptr(obj as *mut c_void)
}

#[inline]
fn obj(raw: RawObject) -> jobject {
    raw.as_ptr() as jobject
}

#[inline]
fn truthy(value: jboolean) -> bool {
    value != JNI_FALSE
}

impl EmbeddedVm for JniVm {
    fn attach_current_thread(&self) -> Result<RawEnv, i32> {
        let mut env: *mut c_void = ptr::null_mut();
        let status = unsafe { vm_call!(self.vm, AttachCurrentThread, &mut env, ptr::null_mut()) };
        if status == JNI_OK && !env.is_null() {
            Ok(RawEnv::from_ptr(env))
        } else {
            Err(status)
        }
    }

    fn detach_current_thread(&self) -> Result<(), i32> {
        let status = unsafe { vm_call!(self.vm, DetachCurrentThread) };
        if status == JNI_OK {
            Ok(())
        } else {
            Err(status)
        }
    }

    fn destroy(&self) -> Result<(), i32> {
        let status = unsafe { vm_call!(self.vm, DestroyJavaVM) };
        if status == JNI_OK {
            Ok(())
        } else {
            Err(status)
        }
    }

    fn find_class(&self, env: RawEnv, name: &CStr) -> RawObject {
        raw(unsafe { env_call!(env, FindClass, name.as_ptr()) })
    }

    fn member_id(
        &self,
        env: RawEnv,
        class: RawObject,
        name: &CStr,
        signature: &CStr,
        kind: MemberKind,
    ) -> Option<MemberId> {
        let class = obj(class);
        let id = unsafe {
            match kind {
                MemberKind::Method => {
                    env_call!(env, GetMethodID, class, name.as_ptr(), signature.as_ptr()) as *mut c_void
                }
                MemberKind::StaticMethod => {
                    env_call!(env, GetStaticMethodID, class, name.as_ptr(), signature.as_ptr())
                        as *mut c_void
                }
                MemberKind::StaticField => {
                    env_call!(env, GetStaticFieldID, class, name.as_ptr(), signature.as_ptr())
                        as *mut c_void
                }
            }
        };
        (!id.is_null()).then(|| MemberId::from_ptr(id))
    }

    fn new_object(&self, env: RawEnv, class: RawObject, ctor: MemberId, args: &[JValue]) -> RawObject {
        let args = to_jvalues(args);
        raw(unsafe { env_call!(env, NewObjectA, obj(class), ctor.as_ptr() as _, args.as_ptr()) })
    }

    fn call_method(
        &self,
        env: RawEnv,
        receiver: RawObject,
        method: MemberId,
        ret: ReturnKind,
        args: &[JValue],
    ) -> RawReturn {
        let args = to_jvalues(args);
        let (receiver, method, args) = (obj(receiver), method.as_ptr() as _, args.as_ptr());
        unsafe {
            match ret {
                ReturnKind::Void => {
                    env_call!(env, CallVoidMethodA, receiver, method, args);
                    RawReturn::Void
                }
                ReturnKind::Boolean => {
                    RawReturn::Boolean(truthy(env_call!(env, CallBooleanMethodA, receiver, method, args)))
                }
                ReturnKind::Int => RawReturn::Int(env_call!(env, CallIntMethodA, receiver, method, args)),
                ReturnKind::Long => RawReturn::Long(env_call!(env, CallLongMethodA, receiver, method, args)),
                ReturnKind::Double => {
                    RawReturn::Double(env_call!(env, CallDoubleMethodA, receiver, method, args))
                }
                ReturnKind::Object => {
                    RawReturn::Object(raw(env_call!(env, CallObjectMethodA, receiver, method, args)))
                }
            }
        }
    }

    fn call_static_method(
        &self,
        env: RawEnv,
        class: RawObject,
        method: MemberId,
        ret: ReturnKind,
        args: &[JValue],
    ) -> RawReturn {
        let args = to_jvalues(args);
        let (class, method, args) = (obj(class), method.as_ptr() as _, args.as_ptr());
        unsafe {
            match ret {
                ReturnKind::Void => {
                    env_call!(env, CallStaticVoidMethodA, class, method, args);
                    RawReturn::Void
                }
                ReturnKind::Boolean => RawReturn::Boolean(truthy(env_call!(
                    env,
                    CallStaticBooleanMethodA,
                    class,
                    method,
                    args
                ))),
                ReturnKind::Int => {
                    RawReturn::Int(env_call!(env, CallStaticIntMethodA, class, method, args))
                }
                ReturnKind::Long => {
                    RawReturn::Long(env_call!(env, CallStaticLongMethodA, class, method, args))
                }
                ReturnKind::Double => {
                    RawReturn::Double(env_call!(env, CallStaticDoubleMethodA, class, method, args))
                }
                ReturnKind::Object => RawReturn::Object(raw(env_call!(
                    env,
                    CallStaticObjectMethodA,
                    class,
                    method,
                    args
                ))),
            }
        }
    }

    fn static_object_field(&self, env: RawEnv, class: RawObject, field: MemberId) -> RawObject {
        raw(unsafe { env_call!(env, GetStaticObjectField, obj(class), field.as_ptr() as _) })
    }

    fn new_global_ref(&self, env: RawEnv, object: RawObject) -> RawObject {
        raw(unsafe { env_call!(env, NewGlobalRef, obj(object)) })
    }

    fn delete_global_ref(&self, env: RawEnv, object: RawObject) {
        unsafe { env_call!(env, DeleteGlobalRef, obj(object)) }
    }

    fn new_local_ref(&self, env: RawEnv, object: RawObject) -> RawObject {
        raw(unsafe { env_call!(env, NewLocalRef, obj(object)) })
    }

    fn delete_local_ref(&self, env: RawEnv, object: RawObject) {
        unsafe { env_call!(env, DeleteLocalRef, obj(object)) }
    }

    fn new_string(&self, env: RawEnv, units: &[u16]) -> RawObject {
        raw(unsafe { env_call!(env, NewString, units.as_ptr(), units.len() as jsize) })
    }

    fn string_units(&self, env: RawEnv, string: RawObject) -> Vec<u16> {
        unsafe {
            let len = env_call!(env, GetStringLength, obj(string));
            let mut units = vec![0u16; len.max(0) as usize];
            env_call!(env, GetStringRegion, obj(string), 0, len, units.as_mut_ptr());
            units
        }
    }

    fn exception_check(&self, env: RawEnv) -> bool {
        truthy(unsafe { env_call!(env, ExceptionCheck) })
    }

    fn exception_take(&self, env: RawEnv) -> RawObject {
        unsafe {
            let throwable = env_call!(env, ExceptionOccurred);
            env_call!(env, ExceptionClear);
            raw(throwable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_fails_to_start() {
        let options = RuntimeOptions::new().with_library_path("/nonexistent/libkson.so");
        assert!(matches!(
            JniVm::create(&options),
            Err(InitError::LibraryNotFound { .. })
        ));
    }

    #[test]
    fn test_jvalue_conversion() {
        let values = to_jvalues(&[JValue::Boolean(true), JValue::Int(7), JValue::Double(1.5)]);
        unsafe {
            assert_eq!(values[0].z, JNI_TRUE);
            assert_eq!(values[1].i, 7);
            assert_eq!(values[2].d, 1.5);
        }
    }
}

//! Runtime, attachment and reference lifecycle tests
//!
//! Runs the bridge against the in-memory runtime and checks the bookkeeping
//! invariants:
//! - nested attachment scopes attach and detach the thread exactly once
//! - pinned references are released exactly once, from any thread
//! - repeated create/use/release cycles leave nothing pinned
//! - concurrent callers never share or leak attachments
//! - shutdown never overlaps a release or call on another thread
//!
//! # Running Tests
//! ```bash
//! cargo test -p kson-bridge --test lifecycle
//! ```

use std::sync::{Arc, Barrier};
use std::thread;

use kson_bridge::testing::{FakeValue, FakeVm};
use kson_bridge::{
    attachment_depth, is_attached, BridgeError, Descriptor, FromEmbedded, GlobalRef, JValue, RawObject, ReturnKind,
    Runtime,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn runtime() -> (FakeVm, Runtime) {
    init_logging();
    let fake = FakeVm::new();
    fake.define_class("test/Echo")
        .constructor("(Ljava/lang/String;)V", &["text"])
        .getter("getText", "()Ljava/lang/String;", "text")
        .method("shout", "()Ljava/lang/String;", |heap, this, _| {
            let text = heap.field(this, "text").object().map(|s| heap.string(s));
            match text {
                Some(text) => Ok(FakeValue::Object(Some(heap.new_string(&text.to_uppercase())))),
                None => Err("java.lang.NullPointerException".to_string()),
            }
        })
        .build();
    let runtime = Runtime::with_vm(Box::new(fake.clone()));
    (fake, runtime)
}

const ECHO_NEW: Descriptor = Descriptor::constructor(c"test/Echo", c"(Ljava/lang/String;)V");
const ECHO_SHOUT: Descriptor =
    Descriptor::method(c"test/Echo", c"shout", c"()Ljava/lang/String;", ReturnKind::Object);

fn new_echo(runtime: &Runtime, text: &str) -> GlobalRef {
    runtime
        .with_attachment(|env| {
            let text = env.new_string(text)?;
            env.new_object(&ECHO_NEW, &[text.as_arg()])?.pin()
        })
        .unwrap()
}

fn shout(echo: &GlobalRef) -> String {
    echo.runtime()
        .with_attachment(|env| String::from_embedded(env.call_object(&ECHO_SHOUT, echo.as_raw(), &[])?))
        .unwrap()
}

// ===== Attachment =====

#[test]
fn test_nested_scopes_attach_once() {
    let (fake, runtime) = runtime();
    runtime
        .with_attachment(|_| {
            runtime.with_attachment(|_| runtime.with_attachment(|_| Ok(())))?;
            assert!(is_attached(&runtime));
            Ok(())
        })
        .unwrap();
    let stats = fake.stats();
    assert_eq!(stats.attaches, 1);
    assert_eq!(stats.detaches, 1);
    assert!(!is_attached(&runtime));
}

#[test]
fn test_panic_inside_scope_detaches() {
    let (fake, runtime) = runtime();
    let inner = runtime.clone();
    let outcome = thread::spawn(move || {
        let _: Result<(), BridgeError> = inner.with_attachment(|_| panic!("boom"));
    })
    .join();
    assert!(outcome.is_err());
    let stats = fake.stats();
    assert_eq!(stats.attaches, 1);
    assert_eq!(stats.detaches, 1);
}

#[test]
fn test_calls_inside_wrapper_reuse_attachment() {
    let (fake, runtime) = runtime();
    let echo = new_echo(&runtime, "hi");
    let before = fake.stats().attaches;
    runtime
        .with_attachment(|_| {
            // Inner calls find the thread already attached
            assert_eq!(shout(&echo), "HI");
            assert_eq!(shout(&echo), "HI");
            Ok(())
        })
        .unwrap();
    assert_eq!(fake.stats().attaches, before + 1);
}

// ===== References =====

#[test]
fn test_cycles_leave_nothing_pinned() {
    let (fake, runtime) = runtime();
    for i in 0..500 {
        let echo = new_echo(&runtime, &format!("item {}", i));
        assert_eq!(shout(&echo), format!("ITEM {}", i));
    }
    let stats = fake.stats();
    assert_eq!(runtime.pinned_references(), 0);
    assert_eq!(stats.live_globals, runtime.cached_classes());
    assert_eq!(stats.live_locals, 0);
    assert_eq!(stats.double_deletes, 0);
    assert_eq!(stats.attaches, stats.detaches);
}

#[test]
fn test_wrapper_moved_between_threads() {
    let (fake, runtime) = runtime();
    let echo = new_echo(&runtime, "moved");
    let handle = thread::spawn(move || {
        let text = shout(&echo);
        drop(echo);
        text
    });
    assert_eq!(handle.join().unwrap(), "MOVED");
    assert_eq!(runtime.pinned_references(), 0);
    assert_eq!(fake.stats().double_deletes, 0);
}

#[test]
fn test_exception_from_method_is_reported() {
    let (fake, runtime) = runtime();
    let result = runtime.with_attachment(|env| {
        let echo = env.new_object(&ECHO_NEW, &[JValue::Object(RawObject::NULL)])?;
        String::from_embedded(env.call_object(&ECHO_SHOUT, echo.as_raw(), &[])?)
    });
    assert_eq!(
        result,
        Err(BridgeError::NativeInvocation {
            member: "test/Echo.shout".to_string(),
            message: "java.lang.NullPointerException".to_string(),
        })
    );
    assert_eq!(fake.stats().pending_exceptions, 0);
}

// ===== Concurrency =====

#[test]
fn test_two_threads_thousand_calls_each() {
    let (fake, runtime) = runtime();
    let handles: Vec<_> = (0..2)
        .map(|worker| {
            let runtime = runtime.clone();
            thread::spawn(move || {
                for i in 0..1000 {
                    let echo = new_echo(&runtime, &format!("w{}-{}", worker, i));
                    assert_eq!(shout(&echo), format!("W{}-{}", worker, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(runtime.pinned_references(), 0);
    runtime.shutdown().unwrap();
    let stats = fake.stats();
    assert_eq!(stats.live_globals, 0);
    assert_eq!(stats.live_locals, 0);
    assert_eq!(stats.double_deletes, 0);
    assert_eq!(stats.attaches, stats.detaches);
}

// ===== Shutdown =====

#[test]
fn test_operations_after_shutdown() {
    let (fake, runtime) = runtime();
    let echo = new_echo(&runtime, "late");
    runtime.shutdown().unwrap();

    let result = runtime.with_attachment(|env| env.new_string("x").map(|_| ()));
    assert_eq!(result, Err(BridgeError::RuntimeNotAvailable));
    assert!(matches!(
        echo.embedded_to_string(),
        Err(BridgeError::RuntimeNotAvailable)
    ));

    let before = fake.stats();
    drop(echo);
    assert_eq!(fake.stats(), before);
}

#[test]
fn test_shutdown_inside_scope_keeps_env_usable() {
    let (fake, runtime) = runtime();
    let echo = runtime
        .with_attachment(|env| {
            assert_eq!(runtime.shutdown(), Err(BridgeError::ShutdownWhileAttached));
            let text = env.new_string("still here")?;
            env.new_object(&ECHO_NEW, &[text.as_arg()])?.pin()
        })
        .unwrap();
    assert_eq!(shout(&echo), "STILL HERE");
    drop(echo);

    runtime.shutdown().unwrap();
    assert_eq!(fake.stats().calls_after_destroy, 0);
}

#[test]
fn test_out_of_order_guards_keep_thread_attached() {
    let (fake, runtime) = runtime();
    let outer = runtime.attach().unwrap();
    let inner = runtime.attach().unwrap();
    drop(outer);

    let env = inner.env();
    let text = env.new_string("inner").unwrap();
    assert_eq!(env.read_string(text.as_raw()).unwrap(), "inner");
    drop(text);
    assert_eq!(attachment_depth(&runtime), 1);
    assert_eq!(fake.stats().detaches, 0);

    drop(inner);
    let stats = fake.stats();
    assert_eq!((stats.attaches, stats.detaches), (1, 1));
}

#[test]
fn test_releases_race_shutdown() {
    let (fake, runtime) = runtime();
    let workers = 4;
    let start = Arc::new(Barrier::new(workers + 1));
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let pinned: Vec<GlobalRef> = (0..200)
                .map(|i| new_echo(&runtime, &format!("w{}-{}", worker, i)))
                .collect();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for echo in pinned {
                    drop(echo);
                }
            })
        })
        .collect();

    start.wait();
    runtime.shutdown().unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = fake.stats();
    assert!(stats.destroyed);
    assert_eq!(stats.calls_after_destroy, 0);
    assert_eq!(stats.double_deletes, 0);
    assert_eq!(stats.attaches, stats.detaches);
}

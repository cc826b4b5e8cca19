//! In-memory runtime for tests
//!
//! [`FakeVm`] implements [`EmbeddedVm`] over a small object heap with the
//! `java.lang`/`java.util` behavior the bridge relies on (strings, lists,
//! maps, iterators, enums, class names, `equals`/`hashCode`/`toString`).
//! Tests define their own classes on top with [`FakeVm::define_class`] and
//! [`FakeVm::define_enum`], and read back reference and attachment counters
//! with [`FakeVm::stats`].
//!
//! Misuse that a real runtime would crash on (calling through a deleted
//! reference, reading a string from a non-string) panics.

use std::ffi::{c_void, CStr};
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::vm::{EmbeddedVm, JValue, MemberId, MemberKind, RawEnv, RawObject, RawReturn, ReturnKind};

/// Index of an object in the fake heap
pub type ObjId = usize;

/// Value seen by fake method bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FakeValue {
    Void,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Object(Option<ObjId>),
}

impl FakeValue {
    /// The object id, if this is a non-null object
    pub fn object(self) -> Option<ObjId> {
        match self {
            FakeValue::Object(obj) => obj,
            _ => None,
        }
    }
}

/// Body of a fake method: heap, receiver, arguments. `Err` throws an
/// exception whose `toString()` is the message.
pub type MethodFn =
    Arc<dyn Fn(&mut FakeHeap, ObjId, &[FakeValue]) -> Result<FakeValue, String> + Send + Sync>;

/// Counters exposed to tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeStats {
    /// Physical attach calls
    pub attaches: usize,
    /// Physical detach calls
    pub detaches: usize,
    pub live_globals: usize,
    pub live_locals: usize,
    /// Deletes of references that were not live
    pub double_deletes: usize,
    pub pending_exceptions: usize,
    pub class_lookups: usize,
    pub member_lookups: usize,
    pub destroyed: bool,
    /// Operations that reached the runtime after `destroy`
    pub calls_after_destroy: usize,
}

// ============================================================================
// Heap
// ============================================================================

type ClassId = usize;

#[derive(Debug, Clone)]
enum Data {
    Class(ClassId),
    Plain(Vec<(String, FakeValue)>),
    Str(Vec<u16>),
    List(Vec<Option<ObjId>>),
    Map(Vec<(ObjId, Option<ObjId>)>),
    Iter(Vec<Option<ObjId>>, usize),
    Entry(ObjId, Option<ObjId>),
    Enum(usize, String),
    Throwable(String),
}

#[derive(Debug, Clone)]
struct FakeObject {
    class: ClassId,
    data: Data,
}

struct FakeClass {
    name: String,
    /// The `java.lang.Class` object for this class
    mirror: ObjId,
    statics: Vec<(String, String, ObjId)>,
}

/// Object heap handed to fake method bodies
pub struct FakeHeap {
    objects: Vec<FakeObject>,
    classes: Vec<FakeClass>,
    class_index: FxHashMap<String, ClassId>,
}

impl FakeHeap {
    fn new() -> Self {
        let mut heap = FakeHeap {
            objects: Vec::new(),
            classes: Vec::new(),
            class_index: FxHashMap::default(),
        };
        for class in BUILTIN_CLASSES {
            heap.define(class);
        }
        let class_class = heap.class_id("java/lang/Class");
        for class in 0..heap.classes.len() {
            let mirror = heap.classes[class].mirror;
            heap.objects[mirror].class = class_class;
        }
        heap
    }

    fn define(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.class_index.get(name) {
            return *id;
        }
        let id = self.classes.len();
        let mirror = self.objects.len();
        self.objects.push(FakeObject {
            class: 0,
            data: Data::Class(id),
        });
        self.classes.push(FakeClass {
            name: name.to_string(),
            mirror,
            statics: Vec::new(),
        });
        self.class_index.insert(name.to_string(), id);
        // The mirror's own class is java/lang/Class once that exists
        let class_class = self.class_index.get("java/lang/Class").copied().unwrap_or(0);
        self.objects[mirror].class = class_class;
        id
    }

    fn class_id(&self, name: &str) -> ClassId {
        match self.class_index.get(name) {
            Some(id) => *id,
            None => panic!("fake runtime: class {} is not defined", name),
        }
    }

    fn alloc(&mut self, class: ClassId, data: Data) -> ObjId {
        self.objects.push(FakeObject { class, data });
        self.objects.len() - 1
    }

    fn object(&self, obj: ObjId) -> &FakeObject {
        &self.objects[obj]
    }

    /// Allocate a string
    pub fn new_string(&mut self, text: &str) -> ObjId {
        let class = self.class_id("java/lang/String");
        self.alloc(class, Data::Str(text.encode_utf16().collect()))
    }

    /// Allocate a string from raw UTF-16 units, valid or not
    pub fn new_string_units(&mut self, units: &[u16]) -> ObjId {
        let class = self.class_id("java/lang/String");
        self.alloc(class, Data::Str(units.to_vec()))
    }

    /// Text of a string object
    pub fn string(&self, obj: ObjId) -> String {
        match &self.object(obj).data {
            Data::Str(units) => String::from_utf16_lossy(units),
            other => panic!("fake runtime: {:?} is not a string", other),
        }
    }

    /// Allocate an `ArrayList`
    pub fn new_list(&mut self, items: Vec<ObjId>) -> ObjId {
        let class = self.class_id("java/util/ArrayList");
        self.alloc(class, Data::List(items.into_iter().map(Some).collect()))
    }

    /// Non-null elements of a list
    pub fn list(&self, obj: ObjId) -> Vec<ObjId> {
        match &self.object(obj).data {
            Data::List(items) => items.iter().flatten().copied().collect(),
            other => panic!("fake runtime: {:?} is not a list", other),
        }
    }

    /// Allocate a `HashMap`
    pub fn new_map(&mut self, entries: Vec<(ObjId, ObjId)>) -> ObjId {
        let class = self.class_id("java/util/HashMap");
        let entries = entries.into_iter().map(|(k, v)| (k, Some(v))).collect();
        self.alloc(class, Data::Map(entries))
    }

    /// Entries of a map with non-null values
    pub fn map(&self, obj: ObjId) -> Vec<(ObjId, ObjId)> {
        match &self.object(obj).data {
            Data::Map(entries) => entries
                .iter()
                .filter_map(|(k, v)| v.map(|v| (*k, v)))
                .collect(),
            other => panic!("fake runtime: {:?} is not a map", other),
        }
    }

    /// Allocate an instance of a defined class with named fields
    pub fn instantiate(&mut self, class: &str, fields: &[(&str, FakeValue)]) -> ObjId {
        let class = self.class_id(class);
        let fields = fields
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        self.alloc(class, Data::Plain(fields))
    }

    /// Named field of an instance
    pub fn field(&self, obj: ObjId, name: &str) -> FakeValue {
        match &self.object(obj).data {
            Data::Plain(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| *value)
                .unwrap_or_else(|| panic!("fake runtime: no field {} on {}", name, self.class_name(obj))),
            other => panic!("fake runtime: {:?} has no fields", other),
        }
    }

    /// Constant of a defined enum
    pub fn enum_constant(&self, class: &str, ordinal: usize) -> ObjId {
        let class = self.class_id(class);
        self.classes[class]
            .statics
            .iter()
            .map(|(_, _, obj)| *obj)
            .find(|obj| matches!(self.object(*obj).data, Data::Enum(o, _) if o == ordinal))
            .unwrap_or_else(|| panic!("fake runtime: no constant {} in {}", ordinal, self.classes[class].name))
    }

    /// Ordinal of an enum constant
    pub fn ordinal(&self, obj: ObjId) -> usize {
        match &self.object(obj).data {
            Data::Enum(ordinal, _) => *ordinal,
            other => panic!("fake runtime: {:?} is not an enum constant", other),
        }
    }

    /// Slash-separated class name of an object
    pub fn class_name(&self, obj: ObjId) -> String {
        self.classes[self.object(obj).class].name.clone()
    }

    // ------------------------------------------------------------------------
    // java.lang.Object behavior
    // ------------------------------------------------------------------------

    fn values_equal(&self, a: FakeValue, b: FakeValue) -> bool {
        match (a, b) {
            (FakeValue::Object(Some(a)), FakeValue::Object(Some(b))) => self.equals(a, b),
            (a, b) => a == b,
        }
    }

    fn nullable_equal(&self, a: Option<ObjId>, b: Option<ObjId>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => self.equals(a, b),
            (a, b) => a == b,
        }
    }

    fn equals(&self, a: ObjId, b: ObjId) -> bool {
        if a == b {
            return true;
        }
        let (left, right) = (self.object(a), self.object(b));
        if left.class != right.class {
            return false;
        }
        match (&left.data, &right.data) {
            (Data::Str(x), Data::Str(y)) => x == y,
            (Data::Plain(x), Data::Plain(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y)
                        .all(|((_, l), (_, r))| self.values_equal(*l, *r))
            }
            (Data::List(x), Data::List(y)) => {
                x.len() == y.len()
                    && x.iter().zip(y).all(|(l, r)| self.nullable_equal(*l, *r))
            }
            (Data::Map(x), Data::Map(y)) => {
                x.len() == y.len()
                    && x.iter().all(|(key, value)| {
                        y.iter()
                            .any(|(other, v)| self.equals(*key, *other) && self.nullable_equal(*value, *v))
                    })
            }
            _ => false,
        }
    }

    fn hash_code(&self, obj: ObjId) -> i32 {
        match &self.object(obj).data {
            Data::Str(units) => units
                .iter()
                .fold(0i32, |h, u| h.wrapping_mul(31).wrapping_add(*u as i32)),
            Data::Plain(fields) => fields.iter().fold(17i32, |h, (_, value)| {
                let field = match value {
                    FakeValue::Object(Some(obj)) => self.hash_code(*obj),
                    FakeValue::Int(i) => *i,
                    FakeValue::Boolean(b) => *b as i32,
                    FakeValue::Long(l) => *l as i32,
                    FakeValue::Double(d) => d.to_bits() as i32,
                    FakeValue::Object(None) | FakeValue::Void => 0,
                };
                h.wrapping_mul(31).wrapping_add(field)
            }),
            Data::List(items) => items.iter().fold(1i32, |h, item| {
                h.wrapping_mul(31)
                    .wrapping_add(item.map_or(0, |item| self.hash_code(item)))
            }),
            Data::Map(entries) => entries.iter().fold(0i32, |h, (key, value)| {
                h.wrapping_add(self.hash_code(*key) ^ value.map_or(0, |value| self.hash_code(value)))
            }),
            _ => obj as i32,
        }
    }

    fn render(&self, obj: ObjId) -> String {
        match &self.object(obj).data {
            Data::Str(units) => String::from_utf16_lossy(units),
            Data::Throwable(message) => message.clone(),
            Data::Enum(_, name) => name.clone(),
            Data::Class(id) => format!("class {}", self.classes[*id].name.replace('/', ".")),
            Data::Plain(fields) => {
                let name = self.class_name(obj);
                let simple = name.rsplit(['/', '$']).next().unwrap_or(&name).to_string();
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(field, value)| format!("{}={}", field, self.value_to_string(*value)))
                    .collect();
                format!("{}({})", simple, fields.join(", "))
            }
            Data::List(items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|item| self.value_to_string(FakeValue::Object(*item)))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            _ => format!("{}@{}", self.class_name(obj).replace('/', "."), obj),
        }
    }

    fn value_to_string(&self, value: FakeValue) -> String {
        match value {
            FakeValue::Void => "void".to_string(),
            FakeValue::Boolean(b) => b.to_string(),
            FakeValue::Int(i) => i.to_string(),
            FakeValue::Long(l) => l.to_string(),
            FakeValue::Double(d) => d.to_string(),
            FakeValue::Object(None) => "null".to_string(),
            FakeValue::Object(Some(obj)) => self.render(obj),
        }
    }
}

const BUILTIN_CLASSES: &[&str] = &[
    "java/lang/Object",
    "java/lang/Class",
    "java/lang/String",
    "java/lang/Enum",
    "java/lang/Throwable",
    "java/util/List",
    "java/util/ArrayList",
    "java/util/Iterator",
    "java/util/Map",
    "java/util/HashMap",
    "java/util/Set",
    "java/util/Map$Entry",
];

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Equals,
    HashCode,
    ToString,
    GetClass,
    GetName,
    Ordinal,
    Name,
    NewArrayList,
    ListAdd,
    ListIterator,
    HasNext,
    Next,
    NewHashMap,
    MapPut,
    EntrySet,
    SetIterator,
    GetKey,
    GetValue,
}

const BUILTIN_MEMBERS: &[(&str, &str, &str, Builtin)] = &[
    ("java/lang/Object", "equals", "(Ljava/lang/Object;)Z", Builtin::Equals),
    ("java/lang/Object", "hashCode", "()I", Builtin::HashCode),
    ("java/lang/Object", "toString", "()Ljava/lang/String;", Builtin::ToString),
    ("java/lang/Object", "getClass", "()Ljava/lang/Class;", Builtin::GetClass),
    ("java/lang/Class", "getName", "()Ljava/lang/String;", Builtin::GetName),
    ("java/lang/Enum", "ordinal", "()I", Builtin::Ordinal),
    ("java/lang/Enum", "name", "()Ljava/lang/String;", Builtin::Name),
    ("java/util/ArrayList", "<init>", "()V", Builtin::NewArrayList),
    ("java/util/List", "add", "(Ljava/lang/Object;)Z", Builtin::ListAdd),
    ("java/util/ArrayList", "add", "(Ljava/lang/Object;)Z", Builtin::ListAdd),
    ("java/util/List", "iterator", "()Ljava/util/Iterator;", Builtin::ListIterator),
    ("java/util/Iterator", "hasNext", "()Z", Builtin::HasNext),
    ("java/util/Iterator", "next", "()Ljava/lang/Object;", Builtin::Next),
    ("java/util/HashMap", "<init>", "()V", Builtin::NewHashMap),
    (
        "java/util/Map",
        "put",
        "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
        Builtin::MapPut,
    ),
    ("java/util/Map", "entrySet", "()Ljava/util/Set;", Builtin::EntrySet),
    ("java/util/Set", "iterator", "()Ljava/util/Iterator;", Builtin::SetIterator),
    ("java/util/Map$Entry", "getKey", "()Ljava/lang/Object;", Builtin::GetKey),
    ("java/util/Map$Entry", "getValue", "()Ljava/lang/Object;", Builtin::GetValue),
];

#[derive(Clone)]
enum Member {
    Builtin(Builtin),
    Method(MethodFn),
    Getter(String),
    Constructor(ClassId, Vec<String>),
    Static(ObjId),
}

type MemberKey = (ClassId, String, String, MemberKind);

// ============================================================================
// Runtime state
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct RefEntry {
    obj: ObjId,
    global: bool,
}

struct FakeState {
    heap: FakeHeap,
    refs: FxHashMap<usize, RefEntry>,
    next_ref: usize,
    members: Vec<Member>,
    member_index: FxHashMap<MemberKey, usize>,
    threads: FxHashMap<ThreadId, usize>,
    next_env: usize,
    pending: FxHashMap<usize, ObjId>,
    fail_attach: Option<i32>,
    stats: FakeStats,
}

impl FakeState {
    fn new() -> Self {
        let mut state = FakeState {
            heap: FakeHeap::new(),
            refs: FxHashMap::default(),
            next_ref: 1,
            members: Vec::new(),
            member_index: FxHashMap::default(),
            threads: FxHashMap::default(),
            next_env: 1,
            pending: FxHashMap::default(),
            fail_attach: None,
            stats: FakeStats::default(),
        };
        for (class, name, signature, builtin) in BUILTIN_MEMBERS {
            let class = state.heap.class_id(class);
            state.add_member(class, name, signature, MemberKind::Method, Member::Builtin(*builtin));
        }
        state
    }

    fn add_member(&mut self, class: ClassId, name: &str, signature: &str, kind: MemberKind, member: Member) {
        self.members.push(member);
        self.member_index.insert(
            (class, name.to_string(), signature.to_string(), kind),
            self.members.len(),
        );
    }

    fn new_ref(&mut self, obj: ObjId, global: bool) -> RawObject {
        let id = self.next_ref;
        self.next_ref += 1;
        self.refs.insert(id, RefEntry { obj, global });
        if global {
            self.stats.live_globals += 1;
        } else {
            self.stats.live_locals += 1;
        }
        RawObject::from_ptr(id as *mut c_void)
    }

    fn delete_ref(&mut self, raw: RawObject, global: bool) {
        let id = raw.as_ptr() as usize;
        match self.refs.get(&id) {
            Some(entry) if entry.global == global => {
                self.refs.remove(&id);
                if global {
                    self.stats.live_globals -= 1;
                } else {
                    self.stats.live_locals -= 1;
                }
            }
            _ => self.stats.double_deletes += 1,
        }
    }

    fn deref(&self, raw: RawObject) -> ObjId {
        match self.refs.get(&(raw.as_ptr() as usize)) {
            Some(entry) => entry.obj,
            None => panic!("fake runtime: use of dead reference {:?}", raw),
        }
    }

    fn to_fake(&self, value: &JValue) -> FakeValue {
        match *value {
            JValue::Boolean(b) => FakeValue::Boolean(b),
            JValue::Int(i) => FakeValue::Int(i),
            JValue::Long(l) => FakeValue::Long(l),
            JValue::Double(d) => FakeValue::Double(d),
            JValue::Object(obj) if obj.is_null() => FakeValue::Object(None),
            JValue::Object(obj) => FakeValue::Object(Some(self.deref(obj))),
        }
    }

    fn throw(&mut self, env: RawEnv, message: String) {
        let class = self.heap.class_id("java/lang/Throwable");
        let throwable = self.heap.alloc(class, Data::Throwable(message));
        self.pending.insert(env.as_ptr() as usize, throwable);
    }

    fn member(&self, id: MemberId) -> Member {
        match self.members.get((id.as_ptr() as usize).wrapping_sub(1)) {
            Some(member) => member.clone(),
            None => panic!("fake runtime: unknown member id {:?}", id),
        }
    }

    /// Turn a method result into a raw return, creating a local for objects
    fn finish(&mut self, env: RawEnv, ret: ReturnKind, result: Result<FakeValue, String>) -> RawReturn {
        let value = match result {
            Ok(value) => value,
            Err(message) => {
                self.throw(env, message);
                return default_return(ret);
            }
        };
        match (ret, value) {
            (ReturnKind::Void, _) => RawReturn::Void,
            (ReturnKind::Boolean, FakeValue::Boolean(b)) => RawReturn::Boolean(b),
            (ReturnKind::Int, FakeValue::Int(i)) => RawReturn::Int(i),
            (ReturnKind::Long, FakeValue::Long(l)) => RawReturn::Long(l),
            (ReturnKind::Double, FakeValue::Double(d)) => RawReturn::Double(d),
            (ReturnKind::Object, FakeValue::Object(None)) => RawReturn::Object(RawObject::NULL),
            (ReturnKind::Object, FakeValue::Object(Some(obj))) => RawReturn::Object(self.new_ref(obj, false)),
            (ret, value) => panic!("fake runtime: {:?} returned for a {:?} call", value, ret),
        }
    }

    fn run_builtin(&mut self, builtin: Builtin, receiver: ObjId, args: &[FakeValue]) -> Result<FakeValue, String> {
        let heap = &mut self.heap;
        let arg = |index: usize| args.get(index).copied().unwrap_or(FakeValue::Object(None));
        Ok(match builtin {
            Builtin::Equals => FakeValue::Boolean(match arg(0) {
                FakeValue::Object(Some(other)) => heap.equals(receiver, other),
                _ => false,
            }),
            Builtin::HashCode => FakeValue::Int(heap.hash_code(receiver)),
            Builtin::ToString => {
                let text = heap.render(receiver);
                FakeValue::Object(Some(heap.new_string(&text)))
            }
            Builtin::GetClass => {
                let class = heap.object(receiver).class;
                FakeValue::Object(Some(heap.classes[class].mirror))
            }
            Builtin::GetName => match heap.object(receiver).data {
                Data::Class(class) => {
                    let name = heap.classes[class].name.replace('/', ".");
                    FakeValue::Object(Some(heap.new_string(&name)))
                }
                _ => return Err("java.lang.ClassCastException: not a class".to_string()),
            },
            Builtin::Ordinal => FakeValue::Int(heap.ordinal(receiver) as i32),
            Builtin::Name => match &heap.object(receiver).data {
                Data::Enum(_, name) => {
                    let name = name.clone();
                    FakeValue::Object(Some(heap.new_string(&name)))
                }
                _ => return Err("java.lang.ClassCastException: not an enum".to_string()),
            },
            Builtin::NewArrayList | Builtin::NewHashMap => {
                return Err("java.lang.IllegalStateException: constructor called as method".to_string())
            }
            Builtin::ListAdd => {
                match &mut heap.objects[receiver].data {
                    Data::List(items) => items.push(arg(0).object()),
                    _ => return Err("java.lang.UnsupportedOperationException".to_string()),
                }
                FakeValue::Boolean(true)
            }
            Builtin::ListIterator => {
                let items = match &heap.object(receiver).data {
                    Data::List(items) => items.clone(),
                    _ => return Err("java.lang.ClassCastException: not a list".to_string()),
                };
                let class = heap.class_id("java/util/Iterator");
                FakeValue::Object(Some(heap.alloc(class, Data::Iter(items, 0))))
            }
            Builtin::SetIterator => {
                let items = match &heap.object(receiver).data {
                    Data::List(items) => items.clone(),
                    _ => return Err("java.lang.ClassCastException: not a set".to_string()),
                };
                let class = heap.class_id("java/util/Iterator");
                FakeValue::Object(Some(heap.alloc(class, Data::Iter(items, 0))))
            }
            Builtin::HasNext => match &heap.object(receiver).data {
                Data::Iter(items, position) => FakeValue::Boolean(*position < items.len()),
                _ => return Err("java.lang.ClassCastException: not an iterator".to_string()),
            },
            Builtin::Next => match &mut heap.objects[receiver].data {
                Data::Iter(items, position) => match items.get(*position).copied() {
                    Some(item) => {
                        *position += 1;
                        FakeValue::Object(item)
                    }
                    None => return Err("java.util.NoSuchElementException".to_string()),
                },
                _ => return Err("java.lang.ClassCastException: not an iterator".to_string()),
            },
            Builtin::MapPut => {
                let key = arg(0)
                    .object()
                    .ok_or_else(|| "java.lang.NullPointerException: null key".to_string())?;
                let value = arg(1).object();
                let entries = match &heap.object(receiver).data {
                    Data::Map(entries) => entries.clone(),
                    _ => return Err("java.lang.ClassCastException: not a map".to_string()),
                };
                let existing = entries.iter().position(|(k, _)| heap.equals(*k, key));
                let previous = match &mut heap.objects[receiver].data {
                    Data::Map(entries) => match existing {
                        Some(index) => std::mem::replace(&mut entries[index].1, value),
                        None => {
                            entries.push((key, value));
                            None
                        }
                    },
                    _ => None,
                };
                FakeValue::Object(previous)
            }
            Builtin::EntrySet => {
                let entries = match &heap.object(receiver).data {
                    Data::Map(entries) => entries.clone(),
                    _ => return Err("java.lang.ClassCastException: not a map".to_string()),
                };
                let entry_class = heap.class_id("java/util/Map$Entry");
                let items = entries
                    .into_iter()
                    .map(|(k, v)| Some(heap.alloc(entry_class, Data::Entry(k, v))))
                    .collect();
                let set_class = heap.class_id("java/util/Set");
                FakeValue::Object(Some(heap.alloc(set_class, Data::List(items))))
            }
            Builtin::GetKey => match heap.object(receiver).data {
                Data::Entry(key, _) => FakeValue::Object(Some(key)),
                _ => return Err("java.lang.ClassCastException: not an entry".to_string()),
            },
            Builtin::GetValue => match heap.object(receiver).data {
                Data::Entry(_, value) => FakeValue::Object(value),
                _ => return Err("java.lang.ClassCastException: not an entry".to_string()),
            },
        })
    }

    fn call(&mut self, member: Member, receiver: ObjId, args: &[FakeValue]) -> Result<FakeValue, String> {
        match member {
            Member::Builtin(builtin) => self.run_builtin(builtin, receiver, args),
            Member::Method(body) => body(&mut self.heap, receiver, args),
            Member::Getter(field) => Ok(self.heap.field(receiver, &field)),
            Member::Constructor(..) | Member::Static(_) => {
                Err("java.lang.IllegalStateException: not a method".to_string())
            }
        }
    }
}

fn default_return(ret: ReturnKind) -> RawReturn {
    match ret {
        ReturnKind::Void => RawReturn::Void,
        ReturnKind::Boolean => RawReturn::Boolean(false),
        ReturnKind::Int => RawReturn::Int(0),
        ReturnKind::Long => RawReturn::Long(0),
        ReturnKind::Double => RawReturn::Double(0.0),
        ReturnKind::Object => RawReturn::Object(RawObject::NULL),
    }
}

// ============================================================================
// FakeVm
// ============================================================================

/// In-memory [`EmbeddedVm`]; clones share the same state
#[derive(Clone)]
pub struct FakeVm {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeVm {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVm {
    pub fn new() -> Self {
        FakeVm {
            state: Arc::new(Mutex::new(FakeState::new())),
        }
    }

    fn enter(&self) -> MutexGuard<'_, FakeState> {
        let mut state = self.state.lock();
        if state.stats.destroyed {
            state.stats.calls_after_destroy += 1;
        }
        state
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> FakeStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.pending_exceptions = state.pending.len();
        stats
    }

    /// Make every following attach fail with `code`
    pub fn fail_attach(&self, code: i32) {
        self.state.lock().fail_attach = Some(code);
    }

    /// Start defining a class
    pub fn define_class(&self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder {
            vm: self,
            name: name.to_string(),
            members: Vec::new(),
            singletons: Vec::new(),
        }
    }

    /// Define an enum class with constants in declaration order
    pub fn define_enum(&self, name: &str, constants: &[&str]) {
        let mut state = self.state.lock();
        let class = state.heap.define(name);
        let signature = format!("L{};", name);
        for (ordinal, constant) in constants.iter().enumerate() {
            let obj = state
                .heap
                .alloc(class, Data::Enum(ordinal, constant.to_string()));
            state.heap.classes[class]
                .statics
                .push((constant.to_string(), signature.clone(), obj));
            state.add_member(class, constant, &signature, MemberKind::StaticField, Member::Static(obj));
        }
    }

    /// Run `f` against the heap, e.g. to build fixtures
    pub fn with_heap<R>(&self, f: impl FnOnce(&mut FakeHeap) -> R) -> R {
        f(&mut self.state.lock().heap)
    }
}

enum MemberDef {
    Method(MethodFn),
    Getter(String),
    Constructor(Vec<String>),
}

/// Builder returned by [`FakeVm::define_class`]
pub struct ClassBuilder<'v> {
    vm: &'v FakeVm,
    name: String,
    members: Vec<(String, String, MemberDef)>,
    singletons: Vec<(String, String)>,
}

impl ClassBuilder<'_> {
    /// Instance method with a custom body
    pub fn method(
        mut self,
        name: &str,
        signature: &str,
        body: impl Fn(&mut FakeHeap, ObjId, &[FakeValue]) -> Result<FakeValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.members
            .push((name.to_string(), signature.to_string(), MemberDef::Method(Arc::new(body))));
        self
    }

    /// Instance method returning a named field of the receiver
    pub fn getter(mut self, name: &str, signature: &str, field: &str) -> Self {
        self.members.push((
            name.to_string(),
            signature.to_string(),
            MemberDef::Getter(field.to_string()),
        ));
        self
    }

    /// Constructor storing its arguments into the named fields, in order
    pub fn constructor(mut self, signature: &str, fields: &[&str]) -> Self {
        self.members.push((
            "<init>".to_string(),
            signature.to_string(),
            MemberDef::Constructor(fields.iter().map(|f| f.to_string()).collect()),
        ));
        self
    }

    /// Static field holding a field-less instance of this class
    pub fn singleton(mut self, field: &str, signature: &str) -> Self {
        self.singletons.push((field.to_string(), signature.to_string()));
        self
    }

    pub fn build(self) {
        let mut state = self.vm.state.lock();
        let class = state.heap.define(&self.name);
        for (name, signature, def) in self.members {
            let member = match def {
                MemberDef::Method(body) => Member::Method(body),
                MemberDef::Getter(field) => Member::Getter(field),
                MemberDef::Constructor(fields) => Member::Constructor(class, fields),
            };
            state.add_member(class, &name, &signature, MemberKind::Method, member);
        }
        for (field, signature) in self.singletons {
            let obj = state.heap.alloc(class, Data::Plain(Vec::new()));
            state.heap.classes[class]
                .statics
                .push((field.clone(), signature.clone(), obj));
            state.add_member(class, &field, &signature, MemberKind::StaticField, Member::Static(obj));
        }
    }
}

impl EmbeddedVm for FakeVm {
    fn attach_current_thread(&self) -> Result<RawEnv, i32> {
        let mut state = self.enter();
        if let Some(code) = state.fail_attach {
            return Err(code);
        }
        let env = state.next_env;
        state.next_env += 1;
        state.threads.insert(std::thread::current().id(), env);
        state.stats.attaches += 1;
        Ok(RawEnv::from_ptr(env as *mut c_void))
    }

    fn detach_current_thread(&self) -> Result<(), i32> {
        let mut state = self.enter();
        state.stats.detaches += 1;
        match state.threads.remove(&std::thread::current().id()) {
            Some(_) => Ok(()),
            None => Err(-2),
        }
    }

    fn destroy(&self) -> Result<(), i32> {
        let mut state = self.enter();
        state.stats.destroyed = true;
        Ok(())
    }

    fn find_class(&self, env: RawEnv, name: &CStr) -> RawObject {
        let mut state = self.enter();
        state.stats.class_lookups += 1;
        let name = name.to_string_lossy();
        match state.heap.class_index.get(name.as_ref()).copied() {
            Some(class) => {
                let mirror = state.heap.classes[class].mirror;
                state.new_ref(mirror, false)
            }
            None => {
                state.throw(env, format!("java.lang.NoClassDefFoundError: {}", name));
                RawObject::NULL
            }
        }
    }

    fn member_id(
        &self,
        env: RawEnv,
        class: RawObject,
        name: &CStr,
        signature: &CStr,
        kind: MemberKind,
    ) -> Option<MemberId> {
        let mut state = self.enter();
        state.stats.member_lookups += 1;
        let class = match state.heap.object(state.deref(class)).data {
            Data::Class(class) => class,
            _ => panic!("fake runtime: member lookup on a non-class"),
        };
        let key = (
            class,
            name.to_string_lossy().into_owned(),
            signature.to_string_lossy().into_owned(),
            kind,
        );
        match state.member_index.get(&key).copied() {
            Some(index) => Some(MemberId::from_ptr(index as *mut c_void)),
            None => {
                state.throw(
                    env,
                    format!("java.lang.NoSuchMethodError: {}{}", key.1, key.2),
                );
                None
            }
        }
    }

    fn new_object(&self, env: RawEnv, _class: RawObject, ctor: MemberId, args: &[JValue]) -> RawObject {
        let mut state = self.enter();
        let args: Vec<FakeValue> = args.iter().map(|arg| state.to_fake(arg)).collect();
        let obj = match state.member(ctor) {
            Member::Builtin(Builtin::NewArrayList) => Ok(state.heap.new_list(Vec::new())),
            Member::Builtin(Builtin::NewHashMap) => Ok(state.heap.new_map(Vec::new())),
            Member::Constructor(class, fields) => {
                if fields.len() != args.len() {
                    Err(format!(
                        "java.lang.IllegalArgumentException: expected {} arguments",
                        fields.len()
                    ))
                } else {
                    let fields = fields.into_iter().zip(args).collect();
                    Ok(state.heap.alloc(class, Data::Plain(fields)))
                }
            }
            _ => Err("java.lang.InstantiationException".to_string()),
        };
        match obj {
            Ok(obj) => state.new_ref(obj, false),
            Err(message) => {
                state.throw(env, message);
                RawObject::NULL
            }
        }
    }

    fn call_method(
        &self,
        env: RawEnv,
        receiver: RawObject,
        method: MemberId,
        ret: ReturnKind,
        args: &[JValue],
    ) -> RawReturn {
        let mut state = self.enter();
        let receiver = state.deref(receiver);
        let args: Vec<FakeValue> = args.iter().map(|arg| state.to_fake(arg)).collect();
        let member = state.member(method);
        let result = state.call(member, receiver, &args);
        state.finish(env, ret, result)
    }

    fn call_static_method(
        &self,
        env: RawEnv,
        class: RawObject,
        method: MemberId,
        ret: ReturnKind,
        args: &[JValue],
    ) -> RawReturn {
        let mut state = self.enter();
        let class = state.deref(class);
        let args: Vec<FakeValue> = args.iter().map(|arg| state.to_fake(arg)).collect();
        let member = state.member(method);
        let result = state.call(member, class, &args);
        state.finish(env, ret, result)
    }

    fn static_object_field(&self, env: RawEnv, _class: RawObject, field: MemberId) -> RawObject {
        let mut state = self.enter();
        match state.member(field) {
            Member::Static(obj) => state.new_ref(obj, false),
            _ => {
                state.throw(env, "java.lang.NoSuchFieldError".to_string());
                RawObject::NULL
            }
        }
    }

    fn new_global_ref(&self, _env: RawEnv, obj: RawObject) -> RawObject {
        let mut state = self.enter();
        let obj = state.deref(obj);
        state.new_ref(obj, true)
    }

    fn delete_global_ref(&self, _env: RawEnv, obj: RawObject) {
        self.enter().delete_ref(obj, true);
    }

    fn new_local_ref(&self, _env: RawEnv, obj: RawObject) -> RawObject {
        let mut state = self.enter();
        let obj = state.deref(obj);
        state.new_ref(obj, false)
    }

    fn delete_local_ref(&self, _env: RawEnv, obj: RawObject) {
        self.enter().delete_ref(obj, false);
    }

    fn new_string(&self, _env: RawEnv, units: &[u16]) -> RawObject {
        let mut state = self.enter();
        let obj = state.heap.new_string_units(units);
        state.new_ref(obj, false)
    }

    fn string_units(&self, _env: RawEnv, string: RawObject) -> Vec<u16> {
        let state = self.enter();
        match &state.heap.object(state.deref(string)).data {
            Data::Str(units) => units.clone(),
            other => panic!("fake runtime: {:?} is not a string", other),
        }
    }

    fn exception_check(&self, env: RawEnv) -> bool {
        self.enter()
            .pending
            .contains_key(&(env.as_ptr() as usize))
    }

    fn exception_take(&self, env: RawEnv) -> RawObject {
        let mut state = self.enter();
        match state.pending.remove(&(env.as_ptr() as usize)) {
            Some(throwable) => state.new_ref(throwable, false),
            None => RawObject::NULL,
        }
    }
}

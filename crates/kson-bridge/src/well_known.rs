//! Descriptors for the core library classes the bridge itself relies on

use crate::invoke::Descriptor;
use crate::vm::ReturnKind::{Boolean, Int, Object};

// java.lang.Object

pub const OBJECT_EQUALS: Descriptor =
    Descriptor::method(c"java/lang/Object", c"equals", c"(Ljava/lang/Object;)Z", Boolean);
pub const OBJECT_HASH_CODE: Descriptor =
    Descriptor::method(c"java/lang/Object", c"hashCode", c"()I", Int);
pub const OBJECT_TO_STRING: Descriptor =
    Descriptor::method(c"java/lang/Object", c"toString", c"()Ljava/lang/String;", Object);
pub const OBJECT_GET_CLASS: Descriptor =
    Descriptor::method(c"java/lang/Object", c"getClass", c"()Ljava/lang/Class;", Object);

// java.lang.Class / java.lang.Enum

pub const CLASS_GET_NAME: Descriptor =
    Descriptor::method(c"java/lang/Class", c"getName", c"()Ljava/lang/String;", Object);
pub const ENUM_ORDINAL: Descriptor = Descriptor::method(c"java/lang/Enum", c"ordinal", c"()I", Int);
pub const ENUM_NAME: Descriptor =
    Descriptor::method(c"java/lang/Enum", c"name", c"()Ljava/lang/String;", Object);

// java.util sequences

pub const ARRAY_LIST_NEW: Descriptor = Descriptor::constructor(c"java/util/ArrayList", c"()V");
pub const LIST_ADD: Descriptor =
    Descriptor::method(c"java/util/List", c"add", c"(Ljava/lang/Object;)Z", Boolean);
pub const LIST_ITERATOR: Descriptor =
    Descriptor::method(c"java/util/List", c"iterator", c"()Ljava/util/Iterator;", Object);
pub const ITERATOR_HAS_NEXT: Descriptor =
    Descriptor::method(c"java/util/Iterator", c"hasNext", c"()Z", Boolean);
pub const ITERATOR_NEXT: Descriptor =
    Descriptor::method(c"java/util/Iterator", c"next", c"()Ljava/lang/Object;", Object);

// java.util maps

pub const HASH_MAP_NEW: Descriptor = Descriptor::constructor(c"java/util/HashMap", c"()V");
pub const MAP_PUT: Descriptor = Descriptor::method(
    c"java/util/Map",
    c"put",
    c"(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
    Object,
);
pub const MAP_ENTRY_SET: Descriptor =
    Descriptor::method(c"java/util/Map", c"entrySet", c"()Ljava/util/Set;", Object);
pub const SET_ITERATOR: Descriptor =
    Descriptor::method(c"java/util/Set", c"iterator", c"()Ljava/util/Iterator;", Object);
pub const ENTRY_GET_KEY: Descriptor =
    Descriptor::method(c"java/util/Map$Entry", c"getKey", c"()Ljava/lang/Object;", Object);
pub const ENTRY_GET_VALUE: Descriptor =
    Descriptor::method(c"java/util/Map$Entry", c"getValue", c"()Ljava/lang/Object;", Object);

/// Every descriptor above, for verification
pub const ALL: &[Descriptor] = &[
    OBJECT_EQUALS,
    OBJECT_HASH_CODE,
    OBJECT_TO_STRING,
    OBJECT_GET_CLASS,
    CLASS_GET_NAME,
    ENUM_ORDINAL,
    ENUM_NAME,
    ARRAY_LIST_NEW,
    LIST_ADD,
    LIST_ITERATOR,
    ITERATOR_HAS_NEXT,
    ITERATOR_NEXT,
    HASH_MAP_NEW,
    MAP_PUT,
    MAP_ENTRY_SET,
    SET_ITERATOR,
    ENTRY_GET_KEY,
    ENTRY_GET_VALUE,
];

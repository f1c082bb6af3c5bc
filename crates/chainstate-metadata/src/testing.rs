//! Synthetic runtime metadata for tests.
//!
//! Builds a small but realistic runtime (System, Balances, Staking, Session)
//! and serializes it to the same byte layout a node returns from
//! `state_getMetadata`, so parsing is exercised end to end.

use chainstate_scale::{
    encode_compact, Field, Primitive, TypeDef, TypeId, TypeInfo, TypeRegistry, Variant,
};

use crate::events::Phase;
use crate::hasher::StorageHasher;
use crate::index::{
    ConstantMetadata, MetadataIndex, ModuleMetadata, StorageEntryMetadata, StorageModifier,
};
use crate::parse::MAGIC;

/// Public key of the well-known `//Alice` development account.
pub const ALICE: [u8; 32] = [
    0xd4, 0x35, 0x93, 0xc7, 0x15, 0xfd, 0xd3, 0x1c, 0x61, 0x14, 0x1a, 0xbd, 0x04, 0xa9, 0x9f, 0xd6,
    0x82, 0x2c, 0x85, 0x58, 0x85, 0x4c, 0xcd, 0xe3, 0x9a, 0x56, 0x84, 0xe7, 0xa5, 0x6d, 0xa2, 0x7d,
];

/// Public key of the well-known `//Bob` development account.
pub const BOB: [u8; 32] = [
    0x8e, 0xaf, 0x04, 0x15, 0x16, 0x87, 0x73, 0x63, 0x26, 0xc9, 0xfe, 0xa1, 0x7e, 0x25, 0xfc, 0x52,
    0x87, 0x61, 0x36, 0x93, 0xc9, 0x12, 0x90, 0x9c, 0xb2, 0x26, 0xaa, 0x47, 0x94, 0xf2, 0x6a, 0x48,
];

/// Type ids of the sample registry.
pub mod ty {
    use chainstate_scale::TypeId;

    pub const U8: TypeId = 0;
    pub const U32: TypeId = 1;
    pub const U64: TypeId = 2;
    pub const U128: TypeId = 3;
    pub const H256: TypeId = 4;
    pub const ACCOUNT_ID: TypeId = 5;
    pub const ACCOUNT_DATA: TypeId = 6;
    pub const ACCOUNT_INFO: TypeId = 7;
    pub const BYTES: TypeId = 8;
    pub const DISPATCH_CLASS: TypeId = 9;
    pub const PAYS: TypeId = 10;
    pub const DISPATCH_INFO: TypeId = 11;
    pub const SYSTEM_EVENT: TypeId = 12;
    pub const BALANCES_EVENT: TypeId = 13;
    pub const SESSION_EVENT: TypeId = 14;
    pub const RUNTIME_EVENT: TypeId = 15;
    pub const PHASE: TypeId = 16;
    pub const TOPICS: TypeId = 17;
    pub const EVENT_RECORD: TypeId = 18;
    pub const EVENT_RECORDS: TypeId = 19;
    pub const SYSTEM_CALL: TypeId = 20;
    pub const BALANCES_CALL: TypeId = 21;
    pub const COMPACT_U128: TypeId = 22;
    pub const ACCOUNT_IDS: TypeId = 23;
    pub const ERA_ACCOUNT: TypeId = 24;
    pub const ERA_ACCOUNT_PAGE: TypeId = 25;
    pub const BALANCES_ERROR: TypeId = 26;
}

fn named(path: &[&str], id: TypeId, def: TypeDef) -> TypeInfo {
    let mut info = TypeInfo::new(id, def);
    info.path = path.iter().map(|s| s.to_string()).collect();
    info
}

fn unit(index: u8, name: &str) -> Variant {
    Variant::new(index, name, vec![])
}

/// The type registry of the sample runtime.
pub fn sample_registry() -> TypeRegistry {
    use ty::*;

    let mut account_id = named(
        &["sp_core", "crypto", "AccountId32"],
        ACCOUNT_ID,
        TypeDef::Composite(vec![Field::unnamed(H256)]),
    );
    account_id.docs = vec!["An opaque 32-byte account identifier.".into()];

    let mut event_record = named(
        &["frame_system", "EventRecord"],
        EVENT_RECORD,
        TypeDef::Composite(vec![
            Field::named("phase", PHASE),
            Field::named("event", RUNTIME_EVENT),
            Field::named("topics", TOPICS),
        ]),
    );
    event_record.params = vec![chainstate_scale::TypeParam {
        name: "E".into(),
        ty: Some(RUNTIME_EVENT),
    }];

    TypeRegistry::from_types([
        TypeInfo::new(U8, TypeDef::Primitive(Primitive::U8)),
        TypeInfo::new(U32, TypeDef::Primitive(Primitive::U32)),
        TypeInfo::new(U64, TypeDef::Primitive(Primitive::U64)),
        TypeInfo::new(U128, TypeDef::Primitive(Primitive::U128)),
        TypeInfo::new(H256, TypeDef::Array { len: 32, elem: U8 }),
        account_id,
        named(
            &["pallet_balances", "types", "AccountData"],
            ACCOUNT_DATA,
            TypeDef::Composite(vec![
                Field::named("free", U128),
                Field::named("reserved", U128),
                Field::named("frozen", U128),
                Field::named("flags", U128),
            ]),
        ),
        named(
            &["frame_system", "AccountInfo"],
            ACCOUNT_INFO,
            TypeDef::Composite(vec![
                Field::named("nonce", U32),
                Field::named("consumers", U32),
                Field::named("providers", U32),
                Field::named("sufficients", U32),
                Field::named("data", ACCOUNT_DATA),
            ]),
        ),
        TypeInfo::new(BYTES, TypeDef::Sequence(U8)),
        named(
            &["frame_support", "dispatch", "DispatchClass"],
            DISPATCH_CLASS,
            TypeDef::Variant(vec![
                unit(0, "Normal"),
                unit(1, "Operational"),
                unit(2, "Mandatory"),
            ]),
        ),
        named(
            &["frame_support", "dispatch", "Pays"],
            PAYS,
            TypeDef::Variant(vec![unit(0, "Yes"), unit(1, "No")]),
        ),
        named(
            &["frame_support", "dispatch", "DispatchInfo"],
            DISPATCH_INFO,
            TypeDef::Composite(vec![
                Field::named("weight", U64),
                Field::named("class", DISPATCH_CLASS),
                Field::named("pays_fee", PAYS),
            ]),
        ),
        named(
            &["frame_system", "pallet", "Event"],
            SYSTEM_EVENT,
            TypeDef::Variant(vec![
                Variant::new(0, "ExtrinsicSuccess", vec![Field::named("dispatch_info", DISPATCH_INFO)]),
                Variant::new(1, "ExtrinsicFailed", vec![Field::named("dispatch_info", DISPATCH_INFO)]),
                unit(2, "CodeUpdated"),
                Variant::new(3, "NewAccount", vec![Field::named("account", ACCOUNT_ID)]),
                Variant::new(4, "KilledAccount", vec![Field::named("account", ACCOUNT_ID)]),
                Variant::new(
                    5,
                    "Remarked",
                    vec![Field::named("sender", ACCOUNT_ID), Field::named("hash", H256)],
                ),
            ]),
        ),
        named(
            &["pallet_balances", "pallet", "Event"],
            BALANCES_EVENT,
            TypeDef::Variant(vec![
                Variant::new(
                    0,
                    "Endowed",
                    vec![Field::named("account", ACCOUNT_ID), Field::named("free_balance", U128)],
                ),
                Variant::new(
                    1,
                    "DustLost",
                    vec![Field::named("account", ACCOUNT_ID), Field::named("amount", U128)],
                ),
                Variant::new(
                    2,
                    "Transfer",
                    vec![
                        Field::named("from", ACCOUNT_ID),
                        Field::named("to", ACCOUNT_ID),
                        Field::named("amount", U128),
                    ],
                ),
            ]),
        ),
        named(
            &["pallet_session", "pallet", "Event"],
            SESSION_EVENT,
            TypeDef::Variant(vec![Variant::new(
                0,
                "NewSession",
                vec![Field::named("session_index", U32)],
            )]),
        ),
        named(
            &["node_runtime", "RuntimeEvent"],
            RUNTIME_EVENT,
            TypeDef::Variant(vec![
                Variant::new(0, "System", vec![Field::unnamed(SYSTEM_EVENT)]),
                Variant::new(5, "Balances", vec![Field::unnamed(BALANCES_EVENT)]),
                Variant::new(9, "Session", vec![Field::unnamed(SESSION_EVENT)]),
            ]),
        ),
        named(
            &["frame_system", "Phase"],
            PHASE,
            TypeDef::Variant(vec![
                Variant::new(0, "ApplyExtrinsic", vec![Field::unnamed(U32)]),
                unit(1, "Finalization"),
                unit(2, "Initialization"),
            ]),
        ),
        TypeInfo::new(TOPICS, TypeDef::Sequence(H256)),
        event_record,
        TypeInfo::new(EVENT_RECORDS, TypeDef::Sequence(EVENT_RECORD)),
        named(
            &["frame_system", "pallet", "Call"],
            SYSTEM_CALL,
            TypeDef::Variant(vec![
                Variant::new(0, "remark", vec![Field::named("remark", BYTES)]),
                Variant::new(1, "set_heap_pages", vec![Field::named("pages", U64)]),
            ]),
        ),
        named(
            &["pallet_balances", "pallet", "Call"],
            BALANCES_CALL,
            TypeDef::Variant(vec![Variant::new(
                0,
                "transfer_allow_death",
                vec![Field::named("dest", ACCOUNT_ID), Field::named("value", COMPACT_U128)],
            )]),
        ),
        TypeInfo::new(COMPACT_U128, TypeDef::Compact(U128)),
        TypeInfo::new(ACCOUNT_IDS, TypeDef::Sequence(ACCOUNT_ID)),
        TypeInfo::new(ERA_ACCOUNT, TypeDef::Tuple(vec![U32, ACCOUNT_ID])),
        TypeInfo::new(ERA_ACCOUNT_PAGE, TypeDef::Tuple(vec![U32, ACCOUNT_ID, U32])),
        named(
            &["pallet_balances", "pallet", "Error"],
            BALANCES_ERROR,
            TypeDef::Variant(vec![unit(0, "InsufficientBalance"), unit(1, "ExistentialDeposit")]),
        ),
    ])
}

fn entry(
    prefix: &str,
    name: &str,
    modifier: StorageModifier,
    map: Option<(Vec<StorageHasher>, TypeId)>,
    value_ty: TypeId,
    default: Vec<u8>,
) -> StorageEntryMetadata {
    let (hashers, key_ty) = match map {
        Some((hashers, key)) => (hashers, Some(key)),
        None => (Vec::new(), None),
    };
    StorageEntryMetadata {
        prefix: prefix.to_string(),
        name: name.to_string(),
        modifier,
        hashers,
        key_ty,
        value_ty,
        default,
        docs: vec![format!("The {name} storage item.")],
    }
}

fn module(name: &str, index: u8, version: u8) -> ModuleMetadata {
    let docs = match (version, name) {
        (14, _) => Vec::new(),
        (_, "System") => vec!["Low-level system functionality.".to_string()],
        (_, other) => vec![format!("The {other} pallet.")],
    };
    ModuleMetadata {
        name: name.to_string(),
        index,
        storage_prefix: Some(name.to_string()),
        storage: Vec::new(),
        call_ty: None,
        event_ty: None,
        error_ty: None,
        constants: Vec::new(),
        docs,
    }
}

/// The modules of the sample runtime as a parser of `version` would see them.
pub fn sample_modules(version: u8) -> Vec<ModuleMetadata> {
    use ty::*;
    use StorageHasher::*;
    use StorageModifier::{Default as WithDefault, Optional};

    let mut system = module("System", 0, version);
    system.storage = vec![
        entry(
            "System",
            "Account",
            WithDefault,
            Some((vec![Blake2_128Concat], ACCOUNT_ID)),
            ACCOUNT_INFO,
            vec![0; 4 * 4 + 4 * 16],
        ),
        entry("System", "Number", WithDefault, None, U32, vec![0; 4]),
        entry(
            "System",
            "BlockHash",
            WithDefault,
            Some((vec![Twox64Concat], U32)),
            H256,
            vec![0; 32],
        ),
        entry("System", "Events", WithDefault, None, EVENT_RECORDS, vec![0]),
    ];
    system.call_ty = Some(SYSTEM_CALL);
    system.event_ty = Some(SYSTEM_EVENT);
    system.constants = vec![ConstantMetadata {
        name: "BlockHashCount".into(),
        ty: U32,
        value: 2400u32.to_le_bytes().to_vec(),
        docs: vec!["Maximum number of block number to block hash mappings to keep.".into()],
    }];

    let mut balances = module("Balances", 5, version);
    balances.storage = vec![entry("Balances", "TotalIssuance", WithDefault, None, U128, vec![0; 16])];
    balances.call_ty = Some(BALANCES_CALL);
    balances.event_ty = Some(BALANCES_EVENT);
    balances.error_ty = Some(BALANCES_ERROR);
    balances.constants = vec![ConstantMetadata {
        name: "ExistentialDeposit".into(),
        ty: U128,
        value: 500u128.to_le_bytes().to_vec(),
        docs: vec![],
    }];

    let mut staking = module("Staking", 7, version);
    staking.storage = vec![
        entry(
            "Staking",
            "Bonded",
            Optional,
            Some((vec![Twox64Concat], ACCOUNT_ID)),
            ACCOUNT_ID,
            vec![],
        ),
        entry(
            "Staking",
            "ErasStakers",
            WithDefault,
            Some((vec![Twox64Concat, Twox64Concat], ERA_ACCOUNT)),
            U128,
            vec![0; 16],
        ),
        entry(
            "Staking",
            "ErasStakersPaged",
            Optional,
            Some((vec![Twox64Concat, Twox64Concat, Twox64Concat], ERA_ACCOUNT_PAGE)),
            U128,
            vec![],
        ),
    ];

    let mut session = module("Session", 9, version);
    session.storage = vec![
        entry("Session", "Validators", WithDefault, None, ACCOUNT_IDS, vec![0]),
        entry("Session", "CurrentIndex", WithDefault, None, U32, vec![0; 4]),
    ];
    session.event_ty = Some(SESSION_EVENT);

    vec![system, balances, staking, session]
}

/// Serialized sample metadata, `b"meta"` prefix included.
pub fn sample_metadata_bytes(version: u8) -> Vec<u8> {
    encode_metadata(version, &sample_registry(), &sample_modules(version))
}

/// Parsed V14 sample metadata.
pub fn sample_metadata() -> MetadataIndex {
    MetadataIndex::parse(&sample_metadata_bytes(14)).expect("sample metadata parses")
}

/// Serialize a registry and module list in the `RuntimeMetadataPrefixed`
/// layout for `version`.
pub fn encode_metadata(version: u8, registry: &TypeRegistry, modules: &[ModuleMetadata]) -> Vec<u8> {
    let mut out = MAGIC.to_vec();
    out.push(version);
    put_vec(&mut out, &registry.iter().collect::<Vec<_>>(), |out, t| put_type(out, t));
    put_vec(&mut out, modules, |out, m| put_module(out, m, version));
    out
}

fn put_len(out: &mut Vec<u8>, len: usize) {
    encode_compact(len as u128, out);
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_bytes(out, s.as_bytes());
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    put_len(out, bytes.len());
    out.extend_from_slice(bytes);
}

fn put_id(out: &mut Vec<u8>, id: TypeId) {
    encode_compact(u128::from(id), out);
}

fn put_vec<T>(out: &mut Vec<u8>, items: &[T], mut f: impl FnMut(&mut Vec<u8>, &T)) {
    put_len(out, items.len());
    for item in items {
        f(out, item);
    }
}

fn put_option<T>(out: &mut Vec<u8>, item: Option<&T>, f: impl FnOnce(&mut Vec<u8>, &T)) {
    match item {
        None => out.push(0),
        Some(item) => {
            out.push(1);
            f(out, item);
        }
    }
}

fn put_docs(out: &mut Vec<u8>, docs: &[String]) {
    put_vec(out, docs, |out, d| put_str(out, d));
}

fn put_type(out: &mut Vec<u8>, info: &TypeInfo) {
    put_id(out, info.id);
    put_vec(out, &info.path, |out, s| put_str(out, s));
    put_vec(out, &info.params, |out, p| {
        put_str(out, &p.name);
        put_option(out, p.ty.as_ref(), |out, id| put_id(out, *id));
    });
    match &info.def {
        TypeDef::Composite(fields) => {
            out.push(0);
            put_vec(out, fields, put_field);
        }
        TypeDef::Variant(variants) => {
            out.push(1);
            put_vec(out, variants, |out, v| {
                put_str(out, &v.name);
                put_vec(out, &v.fields, put_field);
                out.push(v.index);
                put_docs(out, &v.docs);
            });
        }
        TypeDef::Sequence(elem) => {
            out.push(2);
            put_id(out, *elem);
        }
        TypeDef::Array { len, elem } => {
            out.push(3);
            out.extend_from_slice(&len.to_le_bytes());
            put_id(out, *elem);
        }
        TypeDef::Tuple(ids) => {
            out.push(4);
            put_vec(out, ids, |out, id| put_id(out, *id));
        }
        TypeDef::Primitive(p) => {
            out.push(5);
            out.push(p.discriminant());
        }
        TypeDef::Compact(inner) => {
            out.push(6);
            put_id(out, *inner);
        }
        TypeDef::BitSequence { store, order } => {
            out.push(7);
            put_id(out, *store);
            put_id(out, *order);
        }
    }
    put_docs(out, &info.docs);
}

fn put_field(out: &mut Vec<u8>, field: &Field) {
    put_option(out, field.name.as_ref(), |out, n| put_str(out, n));
    put_id(out, field.ty);
    put_option(out, field.type_name.as_ref(), |out, n| put_str(out, n));
    put_docs(out, &field.docs);
}

fn put_module(out: &mut Vec<u8>, module: &ModuleMetadata, version: u8) {
    put_str(out, &module.name);
    put_option(out, module.storage_prefix.as_ref(), |out, prefix| {
        put_str(out, prefix);
        put_vec(out, &module.storage, put_entry);
    });
    put_option(out, module.call_ty.as_ref(), |out, id| put_id(out, *id));
    put_option(out, module.event_ty.as_ref(), |out, id| put_id(out, *id));
    put_vec(out, &module.constants, |out, c| {
        put_str(out, &c.name);
        put_id(out, c.ty);
        put_bytes(out, &c.value);
        put_docs(out, &c.docs);
    });
    put_option(out, module.error_ty.as_ref(), |out, id| put_id(out, *id));
    out.push(module.index);
    if version >= 15 {
        put_docs(out, &module.docs);
    }
}

fn put_entry(out: &mut Vec<u8>, entry: &StorageEntryMetadata) {
    put_str(out, &entry.name);
    out.push(match entry.modifier {
        StorageModifier::Optional => 0,
        StorageModifier::Default => 1,
    });
    match entry.key_ty {
        None => {
            out.push(0);
            put_id(out, entry.value_ty);
        }
        Some(key) => {
            out.push(1);
            put_vec(out, &entry.hashers, |out, h| out.push(h.discriminant()));
            put_id(out, key);
            put_id(out, entry.value_ty);
        }
    }
    put_bytes(out, &entry.default);
    put_docs(out, &entry.docs);
}

/// Builds a raw `System::Events` value one record at a time.
#[derive(Debug, Default)]
pub struct EventsBuilder {
    count: usize,
    body: Vec<u8>,
}

impl EventsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; `fields` is the already encoded event payload.
    pub fn push(
        mut self,
        phase: Phase,
        module_index: u8,
        event_index: u8,
        fields: &[u8],
        topics: &[[u8; 32]],
    ) -> Self {
        match phase {
            Phase::ApplyExtrinsic(i) => {
                self.body.push(0);
                self.body.extend_from_slice(&i.to_le_bytes());
            }
            Phase::Finalization => self.body.push(1),
            Phase::Initialization => self.body.push(2),
        }
        self.body.push(module_index);
        self.body.push(event_index);
        self.body.extend_from_slice(fields);
        put_len(&mut self.body, topics.len());
        for topic in topics {
            self.body.extend_from_slice(topic);
        }
        self.count += 1;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 4);
        put_len(&mut out, self.count);
        out.extend_from_slice(&self.body);
        out
    }
}

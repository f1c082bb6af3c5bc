//! Queryable view over a parsed runtime metadata document.

use std::collections::HashMap;

use chainstate_core::error::MetadataError;
use chainstate_core::types::StorageKey;
use chainstate_scale::{decode_all, Field, TypeDef, TypeId, TypeRegistry, Value, Variant};

use crate::hasher::StorageHasher;
use crate::key::StorageKeyDeriver;

/// Whether a missing value reads as `None` or as the entry's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageModifier {
    Optional,
    Default,
}

/// Shape of a storage entry, by number of map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Plain,
    Map,
    DoubleMap,
    NMap,
}

/// A storage item of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntryMetadata {
    /// Storage prefix of the owning module (usually its name).
    pub prefix: String,
    pub name: String,
    pub modifier: StorageModifier,
    /// One hasher per map key; empty for plain values.
    pub hashers: Vec<StorageHasher>,
    /// Key type: the single key for maps, a tuple of keys for double and
    /// N-maps, `None` for plain values.
    pub key_ty: Option<TypeId>,
    pub value_ty: TypeId,
    /// SCALE-encoded value returned for absent `Default` entries.
    pub default: Vec<u8>,
    pub docs: Vec<String>,
}

impl StorageEntryMetadata {
    pub fn kind(&self) -> StorageKind {
        match self.hashers.len() {
            0 => StorageKind::Plain,
            1 => StorageKind::Map,
            2 => StorageKind::DoubleMap,
            _ => StorageKind::NMap,
        }
    }

    /// Number of map keys the entry takes.
    pub fn key_count(&self) -> usize {
        self.hashers.len()
    }

    pub fn is_map(&self) -> bool {
        !self.hashers.is_empty()
    }
}

/// A constant value baked into the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantMetadata {
    pub name: String,
    pub ty: TypeId,
    /// SCALE-encoded value.
    pub value: Vec<u8>,
    pub docs: Vec<String>,
}

/// A runtime module (pallet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub name: String,
    pub index: u8,
    pub storage_prefix: Option<String>,
    pub storage: Vec<StorageEntryMetadata>,
    pub call_ty: Option<TypeId>,
    pub event_ty: Option<TypeId>,
    pub error_ty: Option<TypeId>,
    pub constants: Vec<ConstantMetadata>,
    /// Module docs; only present from metadata V15 on.
    pub docs: Vec<String>,
}

impl ModuleMetadata {
    pub fn storage_entry(&self, name: &str) -> Option<&StorageEntryMetadata> {
        self.storage.iter().find(|e| e.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantMetadata> {
        self.constants.iter().find(|c| c.name == name)
    }
}

/// A call or event of a module: one variant of the module's call or event enum.
#[derive(Debug, Clone, Copy)]
pub struct VariantDescriptor<'a> {
    pub module: &'a ModuleMetadata,
    pub variant: &'a Variant,
}

pub type EventTypeDescriptor<'a> = VariantDescriptor<'a>;
pub type CallDescriptor<'a> = VariantDescriptor<'a>;

impl<'a> VariantDescriptor<'a> {
    pub fn module_name(&self) -> &'a str {
        &self.module.name
    }

    pub fn module_index(&self) -> u8 {
        self.module.index
    }

    pub fn name(&self) -> &'a str {
        &self.variant.name
    }

    pub fn index(&self) -> u8 {
        self.variant.index
    }

    /// Argument descriptors in declaration (and wire) order.
    pub fn fields(&self) -> &'a [Field] {
        &self.variant.fields
    }
}

/// Immutable index over a runtime metadata document.
///
/// Built once per runtime version and shared as `Arc<MetadataIndex>`. All
/// lookups are by exact, case-sensitive name or by numeric index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIndex {
    version: u8,
    registry: TypeRegistry,
    modules: Vec<ModuleMetadata>,
    by_name: HashMap<String, usize>,
    by_index: HashMap<u8, usize>,
}

impl MetadataIndex {
    /// Parse a `state_getMetadata` response body (magic, version, payload).
    pub fn parse(raw: &[u8]) -> Result<Self, MetadataError> {
        crate::parse::parse(raw)
    }

    /// Assemble an index from already decoded parts.
    pub fn from_parts(version: u8, registry: TypeRegistry, modules: Vec<ModuleMetadata>) -> Self {
        let by_name = modules
            .iter()
            .enumerate()
            .map(|(pos, m)| (m.name.clone(), pos))
            .collect();
        let by_index = modules
            .iter()
            .enumerate()
            .map(|(pos, m)| (m.index, pos))
            .collect();
        Self {
            version,
            registry,
            modules,
            by_name,
            by_index,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn modules(&self) -> &[ModuleMetadata] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Result<&ModuleMetadata, MetadataError> {
        self.by_name
            .get(name)
            .map(|&pos| &self.modules[pos])
            .ok_or_else(|| MetadataError::ModuleNotFound {
                module: name.to_string(),
            })
    }

    pub fn module_by_index(&self, index: u8) -> Result<&ModuleMetadata, MetadataError> {
        self.by_index
            .get(&index)
            .map(|&pos| &self.modules[pos])
            .ok_or(MetadataError::ModuleIndexNotFound { index })
    }

    /// Look up a storage entry by module and item name.
    pub fn resolve_storage(
        &self,
        module: &str,
        item: &str,
    ) -> Result<&StorageEntryMetadata, MetadataError> {
        self.module(module)
            .ok()
            .and_then(|m| m.storage_entry(item))
            .ok_or_else(|| MetadataError::StorageNotFound {
                module: module.to_string(),
                item: item.to_string(),
            })
    }

    /// Look up an event by the indices found on the wire.
    pub fn resolve_event(
        &self,
        module_index: u8,
        event_index: u8,
    ) -> Result<EventTypeDescriptor<'_>, MetadataError> {
        let not_found = || MetadataError::EventNotFound {
            module_index,
            event_index,
        };
        let module = self.module_by_index(module_index).map_err(|_| not_found())?;
        let ty = module.event_ty.ok_or_else(not_found)?;
        let variant = self
            .variants(ty, &module.name, "event")?
            .iter()
            .find(|v| v.index == event_index)
            .ok_or_else(not_found)?;
        Ok(VariantDescriptor { module, variant })
    }

    /// Look up a dispatchable call by module and call index.
    pub fn resolve_call(
        &self,
        module_index: u8,
        call_index: u8,
    ) -> Result<CallDescriptor<'_>, MetadataError> {
        let not_found = || MetadataError::CallNotFound {
            module_index,
            call_index,
        };
        let module = self.module_by_index(module_index).map_err(|_| not_found())?;
        let ty = module.call_ty.ok_or_else(not_found)?;
        let variant = self
            .variants(ty, &module.name, "call")?
            .iter()
            .find(|v| v.index == call_index)
            .ok_or_else(not_found)?;
        Ok(VariantDescriptor { module, variant })
    }

    fn variants(&self, ty: TypeId, module: &str, what: &str) -> Result<&[Variant], MetadataError> {
        match &self.registry.resolve(ty)?.def {
            TypeDef::Variant(variants) => Ok(variants),
            _ => Err(MetadataError::NotAVariant {
                id: ty,
                context: format!("{module} {what}"),
            }),
        }
    }

    pub fn constant(&self, module: &str, name: &str) -> Result<&ConstantMetadata, MetadataError> {
        self.module(module)
            .ok()
            .and_then(|m| m.constant(name))
            .ok_or_else(|| MetadataError::ConstantNotFound {
                module: module.to_string(),
                name: name.to_string(),
            })
    }

    /// Decode a constant with its declared type.
    pub fn decode_constant(&self, module: &str, name: &str) -> Result<Value, MetadataError> {
        let constant = self.constant(module, name)?;
        Ok(decode_all(&constant.value, constant.ty, &self.registry)?)
    }

    /// Resolve `module::item` and derive its storage key.
    pub fn storage_key(
        &self,
        module: &str,
        item: &str,
        map_key: Option<&[u8]>,
    ) -> Result<StorageKey, MetadataError> {
        let entry = self.resolve_storage(module, item)?;
        StorageKeyDeriver::derive(entry, map_key).map_err(MetadataError::from)
    }

    /// Decode the value stored under an entry.
    ///
    /// `data` is what the node returned for the key. An absent `Default`
    /// entry decodes to its declared default; an absent `Optional` entry
    /// yields `None`.
    pub fn decode_storage(
        &self,
        entry: &StorageEntryMetadata,
        data: Option<&[u8]>,
    ) -> Result<Option<Value>, MetadataError> {
        let bytes = match (data, entry.modifier) {
            (Some(bytes), _) => bytes,
            (None, StorageModifier::Default) => entry.default.as_slice(),
            (None, StorageModifier::Optional) => return Ok(None),
        };
        Ok(Some(decode_all(bytes, entry.value_ty, &self.registry)?))
    }

    /// Number of map keys `module::item` takes, for callers validating input.
    pub fn storage_key_count(&self, module: &str, item: &str) -> Result<usize, MetadataError> {
        self.resolve_storage(module, item).map(StorageEntryMetadata::key_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ALICE};
    use chainstate_core::error::StorageKeyError;

    #[test]
    fn lookups_by_name_and_index() {
        let meta = testing::sample_metadata();
        assert_eq!(meta.version(), 14);
        assert_eq!(meta.module("Balances").unwrap().index, 5);
        assert_eq!(meta.module_by_index(9).unwrap().name, "Session");
        assert!(matches!(
            meta.module("balances"),
            Err(MetadataError::ModuleNotFound { .. })
        ));
        assert!(meta.module_by_index(200).unwrap_err().is_not_found());
        let names: Vec<_> = meta.modules().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["System", "Balances", "Staking", "Session"]);
    }

    #[test]
    fn resolve_storage_entries() {
        let meta = testing::sample_metadata();
        let account = meta.resolve_storage("System", "Account").unwrap();
        assert_eq!(account.kind(), StorageKind::Map);
        assert_eq!(account.hashers, [StorageHasher::Blake2_128Concat]);
        assert_eq!(account.modifier, StorageModifier::Default);

        let stakers = meta.resolve_storage("Staking", "ErasStakers").unwrap();
        assert_eq!(stakers.kind(), StorageKind::DoubleMap);
        let paged = meta.resolve_storage("Staking", "ErasStakersPaged").unwrap();
        assert_eq!(paged.kind(), StorageKind::NMap);
        assert_eq!(meta.storage_key_count("Staking", "ErasStakersPaged").unwrap(), 3);

        let err = meta.resolve_storage("System", "events").unwrap_err();
        assert_eq!(
            err,
            MetadataError::StorageNotFound {
                module: "System".into(),
                item: "events".into()
            }
        );
        assert!(meta.resolve_storage("Nope", "Events").unwrap_err().is_not_found());
    }

    #[test]
    fn resolve_event_descriptors() {
        let meta = testing::sample_metadata();
        let transfer = meta.resolve_event(5, 2).unwrap();
        assert_eq!(transfer.module_name(), "Balances");
        assert_eq!(transfer.name(), "Transfer");
        let names: Vec<_> = transfer
            .fields()
            .iter()
            .map(|f| f.name.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(names, ["from", "to", "amount"]);

        assert_eq!(
            meta.resolve_event(5, 99).unwrap_err(),
            MetadataError::EventNotFound {
                module_index: 5,
                event_index: 99
            }
        );
        // Staking declares no events.
        assert!(meta.resolve_event(7, 0).unwrap_err().is_not_found());
        assert!(meta.resolve_event(42, 0).unwrap_err().is_not_found());
    }

    #[test]
    fn resolve_calls() {
        let meta = testing::sample_metadata();
        let call = meta.resolve_call(0, 0).unwrap();
        assert_eq!((call.module_name(), call.name()), ("System", "remark"));
        assert!(matches!(
            meta.resolve_call(9, 0),
            Err(MetadataError::CallNotFound { .. })
        ));
    }

    #[test]
    fn constants_decode_with_declared_type() {
        let meta = testing::sample_metadata();
        assert_eq!(
            meta.decode_constant("System", "BlockHashCount").unwrap(),
            Value::U32(2400)
        );
        assert_eq!(
            meta.decode_constant("Balances", "ExistentialDeposit")
                .unwrap()
                .as_u128(),
            Some(500)
        );
        assert!(meta.constant("System", "Nope").unwrap_err().is_not_found());
    }

    #[test]
    fn storage_key_through_index() {
        let meta = testing::sample_metadata();
        let key = meta.storage_key("System", "Account", Some(&ALICE[..])).unwrap();
        assert_eq!(key.len(), 32 + 16 + 32);
        assert!(matches!(
            meta.storage_key("System", "Account", None),
            Err(MetadataError::StorageKey(StorageKeyError::MissingMapKey { .. }))
        ));
    }

    #[test]
    fn decode_storage_falls_back_to_default() {
        let meta = testing::sample_metadata();
        let issuance = meta.resolve_storage("Balances", "TotalIssuance").unwrap();
        assert_eq!(
            meta.decode_storage(issuance, None).unwrap(),
            Some(Value::U128(0))
        );
        let stored = 12_345u128.to_le_bytes();
        assert_eq!(
            meta.decode_storage(issuance, Some(&stored[..])).unwrap(),
            Some(Value::U128(12_345))
        );

        let bonded = meta.resolve_storage("Staking", "Bonded").unwrap();
        assert_eq!(meta.decode_storage(bonded, None).unwrap(), None);

        let account = meta.resolve_storage("System", "Account").unwrap();
        let info = meta.decode_storage(account, None).unwrap().unwrap();
        assert_eq!(info.field("nonce"), Some(&Value::U32(0)));
    }

    #[test]
    fn index_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MetadataIndex>();
    }
}

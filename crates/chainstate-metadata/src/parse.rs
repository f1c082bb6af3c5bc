//! Decoder for the `RuntimeMetadataPrefixed` document (V14 and V15).
//!
//! Layout: `b"meta"` magic, one version byte, the portable type registry and
//! the pallet list. Everything after the pallets (extrinsic info, runtime
//! APIs, outer enums) is not needed for storage and event decoding and is
//! left unread.

use chainstate_core::error::{DecodeError, MetadataError};
use chainstate_scale::{
    Cursor, Field, Primitive, TypeDef, TypeId, TypeInfo, TypeParam, TypeRegistry, Variant,
};
use tracing::debug;

use crate::hasher::StorageHasher;
use crate::index::{
    ConstantMetadata, MetadataIndex, ModuleMetadata, StorageEntryMetadata, StorageModifier,
};

/// `b"meta"` as it appears at the start of every metadata document.
pub const MAGIC: [u8; 4] = *b"meta";

pub const SUPPORTED_VERSIONS: [u8; 2] = [14, 15];

pub(crate) fn parse(raw: &[u8]) -> Result<MetadataIndex, MetadataError> {
    let mut c = Cursor::new(raw);
    let found: [u8; 4] = c.read_array()?;
    if found != MAGIC {
        return Err(MetadataError::InvalidMagic { found });
    }
    let version = c.read_u8()?;
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(MetadataError::UnsupportedVersion { version });
    }

    let types = c.read_vec(read_type)?;
    let registry = TypeRegistry::from_types(types);
    let modules = c.read_vec(|c| read_pallet(c, version))?;

    debug!(
        version,
        types = registry.len(),
        modules = modules.len(),
        storage_entries = modules.iter().map(|m| m.storage.len()).sum::<usize>(),
        unread = c.remaining(),
        "parsed runtime metadata"
    );
    Ok(MetadataIndex::from_parts(version, registry, modules))
}

fn read_type_id(c: &mut Cursor<'_>) -> Result<TypeId, DecodeError> {
    let at = c.offset();
    let id = c.read_compact()?;
    TypeId::try_from(id).map_err(|_| c.invalid(at, format!("type id {id} exceeds u32")))
}

fn read_docs(c: &mut Cursor<'_>) -> Result<Vec<String>, DecodeError> {
    c.read_vec(|c| c.read_str())
}

fn read_byte_vec(c: &mut Cursor<'_>) -> Result<Vec<u8>, DecodeError> {
    let len = c.read_len()?;
    Ok(c.read_bytes(len)?.to_vec())
}

fn read_type(c: &mut Cursor<'_>) -> Result<TypeInfo, DecodeError> {
    let id = read_type_id(c)?;
    let path = c.read_vec(|c| c.read_str())?;
    let params = c.read_vec(|c| {
        Ok::<_, DecodeError>(TypeParam {
            name: c.read_str()?,
            ty: c.read_option(read_type_id)?,
        })
    })?;
    let def = read_type_def(c)?;
    let docs = read_docs(c)?;
    Ok(TypeInfo {
        id,
        path,
        params,
        def,
        docs,
    })
}

fn read_type_def(c: &mut Cursor<'_>) -> Result<TypeDef, DecodeError> {
    let at = c.offset();
    Ok(match c.read_u8()? {
        0 => TypeDef::Composite(c.read_vec(read_field)?),
        1 => TypeDef::Variant(c.read_vec(read_variant)?),
        2 => TypeDef::Sequence(read_type_id(c)?),
        3 => TypeDef::Array {
            len: c.read_u32()?,
            elem: read_type_id(c)?,
        },
        4 => TypeDef::Tuple(c.read_vec(read_type_id)?),
        5 => {
            let d = c.read_u8()?;
            TypeDef::Primitive(
                Primitive::from_discriminant(d)
                    .ok_or_else(|| c.invalid(at + 1, format!("unknown primitive {d}")))?,
            )
        }
        6 => TypeDef::Compact(read_type_id(c)?),
        7 => TypeDef::BitSequence {
            store: read_type_id(c)?,
            order: read_type_id(c)?,
        },
        tag => return Err(c.invalid(at, format!("unknown type definition tag {tag}"))),
    })
}

fn read_field(c: &mut Cursor<'_>) -> Result<Field, DecodeError> {
    Ok(Field {
        name: c.read_option(|c| c.read_str())?,
        ty: read_type_id(c)?,
        type_name: c.read_option(|c| c.read_str())?,
        docs: read_docs(c)?,
    })
}

fn read_variant(c: &mut Cursor<'_>) -> Result<Variant, DecodeError> {
    Ok(Variant {
        name: c.read_str()?,
        fields: c.read_vec(read_field)?,
        index: c.read_u8()?,
        docs: read_docs(c)?,
    })
}

fn read_pallet(c: &mut Cursor<'_>, version: u8) -> Result<ModuleMetadata, DecodeError> {
    let name = c.read_str()?;
    let storage = c.read_option(|c| {
        let prefix = c.read_str()?;
        let entries = c.read_vec(|c| read_storage_entry(c, &prefix))?;
        Ok::<_, DecodeError>((prefix, entries))
    })?;
    let call_ty = c.read_option(read_type_id)?;
    let event_ty = c.read_option(read_type_id)?;
    let constants = c.read_vec(|c| {
        Ok::<_, DecodeError>(ConstantMetadata {
            name: c.read_str()?,
            ty: read_type_id(c)?,
            value: read_byte_vec(c)?,
            docs: read_docs(c)?,
        })
    })?;
    let error_ty = c.read_option(read_type_id)?;
    let index = c.read_u8()?;
    let docs = if version >= 15 { read_docs(c)? } else { Vec::new() };

    let (storage_prefix, storage) = match storage {
        Some((prefix, entries)) => (Some(prefix), entries),
        None => (None, Vec::new()),
    };
    Ok(ModuleMetadata {
        name,
        index,
        storage_prefix,
        storage,
        call_ty,
        event_ty,
        error_ty,
        constants,
        docs,
    })
}

fn read_storage_entry(c: &mut Cursor<'_>, prefix: &str) -> Result<StorageEntryMetadata, DecodeError> {
    let name = c.read_str()?;
    let at = c.offset();
    let modifier = match c.read_u8()? {
        0 => StorageModifier::Optional,
        1 => StorageModifier::Default,
        m => return Err(c.invalid(at, format!("unknown storage modifier {m}"))),
    };
    let at = c.offset();
    let (hashers, key_ty, value_ty) = match c.read_u8()? {
        0 => (Vec::new(), None, read_type_id(c)?),
        1 => {
            let hashers = c.read_vec(read_hasher)?;
            if hashers.is_empty() {
                return Err(c.invalid(at, format!("storage map '{name}' declares no hashers")));
            }
            (hashers, Some(read_type_id(c)?), read_type_id(c)?)
        }
        t => return Err(c.invalid(at, format!("unknown storage entry type {t}"))),
    };
    Ok(StorageEntryMetadata {
        prefix: prefix.to_string(),
        name,
        modifier,
        hashers,
        key_ty,
        value_ty,
        default: read_byte_vec(c)?,
        docs: read_docs(c)?,
    })
}

fn read_hasher(c: &mut Cursor<'_>) -> Result<StorageHasher, DecodeError> {
    let at = c.offset();
    let d = c.read_u8()?;
    StorageHasher::from_discriminant(d)
        .ok_or_else(|| c.invalid(at, format!("unknown storage hasher {d}")))
}

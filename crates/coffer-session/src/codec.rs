//! Attribute values and the codecs that move them in and out of byte blobs.
//!
//! Session attributes are stored type-erased as [`AttributeValue`]. Turning
//! one into bytes requires a codec registered for its concrete type in a
//! [`CodecRegistry`]; each registration carries a stable type tag that is
//! written next to the bytes so the value can be rebuilt later.
//!
//! Unregistered types fail with [`CodecError::NonSerializable`] on encode,
//! and unknown tags or undecodable bytes fail with
//! [`CodecError::CorruptOrIncompatible`] on decode.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors raised while encoding or decoding attribute values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// No codec is registered for the value's type, or the codec refused it.
    #[error("Attribute value of type {type_name} is not serializable")]
    NonSerializable { type_name: String },

    /// The stored form cannot be turned back into a value.
    #[error("Stored attribute of type '{type_tag}' cannot be restored: {reason}")]
    CorruptOrIncompatible { type_tag: String, reason: String },
}

/// A type-erased, cheaply clonable attribute value.
#[derive(Clone)]
pub struct AttributeValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl AttributeValue {
    /// Wrap a concrete value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the value as `T` if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Check the concrete type without borrowing.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// `TypeId` of the wrapped value.
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the wrapped value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// An attribute in its persisted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAttribute {
    /// Tag of the codec that produced `bytes`.
    pub type_tag: String,
    /// Codec output.
    pub bytes: Vec<u8>,
}

/// Converts values of one concrete type to and from bytes.
pub trait AttributeCodec: Send + Sync {
    /// Encode a value. The registry only hands over values of the type the
    /// codec was registered for.
    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError>;

    /// Rebuild a value from bytes produced by [`encode`](Self::encode).
    fn decode(&self, bytes: &[u8]) -> Result<AttributeValue, CodecError>;
}

/// Serde/JSON codec for any serializable type.
pub struct JsonCodec<T> {
    tag: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> AttributeCodec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Any + Send + Sync,
{
    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>, CodecError> {
        let typed = value
            .downcast_ref::<T>()
            .ok_or_else(|| CodecError::NonSerializable {
                type_name: value.type_name().to_string(),
            })?;
        serde_json::to_vec(typed).map_err(|_| CodecError::NonSerializable {
            type_name: value.type_name().to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<AttributeValue, CodecError> {
        serde_json::from_slice::<T>(bytes)
            .map(AttributeValue::new)
            .map_err(|e| CodecError::CorruptOrIncompatible {
                type_tag: self.tag.clone(),
                reason: e.to_string(),
            })
    }
}

#[derive(Default)]
struct RegistryInner {
    codecs: HashMap<String, Arc<dyn AttributeCodec>>,
    tags: HashMap<TypeId, String>,
}

/// Extensible registry of per-type codecs.
///
/// Registration is expected at startup but is allowed at any time; a tag
/// registered again replaces the previous codec.
#[derive(Default)]
pub struct CodecRegistry {
    inner: RwLock<RegistryInner>,
}

impl CodecRegistry {
    /// Create an empty registry (every value is non-serializable).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with codecs for the standard scalar and text types.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register::<bool>("bool");
        registry.register::<i8>("i8");
        registry.register::<i16>("i16");
        registry.register::<i32>("i32");
        registry.register::<i64>("i64");
        registry.register::<u8>("u8");
        registry.register::<u16>("u16");
        registry.register::<u32>("u32");
        registry.register::<u64>("u64");
        registry.register::<f32>("f32");
        registry.register::<f64>("f64");
        registry.register::<char>("char");
        registry.register::<String>("string");
        registry.register::<Vec<u8>>("bytes");
        registry.register::<serde_json::Value>("json");
        registry
    }

    /// Register a serde-backed codec for `T` under `tag`.
    pub fn register<T>(&self, tag: &str)
    where
        T: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        self.register_codec::<T>(tag, JsonCodec::<T>::new(tag));
    }

    /// Register a custom codec for `T` under `tag`.
    pub fn register_codec<T: Any>(&self, tag: &str, codec: impl AttributeCodec + 'static) {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.tags.insert(TypeId::of::<T>(), tag.to_string()) {
            if previous != tag {
                inner.codecs.remove(&previous);
            }
        }
        inner.codecs.insert(tag.to_string(), Arc::new(codec));
    }

    /// Remove the codec registered under `tag`. Returns whether one existed.
    pub fn unregister(&self, tag: &str) -> bool {
        let mut inner = self.inner.write();
        inner.tags.retain(|_, t| t != tag);
        inner.codecs.remove(tag).is_some()
    }

    /// Whether values of type `T` can be encoded.
    pub fn is_registered<T: Any>(&self) -> bool {
        self.inner.read().tags.contains_key(&TypeId::of::<T>())
    }

    /// Encode a value with the codec registered for its type.
    pub fn encode(&self, value: &AttributeValue) -> Result<EncodedAttribute, CodecError> {
        let (tag, codec) = {
            let inner = self.inner.read();
            let Some(tag) = inner.tags.get(&value.value_type_id()) else {
                return Err(CodecError::NonSerializable {
                    type_name: value.type_name().to_string(),
                });
            };
            let codec = inner.codecs.get(tag).cloned().ok_or_else(|| {
                CodecError::NonSerializable {
                    type_name: value.type_name().to_string(),
                }
            })?;
            (tag.clone(), codec)
        };

        let bytes = codec.encode(value)?;
        Ok(EncodedAttribute {
            type_tag: tag,
            bytes,
        })
    }

    /// Decode a stored attribute using the codec named by its tag.
    pub fn decode(&self, encoded: &EncodedAttribute) -> Result<AttributeValue, CodecError> {
        let codec = self
            .inner
            .read()
            .codecs
            .get(&encoded.type_tag)
            .cloned()
            .ok_or_else(|| CodecError::CorruptOrIncompatible {
                type_tag: encoded.type_tag.clone(),
                reason: "no codec registered for this type tag".to_string(),
            })?;
        codec.decode(&encoded.bytes)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        let mut tags: Vec<&String> = inner.codecs.keys().collect();
        tags.sort();
        f.debug_struct("CodecRegistry").field("tags", &tags).finish()
    }
}

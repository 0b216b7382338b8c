//! Cache Value Module
//!
//! Type-erased cache values and the ordered strategy used to recover them as
//! a concrete type:
//!
//! 1. direct match: the stored type is the requested type
//! 2. safe conversion: lossless conversion between primitive types
//! 3. round trip: serialize the stored value to JSON and deserialize it as
//!    the requested type

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

// == Erased Value ==
/// Object-safe view of a stored value.
pub trait ErasedValue: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Serializes the value for the round-trip fallback.
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    fn type_name(&self) -> &'static str;
}

impl<T> ErasedValue for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

// == Cache Value ==
/// A cheaply cloneable, type-erased cached value.
#[derive(Clone)]
pub struct CacheValue(Arc<dyn ErasedValue>);

impl CacheValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }

    /// Name of the stored Rust type.
    pub fn type_name(&self) -> &'static str {
        self.erased().type_name()
    }

    /// Recovers the value as `D`: direct match, then safe conversion, then
    /// JSON round trip.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the round trip cannot produce a `D`.
    pub fn recover<D>(&self) -> serde_json::Result<D>
    where
        D: DeserializeOwned + Clone + 'static,
    {
        let any = self.erased().as_any();

        if let Some(value) = any.downcast_ref::<D>() {
            return Ok(value.clone());
        }

        if let Some(value) = Primitive::from_any(any).and_then(Primitive::convert::<D>) {
            return Ok(value);
        }

        serde_json::from_value(self.erased().to_json()?)
    }

    fn erased(&self) -> &dyn ErasedValue {
        &*self.0
    }
}

impl fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheValue").field(&self.type_name()).finish()
    }
}

// == Primitive Conversion ==
/// Primitive values that take part in the safe conversion step.
#[derive(Debug, Clone, PartialEq)]
enum Primitive {
    Int(i128),
    Float(f64),
    Text(String),
}

macro_rules! downcast_int {
    ($any:expr, $($ty:ty),+) => {
        $(
            if let Some(value) = $any.downcast_ref::<$ty>() {
                return Some(Primitive::Int(*value as i128));
            }
        )+
    };
}

macro_rules! int_into {
    ($target:expr, $value:expr, $($ty:ty),+) => {
        $(
            if $target == TypeId::of::<$ty>() {
                return <$ty>::try_from($value)
                    .ok()
                    .map(|v| Box::new(v) as Box<dyn Any>);
            }
        )+
    };
}

/// Largest integer magnitude an `f64` represents exactly.
const F64_EXACT: u128 = 1 << 53;
/// Largest integer magnitude an `f32` represents exactly.
const F32_EXACT: u128 = 1 << 24;

impl Primitive {
    fn from_any(any: &dyn Any) -> Option<Self> {
        downcast_int!(any, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

        if let Some(value) = any.downcast_ref::<f32>() {
            return Some(Primitive::Float(f64::from(*value)));
        }
        if let Some(value) = any.downcast_ref::<f64>() {
            return Some(Primitive::Float(*value));
        }
        if let Some(value) = any.downcast_ref::<String>() {
            return Some(Primitive::Text(value.clone()));
        }
        if let Some(value) = any.downcast_ref::<&'static str>() {
            return Some(Primitive::Text((*value).to_string()));
        }
        if let Some(value) = any.downcast_ref::<Box<str>>() {
            return Some(Primitive::Text(value.to_string()));
        }
        None
    }

    /// Converts into `D` only when no information is lost.
    fn convert<D: 'static>(self) -> Option<D> {
        let boxed = self.convert_boxed(TypeId::of::<D>())?;
        boxed.downcast::<D>().ok().map(|value| *value)
    }

    fn convert_boxed(self, target: TypeId) -> Option<Box<dyn Any>> {
        match self {
            Primitive::Int(value) => {
                int_into!(target, value, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

                if target == TypeId::of::<f64>() && value.unsigned_abs() <= F64_EXACT {
                    return Some(Box::new(value as f64));
                }
                if target == TypeId::of::<f32>() && value.unsigned_abs() <= F32_EXACT {
                    return Some(Box::new(value as f32));
                }
                None
            }
            Primitive::Float(value) => {
                if target == TypeId::of::<f64>() {
                    return Some(Box::new(value));
                }
                let narrowed = value as f32;
                if target == TypeId::of::<f32>() && f64::from(narrowed) == value {
                    return Some(Box::new(narrowed));
                }
                None
            }
            Primitive::Text(value) => {
                if target == TypeId::of::<String>() {
                    return Some(Box::new(value));
                }
                if target == TypeId::of::<Box<str>>() {
                    return Some(Box::new(value.into_boxed_str()));
                }
                None
            }
        }
    }
}

//! Pont hôte → [`Value`].
//!
//! Deux chemins :
//! - [`ToValue`], implémenté pour les scalaires, conteneurs et structures
//!   déclarées via [`host_object!`](crate::host_object) ;
//! - [`reflect`], qui passe par `serde_json::Value` pour n'importe quel
//!   type `Serialize`.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use clause_core::Value;
use serde::Serialize;
use thiserror::Error;

/// Échec de conversion d'une valeur hôte.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Aucun équivalent dans le modèle de valeurs.
    #[error("unsupported host type: {0}")]
    UnsupportedType(String),
}

impl BridgeError {
    fn unsupported(what: impl Into<String>) -> Self { Self::UnsupportedType(what.into()) }
}

/// Conversion d'une valeur hôte en [`Value`].
pub trait ToValue {
    /// Convertit `self`.
    fn to_value(&self) -> Result<Value, BridgeError>;
}

/// Référence opaque vers une ressource hôte (canal, descripteur…), vue comme un entier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostHandle(pub i64);

/* ─────────── Scalaires ─────────── */

macro_rules! int_to_value {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::Int(i64::from(*self))) }
        }
    )*};
}

int_to_value!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_to_value {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Result<Value, BridgeError> {
                i64::try_from(*self)
                    .map(Value::Int)
                    .map_err(|_| BridgeError::unsupported(format!("{} {} exceeds i64", stringify!($t), self)))
            }
        }
    )*};
}

wide_int_to_value!(u64, usize, isize, i128, u128);

impl ToValue for f64 {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::Double(*self)) }
}

impl ToValue for f32 {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::Double(f64::from(*self))) }
}

impl ToValue for bool {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::Bool(*self)) }
}

impl ToValue for char {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::Char(*self)) }
}

impl ToValue for str {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::String(self.to_owned())) }
}

impl ToValue for String {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::String(self.clone())) }
}

impl ToValue for HostHandle {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(Value::Int(self.0)) }
}

impl ToValue for Value {
    fn to_value(&self) -> Result<Value, BridgeError> { Ok(self.clone()) }
}

impl ToValue for () {
    fn to_value(&self) -> Result<Value, BridgeError> { Err(BridgeError::unsupported("unit")) }
}

/* ─────────── Références et conteneurs ─────────── */

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Result<Value, BridgeError> { (**self).to_value() }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Result<Value, BridgeError> { (**self).to_value() }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Result<Value, BridgeError> {
        self.as_ref().map_or_else(|| Err(BridgeError::unsupported("none")), ToValue::to_value)
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Result<Value, BridgeError> {
        self.iter().map(ToValue::to_value).collect::<Result<Vec<_>, _>>().map(Value::Array)
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Result<Value, BridgeError> { self.as_slice().to_value() }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Result<Value, BridgeError> { self.as_slice().to_value() }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Result<Value, BridgeError> {
        self.iter().map(|(k, v)| Ok((k.clone(), v.to_value()?))).collect::<Result<_, BridgeError>>().map(Value::Object)
    }
}

impl<T: ToValue, S: BuildHasher> ToValue for HashMap<String, T, S> {
    fn to_value(&self) -> Result<Value, BridgeError> {
        self.iter().map(|(k, v)| Ok((k.clone(), v.to_value()?))).collect::<Result<_, BridgeError>>().map(Value::Object)
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Result<Value, BridgeError> { from_json(self) }
}

/* ─────────── Réflexion serde ─────────── */

/// Convertit n'importe quelle valeur `Serialize`.
///
/// Structures et maps donnent des `Object`, séquences et tuples des `Array`.
/// `null`, `()` et `None` sont refusés, comme les clés de map non textuelles.
pub fn reflect<T: Serialize + ?Sized>(host: &T) -> Result<Value, BridgeError> {
    let json = serde_json::to_value(host).map_err(|e| BridgeError::unsupported(e.to_string()))?;
    from_json(&json)
}

/// Conversion depuis un document JSON déjà construit.
pub fn from_json(json: &serde_json::Value) -> Result<Value, BridgeError> {
    use serde_json::Value as J;
    Ok(match json {
        J::Null => return Err(BridgeError::unsupported("null")),
        J::Bool(b) => Value::Bool(*b),
        J::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Double(n.as_f64().ok_or_else(|| BridgeError::unsupported(format!("number {n}")))?),
        },
        J::String(s) => Value::String(s.clone()),
        J::Array(items) => Value::Array(items.iter().map(from_json).collect::<Result<_, _>>()?),
        J::Object(map) => Value::Object(
            map.iter().map(|(k, v)| Ok((k.clone(), from_json(v)?))).collect::<Result<_, BridgeError>>()?,
        ),
    })
}

/// Implémente [`ToValue`] pour une structure, champ par champ.
///
/// ```
/// use clause_vm::{host_object, bridge::ToValue, Value};
///
/// struct Role { name: String }
/// struct User { role: Role, age: u32 }
/// host_object!(Role { name });
/// host_object!(User { role, age });
///
/// let u = User { role: Role { name: "HI".into() }, age: 7 };
/// let v = u.to_value().unwrap();
/// assert_eq!(v.to_string(), "{age: 7, role: {name: HI}}");
/// ```
#[macro_export]
macro_rules! host_object {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::bridge::ToValue for $ty {
            fn to_value(&self) -> ::core::result::Result<$crate::Value, $crate::bridge::BridgeError> {
                #[allow(unused_mut)]
                let mut fields = ::std::collections::BTreeMap::new();
                $(
                    fields.insert(
                        ::std::string::String::from(::core::stringify!($field)),
                        $crate::bridge::ToValue::to_value(&self.$field)?,
                    );
                )*
                ::core::result::Result::Ok($crate::Value::Object(fields))
            }
        }
    };
}

//! Call Key Module
//!
//! Turns dynamic call arguments into hashable cache keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Argument Values ==
/// A dynamically typed call argument.
///
/// `List`, `Map` and NaN floats have no stable identity and cannot be used
/// as part of a cache key.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Arg>),
    List(Vec<Arg>),
    Map(Vec<(Arg, Arg)>),
}

impl Arg {
    fn kind(&self) -> &'static str {
        match self {
            Arg::Unit => "unit",
            Arg::Bool(_) => "bool",
            Arg::Int(_) => "int",
            Arg::Float(_) => "float",
            Arg::Str(_) => "str",
            Arg::Bytes(_) => "bytes",
            Arg::Tuple(_) => "tuple",
            Arg::List(_) => "list",
            Arg::Map(_) => "map",
        }
    }
}

impl From<()> for Arg {
    fn from(_: ()) -> Self {
        Arg::Unit
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

// == Call Arguments ==
/// Positional and named arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Arg>,
    named: Vec<(String, Arg)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Arg>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument, replacing an earlier one with the same name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.named.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.named.push((name, value)),
        }
        self
    }

    pub fn positional(&self) -> &[Arg] {
        &self.positional
    }

    /// Looks up a named argument.
    pub fn named(&self, name: &str) -> Option<&Arg> {
        self.named
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Named arguments in the order they were supplied.
    pub fn named_args(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.named.iter().map(|(name, value)| (name.as_str(), value))
    }
}

// == Key Parts ==
/// Hashable image of an [`Arg`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyPart {
    Unit,
    Bool(bool),
    Int(i64),
    /// Bit pattern of a non-NaN float, with `-0.0` folded into `0.0`
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<KeyPart>),
}

impl TryFrom<&Arg> for KeyPart {
    type Error = CacheError;

    fn try_from(arg: &Arg) -> Result<Self> {
        match arg {
            Arg::Unit => Ok(KeyPart::Unit),
            Arg::Bool(value) => Ok(KeyPart::Bool(*value)),
            Arg::Int(value) => Ok(KeyPart::Int(*value)),
            Arg::Float(value) if value.is_nan() => Err(CacheError::UnhashableArguments(
                "NaN has no stable equality".to_string(),
            )),
            Arg::Float(value) => {
                let value = if *value == 0.0 { 0.0 } else { *value };
                Ok(KeyPart::Float(value.to_bits()))
            }
            Arg::Str(value) => Ok(KeyPart::Str(value.clone())),
            Arg::Bytes(value) => Ok(KeyPart::Bytes(value.clone())),
            Arg::Tuple(items) => items
                .iter()
                .map(KeyPart::try_from)
                .collect::<Result<Vec<_>>>()
                .map(KeyPart::Tuple),
            Arg::List(_) | Arg::Map(_) => Err(CacheError::UnhashableArguments(format!(
                "{} is mutable and cannot be hashed",
                arg.kind()
            ))),
        }
    }
}

// == Call Key ==
/// Cache key for one call.
///
/// Positional parts compare in order. Named parts, present only when the
/// call had named arguments, compare as a set regardless of supply order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallKey {
    positional: Vec<KeyPart>,
    named: Option<BTreeMap<String, KeyPart>>,
}

impl CallKey {
    /// Builds the key for `args`.
    ///
    /// # Errors
    /// `UnhashableArguments` naming the first argument that cannot be hashed.
    pub fn from_args(args: &Args) -> Result<Self> {
        let positional = args
            .positional()
            .iter()
            .enumerate()
            .map(|(position, arg)| {
                KeyPart::try_from(arg).map_err(|err| describe(err, &format!("argument {}", position)))
            })
            .collect::<Result<Vec<_>>>()?;

        let named = if args.named.is_empty() {
            None
        } else {
            let parts = args
                .named_args()
                .map(|(name, arg)| {
                    KeyPart::try_from(arg)
                        .map(|part| (name.to_string(), part))
                        .map_err(|err| describe(err, &format!("argument `{}`", name)))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            Some(parts)
        };

        Ok(Self { positional, named })
    }

    pub fn positional(&self) -> &[KeyPart] {
        &self.positional
    }

    pub fn named(&self) -> Option<&BTreeMap<String, KeyPart>> {
        self.named.as_ref()
    }
}

impl TryFrom<&Args> for CallKey {
    type Error = CacheError;

    fn try_from(args: &Args) -> Result<Self> {
        Self::from_args(args)
    }
}

fn describe(err: CacheError, location: &str) -> CacheError {
    match err {
        CacheError::UnhashableArguments(reason) => {
            CacheError::UnhashableArguments(format!("{}: {}", location, reason))
        }
        other => other,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(key: &CallKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_positional_order_matters() {
        let a = CallKey::from_args(&Args::new().arg(1).arg(2)).unwrap();
        let b = CallKey::from_args(&Args::new().arg(2).arg(1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_named_order_ignored() {
        let a = CallKey::from_args(&Args::new().arg("x").kwarg("a", 1).kwarg("b", true)).unwrap();
        let b = CallKey::from_args(&Args::new().arg("x").kwarg("b", true).kwarg("a", 1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_named_values_matter() {
        let a = CallKey::from_args(&Args::new().kwarg("a", 1)).unwrap();
        let b = CallKey::from_args(&Args::new().kwarg("a", 2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_named_args_has_no_named_part() {
        let key = CallKey::from_args(&Args::new().arg(3)).unwrap();
        assert!(key.named().is_none());
        assert_eq!(key.positional(), &[KeyPart::Int(3)]);
    }

    #[test]
    fn test_kwarg_replaces_same_name() {
        let args = Args::new().kwarg("a", 1).kwarg("a", 5);
        assert_eq!(args.named("a"), Some(&Arg::Int(5)));
        assert_eq!(args.named_args().count(), 1);
    }

    #[test]
    fn test_nested_tuple_hashable() {
        let tuple = Arg::Tuple(vec![Arg::Int(1), Arg::Tuple(vec![Arg::Str("a".into())])]);
        let key = CallKey::from_args(&Args::new().arg(tuple)).unwrap();
        assert_eq!(
            key.positional(),
            &[KeyPart::Tuple(vec![
                KeyPart::Int(1),
                KeyPart::Tuple(vec![KeyPart::Str("a".into())])
            ])]
        );
    }

    #[test]
    fn test_list_unhashable() {
        let args = Args::new().arg(1).arg(Arg::List(vec![Arg::Int(1)]));
        let err = CallKey::from_args(&args).unwrap_err();
        match err {
            CacheError::UnhashableArguments(reason) => assert!(reason.contains("argument 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_in_named_unhashable() {
        let args = Args::new().kwarg("opts", Arg::Map(vec![]));
        let err = CallKey::from_args(&args).unwrap_err();
        match err {
            CacheError::UnhashableArguments(reason) => assert!(reason.contains("`opts`")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_list_inside_tuple_unhashable() {
        let tuple = Arg::Tuple(vec![Arg::List(vec![])]);
        assert!(CallKey::from_args(&Args::new().arg(tuple)).is_err());
    }

    #[test]
    fn test_nan_unhashable() {
        assert!(CallKey::from_args(&Args::new().arg(f64::NAN)).is_err());
    }

    #[test]
    fn test_signed_zero_equal() {
        let a = CallKey::from_args(&Args::new().arg(0.0)).unwrap();
        let b = CallKey::from_args(&Args::new().arg(-0.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_call_key_serde() {
        let key = CallKey::from_args(&Args::new().arg(1).kwarg("flag", true)).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        let decoded: CallKey = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, key);
    }
}

//! Values passed to and returned from commands.
//!
//! Every strategy speaks [`CommandValue`], so a result obtained in-process is
//! indistinguishable from the same result decoded off a socket.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Positional command arguments.
pub type Args = Vec<CommandValue>;

/// Keyword command arguments. Keys are unique; order carries no meaning.
pub type Kwargs = BTreeMap<String, CommandValue>;

/// A scalar or structured command argument/result.
///
/// Serialized adjacently tagged (`{"type": "int", "value": 1}`) so integers and
/// floats, null and the empty map never alias each other on the wire.
/// Non-finite floats travel as the strings `"nan"`, `"inf"` and `"-inf"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommandValue {
    /// Unit result / absence of a value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(#[serde(with = "float_repr")] f64),
    Str(String),
    List(Vec<CommandValue>),
    Map(BTreeMap<String, CommandValue>),
}

impl CommandValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CommandValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CommandValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CommandValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CommandValue::Float(f) => Some(*f),
            CommandValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CommandValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[CommandValue]> {
        match self {
            CommandValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, CommandValue>> {
        match self {
            CommandValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Collect a list of strings, e.g. the output of an introspection command.
    pub fn to_string_list(&self) -> Option<Vec<String>> {
        self.as_list()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

impl From<()> for CommandValue {
    fn from(_: ()) -> Self {
        CommandValue::Null
    }
}

impl From<bool> for CommandValue {
    fn from(value: bool) -> Self {
        CommandValue::Bool(value)
    }
}

impl From<i64> for CommandValue {
    fn from(value: i64) -> Self {
        CommandValue::Int(value)
    }
}

impl From<i32> for CommandValue {
    fn from(value: i32) -> Self {
        CommandValue::Int(i64::from(value))
    }
}

impl From<u32> for CommandValue {
    fn from(value: u32) -> Self {
        CommandValue::Int(i64::from(value))
    }
}

impl From<f64> for CommandValue {
    fn from(value: f64) -> Self {
        CommandValue::Float(value)
    }
}

impl From<&str> for CommandValue {
    fn from(value: &str) -> Self {
        CommandValue::Str(value.to_string())
    }
}

impl From<String> for CommandValue {
    fn from(value: String) -> Self {
        CommandValue::Str(value)
    }
}

impl<T: Into<CommandValue>> From<Vec<T>> for CommandValue {
    fn from(value: Vec<T>) -> Self {
        CommandValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CommandValue>> From<Option<T>> for CommandValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CommandValue::Null)
    }
}

impl From<BTreeMap<String, CommandValue>> for CommandValue {
    fn from(value: BTreeMap<String, CommandValue>) -> Self {
        CommandValue::Map(value)
    }
}

/// JSON has no NaN or infinity; those are written as tagged strings instead.
mod float_repr {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    const NAN: &str = "nan";
    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_sign_positive() {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_str(NEG_INF)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl Visitor<'_> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a number or one of {NAN:?}, {INF:?}, {NEG_INF:?}")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_and_null_are_distinct_on_the_wire() {
        let null = serde_json::to_string(&CommandValue::Null).unwrap();
        let empty = serde_json::to_string(&CommandValue::Map(BTreeMap::new())).unwrap();
        assert_ne!(null, empty);

        let back: CommandValue = serde_json::from_str(&empty).unwrap();
        assert_eq!(back, CommandValue::Map(BTreeMap::new()));
        let back: CommandValue = serde_json::from_str(&null).unwrap();
        assert!(back.is_null());
    }

    #[test]
    fn int_and_float_do_not_alias() {
        let one_int: CommandValue =
            serde_json::from_str(&serde_json::to_string(&CommandValue::Int(1)).unwrap()).unwrap();
        let one_float: CommandValue =
            serde_json::from_str(&serde_json::to_string(&CommandValue::Float(1.0)).unwrap())
                .unwrap();
        assert_eq!(one_int, CommandValue::Int(1));
        assert_eq!(one_float, CommandValue::Float(1.0));
    }

    fn wire(value: &CommandValue) -> CommandValue {
        serde_json::from_str(&serde_json::to_string(value).unwrap()).unwrap()
    }

    #[test]
    fn non_finite_floats_survive_the_wire() {
        assert_eq!(wire(&CommandValue::Float(f64::INFINITY)), CommandValue::Float(f64::INFINITY));
        assert_eq!(
            wire(&CommandValue::Float(f64::NEG_INFINITY)),
            CommandValue::Float(f64::NEG_INFINITY)
        );
        assert!(wire(&CommandValue::Float(f64::NAN)).as_f64().unwrap().is_nan());

        let json = serde_json::to_string(&CommandValue::Float(f64::NAN)).unwrap();
        assert_eq!(json, r#"{"type":"float","value":"nan"}"#);
    }

    #[test]
    fn float_tag_rejects_arbitrary_strings() {
        let bad = r#"{"type":"float","value":"lots"}"#;
        assert!(serde_json::from_str::<CommandValue>(bad).is_err());

        let whole = r#"{"type":"float","value":2}"#;
        assert_eq!(
            serde_json::from_str::<CommandValue>(whole).unwrap(),
            CommandValue::Float(2.0)
        );
    }

    #[test]
    fn string_lists_convert() {
        let v: CommandValue = vec!["a", "b"].into();
        assert_eq!(v.to_string_list(), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(CommandValue::Int(3).to_string_list(), None);
    }
}

//! `#[serde(with = "...")]` adapters for identifier fields.
//!
//! Identifiers are plain `i64`s, so these adapters only choose the wire form
//! and reject values that are not valid identifiers on the way in.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Order {
//!     #[serde(with = "nodeflake::serde::as_base36")]
//!     id: i64,
//! }
//!
//! let order: Order = serde_json::from_str(r#"{"id":"1y2p0ij32e8e7"}"#)?;
//! assert_eq!(order.id, i64::MAX);
//! # Ok::<(), serde_json::Error>(())
//! ```

use ::serde::{Deserialize, Deserializer, Serializer};

pub mod as_native {
    use super::{Deserialize, Deserializer, Serializer};
    use crate::decompose;

    /// Serialize an identifier as its integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &i64, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_i64(*id)
    }

    /// Deserialize an identifier from its integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying deserializer fails or the value is
    /// not positive.
    pub fn deserialize<'de, D>(d: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = i64::deserialize(d)?;
        match decompose(id) {
            Ok(_) => Ok(id),
            Err(e) => Err(<D::Error as ::serde::de::Error>::custom(e)),
        }
    }
}

pub mod as_base36 {
    use super::{Deserializer, Serializer};
    use crate::{format, parse};

    /// Serialize an identifier as a lowercase base-36 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &i64, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&format(*id))
    }

    /// Deserialize an identifier from a base-36 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying deserializer fails or the string is
    /// not a valid identifier.
    pub fn deserialize<'de, D>(d: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Base36Visitor;

        impl ::serde::de::Visitor<'_> for Base36Visitor {
            type Value = i64;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a base-36 encoded identifier")
            }

            #[inline]
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                parse(v).map_err(E::custom)
            }
        }

        d.deserialize_str(Base36Visitor)
    }
}

#[cfg(test)]
mod tests {
    use ::serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::{Parts, compose};

    #[derive(PartialEq, Eq, Debug, Serialize, Deserialize)]
    struct NativeRow {
        #[serde(with = "as_native")]
        event_id: i64,
    }

    #[derive(PartialEq, Eq, Debug, Serialize, Deserialize)]
    struct Base36Row {
        #[serde(with = "as_base36")]
        event_id: i64,
    }

    #[test]
    fn native_roundtrip() {
        let row = NativeRow { event_id: 42 };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"event_id":42}"#);
        let back: NativeRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn native_rejects_non_positive() {
        for value in [0, -1] {
            let err = serde_json::from_value::<NativeRow>(json!({ "event_id": value }))
                .unwrap_err();
            assert!(err.to_string().contains("invalid identifier"), "{err}");
        }
    }

    #[test]
    fn base36_roundtrip() {
        let id = compose(1_000_000, 3, 77).unwrap();
        let row = Base36Row { event_id: id };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, format!(r#"{{"event_id":"{}"}}"#, crate::format(id)));
        let back: Base36Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);

        let upper: Base36Row =
            serde_json::from_value(json!({ "event_id": crate::format(id).to_uppercase() }))
                .unwrap();
        assert_eq!(upper, row);
    }

    #[test]
    fn base36_rejects_invalid_text() {
        for text in ["", "0", "-1", "not/base36", "1y2p0ij32e8e8"] {
            let err =
                serde_json::from_value::<Base36Row>(json!({ "event_id": text })).unwrap_err();
            assert!(err.to_string().contains("invalid identifier"), "{text}: {err}");
        }
        assert!(serde_json::from_value::<Base36Row>(json!({ "event_id": 42 })).is_err());
    }

    #[test]
    fn parts_serialize_as_fields() {
        let parts = Parts {
            time: 12,
            sequence: 3,
            node: 7,
        };
        let value = serde_json::to_value(parts).unwrap();
        assert_eq!(value, json!({ "time": 12, "sequence": 3, "node": 7 }));
        let back: Parts = serde_json::from_value(value).unwrap();
        assert_eq!(back, parts);
    }
}

//! Body encoding for the legacy API and decoding of both API generations

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use std::borrow::Cow;

use super::Generation;

/// Entities the legacy API emits unescaped, paired with the text they are
/// rewritten to before the body reaches the XML parser. Replacements must not
/// contain any entity of this table, which keeps the rewrite idempotent.
///
/// Decoded fields hold the character itself (`•`), not the entity text.
pub const KNOWN_ENTITY_QUIRKS: &[(&str, &str)] = &[("&bull;", "<![CDATA[\u{2022}]]>")];

const SNIPPET_LEN: usize = 256;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("cannot encode xml payload: {0}")]
    Xml(#[from] quick_xml::SeError),
    #[error("cannot encode query string: {0}")]
    Query(#[from] serde_qs::Error),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Marshals a legacy list entry to its XML document
pub fn encode_entry<E: Serialize>(entry: &E) -> Result<String, EncodeError> {
    Ok(quick_xml::se::to_string(entry)?)
}

/// Rewrites every entity from [KNOWN_ENTITY_QUIRKS]. Bodies without any of
/// them are returned borrowed and untouched
pub fn rewrite_entity_quirks(body: &[u8]) -> Cow<'_, [u8]> {
    let mut body = Cow::Borrowed(body);

    for (entity, replacement) in KNOWN_ENTITY_QUIRKS {
        if find(&body, entity.as_bytes()).is_some() {
            body = Cow::Owned(replace_all(&body, entity.as_bytes(), replacement.as_bytes()));
        }
    }

    body
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len() + replacement.len());
    let mut rest = haystack;

    while let Some(pos) = find(rest, needle) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(replacement);
        rest = &rest[pos + needle.len()..];
    }
    out.extend_from_slice(rest);

    out
}

/// Decodes `body` with the decoder of `generation`: XML (after the entity
/// quirk rewrite) for the legacy API, JSON for the current one
pub fn decode<T: DeserializeOwned>(generation: Generation, body: &[u8]) -> Result<T, DecodeError> {
    match generation {
        Generation::Legacy => {
            let body = rewrite_entity_quirks(body);

            Ok(quick_xml::de::from_reader(body.as_ref())?)
        }
        Generation::Current => Ok(serde_json::from_slice(body)?),
    }
}

pub(crate) fn snippet(body: &[u8]) -> String {
    String::from_utf8_lossy(&body[..body.len().min(SNIPPET_LEN)]).into_owned()
}

/// Legacy dates are sent as `mmddyyyy`
pub(crate) mod mmddyyyy {
    use chrono::NaiveDate;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%m%d%Y";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => s.collect_str(&date.format(FORMAT)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let value = String::deserialize(d)?;

        NaiveDate::parse_from_str(&value, FORMAT)
            .map(Some)
            .map_err(D::Error::custom)
    }
}

pub(crate) mod comma_separated {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &Option<Vec<String>>, s: S) -> Result<S::Ok, S::Error> {
        match values {
            Some(values) => s.serialize_str(&values.join(",")),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        let value = String::deserialize(d)?;

        Ok(Some(
            value
                .split(',')
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect(),
        ))
    }
}

/// Legacy flags are sent as `1`/`0`
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => s.serialize_u8(u8::from(*value)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Some(u8::deserialize(d)? != 0))
    }
}

/// Reads a legacy status string back into the variant of `all` whose
/// `as_str` matches it
pub(crate) fn deserialize_status<'de, D, T>(
    d: D,
    all: &[T],
    as_str: fn(&T) -> &'static str,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Copy,
{
    let value = String::deserialize(d)?;

    all.iter()
        .copied()
        .find(|status| as_str(status) == value)
        .ok_or_else(|| D::Error::custom(format!("unknown entry status {value:?}")))
}

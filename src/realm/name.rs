use std::fmt::Display;

use actix_web::http::header::HeaderValue;
use serde::Deserialize;

/// A struct that parses the human-readable name of a protection scope, and
/// enforces the constraints required to place it verbatim inside a
/// `WWW-Authenticate` challenge: reject empty names, enforce a maximum length,
/// reject double quotes and anything that is not visible ASCII (or a space).
///
/// Must be instantiated with `RealmName::parse` (or deserialized, which calls
/// `parse`). The fields are left private, so the challenge can never be built
/// from an unchecked name.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct RealmName {
    name: String,
    // built once at parse time; the name is substituted verbatim (no escaping)
    challenge: HeaderValue,
}

impl RealmName {
    pub fn parse(name: String) -> Result<Self, String> {
        let empty = name.trim().is_empty();
        let too_long = name.len() > 256;
        let bad = name.bytes().any(|b| b == b'"' || !(b == b' ' || b.is_ascii_graphic()));
        if empty || too_long || bad {
            return Err(format!("Invalid realm name: {name:?}"));
        }
        let challenge = HeaderValue::from_str(&format!(r#"Basic realm="{name}""#))
            .map_err(|e| format!("Invalid realm name: {name:?} ({e})"))?;
        Ok(Self { name, challenge })
    }

    /// The full `WWW-Authenticate` value, i.e. `Basic realm="<name>"`
    pub fn challenge(&self) -> &HeaderValue { &self.challenge }
}

impl TryFrom<String> for RealmName {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl AsRef<str> for RealmName {
    fn as_ref(&self) -> &str { &self.name }
}

impl Display for RealmName {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

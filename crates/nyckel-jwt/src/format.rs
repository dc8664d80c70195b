#![forbid(unsafe_code)]

//! JWS compact serialization (RFC 7515 §7.1) for JWTs.
//!
//! A token is `base64url(header) "." base64url(payload) "." base64url(signature)`
//! without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nyckel_core::Error;
use serde_json::{Map, Value};

/// An unsigned set of JWT claims plus an optional `typ` header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawJwt {
    type_header: Option<String>,
    claims: Map<String, Value>,
}

impl RawJwt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of claims.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::Encoding(format!("invalid JWT claims JSON: {e}")))?;
        match value {
            Value::Object(claims) => Ok(Self {
                type_header: None,
                claims,
            }),
            other => Err(Error::Encoding(format!(
                "JWT claims must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn with_type_header(mut self, typ: impl Into<String>) -> Self {
        self.type_header = Some(typ.into());
        self
    }

    pub fn with_issuer(self, iss: impl Into<String>) -> Self {
        self.with_claim("iss", Value::String(iss.into()))
    }

    pub fn with_subject(self, sub: impl Into<String>) -> Self {
        self.with_claim("sub", Value::String(sub.into()))
    }

    pub fn with_audience(self, aud: impl Into<String>) -> Self {
        self.with_claim("aud", Value::String(aud.into()))
    }

    pub fn with_jwt_id(self, jti: impl Into<String>) -> Self {
        self.with_claim("jti", Value::String(jti.into()))
    }

    /// Expiration time in seconds since the Unix epoch.
    pub fn with_expiration(self, exp: u64) -> Self {
        self.with_claim("exp", Value::from(exp))
    }

    pub fn with_issued_at(self, iat: u64) -> Self {
        self.with_claim("iat", Value::from(iat))
    }

    pub fn with_not_before(self, nbf: u64) -> Self {
        self.with_claim("nbf", Value::from(nbf))
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.claims.insert(name.into(), value);
        self
    }

    pub fn type_header(&self) -> Option<&str> {
        self.type_header.as_deref()
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    fn payload_json(&self) -> Result<String, Error> {
        serde_json::to_string(&self.claims)
            .map_err(|e| Error::Encoding(format!("cannot serialize JWT claims: {e}")))
    }
}

fn encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

fn decode(part: &str, what: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| Error::Encoding(format!("invalid base64url in JWT {what}: {e}")))
}

/// Build the JOSE header JSON.
pub fn create_header(algorithm: &str, type_header: Option<&str>, kid: Option<&str>) -> String {
    let mut header = Map::new();
    header.insert("alg".into(), Value::String(algorithm.into()));
    if let Some(typ) = type_header {
        header.insert("typ".into(), Value::String(typ.into()));
    }
    if let Some(kid) = kid {
        header.insert("kid".into(), Value::String(kid.into()));
    }
    Value::Object(header).to_string()
}

/// The signing input: `base64url(header) "." base64url(payload)`.
pub fn create_unsigned_compact(
    algorithm: &str,
    kid: Option<&str>,
    raw_jwt: &RawJwt,
) -> Result<String, Error> {
    let header = create_header(algorithm, raw_jwt.type_header(), kid);
    let payload = raw_jwt.payload_json()?;
    Ok(format!(
        "{}.{}",
        encode(header.as_bytes()),
        encode(payload.as_bytes())
    ))
}

/// Append the encoded signature to the signing input.
pub fn create_signed_compact(unsigned_compact: &str, signature: &[u8]) -> String {
    format!("{unsigned_compact}.{}", encode(signature))
}

/// Split a signed compact token into its signing input and raw signature.
pub fn split_signed_compact(compact: &str) -> Result<(&str, Vec<u8>), Error> {
    let (unsigned, signature) = compact
        .rsplit_once('.')
        .ok_or_else(|| Error::Encoding("JWT has no signature part".into()))?;
    if unsigned.matches('.').count() != 1 {
        return Err(Error::Encoding(
            "JWT compact serialization must have exactly three parts".into(),
        ));
    }
    Ok((unsigned, decode(signature, "signature")?))
}

fn decode_json_part(part: &str, what: &str) -> Result<Map<String, Value>, Error> {
    let bytes = decode(part, what)?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::Encoding(format!("JWT {what} is not a JSON object"))),
        Err(e) => Err(Error::Encoding(format!("invalid JSON in JWT {what}: {e}"))),
    }
}

/// Decode the JOSE header of a signing input or a signed token.
pub fn decode_header(compact: &str) -> Result<Map<String, Value>, Error> {
    let header = compact.split('.').next().unwrap_or_default();
    decode_json_part(header, "header")
}

/// Decode the claims of a signing input or a signed token.
pub fn decode_payload(compact: &str) -> Result<Map<String, Value>, Error> {
    let payload = compact
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::Encoding("JWT has no payload part".into()))?;
    decode_json_part(payload, "payload")
}

/// The `kid` header value for a keyset key id: base64url of its big-endian bytes.
pub fn kid_for_key_id(key_id: u32) -> String {
    encode(&key_id.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_compact_header_and_payload() {
        let raw = RawJwt::new().with_issuer("nyckel").with_expiration(1_700_000_000);
        let unsigned = create_unsigned_compact("RS256", Some("abc"), &raw).unwrap();

        let header = decode_header(&unsigned).unwrap();
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["kid"], "abc");
        assert!(!header.contains_key("typ"));

        let payload = decode_payload(&unsigned).unwrap();
        assert_eq!(payload["iss"], "nyckel");
        assert_eq!(payload["exp"], 1_700_000_000u64);
    }

    #[test]
    fn test_header_without_kid_has_type() {
        let raw = RawJwt::new().with_type_header("JWT");
        let unsigned = create_unsigned_compact("RS512", None, &raw).unwrap();
        let header = decode_header(&unsigned).unwrap();
        assert_eq!(header["typ"], "JWT");
        assert!(!header.contains_key("kid"));
    }

    #[test]
    fn test_signed_compact_split() {
        let signed = create_signed_compact("aGVhZA.Ym9keQ", &[1, 2, 3, 255]);
        assert_eq!(signed, "aGVhZA.Ym9keQ.AQID_w");
        let (unsigned, sig) = split_signed_compact(&signed).unwrap();
        assert_eq!(unsigned, "aGVhZA.Ym9keQ");
        assert_eq!(sig, vec![1, 2, 3, 255]);
    }

    #[test]
    fn test_split_rejects_wrong_part_count() {
        assert!(split_signed_compact("nodots").is_err());
        assert!(split_signed_compact("a.b").is_err());
        assert!(split_signed_compact("a.b.c.d").is_err());
    }

    #[test]
    fn test_claims_must_be_object() {
        assert!(RawJwt::from_json(r#"{"sub":"alice"}"#).is_ok());
        assert!(matches!(RawJwt::from_json("[1,2]"), Err(Error::Encoding(_))));
        assert!(matches!(RawJwt::from_json("{"), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_kid_for_key_id() {
        assert_eq!(kid_for_key_id(0x0102_0304), "AQIDBA");
    }
}

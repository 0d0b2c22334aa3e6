//! Purpose: Derive the tagging identity of a caller from their bearer token.
//! Exports: `identity_from_bearer`.
//! Role: Pure decode step used by the folder engine before every tag operation.
//! Invariants: Identity format is `user_{authns}_{user}`; both claims are required.
//! Invariants: Only the claims segment is read; a trailing signature segment may be absent.
//! Invariants: The token signature is NOT verified here. The tagging service only
//! accepts writes under the identity encoded in the token it authenticates, so a
//! forged claim yields rejected requests, never foreign data.
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde_json::Value;

use super::error::{Error, ErrorKind};

pub fn identity_from_bearer(token: Option<&str>) -> Result<String, Error> {
    let Some(token) = token.filter(|token| !token.trim().is_empty()) else {
        return Err(Error::new(ErrorKind::Configuration)
            .with_message("user folders must be invoked with a valid bearer token")
            .with_hint("Pass --token or set TAGFOLDERS_BEARER_TOKEN."));
    };

    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload)) = (segments.next(), segments.next()) else {
        return Err(invalid_token("bearer token has no claims segment"));
    };

    let bytes = decode_segment(payload)?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|err| {
        invalid_token("bearer token payload is not valid json").with_source(err)
    })?;
    if !claims.is_object() {
        return Err(invalid_token("bearer token payload is not a json object"));
    }

    let authns = claim(&claims, "authns")?;
    let user = claim(&claims, "user")?;
    Ok(format!("user_{authns}_{user}"))
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, Error> {
    // Tokens in the wild use either alphabet, with or without padding.
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|err| invalid_token("bearer token payload is not base64").with_source(err))
}

fn claim(claims: &Value, name: &str) -> Result<String, Error> {
    match claims.get(name) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        Some(Value::Number(value)) => Ok(value.to_string()),
        _ => Err(invalid_token(format!("bearer token is missing the `{name}` claim"))),
    }
}

fn invalid_token(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Configuration).with_message(message)
}

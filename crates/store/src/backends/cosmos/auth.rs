//! Master-key request signing.
//!
//! Every request carries `authorization: type=master&ver=1.0&sig=<sig>`
//! (URL-encoded), where `sig` is the base64 HMAC-SHA256 of
//! `verb\nresource_type\nresource_link\ndate\n\n` with verb, resource type
//! and date lowercased.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use ring::hmac;

use crate::error::{StoreError, StoreResult};

/// Resource type segment of the string to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceType {
    Databases,
    Containers,
    Documents,
}

impl ResourceType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ResourceType::Databases => "dbs",
            ResourceType::Containers => "colls",
            ResourceType::Documents => "docs",
        }
    }
}

/// Decoded account key, ready to sign requests.
pub(crate) struct MasterKey {
    key: hmac::Key,
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

impl MasterKey {
    pub(crate) fn from_base64(encoded: &str) -> StoreResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| StoreError::invalid_config(format!("master key is not base64: {e}")))?;
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, &bytes),
        })
    }

    /// Returns the URL-encoded authorization header value.
    pub(crate) fn authorization(
        &self,
        verb: &str,
        resource_type: ResourceType,
        resource_link: &str,
        date: &str,
    ) -> String {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.as_str(),
            resource_link,
            date.to_lowercase()
        );
        let tag = hmac::sign(&self.key, payload.as_bytes());
        let token = format!("type=master&ver=1.0&sig={}", STANDARD.encode(tag.as_ref()));
        url::form_urlencoded::byte_serialize(token.as_bytes()).collect()
    }
}

/// Formats a timestamp the way `x-ms-date` expects (RFC 1123, GMT).
pub(crate) fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DOC_KEY: &str =
        "dsZQi3KtZmCv1ljt3VNWNm7sQUF1y5rJfC6kv5JiwvW0EndXdDku/dkKBp8/ufDToSxLzR4y+O/0H/t4bQtVNw==";
    const DOC_DATE: &str = "Thu, 27 Apr 2017 00:51:12 GMT";

    #[test]
    fn test_signature_matches_published_vector() {
        let key = MasterKey::from_base64(DOC_KEY).unwrap();
        let header = key.authorization("GET", ResourceType::Databases, "dbs/ToDoList", DOC_DATE);
        assert_eq!(
            header,
            "type%3Dmaster%26ver%3D1.0%26sig%3Dc09PEVJrgp2uQRkr934kFbTqhByc7TVr3OHyqlu%2Bc%2Bc%3D"
        );
    }

    #[test]
    fn test_document_post_signature() {
        let key = MasterKey::from_base64(DOC_KEY).unwrap();
        let header = key.authorization(
            "POST",
            ResourceType::Documents,
            "dbs/Shipment/colls/Items",
            DOC_DATE,
        );
        assert_eq!(
            header,
            "type%3Dmaster%26ver%3D1.0%26sig%3DIbi5XvvOPzc9w5EN8rMiX0CG%2BivU1nMF1DxoLLq%2F5HU%3D"
        );
    }

    #[test]
    fn test_verb_changes_signature() {
        let key = MasterKey::from_base64(DOC_KEY).unwrap();
        let get = key.authorization("GET", ResourceType::Documents, "dbs/a/colls/b", DOC_DATE);
        let post = key.authorization("POST", ResourceType::Documents, "dbs/a/colls/b", DOC_DATE);
        assert_ne!(get, post);
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        assert!(MasterKey::from_base64("%%%").is_err());
    }

    #[test]
    fn test_http_date_format() {
        let at = Utc.with_ymd_and_hms(2017, 4, 27, 0, 51, 12).unwrap();
        assert_eq!(http_date(at), DOC_DATE);
    }
}

//! Cache key derivation.
//!
//! A key is `<selector>::<query>` where the selector is the entity id, or the
//! `<find>` wildcard for collection reads, and the query is the JSON text of
//! the call's query parameters.

use std::fmt;

use serde_json::Value;

use crate::pipeline::HookContext;

/// Selector used for calls without an id.
pub const WILDCARD: &str = "<find>";
/// Separates the selector from the serialized query.
pub const SEPARATOR: &str = "::";
/// Query text used when a call carries no query at all.
pub const ABSENT_QUERY: &str = "undefined";

/// How the query part of a key is serialized.
///
/// `AsReceived` keeps object keys in the order the caller supplied them, so
/// `{"a":1,"b":2}` and `{"b":2,"a":1}` address different entries.
/// `Canonical` sorts keys (RFC 8785) so both share one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryEncoding {
    #[default]
    AsReceived,
    Canonical,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request. Never fails.
    pub fn for_context(ctx: &HookContext, encoding: QueryEncoding) -> Self {
        let selector = ctx.id.as_ref().map_or(WILDCARD, |id| id.as_str());
        let query = encode_query(ctx.params.query.as_ref(), encoding);
        Self(format!("{selector}{SEPARATOR}{query}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id part of the key, or the wildcard.
    pub fn selector(&self) -> &str {
        selector_of(&self.0)
    }

    pub fn is_wildcard(&self) -> bool {
        self.selector() == WILDCARD
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Everything before the first separator; the whole key if there is none.
pub fn selector_of(raw: &str) -> &str {
    raw.split_once(SEPARATOR).map_or(raw, |(selector, _)| selector)
}

/// Whether a stored key is stale after a mutation of `mutated_id`.
pub fn is_affected_by(raw: &str, mutated_id: &str) -> bool {
    let selector = selector_of(raw);
    selector == WILDCARD || selector == mutated_id
}

fn encode_query(query: Option<&Value>, encoding: QueryEncoding) -> String {
    let Some(query) = query else {
        return ABSENT_QUERY.to_string();
    };
    match encoding {
        QueryEncoding::AsReceived => query.to_string(),
        // A `Value` has no non-finite numbers or non-string keys, so the
        // canonicalizer cannot reject it.
        QueryEncoding::Canonical => serde_json_canonicalizer::to_vec(query)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_else(|| query.to_string()),
    }
}

//! Trigger resolution: map inbound text to a stored command's reply.
//!
//! The lookup key is the leading token of the text (everything before the
//! first whitespace boundary). Matching is exact and case-sensitive; no
//! prefix or fuzzy matching, no argument parsing.

use crate::domain::DomainError;
use crate::ports::StorePort;
use std::sync::Arc;

/// Reply used when a matched command has no stored response text.
const DEFAULT_REPLY: &str = "Command received.";

/// Resolves inbound text against the command table.
pub struct TriggerResolver {
    store: Arc<dyn StorePort>,
}

impl TriggerResolver {
    pub fn new(store: Arc<dyn StorePort>) -> Self {
        Self { store }
    }

    /// Returns the reply text for a matching trigger, or None when the text
    /// is absent or no command matches. Absence of a match is the common
    /// case, not an error.
    pub async fn resolve(&self, text: Option<&str>) -> Result<Option<String>, DomainError> {
        let Some(text) = text else {
            return Ok(None);
        };
        let Some(token) = leading_token(text) else {
            return Ok(None);
        };
        match self.store.find_command_by_name(token).await? {
            Some(cmd) => Ok(Some(
                cmd.response.unwrap_or_else(|| DEFAULT_REPLY.to_string()),
            )),
            None => Ok(None),
        }
    }
}

/// Substring before the first whitespace boundary (the whole string when
/// there is none). No trimming: text starting with whitespace has an empty
/// leading token, which never matches.
fn leading_token(text: &str) -> Option<&str> {
    match text.split(char::is_whitespace).next() {
        Some(token) if !token.is_empty() => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::SqliteStore;

    async fn resolver_with(commands: &[(&str, Option<&str>)]) -> TriggerResolver {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        for (name, response) in commands {
            store.create_command(name, None, *response).await.unwrap();
        }
        TriggerResolver::new(store)
    }

    #[test]
    fn leading_token_splits_on_first_whitespace() {
        assert_eq!(leading_token("/start now"), Some("/start"));
        assert_eq!(leading_token("/start"), Some("/start"));
        assert_eq!(leading_token(""), None);
        assert_eq!(leading_token("   "), None);
        // Leading whitespace means the first token is empty: no key, no match.
        assert_eq!(leading_token("  /start now"), None);
    }

    #[tokio::test]
    async fn matches_leading_token_with_arguments() {
        let resolver = resolver_with(&[("/start", Some("hi"))]).await;
        let reply = resolver.resolve(Some("/start now")).await.unwrap();
        assert_eq!(reply.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn case_mismatch_yields_no_reply() {
        let resolver = resolver_with(&[("/start", Some("hi"))]).await;
        assert!(resolver.resolve(Some("/Start")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn leading_whitespace_yields_no_reply() {
        let resolver = resolver_with(&[("/start", Some("hi"))]).await;
        assert!(resolver.resolve(Some("  /start now")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unmatched_token_yields_no_reply() {
        let resolver = resolver_with(&[("/start", Some("hi"))]).await;
        assert!(resolver.resolve(Some("hello /start")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn absent_text_yields_no_reply() {
        let resolver = resolver_with(&[("/start", Some("hi"))]).await;
        assert!(resolver.resolve(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn null_response_falls_back_to_default_reply() {
        let resolver = resolver_with(&[("/ping", None)]).await;
        let reply = resolver.resolve(Some("/ping")).await.unwrap();
        assert_eq!(reply.as_deref(), Some(DEFAULT_REPLY));
    }
}

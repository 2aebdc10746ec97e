//! Sender identifier to display name resolution

use crate::error::Error;
use crate::platform::ContactDirectory;
use std::sync::Arc;

/// Strip everything but ASCII digits from a phone number or sender identifier
pub fn normalize_number(identifier: &str) -> String {
    identifier.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Best-effort contact name lookup.
///
/// Never fails: a blank identifier, a missing entry, a denied permission or a
/// directory error all resolve to the identifier itself.
#[derive(Clone)]
pub struct ContactResolver {
    directory: Arc<dyn ContactDirectory>,
}

impl ContactResolver {
    pub fn new(directory: Arc<dyn ContactDirectory>) -> Self {
        Self { directory }
    }

    pub fn resolve(&self, identifier: &str) -> String {
        if identifier.trim().is_empty() {
            return identifier.to_string();
        }

        match self.directory.display_name(identifier) {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            Ok(_) => identifier.to_string(),
            Err(Error::PermissionDenied(permission)) => {
                tracing::debug!(%permission, "Contact lookup not permitted");
                identifier.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Contact lookup failed");
                identifier.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::platform::Permission;
    use std::collections::HashMap;

    struct FakeDirectory {
        names: HashMap<String, String>,
        failure: Option<fn() -> Error>,
    }

    impl ContactDirectory for FakeDirectory {
        fn display_name(&self, identifier: &str) -> Result<Option<String>> {
            if let Some(make_err) = self.failure {
                return Err(make_err());
            }
            Ok(self.names.get(identifier).cloned())
        }
    }

    fn resolver(failure: Option<fn() -> Error>) -> ContactResolver {
        let mut names = HashMap::new();
        names.insert("+989121112233".to_string(), "Sara".to_string());
        names.insert("+1000".to_string(), "  ".to_string());
        ContactResolver::new(Arc::new(FakeDirectory { names, failure }))
    }

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("+98 (912) 111-2233"), "989121112233");
        assert_eq!(normalize_number("Irancell"), "");
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let r = resolver(None);
        assert_eq!(r.resolve("+989121112233"), "Sara");
        assert_eq!(r.resolve("+15550000"), "+15550000");
        assert_eq!(r.resolve("+1000"), "+1000");
        assert_eq!(r.resolve("   "), "   ");
        assert_eq!(r.resolve(""), "");
    }

    #[test]
    fn test_resolve_falls_back_on_errors() {
        let denied = resolver(Some(|| Error::PermissionDenied(Permission::ReadContacts)));
        assert_eq!(denied.resolve("+989121112233"), "+989121112233");

        let broken = resolver(Some(|| Error::Provider("cursor closed".to_string())));
        assert_eq!(broken.resolve("+989121112233"), "+989121112233");
    }
}

//! Key Vault item references

use url::Url;

const NESTED_ITEM_TYPES: &[&str] = &["keys", "secrets", "certificates"];

/// A key, secret or certificate inside a vault, e.g.
/// `https://vault1.vault.azure.net/keys/key1/0123abcd`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedItemId {
    pub vault_base_url: String,
    pub nested_item_type: String,
    pub name: String,
    pub version: Option<String>,
}

impl NestedItemId {
    pub fn parse(input: &str) -> Result<Self, String> {
        let url = Url::parse(input).map_err(|e| format!("parsing {:?}: {}", input, e))?;
        if url.scheme() != "https" {
            return Err(format!("expected an https URL but got {:?}", input));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| format!("{:?} has no vault host", input))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|part| !part.is_empty()).collect())
            .unwrap_or_default();
        let (nested_item_type, name, version) = match segments.as_slice() {
            [kind, name] => (*kind, *name, None),
            [kind, name, version] => (*kind, *name, Some(version.to_string())),
            _ => {
                return Err(format!(
                    "expected a path of the form /{{type}}/{{name}}[/{{version}}] in {:?}",
                    input
                ))
            }
        };
        if !NESTED_ITEM_TYPES.contains(&nested_item_type) {
            return Err(format!(
                "expected the item type to be one of {:?} but got {:?}",
                NESTED_ITEM_TYPES, nested_item_type
            ));
        }

        let vault_base_url = match url.port() {
            Some(port) => format!("https://{}:{}/", host, port),
            None => format!("https://{}/", host),
        };

        Ok(Self {
            vault_base_url,
            nested_item_type: nested_item_type.to_string(),
            name: name.to_string(),
            version,
        })
    }

    /// First label of the vault host
    pub fn vault_name(&self) -> &str {
        self.vault_base_url
            .trim_start_matches("https://")
            .split(['.', ':', '/'])
            .next()
            .unwrap_or_default()
    }
}

pub fn nested_item_id(value: &str, key: &str) -> Vec<String> {
    match NestedItemId::parse(value) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("{:?}: {}", key, e)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versioned_key() {
        let id = NestedItemId::parse("https://vault1.vault.azure.net/keys/key1/0123abcd").unwrap();
        assert_eq!(id.vault_base_url, "https://vault1.vault.azure.net/");
        assert_eq!(id.vault_name(), "vault1");
        assert_eq!(id.nested_item_type, "keys");
        assert_eq!(id.name, "key1");
        assert_eq!(id.version.as_deref(), Some("0123abcd"));
    }

    #[test]
    fn version_is_optional() {
        let id = NestedItemId::parse("https://vault1.vault.azure.net/keys/key1").unwrap();
        assert!(id.version.is_none());
    }

    #[test]
    fn rejects_malformed_references() {
        for input in [
            "",
            "vault1/keys/key1",
            "http://vault1.vault.azure.net/keys/key1/v1",
            "https://vault1.vault.azure.net/keys",
            "https://vault1.vault.azure.net/blobs/key1/v1",
            "https://vault1.vault.azure.net/keys/key1/v1/extra",
        ] {
            assert_eq!(nested_item_id(input, "key_vault_key_id").len(), 1, "{input:?}");
        }
    }
}

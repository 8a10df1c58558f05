use sha2::{Digest, Sha256};

use crate::types::RequestKey;

/// Digest of a stored body, `sha256:<hex>`.
pub(crate) fn body_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(bytes))
}

/// Directory name for an entry: hex SHA-256 of its key.
pub(crate) fn key_dir_name(key: &RequestKey) -> String {
    sha256_hex(key.as_str().as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn body_digest_is_prefixed_and_stable() {
        let digest = body_digest(b"hello");
        assert_eq!(
            digest,
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn key_dir_name_differs_by_query() {
        let a = RequestKey::from_url(&Url::parse("https://app.example/a.json").unwrap());
        let b = RequestKey::from_url(&Url::parse("https://app.example/a.json?v=2").unwrap());
        assert_ne!(key_dir_name(&a), key_dir_name(&b));
        assert_eq!(key_dir_name(&a).len(), 64);
    }
}

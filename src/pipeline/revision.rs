//! Content-hash filenames.

use crate::utils::hash::fingerprint;

/// Insert `-<hash>` before the last extension: `main.css` → `main-<hash>.css`.
pub fn revisioned_name(name: &str, hash: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], hash, &name[dot..]),
        _ => format!("{name}-{hash}"),
    }
}

/// Revisioned name for `bytes`.
pub fn revision(name: &str, bytes: &[u8]) -> String {
    revisioned_name(name, &fingerprint(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hash::FINGERPRINT_LEN;

    #[test]
    fn test_revisioned_name() {
        assert_eq!(revisioned_name("main.css", "0123abcd"), "main-0123abcd.css");
        assert_eq!(revisioned_name("jquery.min.js", "0123abcd"), "jquery.min-0123abcd.js");
        assert_eq!(revisioned_name("LICENSE", "0123abcd"), "LICENSE-0123abcd");
    }

    #[test]
    fn test_revision_hash_is_content_based() {
        let a = revision("main.css", b"body{color:red}");
        let b = revision("main.css", b"body{color:red}");
        let c = revision("main.css", b"body{color:blue}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), "main-.css".len() + FINGERPRINT_LEN);
    }
}

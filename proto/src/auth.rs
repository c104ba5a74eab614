//! Digests used by the auth handshake and account requests.

use md5::{Digest, Md5};

fn md5_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Response to an `<auth1/>` challenge: hex MD5 of nonce followed by password.
pub fn nonce_hash(nonce: &str, password: &str) -> String {
    md5_hex(&[nonce.as_bytes(), password.as_bytes()])
}

/// Account password digest: hex MD5 of password followed by the lowercased
/// email address.
pub fn passwd_hash(passwd: &str, email_addr: &str) -> String {
    md5_hex(&[passwd.as_bytes(), email_addr.to_lowercase().as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_hash_concatenates_before_hashing() {
        // MD5("abc")
        assert_eq!(nonce_hash("ab", "c"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(nonce_hash("", ""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn passwd_hash_lowercases_email() {
        assert_eq!(passwd_hash("a", "BC"), nonce_hash("a", "bc"));
    }
}

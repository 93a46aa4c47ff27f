//! Content hashing.
//!
//! Duplicate textures are grouped by a BLAKE3 hash of their encoded bytes,
//! so two textures are duplicates only when their files are byte-identical.
//! Re-encoding the same pixels differently produces distinct hashes.

use crate::scene::TextureRecord;

/// Computes the BLAKE3 hash of a byte slice.
///
/// # Returns
/// * A 64-character lowercase hexadecimal string
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hashes a texture's encoded bytes.
///
/// Returns `None` when the texture file cannot be read.
pub fn texture_hash(texture: &TextureRecord) -> Option<String> {
    let bytes = texture.read_bytes().ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(content_hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_hex() {
        let hash = content_hash(b"pinnacle");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, content_hash(b"pinnacle"));
        assert_ne!(hash, content_hash(b"pinnacle!"));
    }

    #[test]
    fn test_missing_texture_has_no_hash() {
        let texture = TextureRecord::from_file("/nonexistent/pinnacle/albedo.png");
        assert_eq!(texture_hash(&texture), None);
    }
}

//! Reversible byte-wise XOR masking.
//! Obfuscation only: anyone holding the image can undo it.

/// Masks `data` in place with `key`. Applying it twice restores the input.
pub fn apply_mask(data: &mut [u8], key: u8) {
    for byte in data.iter_mut() {
        *byte ^= key;
    }
}

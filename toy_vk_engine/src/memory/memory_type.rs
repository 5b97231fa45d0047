/// Memory type selection

use crate::error::Result;
use crate::graphics_device::{MemoryPropertyFlags, MemoryType};

/// First memory type allowed by `type_bits` whose flags contain `required`
///
/// `type_bits` is the requirement bitmask reported for a buffer or image
/// (bit `i` set means memory type `i` is usable). No match is a
/// `ResourceCreation` error.
pub fn find_memory_type(
    types: &[MemoryType],
    type_bits: u32,
    required: MemoryPropertyFlags,
) -> Result<u32> {
    let found = types
        .iter()
        .enumerate()
        .take(32)
        .find(|(i, t)| type_bits & (1 << i) != 0 && t.property_flags.contains(required));

    match found {
        Some((index, _)) => Ok(index as u32),
        None => crate::engine_bail!(
            "toyvk::memory",
            ResourceCreation,
            "No memory type with {:?} in type mask {:#b}",
            required,
            type_bits
        ),
    }
}

#[cfg(test)]
#[path = "memory_type_tests.rs"]
mod tests;

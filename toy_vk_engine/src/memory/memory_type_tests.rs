/// Unit tests for memory type selection

use crate::error::Error;
use crate::graphics_device::{MemoryPropertyFlags, MemoryType};
use crate::memory::memory_type::find_memory_type;

fn types() -> Vec<MemoryType> {
    vec![
        MemoryType { property_flags: MemoryPropertyFlags::DEVICE_LOCAL, heap_index: 0 },
        MemoryType {
            property_flags: MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
            heap_index: 1,
        },
        MemoryType {
            property_flags: MemoryPropertyFlags::DEVICE_LOCAL
                | MemoryPropertyFlags::HOST_VISIBLE
                | MemoryPropertyFlags::HOST_COHERENT,
            heap_index: 0,
        },
    ]
}

#[test]
fn test_first_matching_type_wins() {
    assert_eq!(find_memory_type(&types(), 0b111, MemoryPropertyFlags::DEVICE_LOCAL).unwrap(), 0);
    let host = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
    assert_eq!(find_memory_type(&types(), 0b111, host).unwrap(), 1);
}

#[test]
fn test_requirement_mask_is_honored() {
    // Type 0 is excluded by the mask, so the combined type is the only device-local candidate
    assert_eq!(find_memory_type(&types(), 0b110, MemoryPropertyFlags::DEVICE_LOCAL).unwrap(), 2);
}

#[test]
fn test_flags_must_be_superset() {
    let all = MemoryPropertyFlags::DEVICE_LOCAL | MemoryPropertyFlags::HOST_VISIBLE;
    assert_eq!(find_memory_type(&types(), 0b111, all).unwrap(), 2);
    assert_eq!(find_memory_type(&types(), 0b111, MemoryPropertyFlags::empty()).unwrap(), 0);
}

#[test]
fn test_every_selection_satisfies_both_conditions() {
    let wanted = [
        MemoryPropertyFlags::DEVICE_LOCAL,
        MemoryPropertyFlags::HOST_VISIBLE,
        MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
        MemoryPropertyFlags::DEVICE_LOCAL | MemoryPropertyFlags::HOST_COHERENT,
    ];
    let types = types();
    for mask in 0u32..8 {
        for required in wanted {
            if let Ok(index) = find_memory_type(&types, mask, required) {
                assert_ne!(mask & (1 << index), 0);
                assert!(types[index as usize].property_flags.contains(required));
            }
        }
    }
}

#[test]
fn test_no_match_is_error() {
    let result = find_memory_type(&types(), 0b001, MemoryPropertyFlags::HOST_VISIBLE);
    assert!(matches!(result, Err(Error::ResourceCreation(_))));

    let result = find_memory_type(&types(), 0, MemoryPropertyFlags::DEVICE_LOCAL);
    assert!(matches!(result, Err(Error::ResourceCreation(_))));

    let result = find_memory_type(&types(), 0b111, MemoryPropertyFlags::HOST_CACHED);
    assert!(matches!(result, Err(Error::ResourceCreation(_))));
}

/// Asset paths relative to the executable
///
/// The build script places `shaders/` and `resources/` next to the binary,
/// so the demo runs from any working directory.

use std::path::{Path, PathBuf};

use toy_vk_engine::engine_err;
use toy_vk_engine::toyvk::Result;

/// Directory containing the running executable
pub fn base_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| engine_err!("toyvk::demo", Io, "Cannot locate the executable: {}", e))?;
    match exe.parent() {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Err(engine_err!("toyvk::demo", Io, "Executable path '{}' has no parent", exe.display())),
    }
}

/// `relative` resolved against `base`; absolute paths are returned unchanged
pub fn resolve(base: &Path, relative: &str) -> PathBuf {
    base.join(relative)
}

/// Read a whole file, reporting failures as `Error::Io`
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| engine_err!("toyvk::demo", Io, "Failed to read '{}': {}", path.display(), e))
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;

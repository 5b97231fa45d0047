//! Places the shaders and demo assets next to the executable
//!
//! The runtime looks for `shaders/vert.spv`, `shaders/frag.spv` and
//! `resources/*` relative to the directory of the binary.

use color_eyre::eyre::{OptionExt, WrapErr};
use color_eyre::Result;
use std::{env, fs, path::Path, path::PathBuf};

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=shaders");
    println!("cargo:rerun-if-changed=resources");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    // OUT_DIR is <target>/<profile>/build/<package>-<hash>/out
    let profile_dir = out_dir
        .ancestors()
        .nth(3)
        .ok_or_eyre("OUT_DIR is not inside a target profile directory")?;

    let shaders_out_dir = profile_dir.join("shaders");
    fs::create_dir_all(&shaders_out_dir)?;
    build_shaders(&manifest_dir.join("shaders"), &shaders_out_dir)?;

    copy_resources(&manifest_dir.join("resources"), &profile_dir.join("resources"))?;
    Ok(())
}

/// Compile every GLSL stage: `shader.vert` becomes `vert.spv`, `shader.frag` becomes `frag.spv`
fn build_shaders(shaders_in_dir: &Path, shaders_out_dir: &Path) -> Result<()> {
    let compiler = shaderc::Compiler::new().ok_or_eyre("shaderc compiler is not available")?;
    let mut options = shaderc::CompileOptions::new().ok_or_eyre("shaderc options are not available")?;
    options.set_target_env(shaderc::TargetEnv::Vulkan, shaderc::EnvVersion::Vulkan1_0 as u32);

    for entry in fs::read_dir(shaders_in_dir)? {
        let path = entry?.path();
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        let kind = match ext {
            "vert" => shaderc::ShaderKind::Vertex,
            "frag" => shaderc::ShaderKind::Fragment,
            _ => continue,
        };

        let source = fs::read_to_string(&path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_eyre("Shader file name is not valid UTF-8")?;
        let artifact = compiler
            .compile_into_spirv(&source, kind, file_name, "main", Some(&options))
            .wrap_err_with(|| format!("Failed to compile {}", path.display()))?;

        fs::write(shaders_out_dir.join(format!("{}.spv", ext)), artifact.as_binary_u8())?;
    }
    Ok(())
}

fn copy_resources(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let path = entry?.path();
        if let Some(name) = path.file_name() {
            if path.is_file() {
                fs::copy(&path, to.join(name))?;
            }
        }
    }
    Ok(())
}

/// Wavefront OBJ loading and the built-in fallback cube
///
/// Loaded meshes are triangulated, single-indexed and deduplicated. Every
/// vertex gets an opaque white color so the texture shows unmodified, and
/// texture V is flipped from OBJ's bottom-up convention.

use std::io::BufRead;
use std::path::Path;

use rustc_hash::FxHashMap;
use toy_vk_engine::engine_err;
use toy_vk_engine::toyvk::resource::Vertex;
use toy_vk_engine::toyvk::Result;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Indexed triangle list ready for `Renderer::create_surface`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Load an OBJ file; materials are ignored
pub fn load_obj(path: &Path) -> Result<MeshData> {
    let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .map_err(|e| engine_err!("toyvk::demo", Io, "Failed to load model '{}': {}", path.display(), e))?;
    build_mesh(&models, &path.display().to_string())
}

/// Load OBJ text from any reader; `mtllib` statements are ignored
pub fn load_obj_from_reader<R: BufRead>(reader: &mut R) -> Result<MeshData> {
    let (models, _materials) = tobj::load_obj_buf(reader, &tobj::GPU_LOAD_OPTIONS, |_| Ok(Default::default()))
        .map_err(|e| engine_err!("toyvk::demo", Io, "Failed to parse OBJ data: {}", e))?;
    build_mesh(&models, "<buffer>")
}

fn build_mesh(models: &[tobj::Model], label: &str) -> Result<MeshData> {
    let mut mesh = MeshData::default();
    let mut unique: FxHashMap<[u32; 9], u32> = FxHashMap::default();

    for model in models {
        let source = &model.mesh;
        for &index in &source.indices {
            let i = index as usize;
            let pos = match source.positions.get(3 * i..3 * i + 3) {
                Some(p) => [p[0], p[1], p[2]],
                None => {
                    return Err(engine_err!(
                        "toyvk::demo",
                        Io,
                        "Model '{}' ({}): index {} has no position",
                        label,
                        model.name,
                        index
                    ))
                }
            };
            let uv = source
                .texcoords
                .get(2 * i..2 * i + 2)
                .map_or([0.0, 0.0], |t| [t[0], 1.0 - t[1]]);
            let vertex = Vertex::new(pos, WHITE, uv);

            let next = mesh.vertices.len() as u32;
            let slot = *unique.entry(bytemuck::cast(vertex)).or_insert(next);
            if slot == next {
                mesh.vertices.push(vertex);
            }
            mesh.indices.push(slot);
        }
    }

    if mesh.indices.is_empty() {
        return Err(engine_err!("toyvk::demo", Io, "Model '{}' contains no triangles", label));
    }
    Ok(mesh)
}

/// Unit cube centered on the origin, one texture per face
pub fn cube() -> MeshData {
    // (center, right, up) per face; corners wind counter-clockwise seen from outside
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 0.5], [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]),
        ([0.0, 0.0, -0.5], [-0.5, 0.0, 0.0], [0.0, 0.5, 0.0]),
        ([0.5, 0.0, 0.0], [0.0, 0.0, -0.5], [0.0, 0.5, 0.0]),
        ([-0.5, 0.0, 0.0], [0.0, 0.0, 0.5], [0.0, 0.5, 0.0]),
        ([0.0, 0.5, 0.0], [0.5, 0.0, 0.0], [0.0, 0.0, -0.5]),
        ([0.0, -0.5, 0.0], [0.5, 0.0, 0.0], [0.0, 0.0, 0.5]),
    ];
    const CORNERS: [([f32; 2], [f32; 2]); 4] = [
        ([-1.0, -1.0], [0.0, 1.0]),
        ([1.0, -1.0], [1.0, 1.0]),
        ([1.0, 1.0], [1.0, 0.0]),
        ([-1.0, 1.0], [0.0, 0.0]),
    ];

    let mut mesh = MeshData::default();
    for (center, right, up) in FACES {
        let base = mesh.vertices.len() as u32;
        for ([sx, sy], uv) in CORNERS {
            let pos = [
                center[0] + right[0] * sx + up[0] * sy,
                center[1] + right[1] * sx + up[1] * sy,
                center[2] + right[2] * sx + up[2] * sy,
            ];
            mesh.vertices.push(Vertex::new(pos, WHITE, uv));
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    mesh
}

/// RGBA8 checkerboard used when the model texture is missing
pub fn checkerboard(size: u32, cell: u32) -> Vec<u8> {
    let cell = cell.max(1);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = (x / cell + y / cell) % 2 == 0;
            rgba.extend_from_slice(if light { &[220, 220, 220, 255] } else { &[60, 60, 90, 255] });
        }
    }
    rgba
}

#[cfg(test)]
#[path = "mesh_loader_tests.rs"]
mod tests;

pub mod cache;
pub mod geometry;
pub mod handle;
pub mod shader;

pub use cache::AssetCache;
pub use geometry::{Geometry, Skin};
pub use handle::Handle;
pub use shader::Shader;

use crate::renderer::Material;

/// Everything a frame may reference by handle. Owned by the host; the render
/// core only reads from it.
pub struct Assets {
    pub geometries: AssetCache<Geometry>,
    pub materials: AssetCache<Material>,
    pub shaders: AssetCache<Shader>,
    pub skins: AssetCache<Skin>,
}

impl Assets {
    pub fn new() -> Self {
        Self {
            geometries: AssetCache::new(),
            materials: AssetCache::new(),
            shaders: AssetCache::new(),
            skins: AssetCache::new(),
        }
    }
}

impl Default for Assets {
    fn default() -> Self {
        Self::new()
    }
}

use crate::asset::{Assets, Geometry, Handle, Shader};
use crate::renderer::material::{Material, RenderPassKind, ShadingVariant, StateBucketId};
use crate::renderer::pool::{Pool, Poolable};
use crate::scene::Visual;
use crate::settings::PoolSettings;

/// Why a drawable contributed nothing to a bucket graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoGeometry,
    NoMaterial,
    NoShader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added,
    Skipped(SkipReason),
}

/// The parts of a drawable the bucket graph keys on.
#[derive(Clone, Copy)]
pub struct Renderable<'a> {
    pub geometry: Handle<Geometry>,
    pub material: &'a Material,
    pub shader: Handle<Shader>,
}

/// Resolves a drawable's geometry, material and shader. Any missing piece
/// means the drawable is not renderable yet.
pub fn resolve<'a>(visual: &Visual, assets: &'a Assets) -> Result<Renderable<'a>, SkipReason> {
    let geometry = visual
        .geometry
        .filter(|handle| assets.geometries.contains(*handle))
        .ok_or(SkipReason::NoGeometry)?;
    let material = visual
        .material
        .and_then(|handle| assets.materials.get(handle))
        .ok_or(SkipReason::NoMaterial)?;
    let shader = material
        .shader()
        .filter(|handle| assets.shaders.contains(*handle))
        .ok_or(SkipReason::NoShader)?;
    Ok(Renderable {
        geometry,
        material,
        shader,
    })
}

/// One logical pass: state buckets kept sorted by id.
#[derive(Default)]
pub struct PassBuckets {
    state_buckets: Vec<usize>,
}

impl Poolable for PassBuckets {
    fn reset(&mut self) {
        self.state_buckets.clear();
    }
}

pub struct StateBucket {
    id: StateBucketId,
    shaders: Vec<usize>,
}

impl Default for StateBucket {
    fn default() -> Self {
        Self {
            id: StateBucketId::default(),
            shaders: Vec::new(),
        }
    }
}

impl Poolable for StateBucket {
    fn reset(&mut self) {
        self.id = StateBucketId::default();
        self.shaders.clear();
    }
}

impl StateBucket {
    pub fn id(&self) -> StateBucketId {
        self.id
    }
}

pub struct ShaderBucket {
    shader: Handle<Shader>,
    variants: Vec<usize>,
}

impl Default for ShaderBucket {
    fn default() -> Self {
        Self {
            shader: Handle::new(0),
            variants: Vec::new(),
        }
    }
}

impl Poolable for ShaderBucket {
    fn reset(&mut self) {
        self.shader = Handle::new(0);
        self.variants.clear();
    }
}

impl ShaderBucket {
    pub fn shader(&self) -> Handle<Shader> {
        self.shader
    }
}

#[derive(Default)]
pub struct VariantBucket {
    variant: ShadingVariant,
    sources: Vec<usize>,
}

impl Poolable for VariantBucket {
    fn reset(&mut self) {
        self.variant = ShadingVariant::empty();
        self.sources.clear();
    }
}

impl VariantBucket {
    pub fn variant(&self) -> ShadingVariant {
        self.variant
    }
}

pub struct SourceBucket {
    source: Handle<Geometry>,
    drawables: Vec<usize>,
}

impl Default for SourceBucket {
    fn default() -> Self {
        Self {
            source: Handle::new(0),
            drawables: Vec::new(),
        }
    }
}

impl Poolable for SourceBucket {
    fn reset(&mut self) {
        self.source = Handle::new(0);
        self.drawables.clear();
    }
}

impl SourceBucket {
    pub fn source(&self) -> Handle<Geometry> {
        self.source
    }

    /// Indices into the frame's drawable list, in insertion order.
    pub fn drawables(&self) -> &[usize] {
        &self.drawables
    }
}

/// An opaque + transparent pair of bucket graphs allocated for one camera,
/// shadow pass or probe for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPassDefinition {
    opaque: usize,
    transparent: usize,
}

impl RenderPassDefinition {
    fn pass(&self, kind: RenderPassKind) -> usize {
        match kind {
            RenderPassKind::Opaque => self.opaque,
            RenderPassKind::Transparent => self.transparent,
        }
    }
}

/// Flattened key of one draw, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawKey {
    pub state_bucket: StateBucketId,
    pub shader: Handle<Shader>,
    pub variant: ShadingVariant,
    pub source: Handle<Geometry>,
    pub drawable: usize,
}

/// Arenas backing every bucket graph of a frame.
pub struct BucketPools {
    passes: Pool<PassBuckets>,
    states: Pool<StateBucket>,
    shaders: Pool<ShaderBucket>,
    variants: Pool<VariantBucket>,
    sources: Pool<SourceBucket>,
}

impl BucketPools {
    pub fn new(settings: &PoolSettings) -> Self {
        Self {
            passes: Pool::with_capacity("pass definition", settings.pass_definitions * 2),
            states: Pool::with_capacity("state bucket", settings.state_buckets),
            shaders: Pool::with_capacity("shader bucket", settings.shader_buckets),
            variants: Pool::with_capacity("variant bucket", settings.variant_buckets),
            sources: Pool::with_capacity("source bucket", settings.source_buckets),
        }
    }

    pub fn flush(&mut self) {
        self.passes.flush();
        self.states.flush();
        self.shaders.flush();
        self.variants.flush();
        self.sources.flush();
    }

    pub fn allocate_definition(&mut self) -> RenderPassDefinition {
        RenderPassDefinition {
            opaque: self.passes.acquire(),
            transparent: self.passes.acquire(),
        }
    }

    /// Inserts drawable `index` into `definition` under the material's pass,
    /// creating intermediate buckets on first use. Drawables that are not
    /// renderable yet are skipped.
    pub fn add_drawable(
        &mut self,
        definition: RenderPassDefinition,
        index: usize,
        visual: &Visual,
        assets: &Assets,
        variant: ShadingVariant,
    ) -> Insertion {
        match resolve(visual, assets) {
            Ok(renderable) => {
                self.insert(definition, index, &renderable, variant);
                Insertion::Added
            }
            Err(reason) => {
                log::debug!("Skipping drawable {}: {:?}", index, reason);
                Insertion::Skipped(reason)
            }
        }
    }

    pub(crate) fn insert(
        &mut self,
        definition: RenderPassDefinition,
        index: usize,
        renderable: &Renderable<'_>,
        variant: ShadingVariant,
    ) {
        let pass = definition.pass(renderable.material.render_pass());
        let state = self.state_bucket(pass, renderable.material.state_bucket_id());
        let shader = self.shader_bucket(state, renderable.shader);
        let variant = self.variant_bucket(shader, variant);
        let source = self.source_bucket(variant, renderable.geometry);
        self.sources.get_mut(source).drawables.push(index);
    }

    fn state_bucket(&mut self, pass: usize, id: StateBucketId) -> usize {
        let position = {
            let states = &self.states;
            self.passes
                .get(pass)
                .state_buckets
                .binary_search_by_key(&id, |&bucket| states.get(bucket).id)
        };
        match position {
            Ok(position) => self.passes.get(pass).state_buckets[position],
            Err(position) => {
                let bucket = self.states.acquire();
                self.states.get_mut(bucket).id = id;
                self.passes
                    .get_mut(pass)
                    .state_buckets
                    .insert(position, bucket);
                bucket
            }
        }
    }

    fn shader_bucket(&mut self, state: usize, shader: Handle<Shader>) -> usize {
        let existing = self
            .states
            .get(state)
            .shaders
            .iter()
            .copied()
            .find(|&bucket| self.shaders.get(bucket).shader == shader);
        existing.unwrap_or_else(|| {
            let bucket = self.shaders.acquire();
            self.shaders.get_mut(bucket).shader = shader;
            self.states.get_mut(state).shaders.push(bucket);
            bucket
        })
    }

    fn variant_bucket(&mut self, shader: usize, variant: ShadingVariant) -> usize {
        let existing = self
            .shaders
            .get(shader)
            .variants
            .iter()
            .copied()
            .find(|&bucket| self.variants.get(bucket).variant == variant);
        existing.unwrap_or_else(|| {
            let bucket = self.variants.acquire();
            self.variants.get_mut(bucket).variant = variant;
            self.shaders.get_mut(shader).variants.push(bucket);
            bucket
        })
    }

    fn source_bucket(&mut self, variant: usize, source: Handle<Geometry>) -> usize {
        let existing = self
            .variants
            .get(variant)
            .sources
            .iter()
            .copied()
            .find(|&bucket| self.sources.get(bucket).source == source);
        existing.unwrap_or_else(|| {
            let bucket = self.sources.acquire();
            self.sources.get_mut(bucket).source = source;
            self.variants.get_mut(variant).sources.push(bucket);
            bucket
        })
    }

    /// State buckets of one pass in ascending id order.
    pub fn state_buckets(
        &self,
        definition: RenderPassDefinition,
        kind: RenderPassKind,
    ) -> impl Iterator<Item = &StateBucket> + '_ {
        self.passes
            .get(definition.pass(kind))
            .state_buckets
            .iter()
            .map(|&bucket| self.states.get(bucket))
    }

    pub fn shader_buckets<'a>(
        &'a self,
        state: &'a StateBucket,
    ) -> impl Iterator<Item = &'a ShaderBucket> + 'a {
        state.shaders.iter().map(|&bucket| self.shaders.get(bucket))
    }

    pub fn variant_buckets<'a>(
        &'a self,
        shader: &'a ShaderBucket,
    ) -> impl Iterator<Item = &'a VariantBucket> + 'a {
        shader.variants.iter().map(|&bucket| self.variants.get(bucket))
    }

    pub fn source_buckets<'a>(
        &'a self,
        variant: &'a VariantBucket,
    ) -> impl Iterator<Item = &'a SourceBucket> + 'a {
        variant.sources.iter().map(|&bucket| self.sources.get(bucket))
    }

    pub fn is_empty(&self, definition: RenderPassDefinition) -> bool {
        RenderPassKind::ALL.iter().all(|&kind| {
            self.passes
                .get(definition.pass(kind))
                .state_buckets
                .is_empty()
        })
    }

    /// Every draw of one pass flattened in emission order.
    pub fn draw_list(&self, definition: RenderPassDefinition, kind: RenderPassKind) -> Vec<DrawKey> {
        let mut draws = Vec::new();
        for state in self.state_buckets(definition, kind) {
            for shader in self.shader_buckets(state) {
                for variant in self.variant_buckets(shader) {
                    for source in self.source_buckets(variant) {
                        draws.extend(source.drawables().iter().map(|&drawable| DrawKey {
                            state_bucket: state.id(),
                            shader: shader.shader(),
                            variant: variant.variant(),
                            source: source.source(),
                            drawable,
                        }));
                    }
                }
            }
        }
        draws
    }

    /// State buckets in use across every graph this frame.
    pub fn state_bucket_count(&self) -> usize {
        self.states.len()
    }

    pub fn growths(&self) -> usize {
        self.passes.growths()
            + self.states.growths()
            + self.shaders.growths()
            + self.variants.growths()
            + self.sources.growths()
    }
}

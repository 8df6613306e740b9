/// A shader program reference. Compilation and linking happen inside the GPU
/// backend; the render graph only uses the handle as a grouping key.
#[derive(Debug, Clone)]
pub struct Shader {
    name: String,
}

impl Shader {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

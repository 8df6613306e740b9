pub mod asset;
pub mod environment;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use environment::{Environment, Fog};
pub use renderer::{FrameInput, Renderer};
pub use settings::RenderSettings;

/// Installs `env_logger` with an `Info` default; `RUST_LOG` still overrides.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

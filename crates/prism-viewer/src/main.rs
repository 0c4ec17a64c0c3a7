use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use prism_engine::camera::CameraConfig;
use prism_engine::device::{GpuInit, WgpuBackend};
use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::render::{Renderer, RendererConfig, ShaderCode, UniformUpdate};
use prism_engine::rhi::{Device, DeviceDesc};
use prism_engine::runtime::{FrameLoop, LoopConfig, WindowConfig, WinitPlatform};

const DEFAULT_VERTEX_SHADER: &str = "shaders/triangle.vert.wgsl";
const DEFAULT_FRAGMENT_SHADER: &str = "shaders/triangle.frag.wgsl";

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(e) = run() {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let (vertex, fragment) = shader_paths(std::env::args().skip(1));
    let shaders = ShaderCode::load(&vertex, &fragment).context("failed to load shaders")?;

    let mut platform =
        WinitPlatform::new(WindowConfig::default()).context("failed to open the window")?;
    let window = platform
        .window()
        .context("window vanished right after creation")?;
    let backend = pollster::block_on(WgpuBackend::new(window, GpuInit::default()))
        .context("failed to initialize the GPU")?;
    let device = Device::new(backend, &DeviceDesc::default());

    let (width, height) = platform.window_size();
    let mut frame_loop = FrameLoop::new(
        LoopConfig::default(),
        &CameraConfig::default(),
        (width, height),
    );
    let config = RendererConfig {
        width,
        height,
        uniform_update: UniformUpdate::EveryFrame,
        ..Default::default()
    };
    let mut renderer = Renderer::new(device, &shaders, frame_loop.camera(), &config)
        .context("failed to set up the triangle")?;

    let frames = frame_loop
        .run(&mut platform, &mut renderer)
        .context("frame loop aborted")?;
    log::info!("closed after {frames} frames");
    Ok(())
}

/// `[vertex] [fragment]` from the command line, each falling back to the shipped
/// WGSL shader.
fn shader_paths(mut args: impl Iterator<Item = String>) -> (PathBuf, PathBuf) {
    let vertex = args.next().map(PathBuf::from);
    let fragment = args.next().map(PathBuf::from);
    (
        vertex.unwrap_or_else(|| bundled(DEFAULT_VERTEX_SHADER)),
        fragment.unwrap_or_else(|| bundled(DEFAULT_FRAGMENT_SHADER)),
    )
}

/// Looks next to the working directory first, then inside this crate.
fn bundled(relative: &str) -> PathBuf {
    let local = Path::new(relative);
    if local.exists() {
        return local.to_path_buf();
    }
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_win() {
        let args = ["a.spv", "b.spv"].map(String::from).into_iter();
        let (v, f) = shader_paths(args);
        assert_eq!(v, PathBuf::from("a.spv"));
        assert_eq!(f, PathBuf::from("b.spv"));
    }

    #[test]
    fn bundled_shaders_exist() {
        let (v, f) = shader_paths(std::iter::empty());
        assert!(v.ends_with("triangle.vert.wgsl"));
        assert!(v.exists(), "{}", v.display());
        assert!(f.exists(), "{}", f.display());
    }

    #[test]
    fn bundled_shaders_load() {
        let (v, f) = shader_paths(std::iter::empty());
        let code = ShaderCode::load(&v, &f).unwrap();
        assert!(!code.vertex.is_empty());
        assert!(!code.fragment.is_empty());
    }
}

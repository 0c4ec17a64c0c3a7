use super::{convert, SurfaceErrorAction};
use crate::rhi::TextureFormat;

/// Picks a swap-chain format the RHI can describe, sRGB first when `prefer_srgb`.
/// Returns the wgpu format together with its RHI counterpart.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<(wgpu::TextureFormat, TextureFormat)> {
    let mut supported = caps
        .formats
        .iter()
        .filter_map(|f| convert::rhi_texture_format(*f).map(|rhi| (*f, rhi)));

    if prefer_srgb {
        if let Some(found) = supported.clone().find(|(f, _)| f.is_srgb()) {
            return Some(found);
        }
    }
    supported.next()
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Falls back to FIFO, which every surface supports, when `requested` is unavailable.
pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    if caps.present_modes.contains(&requested) {
        requested
    } else {
        log::warn!("present mode {requested:?} unsupported, using Fifo");
        wgpu::PresentMode::Fifo
    }
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: &wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if config.width > 0 && config.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::Retry,
        wgpu::SurfaceError::Other => SurfaceErrorAction::Retry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: &[wgpu::TextureFormat]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    #[test]
    fn srgb_preferred_over_earlier_linear_format() {
        let caps = caps(&[
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        assert_eq!(
            choose_surface_format(&caps, true),
            Some((wgpu::TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8UnormSrgb))
        );
        assert_eq!(
            choose_surface_format(&caps, false),
            Some((wgpu::TextureFormat::Bgra8Unorm, TextureFormat::Bgra8Unorm))
        );
    }

    #[test]
    fn unmodelled_formats_are_skipped() {
        let caps = caps(&[wgpu::TextureFormat::Rgb10a2Unorm]);
        assert_eq!(choose_surface_format(&caps, true), None);
    }

    #[test]
    fn missing_present_mode_falls_back_to_fifo() {
        let caps = caps(&[wgpu::TextureFormat::Bgra8UnormSrgb]);
        assert_eq!(
            choose_present_mode(&caps, wgpu::PresentMode::Mailbox),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            choose_alpha_mode(&caps, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }
}

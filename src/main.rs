//! Headless demo: renders a test pattern through a pixelation and copy
//! chain and logs what came out the other end.
//!
//! Usage: `postfx [preset.toml]`

use std::path::Path;

use postfx::error::PostFxError;
use postfx::gpu::render_context::RenderContext;
use postfx::gpu::renderer::ScreenTarget;
use postfx::gpu::texture::{RenderTarget, RenderTargetOptions};
use postfx::options::Options;
use postfx::renderer::composer::Composer;
use postfx::renderer::material::OPACITY;
use postfx::renderer::postprocess::{CopyPass, Pass, PixelationPass};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    if let Err(e) = run(std::env::args().nth(1).as_deref()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(preset: Option<&str>) -> Result<(), PostFxError> {
    let options = match preset {
        Some(path) => {
            log::info!("loading options from {path}");
            Options::load(Path::new(path))?
        }
        None => Options::default(),
    };

    let context = pollster::block_on(RenderContext::new_headless())?;
    let mut composer = Composer::new(context.caps(), &options.composer)?;
    composer.set_size(WIDTH, HEIGHT);

    let mut pixelation = PixelationPass::new(options.pixelation.granularity);
    pixelation.set_enabled(options.pixelation.enabled);
    composer.add_pass(pixelation);

    let mut copy = CopyPass::new(None, options.copy.auto_resize);
    if let Some(material) = copy.fullscreen_material_mut() {
        material.set_uniform(OPACITY, options.copy.opacity);
    }
    composer.add_pass(copy);

    let pixel_type = options.composer.frame_buffer_type;
    let pattern = pixel_type.encode(&gradient_checkerboard(WIDTH, HEIGHT));
    composer.input_target_mut().write_pixels(&context, &pattern)?;

    let mut screen = RenderTarget::with_options(
        WIDTH,
        HEIGHT,
        RenderTargetOptions {
            pixel_type,
            depth_buffer: false,
            ..RenderTargetOptions::default()
        },
    );
    screen.prepare(&context.device);

    let mut encoder = context.create_encoder();
    if let Some(view) = ScreenTarget::from_render_target(&screen) {
        composer.render(&context, &mut encoder, view, 1.0 / 60.0)?;
    }
    context.submit(encoder);

    let pixels = screen.read_pixels_f32(&context)?;
    let texels = (pixels.len() / 4).max(1) as f32;
    let mut mean = [0.0_f32; 4];
    for texel in pixels.chunks_exact(4) {
        for (sum, channel) in mean.iter_mut().zip(texel) {
            *sum += channel / texels;
        }
    }
    log::info!(
        "rendered {WIDTH}x{HEIGHT} {pixel_type:?} frame through {} passes; \
         mean rgba = [{:.3}, {:.3}, {:.3}, {:.3}]",
        composer.passes().len(),
        mean[0],
        mean[1],
        mean[2],
        mean[3]
    );

    composer.dispose();
    Ok(())
}

/// 16-pixel checkerboard modulated by a horizontal and vertical gradient,
/// as RGBA `f32` channels.
fn gradient_checkerboard(width: u32, height: u32) -> Vec<f32> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| {
            let on = ((x / 16) + (y / 16)) % 2 == 0;
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            let base = if on { 1.0 } else { 0.25 };
            [base * u, base * v, base * (1.0 - u), 1.0]
        })
        .collect()
}

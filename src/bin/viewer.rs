//! Interactive viewer for the built-in demo map.
//!
//! ```bash
//! cargo run --release -- --width 800 --height 600
//! ```
//!
//! Arrows move and turn, Alt+←/→ (or Delete/End) strafe, PageUp/PageDown
//! fly.  Rendering happens in 32-bit colour straight into the window
//! buffer; the title shows a rolling average of the frame time.

use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::Parser;
use minifb::{Key, Window, WindowOptions};

use sectorcast::render::{Camera, Depth, RenderContext, Surface, TextureView, render_frame};
use sectorcast::world::demo;

#[derive(Parser, Debug)]
#[command(about = "sloped-sector software renderer demo")]
struct Args {
    #[arg(long, default_value_t = 800)]
    width: usize,

    #[arg(long, default_value_t = 600)]
    height: usize,

    /// Horizontal field of view in degrees.
    #[arg(long, default_value_t = 90.0)]
    fov: f32,

    /// Fade the demo sector into reddish fog.
    #[arg(long)]
    fog: bool,
}

/// Procedural 64×64 brick-ish texture; the renderer itself never decodes
/// image files.
fn make_texture() -> Vec<u32> {
    let mut texels = vec![0u32; 64 * 64];
    for u in 0..64usize {
        for v in 0..64usize {
            let mortar = v % 16 == 0 || (u + if v % 32 < 16 { 0 } else { 8 }) % 16 == 0;
            texels[u * 64 + v] = if mortar {
                0x00B0_B0A8
            } else {
                let shade = 0x70 + ((u * 13 + v * 7) % 0x28) as u32;
                (shade << 16) | (0x30 << 8) | 0x28
            };
        }
    }
    texels
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let fogged;
    let map = if args.fog {
        let mut m = demo::demo_map().clone();
        for sector in &mut m.sectors {
            sector.light.fog_start = 0.02;
            sector.light.fog_stop = 0.002;
            sector.light.fog_r = 90;
        }
        fogged = m;
        &fogged
    } else {
        demo::demo_map()
    };

    let camera = Camera::new(demo::SPAWN_POS, demo::SPAWN_ANGLE);
    let mut ctx = RenderContext::new(camera, args.width, args.height, args.fov);

    let texels = make_texture();
    let texture = TextureView::new(bytemuck::cast_slice(&texels[..]), 64, Depth::Argb8888)
        .context("texture setup")?;

    let mut frame = vec![0u32; args.width * args.height];

    let mut win = Window::new(
        "sectorcast",
        args.width,
        args.height,
        WindowOptions::default(),
    )?;

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_tick = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let dt = last_tick.elapsed().as_millis() as f32;
        last_tick = Instant::now();

        /* time-scaled camera controls ------------------------------------ */
        let alt = win.is_key_down(Key::LeftAlt) || win.is_key_down(Key::RightAlt);
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            ctx.camera.move_by(0.2 * dt);
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            ctx.camera.move_by(-0.2 * dt);
        }
        if win.is_key_down(Key::Left) {
            if alt {
                ctx.camera.strafe(-0.1 * dt);
            } else {
                ctx.camera.rotate(-0.002 * dt);
            }
        }
        if win.is_key_down(Key::Right) {
            if alt {
                ctx.camera.strafe(0.1 * dt);
            } else {
                ctx.camera.rotate(0.002 * dt);
            }
        }
        if win.is_key_down(Key::A) || win.is_key_down(Key::Delete) {
            ctx.camera.strafe(-0.1 * dt);
        }
        if win.is_key_down(Key::D) || win.is_key_down(Key::End) {
            ctx.camera.strafe(0.1 * dt);
        }
        if win.is_key_down(Key::PageUp) {
            ctx.camera.fly(0.1 * dt);
        }
        if win.is_key_down(Key::PageDown) {
            ctx.camera.fly(-0.1 * dt);
        }

        /* draw ------------------------------------------------------------ */
        let t0 = Instant::now();
        {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut frame[..]);
            let mut surface = Surface::new(bytes, args.width, args.height, 4)?;
            render_frame(&mut ctx, map, &mut surface, &texture)?;
        }
        acc_time += t0.elapsed();
        acc_frames += 1;

        win.update_with_buffer(&frame, args.width, args.height)?;

        // refresh the title every ~30 frames
        if acc_frames == 30 {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            win.set_title(&format!("sectorcast ({:.0} fps)", 1000.0 / avg_ms));
            log::info!("avg render: {:.2} ms ({:.1} fps)", avg_ms, 1000.0 / avg_ms);
            acc_time = Duration::ZERO;
            acc_frames = 0;
        }
    }
    Ok(())
}

//! sectorcast — a software perspective renderer for convex, possibly
//! sloped sectors, in the classic column-and-span style: vertical strips
//! for walls, horizontal spans for flats, 16.16 fixed-point stepping in
//! the inner loops and distance light with linear fog on top.
//!
//! The crate is the renderer only.  Windows, input, texture decoding and
//! map authoring belong to the caller; see `src/bin/viewer.rs` for a
//! minimal one.
//!
//! ```no_run
//! use sectorcast::render::{Camera, RenderContext, Surface, TextureView, Depth, render_frame};
//! use sectorcast::world::demo;
//!
//! let map = demo::demo_map();
//! let camera = Camera::new(demo::SPAWN_POS, demo::SPAWN_ANGLE);
//! let mut ctx = RenderContext::new(camera, 640, 400, 90.0);
//!
//! let mut frame = vec![0u32; 640 * 400];
//! let texels = vec![0x0060_6060u32; 64 * 64];
//! let mut surface =
//!     Surface::new(bytemuck::cast_slice_mut(&mut frame[..]), 640, 400, 4).unwrap();
//! let texture =
//!     TextureView::new(bytemuck::cast_slice(&texels[..]), 64, Depth::Argb8888).unwrap();
//! render_frame(&mut ctx, map, &mut surface, &texture).unwrap();
//! ```

pub mod render;
pub mod world;

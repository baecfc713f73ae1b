mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use common::{SharedDevice, fill, size};
use dpi::PhysicalSize;
use xian_gl_surface::headless::ObjectKind;
use xian_gl_surface::{
    AmbientState, Framebuffer, FramebufferRole, GlApi, GlError, SamplingParams, Surface,
    SurfaceKind,
};

fn color(gl: &dyn GlApi, size: PhysicalSize<u32>) -> Surface {
    Surface::create_texture(gl, glow::TEXTURE_2D, size, glow::RGBA8, SamplingParams::default())
        .unwrap()
}

fn depth(gl: &dyn GlApi, size: PhysicalSize<u32>) -> Surface {
    Surface::create_renderbuffer(gl, size, glow::DEPTH24_STENCIL8).unwrap()
}

fn framebuffer(gl: &dyn GlApi, size: PhysicalSize<u32>) -> Framebuffer {
    Framebuffer::create(gl, color(gl, size), depth(gl, size)).unwrap()
}

#[test]
fn texture_surfaces_restore_the_previous_binding() {
    let gpu = SharedDevice::new();
    let gl = &gpu.render;
    let bound = gl.create_texture().unwrap();
    gl.bind_texture(glow::TEXTURE_2D, bound);

    let surface = color(gl, size(4, 2));
    assert_eq!(surface.kind(), SurfaceKind::Texture { target: glow::TEXTURE_2D });
    assert_eq!(surface.size(), size(4, 2));
    assert_eq!(gpu.device.texture_size(surface.id()), Some(size(4, 2)));
    assert_eq!(gl.get_integer(glow::TEXTURE_BINDING_2D) as u32, bound);

    assert!(surface.destroy(gl));
    assert!(!surface.destroy(gl));
    assert!(matches!(surface.bind(gl), Err(GlError::Destroyed { .. })));
    gl.delete_texture(bound);
}

#[test]
fn unsupported_texture_targets_are_rejected() {
    let gpu = SharedDevice::new();
    for target in [glow::TEXTURE_3D, glow::TEXTURE_CUBE_MAP, 0x1234] {
        let result = Surface::create_texture(
            &gpu.render,
            target,
            size(4, 4),
            glow::RGBA8,
            SamplingParams::default(),
        );
        assert!(matches!(
            result,
            Err(GlError::UnsupportedTextureTarget { target: t }) if t == target
        ));
    }
    assert_eq!(gpu.device.created(ObjectKind::Texture), 0);
}

#[test]
fn mismatched_attachments_are_released() {
    let gpu = SharedDevice::new();
    let gl = &gpu.render;
    let result = Framebuffer::create(gl, color(gl, size(4, 4)), depth(gl, size(8, 8)));

    let err = result.unwrap_err();
    assert!(matches!(err, GlError::AttachmentSizeMismatch { .. }));
    assert!(err.to_string().contains("4x4"));
    assert_eq!(gpu.device.live(ObjectKind::Texture), 0);
    assert_eq!(gpu.device.live(ObjectKind::Renderbuffer), 0);
    assert_eq!(gpu.device.created(ObjectKind::Framebuffer), 0);
}

#[test]
fn framebuffer_creation_keeps_bindings() {
    let gpu = SharedDevice::new();
    let gl = &gpu.render;
    let outer = framebuffer(gl, size(2, 2));
    outer.bind(gl).unwrap();

    let inner = framebuffer(gl, size(3, 3));
    assert_eq!(gl.get_integer(glow::DRAW_FRAMEBUFFER_BINDING) as u32, outer.id());
    assert_eq!(gl.get_integer(glow::READ_FRAMEBUFFER_BINDING) as u32, outer.id());

    outer.unbind(gl);
    inner.destroy(gl);
    outer.destroy(gl);
}

#[test]
fn concurrent_destroy_deletes_once() {
    let gpu = Arc::new(SharedDevice::new());
    let framebuffer = Arc::new(framebuffer(&gpu.render, size(4, 4)));
    let wins = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let (gpu, framebuffer, wins) = (gpu.clone(), framebuffer.clone(), wins.clone());
            thread::spawn(move || {
                let gl = if i % 2 == 0 { &gpu.render } else { &gpu.display };
                if framebuffer.destroy(gl) {
                    wins.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(wins.load(Ordering::Relaxed), 1);
    assert!(framebuffer.is_destroyed());
    for kind in [
        ObjectKind::Framebuffer,
        ObjectKind::Texture,
        ObjectKind::Renderbuffer,
    ] {
        assert_eq!(gpu.device.deleted(kind), 1, "{kind:?}");
    }
}

#[test]
fn leases_are_exclusive() {
    let gpu = SharedDevice::new();
    let framebuffer = framebuffer(&gpu.render, size(4, 4));

    {
        let _render = framebuffer.lease(FramebufferRole::Render).unwrap();
        assert_eq!(framebuffer.leased_by(), Some(FramebufferRole::Render));
        let err = framebuffer.lease(FramebufferRole::Display).unwrap_err();
        assert!(matches!(
            err,
            GlError::FramebufferInUse {
                held_by: "render",
                ..
            }
        ));
    }
    assert_eq!(framebuffer.leased_by(), None);
    let _display = framebuffer.lease(FramebufferRole::Display).unwrap();
    assert_eq!(framebuffer.leased_by(), Some(FramebufferRole::Display));
    drop(_display);
    framebuffer.destroy(&gpu.render);
}

#[test]
fn snapshot_reads_back_the_color_attachment() {
    let gpu = SharedDevice::new();
    let framebuffer = framebuffer(&gpu.render, size(3, 2));
    framebuffer.bind(&gpu.render).unwrap();
    fill(&gpu.render, 51);
    framebuffer.unbind(&gpu.render);

    let pixels = framebuffer.snapshot(&gpu.display).unwrap();
    assert_eq!(pixels.len(), 3 * 2 * 4);
    assert!(pixels.chunks_exact(4).all(|p| p == [51, 0, 0, 255]));
    assert_eq!(gpu.display.get_integer(glow::READ_FRAMEBUFFER_BINDING), 0);

    framebuffer.destroy(&gpu.render);
    assert!(matches!(
        framebuffer.snapshot(&gpu.display),
        Err(GlError::Destroyed { .. })
    ));
}

#[test]
fn ambient_state_is_restored_on_drop() {
    let gpu = SharedDevice::new();
    let gl = &gpu.render;
    let framebuffer = framebuffer(gl, size(4, 4));
    gl.viewport(0, 0, 640, 480);
    gl.set_enabled(glow::DEPTH_TEST, true);

    {
        let _ambient = AmbientState::capture(gl);
        framebuffer.bind(gl).unwrap();
        gl.set_enabled(glow::DEPTH_TEST, false);
        gl.scissor(1, 1, 1, 1);
    }

    let mut viewport = [0; 4];
    gl.get_integer_v(glow::VIEWPORT, &mut viewport);
    assert_eq!(viewport, [0, 0, 640, 480]);
    assert!(gl.is_enabled(glow::DEPTH_TEST));
    assert_eq!(gl.get_integer(glow::DRAW_FRAMEBUFFER_BINDING), 0);
    let mut scissor = [0; 4];
    gl.get_integer_v(glow::SCISSOR_BOX, &mut scissor);
    assert_eq!(scissor, [0, 0, 0, 0]);
    framebuffer.destroy(gl);
}

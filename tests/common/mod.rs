#![allow(dead_code)]

use std::sync::Arc;

use dpi::PhysicalSize;
use xian_gl_surface::headless::{HeadlessBackend, HeadlessContext, HeadlessDevice, HeadlessGl};
use xian_gl_surface::{ContextProvider, DrawError, Framebuffer, GlApi, GlContext, PoolError};

pub type Provider = Arc<ContextProvider<HeadlessBackend>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn size(width: u32, height: u32) -> PhysicalSize<u32> {
    PhysicalSize::new(width, height)
}

/// A host toolkit with one root context, wrapped the way an embedder would.
pub struct Host {
    pub backend: HeadlessBackend,
    pub provider: Provider,
    pub root: HeadlessContext,
    pub context: GlContext<HeadlessBackend>,
}

impl Host {
    pub fn new() -> Self {
        init_logging();
        let backend = HeadlessBackend::new();
        let provider = ContextProvider::new(backend.clone());
        let root = backend.create_root();
        let context = provider.wrap_host(root).unwrap();
        Self {
            backend,
            provider,
            root,
            context,
        }
    }

    pub fn device(&self) -> Arc<HeadlessDevice> {
        self.backend.device(self.root).unwrap()
    }
}

/// Two software contexts sharing one device, standing in for a render and a display context.
pub struct SharedDevice {
    pub device: Arc<HeadlessDevice>,
    pub render: HeadlessGl,
    pub display: HeadlessGl,
}

impl SharedDevice {
    pub fn new() -> Self {
        init_logging();
        let device = Arc::new(HeadlessDevice::new());
        Self {
            render: HeadlessGl::new(device.clone()),
            display: HeadlessGl::new(device.clone()),
            device,
        }
    }
}

/// Fills `framebuffer` with a color whose red channel is `tag`.
pub fn paint(gl: &dyn GlApi, framebuffer: &Framebuffer, tag: u8) -> Result<(), PoolError> {
    framebuffer.bind(gl)?;
    fill(gl, tag);
    framebuffer.unbind(gl);
    Ok(())
}

/// Clears the bound draw framebuffer so its red channel reads back as `tag`.
pub fn fill(gl: &dyn GlApi, tag: u8) {
    gl.clear_color(f32::from(tag) / 255.0, 0.0, 0.0, 1.0);
    gl.clear(glow::COLOR_BUFFER_BIT);
}

/// Red channel of the first pixel, i.e. the tag written by [`paint`] or [`fill`].
pub fn read_tag(gl: &dyn GlApi, framebuffer: &Framebuffer) -> u8 {
    framebuffer.read_pixels(gl, 0, 0, 1, 1).unwrap()[0]
}

pub fn draw_error(message: &str) -> DrawError {
    message.to_string().into()
}

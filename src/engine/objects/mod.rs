//! ### English
//! GPU object model: attachments ([`Surface`]) and the render targets composed from them
//! ([`Framebuffer`]).
//!
//! ### 中文
//! GPU 对象模型：附件（[`Surface`]）以及由其组合而成的渲染目标（[`Framebuffer`]）。

mod destroy;
mod framebuffer;
mod surface;

pub use destroy::DestroyFlag;
pub use framebuffer::{Framebuffer, FramebufferLease, FramebufferRole};
pub use surface::{Surface, SurfaceKind, texture_binding_for};

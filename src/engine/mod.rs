/// ### English
/// Engine internal modules (GL objects, contexts, swap chains, pool, and render loop).
///
/// ### 中文
/// 引擎内部模块（GL 对象、上下文、交换链、池与渲染循环）。
pub mod config;
pub mod context;
pub mod error;
pub mod gl;
#[cfg(feature = "headless")]
pub mod headless;
pub mod objects;
pub mod pool;
pub mod size;
pub mod surface;
pub mod swap_chain;

mod common;

use std::time::Duration;

use common::{Host, draw_error, fill, read_tag, size};
use xian_gl_surface::headless::{HeadlessBackend, ObjectKind};
use xian_gl_surface::{
    DEFAULT_REDRAW_AFTER, FramebufferPool, GlApi, GlError, PoolError, PresentMode, Redraw,
    RenderOutcome, SwapChainConfig,
};

fn pool(host: &Host, mode: PresentMode, capacity: usize) -> FramebufferPool<HeadlessBackend> {
    host.context.make_current().unwrap();
    let render = host.context.derive_offscreen().unwrap();
    let display = host.context.share().unwrap();
    FramebufferPool::new(
        render,
        display,
        size(100, 100),
        &SwapChainConfig::new(mode, capacity),
    )
    .unwrap()
}

fn render_tag(pool: &FramebufferPool<HeadlessBackend>, tag: u8) -> RenderOutcome {
    pool.render(Duration::ZERO, |scope| {
        fill(scope.gl(), tag);
        Ok(())
    })
    .unwrap()
}

fn display_tag(pool: &FramebufferPool<HeadlessBackend>) -> Option<u8> {
    pool.display(|scope| read_tag(scope.gl(), scope.framebuffer()))
        .unwrap()
}

#[test]
fn mailbox_pool_presents_the_most_recent_frame() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Mailbox, 4);
    pool.initialize().unwrap();

    for tag in 1..=3 {
        assert!(matches!(render_tag(&pool, tag), RenderOutcome::Rendered(_)));
    }
    assert_eq!(display_tag(&pool), Some(3));
}

#[test]
fn fifo_pool_presents_frames_in_render_order() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Fifo, 3);
    pool.initialize().unwrap();

    for tag in 1..=3 {
        assert!(matches!(render_tag(&pool, tag), RenderOutcome::Rendered(_)));
    }
    let shown: Vec<_> = (0..3).map(|_| display_tag(&pool)).collect();
    assert_eq!(shown, vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn lifecycle_is_enforced() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Fifo, 2);

    assert!(matches!(
        pool.render(Duration::ZERO, |_| Ok(())),
        Err(PoolError::NotInitialized)
    ));
    assert!(matches!(pool.display(|_| ()), Err(PoolError::NotInitialized)));

    pool.initialize().unwrap();
    pool.initialize().unwrap();
    assert!(pool.is_initialized());
    assert_eq!(display_tag(&pool), None);

    pool.destroy().unwrap();
    pool.destroy().unwrap();
    assert!(pool.is_destroyed());
    assert!(matches!(
        pool.render(Duration::ZERO, |_| Ok(())),
        Err(PoolError::Destroyed)
    ));
    assert!(matches!(pool.initialize(), Err(PoolError::Destroyed)));

    let device = host.device();
    for kind in [
        ObjectKind::Framebuffer,
        ObjectKind::Texture,
        ObjectKind::Renderbuffer,
    ] {
        assert_eq!(device.live(kind), 0);
        assert_eq!(device.deleted(kind), device.created(kind));
    }
}

#[test]
fn calls_restore_the_callers_context() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Mailbox, 2);

    pool.initialize().unwrap();
    assert_eq!(host.provider.current_handle(), Some(host.root));
    render_tag(&pool, 1);
    assert_eq!(host.provider.current_handle(), Some(host.root));

    host.context.release_current().unwrap();
    render_tag(&pool, 2);
    assert_eq!(host.provider.current_handle(), None);
    assert_eq!(display_tag(&pool), Some(2));
    assert_eq!(host.provider.current_handle(), None);
}

#[test]
fn render_preserves_ambient_gl_state() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Fifo, 2);
    pool.initialize().unwrap();

    let gl = pool.render_context().shared_gl();
    gl.viewport(1, 2, 3, 4);
    gl.set_enabled(glow::SCISSOR_TEST, true);

    pool.render(Duration::ZERO, |scope| {
        let mut viewport = [0; 4];
        scope.gl().get_integer_v(glow::VIEWPORT, &mut viewport);
        assert_eq!(viewport, [0, 0, 100, 100]);
        scope.gl().set_enabled(glow::SCISSOR_TEST, false);
        Ok(())
    })
    .unwrap();

    let mut viewport = [0; 4];
    gl.get_integer_v(glow::VIEWPORT, &mut viewport);
    assert_eq!(viewport, [1, 2, 3, 4]);
    assert!(gl.is_enabled(glow::SCISSOR_TEST));
    assert_eq!(gl.get_integer(glow::DRAW_FRAMEBUFFER_BINDING), 0);
}

#[test]
fn render_waits_for_the_gpu_once_per_frame() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Mailbox, 2);
    pool.initialize().unwrap();

    let render_gl = host
        .backend
        .gl(pool.render_context().handle())
        .unwrap();
    let before = render_gl.flushes();
    render_tag(&pool, 1);
    render_tag(&pool, 2);
    assert_eq!(render_gl.flushes() - before, 2);
}

#[test]
fn draw_scope_controls_the_next_frame() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Mailbox, 2);
    pool.initialize().unwrap();

    let outcome = pool
        .render(Duration::from_millis(7), |scope| {
            assert_eq!(scope.delta_time(), Duration::from_millis(7));
            assert_eq!(scope.size(), size(100, 100));
            Ok(())
        })
        .unwrap();
    assert_eq!(outcome, RenderOutcome::Rendered(Redraw::After(DEFAULT_REDRAW_AFTER)));

    let outcome = pool
        .render(Duration::ZERO, |scope| {
            scope.redraw_after(Some(Duration::from_millis(5)));
            Ok(())
        })
        .unwrap();
    assert_eq!(outcome, RenderOutcome::Rendered(Redraw::After(Duration::from_millis(5))));

    let outcome = pool
        .render(Duration::ZERO, |scope| {
            scope.redraw_after(None);
            Ok(())
        })
        .unwrap();
    assert_eq!(outcome, RenderOutcome::Rendered(Redraw::OnRequest));

    let outcome = pool
        .render(Duration::ZERO, |scope| {
            scope.terminate();
            Ok(())
        })
        .unwrap();
    assert_eq!(outcome, RenderOutcome::Terminated);
}

#[test]
fn default_redraw_is_configurable() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Fifo, 2).with_default_redraw(Duration::from_millis(20));
    pool.initialize().unwrap();

    assert_eq!(
        render_tag(&pool, 1),
        RenderOutcome::Rendered(Redraw::After(Duration::from_millis(20)))
    );
}

#[test]
fn failed_draw_does_not_leak_a_framebuffer() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Fifo, 2);
    pool.initialize().unwrap();

    let err = pool
        .render(Duration::ZERO, |_| Err(draw_error("boom")))
        .unwrap_err();
    assert!(matches!(err, PoolError::Draw(_)));
    assert!(err.to_string().contains("boom"));
    assert_eq!(pool.swap_chain().held_framebuffers(), 2);

    assert!(matches!(render_tag(&pool, 1), RenderOutcome::Rendered(_)));
    assert_eq!(display_tag(&pool), Some(1));
}

#[test]
fn resize_applies_on_the_next_render() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Mailbox, 2);
    pool.initialize().unwrap();
    render_tag(&pool, 1);

    assert!(!pool.resize(size(0, 0)));
    assert!(!pool.resize(size(100, 100)));
    assert_eq!(pool.size(), size(100, 100));

    assert!(pool.resize(size(64, 32)));
    assert_eq!(pool.swap_chain().size(), size(100, 100));

    let drawn = pool
        .render(Duration::ZERO, |scope| {
            assert_eq!(scope.size(), size(64, 32));
            Ok(())
        })
        .unwrap();
    assert!(matches!(drawn, RenderOutcome::Rendered(_)));
    assert_eq!(pool.display(|scope| scope.size()).unwrap(), Some(size(64, 32)));
    assert_eq!(
        host.device().live(ObjectKind::Framebuffer),
        pool.swap_chain().held_framebuffers()
    );
}

#[test]
fn incomplete_framebuffer_fails_initialization_cleanly() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Fifo, 2);
    let device = host.device();
    device.force_framebuffer_status(Some(glow::FRAMEBUFFER_UNSUPPORTED));

    let err = pool.initialize().unwrap_err();
    assert!(matches!(
        err,
        PoolError::Gl(GlError::IncompleteFramebuffer {
            status: glow::FRAMEBUFFER_UNSUPPORTED
        })
    ));
    assert!(err.to_string().contains("0x8CDD"));
    assert!(!pool.is_initialized());
    for kind in [
        ObjectKind::Framebuffer,
        ObjectKind::Texture,
        ObjectKind::Renderbuffer,
    ] {
        assert_eq!(device.live(kind), 0, "{kind:?} leaked");
    }

    device.force_framebuffer_status(None);
    pool.initialize().unwrap();
    assert_eq!(pool.swap_chain().held_framebuffers(), 2);
}

#[test]
fn allocation_failure_is_reported() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Mailbox, 2);
    let device = host.device();
    device.fail_allocations(true);

    assert!(matches!(pool.initialize(), Err(PoolError::Gl(_))));
    assert_eq!(device.live(ObjectKind::Texture), 0);
    assert_eq!(device.live(ObjectKind::Renderbuffer), 0);
}

#[test]
fn dropping_the_pool_releases_everything() {
    let host = Host::new();
    let pool = pool(&host, PresentMode::Fifo, 3);
    pool.initialize().unwrap();
    render_tag(&pool, 1);
    let _ = display_tag(&pool);

    let render_handle = pool.render_context().handle();
    assert!(host.backend.is_alive(render_handle));
    drop(pool);

    assert!(!host.backend.is_alive(render_handle));
    assert!(host.backend.is_alive(host.root));
    assert_eq!(host.device().live(ObjectKind::Framebuffer), 0);
    assert_eq!(host.provider.ref_count(host.root), 1);
}

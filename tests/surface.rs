mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use common::{Host, draw_error, fill, read_tag, size};
use dpi::PhysicalSize;
use xian_gl_surface::headless::{HeadlessBackend, ObjectKind};
use xian_gl_surface::{GlSurface, PoolError, PresentMode, SurfaceConfig, SwapChainConfig};

fn config(mode: PresentMode, initial_size: PhysicalSize<u32>) -> SurfaceConfig {
    SurfaceConfig {
        swap_chain: SwapChainConfig::new(mode, 3),
        initial_size,
        default_frame_interval: Duration::from_millis(1),
        ..SurfaceConfig::default()
    }
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn displayed_size(surface: &GlSurface<HeadlessBackend>) -> Option<PhysicalSize<u32>> {
    surface.display(|scope| scope.size()).unwrap()
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    (counter.clone(), counter)
}

#[test]
fn surface_renders_and_presents_frames() {
    let host = Host::new();
    host.context.make_current().unwrap();
    let (cleanups, cleanup_seen) = counter();
    let frames = Arc::new(AtomicUsize::new(0));

    let surface = {
        let frames = frames.clone();
        GlSurface::launch(
            host.context.share().unwrap(),
            config(PresentMode::Mailbox, size(32, 32)),
            move |scope| {
                let frame = frames.fetch_add(1, Ordering::Relaxed);
                fill(scope.gl(), (frame % 255 + 1) as u8);
                Ok(())
            },
            move || {
                cleanups.fetch_add(1, Ordering::Relaxed);
            },
        )
        .unwrap()
    };

    wait_until("first frame", || displayed_size(&surface).is_some());
    assert!(surface.is_rendering());
    assert_eq!(displayed_size(&surface), Some(size(32, 32)));
    let shown = surface
        .display(|scope| read_tag(scope.gl(), scope.framebuffer()))
        .unwrap();
    assert!(shown.is_some_and(|tag| tag > 0));
    assert!(frames.load(Ordering::Relaxed) > 0);
    assert_eq!(host.provider.current_handle(), Some(host.root));

    surface.interrupt();
    surface.join().unwrap();
    assert!(surface.is_finished());
    assert!(!surface.is_rendering());
    assert_eq!(displayed_size(&surface), None);
    assert_eq!(cleanup_seen.load(Ordering::Relaxed), 1);
    assert_eq!(host.backend.offscreen_created(), 1);
    assert_eq!(host.backend.destroyed_contexts(), 1);
    assert_eq!(host.device().live(ObjectKind::Framebuffer), 0);
    assert!(host.backend.is_alive(host.root));
}

#[test]
fn render_thread_waits_for_a_non_empty_size() {
    let host = Host::new();
    let (frames, frames_seen) = counter();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Fifo, size(0, 0)),
        move |_| {
            frames.fetch_add(1, Ordering::Relaxed);
            Ok(())
        },
        || {},
    )
    .unwrap();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(frames_seen.load(Ordering::Relaxed), 0);
    assert!(!surface.is_rendering());
    assert_eq!(host.backend.offscreen_created(), 0);

    surface.resize(size(16, 16));
    wait_until("first frame", || frames_seen.load(Ordering::Relaxed) > 0);
    wait_until("display", || displayed_size(&surface) == Some(size(16, 16)));
}

#[test]
fn interrupt_before_sizing_exits_cleanly() {
    let host = Host::new();
    let (cleanups, cleanup_seen) = counter();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Mailbox, size(0, 0)),
        |_| Ok(()),
        move || {
            cleanups.fetch_add(1, Ordering::Relaxed);
        },
    )
    .unwrap();

    surface.interrupt();
    surface.join().unwrap();
    surface.join().unwrap();
    assert_eq!(cleanup_seen.load(Ordering::Relaxed), 1);
    assert_eq!(host.backend.offscreen_created(), 0);
    assert_eq!(host.provider.ref_count(host.root), 1);
}

#[test]
fn draw_callback_can_terminate_the_loop() {
    let host = Host::new();
    let (frames, frames_seen) = counter();
    let (cleanups, cleanup_seen) = counter();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Fifo, size(8, 8)),
        move |scope| {
            if frames.fetch_add(1, Ordering::Relaxed) + 1 == 3 {
                scope.terminate();
            }
            Ok(())
        },
        move || {
            cleanups.fetch_add(1, Ordering::Relaxed);
        },
    )
    .unwrap();

    surface.join().unwrap();
    assert_eq!(frames_seen.load(Ordering::Relaxed), 3);
    assert_eq!(cleanup_seen.load(Ordering::Relaxed), 1);
    assert_eq!(host.backend.destroyed_contexts(), 1);
}

#[test]
fn draw_error_stops_the_loop_and_is_reported_by_join() {
    let host = Host::new();
    let (cleanups, cleanup_seen) = counter();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Mailbox, size(8, 8)),
        |_| Err(draw_error("shader compile failed")),
        move || {
            cleanups.fetch_add(1, Ordering::Relaxed);
        },
    )
    .unwrap();

    let err = surface.join().unwrap_err();
    assert!(matches!(err, PoolError::Draw(_)));
    assert!(err.to_string().contains("shader compile failed"));
    assert_eq!(cleanup_seen.load(Ordering::Relaxed), 1);
    assert_eq!(host.backend.destroyed_contexts(), 1);
    assert_eq!(host.device().live(ObjectKind::Framebuffer), 0);
}

#[test]
fn allocation_failure_is_fatal() {
    let host = Host::new();
    host.device().fail_allocations(true);
    let (cleanups, cleanup_seen) = counter();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Fifo, size(8, 8)),
        |_| Ok(()),
        move || {
            cleanups.fetch_add(1, Ordering::Relaxed);
        },
    )
    .unwrap();

    assert!(matches!(surface.join(), Err(PoolError::Gl(_))));
    assert!(!surface.is_rendering());
    assert_eq!(cleanup_seen.load(Ordering::Relaxed), 1);
    assert_eq!(host.backend.destroyed_contexts(), 1);
}

#[test]
fn on_request_frames_wait_for_a_redraw_request() {
    let host = Host::new();
    let (frames, frames_seen) = counter();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Mailbox, size(8, 8)),
        move |scope| {
            frames.fetch_add(1, Ordering::Relaxed);
            scope.redraw_after(None);
            Ok(())
        },
        || {},
    )
    .unwrap();

    wait_until("first frame", || frames_seen.load(Ordering::Relaxed) == 1);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(frames_seen.load(Ordering::Relaxed), 1);

    surface.request_redraw();
    wait_until("second frame", || frames_seen.load(Ordering::Relaxed) == 2);

    let requester = surface.redraw_requester();
    thread::spawn(move || requester.request_redraw())
        .join()
        .unwrap();
    wait_until("third frame", || frames_seen.load(Ordering::Relaxed) == 3);
}

#[test]
fn size_override_takes_precedence_over_resizes() {
    let host = Host::new();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Mailbox, size(32, 32)),
        |_| Ok(()),
        || {},
    )
    .unwrap();
    wait_until("first frame", || displayed_size(&surface) == Some(size(32, 32)));

    surface.set_size_override(Some(size(8, 8)));
    assert_eq!(surface.size(), size(8, 8));
    wait_until("override", || displayed_size(&surface) == Some(size(8, 8)));

    surface.resize(size(64, 64));
    assert_eq!(surface.size(), size(8, 8));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(displayed_size(&surface), Some(size(8, 8)));

    surface.set_size_override(None);
    assert_eq!(surface.size(), size(64, 64));
    wait_until("component size", || displayed_size(&surface) == Some(size(64, 64)));
}

#[test]
fn statistics_track_render_and_display() {
    let host = Host::new();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Mailbox, size(8, 8)),
        |_| Ok(()),
        || {},
    )
    .unwrap();

    wait_until("frames", || surface.render_statistics().len() >= 3);
    let render = surface.render_statistics();
    assert_eq!(render.window(), Duration::from_secs(5));
    assert!(!render.fps().is_empty());
    assert!(render.frame_times().max() >= render.frame_times().min());

    wait_until("first display", || displayed_size(&surface).is_some());
    let before = surface.display_statistics().len();
    for _ in 0..3 {
        assert!(displayed_size(&surface).is_some());
    }
    assert_eq!(surface.display_statistics().len(), before + 3);
}

#[test]
fn dropping_the_surface_shuts_the_thread_down() {
    let host = Host::new();
    let (cleanups, cleanup_seen) = counter();
    let surface = GlSurface::launch(
        host.context.share().unwrap(),
        config(PresentMode::Fifo, size(8, 8)),
        |_| Ok(()),
        move || {
            cleanups.fetch_add(1, Ordering::Relaxed);
        },
    )
    .unwrap();
    wait_until("rendering", || surface.is_rendering());

    drop(surface);
    assert_eq!(cleanup_seen.load(Ordering::Relaxed), 1);
    assert_eq!(host.backend.destroyed_contexts(), 1);
    assert_eq!(host.provider.ref_count(host.root), 1);
}

#[test]
fn invalid_capacity_is_rejected_before_spawning() {
    let host = Host::new();
    let mut config = config(PresentMode::Fifo, size(8, 8));
    config.swap_chain.capacity = 1;
    let result = GlSurface::launch(host.context.share().unwrap(), config, |_| Ok(()), || {});
    assert!(matches!(result, Err(PoolError::InvalidCapacity { .. })));
    assert_eq!(host.provider.ref_count(host.root), 1);
}

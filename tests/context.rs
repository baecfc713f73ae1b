mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use common::{Host, init_logging};
use xian_gl_surface::headless::{HeadlessBackend, ObjectKind};
use xian_gl_surface::{
    ContextError, ContextProvider, CurrentContextAdapter, GlApi, HostContextAdapter, HostWindow,
    NativeBackend,
};

#[test]
fn capabilities_resolve_once_per_handle() {
    let host = Host::new();
    assert_eq!(host.backend.capability_loads(), 1);

    let second = host.provider.wrap_host(host.root).unwrap();
    let third = second.share().unwrap();
    assert_eq!(host.backend.capability_loads(), 1);
    assert_eq!(host.provider.ref_count(host.root), 3);
    assert!(Arc::ptr_eq(
        &host.context.shared_gl(),
        &third.shared_gl()
    ));
    assert_eq!(third.capabilities().version().major, 3);
    assert_eq!(third.capabilities().version().minor, 3);
}

#[test]
fn borrowed_contexts_are_never_destroyed() {
    let host = Host::new();
    let extra = host.provider.wrap_host(host.root).unwrap();

    assert!(extra.destroy());
    assert!(!extra.destroy());
    assert_eq!(host.provider.ref_count(host.root), 1);

    drop(host.context);
    assert_eq!(host.provider.ref_count(host.root), 0);
    assert_eq!(host.provider.live_contexts(), 0);
    assert!(host.backend.is_alive(host.root));
    assert_eq!(host.backend.destroyed_contexts(), 0);
}

#[test]
fn offscreen_context_is_destroyed_with_its_last_wrapper() {
    let host = Host::new();
    let offscreen = host.context.derive_offscreen().unwrap();
    let handle = offscreen.handle();
    let shared = offscreen.share().unwrap();
    assert!(offscreen.is_owned() && shared.is_owned());
    assert_eq!(host.backend.offscreen_created(), 1);

    offscreen.destroy();
    assert!(host.backend.is_alive(handle));

    shared.make_current().unwrap();
    drop(shared);
    assert!(!host.backend.is_alive(handle));
    assert_eq!(host.backend.destroyed_contexts(), 1);
    assert_eq!(host.provider.current_handle(), None);
}

#[test]
fn concurrent_destroy_releases_exactly_once() {
    let host = Host::new();
    let offscreen = Arc::new(host.context.derive_offscreen().unwrap());
    let wins = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let (offscreen, wins) = (offscreen.clone(), wins.clone());
            thread::spawn(move || {
                if offscreen.destroy() {
                    wins.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(wins.load(Ordering::Relaxed), 1);
    assert_eq!(host.backend.destroyed_contexts(), 1);
    assert!(matches!(offscreen.make_current(), Err(ContextError::Destroyed)));
    assert!(matches!(offscreen.share(), Err(ContextError::Destroyed)));
}

#[test]
fn capability_loading_keeps_the_current_context() {
    let host = Host::new();
    host.context.make_current().unwrap();

    let offscreen = host.context.derive_offscreen().unwrap();
    assert_eq!(host.provider.current_handle(), Some(host.root));
    assert!(host.context.is_current());
    assert!(!offscreen.is_current());

    offscreen.make_current().unwrap();
    assert!(offscreen.is_current());
    offscreen.release_current().unwrap();
    assert_eq!(host.provider.current_handle(), None);
}

#[test]
fn offscreen_contexts_share_objects_with_the_parent() {
    let host = Host::new();
    let offscreen = host.context.derive_offscreen().unwrap();

    let texture = offscreen.gl().create_texture().unwrap();
    let device = host.device();
    assert_eq!(device.live(ObjectKind::Texture), 1);

    host.context.gl().delete_texture(texture);
    assert_eq!(device.live(ObjectKind::Texture), 0);
}

#[test]
fn host_adapter_wraps_the_bound_context() {
    init_logging();
    let backend = HeadlessBackend::new();
    let provider = ContextProvider::new(backend.clone());
    let adapter = CurrentContextAdapter;

    assert!(provider.from_current().unwrap().is_none());
    assert!(
        provider
            .from_host(&adapter, HostWindow(7))
            .unwrap()
            .is_none()
    );

    let root = backend.create_root();
    backend.make_current(root).unwrap();
    let wrapped = provider.from_host(&adapter, HostWindow(7)).unwrap().unwrap();
    assert_eq!(wrapped.handle(), root);
    assert!(!wrapped.is_owned());
    assert!(!HostContextAdapter::<HeadlessBackend>::host_version(&adapter).is_empty());

    let current = provider.from_current().unwrap().unwrap();
    assert_eq!(current.handle(), root);
    assert_eq!(provider.ref_count(root), 2);
}

#[test]
fn context_cannot_be_current_on_two_threads() {
    let host = Host::new();
    host.context.make_current().unwrap();

    let context = host.context.share().unwrap();
    let result = thread::spawn(move || context.make_current())
        .join()
        .unwrap();
    assert!(matches!(result, Err(ContextError::MakeCurrent { .. })));
}

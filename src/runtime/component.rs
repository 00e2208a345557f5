use crate::store::{Listener, Subscription};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Environment a component renders in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Interactive rendering: external stores are subscribed to.
    #[default]
    Client,
    /// Non-interactive rendering: fallback snapshots only, no subscriptions.
    Server,
}

type SnapshotFn<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

struct ExternalSnapshot<T> {
    rendered: Arc<T>,
    get_snapshot: SnapshotFn<T>,
}

struct ExternalStoreSlot<T> {
    snapshot: Arc<Mutex<ExternalSnapshot<T>>>,
    _subscription: Subscription,
}

/// A render function together with the state its hooks keep between renders.
///
/// Hooks are matched to their slots by call order, so a render function must
/// call the same hooks in the same order every time it runs.
///
/// # Examples
///
/// ```
/// use context_select::runtime::Component;
///
/// let mut counter = Component::new(|cx| {
///     let renders = cx.use_ref(|| 0usize);
///     let mut renders = renders.lock();
///     *renders += 1;
///     *renders
/// });
///
/// assert_eq!(counter.render(), 1);
/// assert_eq!(counter.render(), 2);
/// ```
pub struct Component<R> {
    render: Box<dyn FnMut(&mut RenderCx<'_>) -> R>,
    slots: Vec<Option<Box<dyn Any>>>,
    mode: RenderMode,
    stale: Arc<AtomicBool>,
    render_count: usize,
}

impl<R> Component<R> {
    /// Create a client-mode component.
    pub fn new<F>(render: F) -> Self
    where
        F: FnMut(&mut RenderCx<'_>) -> R + 'static,
    {
        Self::with_mode(RenderMode::Client, render)
    }

    /// Create a component rendering in the given mode.
    pub fn with_mode<F>(mode: RenderMode, render: F) -> Self
    where
        F: FnMut(&mut RenderCx<'_>) -> R + 'static,
    {
        Self {
            render: Box::new(render),
            slots: Vec::new(),
            mode,
            stale: Arc::new(AtomicBool::new(false)),
            render_count: 0,
        }
    }

    /// Run the render function.
    ///
    /// # Panics
    ///
    /// Panics if the render function calls its hooks in a different order
    /// than on the previous render.
    pub fn render(&mut self) -> R {
        self.stale.store(false, Ordering::SeqCst);
        self.render_count += 1;
        tracing::trace!(render = self.render_count, mode = ?self.mode, "rendering component");

        let mut cx = RenderCx {
            slots: &mut self.slots,
            cursor: 0,
            mode: self.mode,
            stale: &self.stale,
        };
        (self.render)(&mut cx)
    }

    /// Render again if an external store change was detected, otherwise `None`.
    pub fn render_if_needed(&mut self) -> Option<R> {
        self.needs_render().then(|| self.render())
    }

    /// Whether a subscribed snapshot changed since the last render.
    pub fn needs_render(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Number of times the component has rendered.
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    /// The mode this component was created with.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Drop all hook state, disposing every subscription the hooks hold.
    ///
    /// A later [`render`](Self::render) mounts the component afresh.
    pub fn unmount(&mut self) {
        tracing::trace!(slots = self.slots.len(), "unmounting component");
        self.slots.clear();
        self.stale.store(false, Ordering::SeqCst);
    }
}

/// Hook access for one render pass of a [`Component`].
pub struct RenderCx<'a> {
    slots: &'a mut Vec<Option<Box<dyn Any>>>,
    cursor: usize,
    mode: RenderMode,
    stale: &'a Arc<AtomicBool>,
}

impl RenderCx<'_> {
    /// The mode of the component being rendered.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// A cell that persists across renders of this component, created with
    /// `init` on the first render.
    pub fn use_ref<T, F>(&mut self, init: F) -> Arc<Mutex<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T,
    {
        let cell = self.slot(|| Arc::new(Mutex::new(init())));
        Arc::clone(cell)
    }

    /// Read an external store in a way that stays consistent across renders.
    ///
    /// In client mode `get_snapshot` is called during the render, and
    /// `subscribe` is called once, on the first render, with a listener that
    /// re-reads the latest `get_snapshot` on every store change. When that
    /// result is not the same `Arc` as the one last rendered, the component
    /// is marked as needing a render. `get_snapshot` must therefore return
    /// the same `Arc` for as long as the underlying data is unchanged.
    ///
    /// A `get_snapshot` that panics inside the listener only marks the
    /// component for rendering; the panic resurfaces from that render.
    ///
    /// In server mode `get_server_snapshot` is returned and nothing is
    /// subscribed.
    pub fn use_sync_external_store<T, Sub, G, SG>(
        &mut self,
        subscribe: Sub,
        get_snapshot: G,
        get_server_snapshot: SG,
    ) -> Arc<T>
    where
        T: Send + Sync + 'static,
        Sub: FnOnce(Listener) -> Subscription,
        G: Fn() -> Arc<T> + Send + Sync + 'static,
        SG: FnOnce() -> Arc<T>,
    {
        if self.mode == RenderMode::Server {
            return get_server_snapshot();
        }

        let get_snapshot: SnapshotFn<T> = Arc::new(get_snapshot);
        let value = get_snapshot();
        let stale = Arc::clone(self.stale);

        let slot = self.slot(|| {
            let snapshot = Arc::new(Mutex::new(ExternalSnapshot {
                rendered: Arc::clone(&value),
                get_snapshot: Arc::clone(&get_snapshot),
            }));
            let on_change = {
                let snapshot = Arc::clone(&snapshot);
                Listener::new(move || {
                    let (rendered, latest) = {
                        let snapshot = snapshot.lock();
                        (Arc::clone(&snapshot.rendered), Arc::clone(&snapshot.get_snapshot))
                    };
                    // A failing snapshot read is rethrown by the next render.
                    let changed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        !Arc::ptr_eq(&rendered, &latest())
                    }))
                    .unwrap_or(true);
                    if changed {
                        tracing::trace!("external snapshot changed, component needs render");
                        stale.store(true, Ordering::SeqCst);
                    }
                })
            };
            ExternalStoreSlot {
                snapshot,
                _subscription: subscribe(on_change),
            }
        });

        let mut snapshot = slot.snapshot.lock();
        snapshot.rendered = Arc::clone(&value);
        snapshot.get_snapshot = get_snapshot;
        value
    }

    /// Keep the slot of a [`use_sync_external_store`](Self::use_sync_external_store)
    /// call that bailed out early, so the hooks after it stay in place.
    pub(crate) fn skip_sync_external_store(&mut self) {
        if self.mode == RenderMode::Server {
            return;
        }
        if self.cursor == self.slots.len() {
            self.slots.push(None);
        }
        self.cursor += 1;
    }

    fn slot<T: 'static>(&mut self, init: impl FnOnce() -> T) -> &mut T {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.slots.len() {
            self.slots.push(None);
        }
        let slot = self.slots[index].get_or_insert_with(|| Box::new(init()) as Box<dyn Any>);
        match slot.downcast_mut::<T>() {
            Some(slot) => slot,
            None => panic!("hook {index} changed type between renders; hooks must be called in the same order"),
        }
    }
}

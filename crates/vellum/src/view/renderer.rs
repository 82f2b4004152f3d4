//! Visible-range orchestration over a recycling pool.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use vellum_core::{ConnectionGuard, Signal};

use super::pool::RecyclingPool;
use super::{BindError, Result, ViewError};
use crate::collection::{ChangeEvent, ObservableCollection};

/// The visual side of the renderer, supplied by the host.
///
/// One adapter serves one renderer; capability differences between item
/// kinds (sizes, layouts) are expressed through the adapter's methods, not
/// through renderer subclassing.
pub trait ItemAdapter<T>: Send + Sync {
    /// The pooled visual object.
    type Instance;

    /// Creates a fresh, unbound instance.
    fn create(&self) -> Self::Instance;

    /// Pushes `item` into `instance`.
    ///
    /// Errors are caller contract violations: the renderer propagates them
    /// unmodified instead of swallowing them, since a silently failed bind
    /// would corrupt the visible window.
    fn bind(&self, instance: &mut Self::Instance, item: &T) -> std::result::Result<(), BindError>;

    /// The extent (height, or width in a horizontal layout) of `item` in
    /// layout units. Only consulted in variable-extent mode; the default is
    /// a nominal 1.
    fn extent(&self, _item: &T) -> u32 {
        1
    }
}

/// Renderer configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererOptions {
    /// Items per block row (tiles per row in grid mode; 1 for a plain
    /// list). Zero is treated as 1.
    pub items_per_block: usize,
    /// `Some(extent)` for fixed-extent rows; `None` queries
    /// [`ItemAdapter::extent`] per item and uses the block-row maximum.
    pub uniform_extent: Option<u32>,
    /// Extra items kept bound past the visible end.
    pub lookahead_margin: usize,
    /// Destroy surplus free instances whenever the bound range shrinks.
    /// When off, freed instances linger for reuse.
    pub destroy_on_shrink: bool,
    /// Hard cap on live instances; exceeding it fails with
    /// [`ViewError::PoolExhausted`].
    pub max_instances: Option<usize>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            items_per_block: 1,
            uniform_extent: None,
            lookahead_margin: 0,
            destroy_on_shrink: false,
            max_instances: None,
        }
    }
}

/// Half-open index interval `[start, end)` into the output collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    /// Number of indices in the range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `index` falls inside the range.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// Signals surfaced to the host.
pub struct RendererSignals {
    /// Scroll offset changed (layout units).
    pub scroll_changed: Signal<u32>,
    /// The bound range changed.
    pub range_changed: Signal<VisibleRange>,
    /// An instance received data for the given index. Selection and theming
    /// overlays reapply here, because a reused instance carries stale
    /// visual state from its previous binding.
    pub instance_bound: Signal<usize>,
    /// The output collection was swapped via
    /// [`VirtualizedRenderer::set_output`].
    pub data_replaced: Signal<()>,
}

impl RendererSignals {
    fn new() -> Self {
        Self {
            scroll_changed: Signal::new(),
            range_changed: Signal::new(),
            instance_bound: Signal::new(),
            data_replaced: Signal::new(),
        }
    }
}

/// Maps the visible slice of an observable collection onto pooled visual
/// instances.
///
/// The renderer owns its [`RecyclingPool`] exclusively; instances are never
/// shared across renderers. Collection changes are queued as they arrive
/// and reconciled by [`VirtualizedRenderer::update`], which the host calls
/// once per frame tick. Scroll and viewport changes reconcile immediately.
///
/// Reconciliation is cheap for pure tail growth or shrink outside the
/// bound range (no rebinding); any interior change forces a full range
/// recompute and rebind, equivalent to a scroll-triggered update.
pub struct VirtualizedRenderer<T, A: ItemAdapter<T>> {
    adapter: A,
    output: Arc<ObservableCollection<T>>,
    options: RendererOptions,
    pool: RecyclingPool<A::Instance>,
    pending: Arc<Mutex<VecDeque<ChangeEvent>>>,
    _subscription: ConnectionGuard<ChangeEvent>,
    signals: RendererSignals,
    scroll_offset: u32,
    viewport: u32,
    range: VisibleRange,
    /// Extent of each block row; maintained in variable-extent mode only.
    row_extents: Vec<u32>,
}

impl<T, A> VirtualizedRenderer<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: ItemAdapter<T>,
{
    /// Creates a renderer over `output`. Nothing is bound until the host
    /// supplies a viewport via [`VirtualizedRenderer::set_viewport`].
    pub fn new(output: Arc<ObservableCollection<T>>, adapter: A, options: RendererOptions) -> Self {
        let options = RendererOptions {
            items_per_block: options.items_per_block.max(1),
            ..options
        };
        let pending = Arc::new(Mutex::new(VecDeque::new()));
        let subscription = Self::watch(&output, &pending);
        let mut renderer = Self {
            adapter,
            output,
            pool: RecyclingPool::new(options.max_instances),
            options,
            pending,
            _subscription: subscription,
            signals: RendererSignals::new(),
            scroll_offset: 0,
            viewport: 0,
            range: VisibleRange::default(),
            row_extents: Vec::new(),
        };
        renderer.recompute_extents();
        renderer
    }

    fn watch(
        output: &ObservableCollection<T>,
        pending: &Arc<Mutex<VecDeque<ChangeEvent>>>,
    ) -> ConnectionGuard<ChangeEvent> {
        let queue = pending.clone();
        output.changed().connect_scoped(move |event| {
            queue.lock().push_back(event.clone());
        })
    }

    /// The signals surfaced to the host.
    pub fn signals(&self) -> &RendererSignals {
        &self.signals
    }

    /// The current bound range (includes the lookahead margin).
    pub fn range(&self) -> VisibleRange {
        self.range
    }

    /// The instance pool, for inspection.
    pub fn pool(&self) -> &RecyclingPool<A::Instance> {
        &self.pool
    }

    /// The renderer configuration.
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Current scroll offset in layout units.
    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    /// The instance currently bound to `index`, if any.
    pub fn instance_at(&self, index: usize) -> Option<&A::Instance> {
        let key = self.pool.key_for_index(index)?;
        self.pool.get(key)
    }

    /// Sets the viewport extent and reconciles bindings.
    pub fn set_viewport(&mut self, extent: u32) -> Result<()> {
        self.update()?;
        self.viewport = extent;
        let range = self.compute_range();
        self.reconcile(range)
    }

    /// Sets the scroll offset and reconciles bindings.
    pub fn set_scroll_offset(&mut self, offset: u32) -> Result<()> {
        self.update()?;
        if offset != self.scroll_offset {
            self.scroll_offset = offset;
            self.signals.scroll_changed.emit(offset);
        }
        let range = self.compute_range();
        self.reconcile(range)
    }

    /// Drains queued collection changes and reconciles bindings. Call once
    /// per frame tick.
    pub fn update(&mut self) -> Result<()> {
        let events: Vec<ChangeEvent> = self.pending.lock().drain(..).collect();
        if events.is_empty() {
            return Ok(());
        }

        let mut structural = false;
        let mut replaced: Vec<usize> = Vec::new();
        for event in &events {
            match *event {
                // Pure tail growth or shrink past the bound range leaves
                // every current binding valid.
                ChangeEvent::Inserted { first, .. } | ChangeEvent::Removed { first, .. } => {
                    if first < self.range.end {
                        structural = true;
                    }
                }
                ChangeEvent::Replaced { index } => {
                    if self.range.contains(index) {
                        replaced.push(index);
                    }
                }
                ChangeEvent::Moved { .. } | ChangeEvent::Reset => structural = true,
            }
        }

        self.recompute_extents();
        if structural {
            tracing::debug!(target: "vellum::view", "interior change, full rebind");
            self.pool.release_all();
            let range = self.compute_range();
            self.reconcile(range)?;
        } else {
            let range = self.compute_range();
            self.reconcile(range)?;
            for index in replaced {
                self.rebind_in_place(index)?;
            }
        }

        if self.options.destroy_on_shrink {
            self.pool.shrink_to(self.range.len());
        }
        Ok(())
    }

    /// Swaps the data source, releasing every binding and rebinding against
    /// the new collection.
    pub fn set_output(&mut self, output: Arc<ObservableCollection<T>>) -> Result<()> {
        self.output = output;
        self._subscription = Self::watch(&self.output, &self.pending);
        self.pending.lock().clear();
        self.signals.data_replaced.emit(());
        self.pool.release_all();
        self.recompute_extents();
        let range = self.compute_range();
        self.reconcile(range)
    }

    /// Exempts the instance bound at `index` from recycling until unpinned.
    /// Returns `false` if nothing is bound there.
    pub fn pin(&mut self, index: usize) -> bool {
        match self.pool.key_for_index(index) {
            Some(key) => self.pool.set_pinned(key, true),
            None => false,
        }
    }

    /// Reverses [`VirtualizedRenderer::pin`].
    pub fn unpin(&mut self, index: usize) -> bool {
        match self.pool.key_for_index(index) {
            Some(key) => self.pool.set_pinned(key, false),
            None => false,
        }
    }

    fn recompute_extents(&mut self) {
        if self.options.uniform_extent.is_some() {
            return;
        }
        let block = self.options.items_per_block;
        let adapter = &self.adapter;
        let items = self.output.items();
        let rows = items.len().div_ceil(block);
        self.row_extents = (0..rows)
            .map(|row| {
                items[row * block..((row + 1) * block).min(items.len())]
                    .iter()
                    .map(|item| adapter.extent(item))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
    }

    /// Computes the bound range from scroll offset, viewport and row
    /// extents, extending the tail by the lookahead margin.
    fn compute_range(&self) -> VisibleRange {
        let len = self.output.len();
        let block = self.options.items_per_block;
        if len == 0 || self.viewport == 0 {
            return VisibleRange::default();
        }
        let rows = len.div_ceil(block);
        let offset = u64::from(self.scroll_offset);
        let viewport_end = offset + u64::from(self.viewport);

        let visible_rows = match self.options.uniform_extent {
            Some(extent) => {
                let extent = u64::from(extent.max(1));
                let first = (offset / extent) as usize;
                if first >= rows {
                    None
                } else {
                    let last = (((viewport_end - 1) / extent) as usize).min(rows - 1);
                    Some((first, last))
                }
            }
            None => {
                let mut first = None;
                let mut last = None;
                let mut row_start: u64 = 0;
                for (row, &extent) in self.row_extents.iter().enumerate() {
                    let row_end = row_start + u64::from(extent.max(1));
                    if row_end > offset && row_start < viewport_end {
                        if first.is_none() {
                            first = Some(row);
                        }
                        last = Some(row);
                    }
                    if row_start >= viewport_end {
                        break;
                    }
                    row_start = row_end;
                }
                first.zip(last)
            }
        };

        let Some((first_row, last_row)) = visible_rows else {
            return VisibleRange::default();
        };
        let start = first_row * block;
        let visible_end = ((last_row + 1) * block).min(len);
        let end = (visible_end + self.options.lookahead_margin).min(len);
        VisibleRange { start, end }
    }

    /// Releases indices leaving the range (ascending), then binds entering
    /// ones (ascending), reusing instances already bound in place.
    fn reconcile(&mut self, range: VisibleRange) -> Result<()> {
        if range != self.range {
            self.range = range;
            self.signals.range_changed.emit(range);
        }
        for index in self.pool.bound_indices() {
            if range.contains(index) {
                continue;
            }
            if let Some(key) = self.pool.key_for_index(index) {
                self.pool.release(key); // pinned instances stay put
            }
        }
        self.bind_missing()
    }

    fn bind_missing(&mut self) -> Result<()> {
        let range = self.range;
        let entering: Vec<(usize, T)> = {
            let items = self.output.items();
            (range.start..range.end)
                .filter(|index| self.pool.key_for_index(*index).is_none())
                .map(|index| (index, items[index].clone()))
                .collect()
        };
        for (index, item) in entering {
            let adapter = &self.adapter;
            let key = self.pool.acquire(|| adapter.create())?;
            let instance = self
                .pool
                .get_mut(key)
                .expect("acquired key must be live");
            adapter
                .bind(instance, &item)
                .map_err(|source| ViewError::Bind { index, source })?;
            self.pool.mark_bound(key, index);
            self.signals.instance_bound.emit(index);
        }
        Ok(())
    }

    fn rebind_in_place(&mut self, index: usize) -> Result<()> {
        let Some(key) = self.pool.key_for_index(index) else {
            return Ok(());
        };
        let Some(item) = self.output.get(index) else {
            return Ok(());
        };
        let adapter = &self.adapter;
        let instance = self.pool.get_mut(key).expect("bound key must be live");
        adapter
            .bind(instance, &item)
            .map_err(|source| ViewError::Bind { index, source })?;
        self.signals.instance_bound.emit(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Label {
        text: String,
        binds: usize,
    }

    struct LabelAdapter;

    impl ItemAdapter<String> for LabelAdapter {
        type Instance = Label;

        fn create(&self) -> Label {
            Label {
                text: String::new(),
                binds: 0,
            }
        }

        fn bind(&self, instance: &mut Label, item: &String) -> std::result::Result<(), BindError> {
            instance.text = item.clone();
            instance.binds += 1;
            Ok(())
        }

        fn extent(&self, item: &String) -> u32 {
            item.len() as u32
        }
    }

    fn items(n: usize) -> Arc<ObservableCollection<String>> {
        Arc::new(ObservableCollection::from_items(
            (0..n).map(|i| format!("item-{i}")).collect(),
        ))
    }

    fn uniform(lookahead: usize) -> RendererOptions {
        RendererOptions {
            uniform_extent: Some(10),
            lookahead_margin: lookahead,
            ..Default::default()
        }
    }

    #[test]
    fn test_uniform_visible_range() {
        let mut renderer = VirtualizedRenderer::new(items(100), LabelAdapter, uniform(0));
        renderer.set_viewport(30).unwrap();

        assert_eq!(renderer.range(), VisibleRange { start: 0, end: 3 });
        assert_eq!(renderer.pool().bound_indices(), vec![0, 1, 2]);
        assert_eq!(renderer.instance_at(1).unwrap().text, "item-1");

        renderer.set_scroll_offset(25).unwrap();
        // Rows 2..=5 intersect [25, 55).
        assert_eq!(renderer.range(), VisibleRange { start: 2, end: 6 });
        assert_eq!(renderer.pool().bound_indices(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_lookahead_extends_tail() {
        let mut renderer = VirtualizedRenderer::new(items(100), LabelAdapter, uniform(2));
        renderer.set_viewport(30).unwrap();
        assert_eq!(renderer.range(), VisibleRange { start: 0, end: 5 });
        assert_eq!(renderer.pool().bound_indices(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pool_conservation_while_scrolling() {
        let mut renderer = VirtualizedRenderer::new(items(50), LabelAdapter, uniform(2));
        renderer.set_viewport(40).unwrap();

        for offset in (0..400).step_by(7) {
            renderer.set_scroll_offset(offset).unwrap();
            assert_eq!(renderer.pool().destroyed_count(), 0);
            assert!(renderer.pool().live_count() <= renderer.range().len().max(1) + 2);
        }
        // Scrolling reuses instances instead of growing the pool.
        assert!(renderer.pool().created_count() <= renderer.range().len() + 2);
    }

    #[test]
    fn test_tail_append_outside_window_skips_rebind() {
        let collection = items(10);
        let mut renderer = VirtualizedRenderer::new(collection.clone(), LabelAdapter, uniform(0));
        renderer.set_viewport(30).unwrap();
        let binds_before = renderer.instance_at(0).unwrap().binds;

        collection.push("item-10".to_string());
        renderer.update().unwrap();

        assert_eq!(renderer.instance_at(0).unwrap().binds, binds_before);
        assert_eq!(renderer.range(), VisibleRange { start: 0, end: 3 });
    }

    #[test]
    fn test_tail_append_fills_short_viewport() {
        let collection = items(1);
        let mut renderer = VirtualizedRenderer::new(collection.clone(), LabelAdapter, uniform(0));
        renderer.set_viewport(50).unwrap();
        assert_eq!(renderer.range().len(), 1);

        collection.push("item-1".to_string());
        renderer.update().unwrap();
        // The append is past the old bound range but newly visible.
        assert_eq!(renderer.pool().bound_indices(), vec![0, 1]);
    }

    #[test]
    fn test_interior_change_forces_full_rebind() {
        let collection = items(20);
        let mut renderer = VirtualizedRenderer::new(collection.clone(), LabelAdapter, uniform(0));
        renderer.set_viewport(30).unwrap();

        collection.insert(0, "front".to_string()).unwrap();
        renderer.update().unwrap();

        assert_eq!(renderer.instance_at(0).unwrap().text, "front");
        assert_eq!(renderer.instance_at(1).unwrap().text, "item-0");
    }

    #[test]
    fn test_replace_rebinds_in_place() {
        let collection = items(10);
        let mut renderer = VirtualizedRenderer::new(collection.clone(), LabelAdapter, uniform(0));
        renderer.set_viewport(30).unwrap();
        let created = renderer.pool().created_count();

        collection.replace(1, "fresh".to_string()).unwrap();
        renderer.update().unwrap();

        assert_eq!(renderer.instance_at(1).unwrap().text, "fresh");
        assert_eq!(renderer.pool().created_count(), created);
    }

    #[test]
    fn test_reset_rebinds_everything() {
        let collection = items(10);
        let mut renderer = VirtualizedRenderer::new(collection.clone(), LabelAdapter, uniform(0));
        renderer.set_viewport(30).unwrap();

        collection.set_items(vec!["x".to_string(), "y".to_string()]);
        renderer.update().unwrap();

        assert_eq!(renderer.pool().bound_indices(), vec![0, 1]);
        assert_eq!(renderer.instance_at(0).unwrap().text, "x");
        assert_eq!(renderer.instance_at(1).unwrap().text, "y");
    }

    #[test]
    fn test_variable_extent_mode() {
        let collection = Arc::new(ObservableCollection::from_items(vec![
            "aaaaaaaaaa".to_string(), // extent 10
            "aaaaa".to_string(),      // extent 5
            "aaaaaaaaaaaaaaaaaaaa".to_string(), // extent 20
            "aaa".to_string(),        // extent 3
        ]));
        let mut renderer =
            VirtualizedRenderer::new(collection, LabelAdapter, RendererOptions::default());
        renderer.set_viewport(12).unwrap();
        // [0, 12) covers rows 0 (0..10) and 1 (10..15).
        assert_eq!(renderer.range(), VisibleRange { start: 0, end: 2 });

        renderer.set_scroll_offset(16).unwrap();
        // [16, 28) falls entirely inside row 2 (15..35).
        assert_eq!(renderer.range(), VisibleRange { start: 2, end: 3 });
    }

    #[test]
    fn test_grid_blocks() {
        let options = RendererOptions {
            items_per_block: 3,
            uniform_extent: Some(10),
            ..Default::default()
        };
        let mut renderer = VirtualizedRenderer::new(items(10), LabelAdapter, options);
        renderer.set_viewport(10).unwrap();
        // One block row of three tiles.
        assert_eq!(renderer.range(), VisibleRange { start: 0, end: 3 });

        renderer.set_scroll_offset(30).unwrap();
        // Fourth block row holds only the last item.
        assert_eq!(renderer.range(), VisibleRange { start: 9, end: 10 });
    }

    #[test]
    fn test_destroy_on_shrink() {
        let collection = items(50);
        let options = RendererOptions {
            uniform_extent: Some(10),
            destroy_on_shrink: true,
            ..Default::default()
        };
        let mut renderer = VirtualizedRenderer::new(collection.clone(), LabelAdapter, options);
        renderer.set_viewport(100).unwrap();
        assert_eq!(renderer.pool().live_count(), 10);

        collection.set_items(vec!["only".to_string()]);
        renderer.update().unwrap();
        assert_eq!(renderer.pool().live_count(), 1);
        assert!(renderer.pool().destroyed_count() > 0);
    }

    #[test]
    fn test_pinned_instance_survives_scroll() {
        let mut renderer = VirtualizedRenderer::new(items(100), LabelAdapter, uniform(0));
        renderer.set_viewport(30).unwrap();
        assert!(renderer.pin(0));

        renderer.set_scroll_offset(500).unwrap();
        assert!(!renderer.range().contains(0));
        // Still bound: recycling skipped it.
        assert_eq!(renderer.instance_at(0).unwrap().text, "item-0");

        renderer.unpin(0);
        renderer.set_scroll_offset(510).unwrap();
        assert!(renderer.instance_at(0).is_none());
    }

    #[test]
    fn test_range_and_scroll_signals() {
        let mut renderer = VirtualizedRenderer::new(items(100), LabelAdapter, uniform(0));
        let ranges = Arc::new(Mutex::new(Vec::new()));
        let offsets = Arc::new(Mutex::new(Vec::new()));
        let ranges_recv = ranges.clone();
        let offsets_recv = offsets.clone();
        renderer.signals().range_changed.connect(move |r| {
            ranges_recv.lock().push(*r);
        });
        renderer.signals().scroll_changed.connect(move |o| {
            offsets_recv.lock().push(*o);
        });

        renderer.set_viewport(30).unwrap();
        renderer.set_scroll_offset(40).unwrap();

        assert_eq!(*offsets.lock(), vec![40]);
        assert_eq!(
            *ranges.lock(),
            vec![
                VisibleRange { start: 0, end: 3 },
                VisibleRange { start: 4, end: 7 },
            ]
        );
    }

    #[test]
    fn test_bind_error_propagates() {
        struct FailingAdapter;
        impl ItemAdapter<String> for FailingAdapter {
            type Instance = ();
            fn create(&self) {}
            fn bind(&self, _: &mut (), item: &String) -> std::result::Result<(), BindError> {
                if item == "poison" {
                    Err("refused to bind".into())
                } else {
                    Ok(())
                }
            }
        }

        let collection = Arc::new(ObservableCollection::from_items(vec![
            "ok".to_string(),
            "poison".to_string(),
        ]));
        let options = RendererOptions {
            uniform_extent: Some(10),
            ..Default::default()
        };
        let mut renderer = VirtualizedRenderer::new(collection, FailingAdapter, options);
        let err = renderer.set_viewport(30).unwrap_err();
        assert!(matches!(err, ViewError::Bind { index: 1, .. }));
    }

    #[test]
    fn test_set_output_swaps_source() {
        let mut renderer = VirtualizedRenderer::new(items(10), LabelAdapter, uniform(0));
        renderer.set_viewport(30).unwrap();

        let swapped = Arc::new(Mutex::new(0));
        let swapped_recv = swapped.clone();
        renderer.signals().data_replaced.connect(move |_| {
            *swapped_recv.lock() += 1;
        });

        let replacement = Arc::new(ObservableCollection::from_items(vec![
            "new-0".to_string(),
            "new-1".to_string(),
        ]));
        renderer.set_output(replacement.clone()).unwrap();

        assert_eq!(*swapped.lock(), 1);
        assert_eq!(renderer.instance_at(0).unwrap().text, "new-0");

        replacement.push("new-2".to_string());
        renderer.update().unwrap();
        assert_eq!(renderer.instance_at(2).unwrap().text, "new-2");
    }
}

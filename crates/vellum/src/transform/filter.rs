//! Predicate filtering transform.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use vellum_core::ConnectionGuard;

use super::CollectionTransform;
use crate::collection::{ChangeEvent, ObservableCollection};

/// Type alias for a filter predicate.
///
/// Returns `true` if the item should be included in the output. The
/// predicate is re-evaluated on every refresh and input change; the
/// transform never memoizes results.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

struct FilterInner<T> {
    input: Mutex<Arc<ObservableCollection<T>>>,
    output: Mutex<Arc<ObservableCollection<T>>>,
    predicate: Mutex<Predicate<T>>,
    /// Per source index: did the item pass the predicate when last seen.
    /// The output index of a passing source index is the number of passing
    /// entries before it.
    passes: Mutex<Vec<bool>>,
}

/// A transform whose output is the subset of input items passing a
/// predicate, in input order.
///
/// Insertions, removals and replacements on the input are spliced into the
/// output incrementally; moves and resets trigger a full recompute.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vellum::collection::ObservableCollection;
/// use vellum::transform::{CollectionTransform, FilterTransform};
///
/// let fruit = Arc::new(ObservableCollection::from_items(vec![
///     "Apple".to_string(),
///     "Banana".to_string(),
///     "Avocado".to_string(),
/// ]));
/// let filter = FilterTransform::new(fruit.clone(), |s: &String| s.starts_with('A'));
/// assert_eq!(*filter.output().items(), vec!["Apple", "Avocado"]);
///
/// fruit.push("Apricot".to_string());
/// assert_eq!(filter.output().len(), 3);
/// ```
pub struct FilterTransform<T> {
    inner: Arc<FilterInner<T>>,
    subscription: Mutex<Option<ConnectionGuard<ChangeEvent>>>,
}

impl<T: Clone + Send + Sync + 'static> FilterTransform<T> {
    /// Creates a filter over `input` and populates a fresh output
    /// collection.
    pub fn new<F>(input: Arc<ObservableCollection<T>>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let inner = Arc::new(FilterInner {
            input: Mutex::new(input),
            output: Mutex::new(Arc::new(ObservableCollection::new())),
            predicate: Mutex::new(Arc::new(predicate)),
            passes: Mutex::new(Vec::new()),
        });
        Self::rebuild(&inner);
        let transform = Self {
            inner,
            subscription: Mutex::new(None),
        };
        transform.resubscribe();
        transform
    }

    /// Replaces the predicate and recomputes the output.
    pub fn set_predicate<F>(&self, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        *self.inner.predicate.lock() = Arc::new(predicate);
        self.refresh();
    }

    /// The input collection currently being filtered.
    pub fn input(&self) -> Arc<ObservableCollection<T>> {
        self.inner.input.lock().clone()
    }

    fn resubscribe(&self) {
        let weak = Arc::downgrade(&self.inner);
        let guard = self
            .inner
            .input
            .lock()
            .changed()
            .connect_scoped(move |event| {
                if let Some(inner) = Weak::upgrade(&weak) {
                    FilterTransform::on_input_changed(&inner, event);
                }
            });
        *self.subscription.lock() = Some(guard);
    }

    fn on_input_changed(inner: &Arc<FilterInner<T>>, event: &ChangeEvent) {
        tracing::trace!(target: "vellum::transform", ?event, "filter input changed");
        match *event {
            ChangeEvent::Inserted { first, last } => Self::apply_inserted(inner, first, last),
            ChangeEvent::Removed { first, last } => Self::apply_removed(inner, first, last),
            ChangeEvent::Replaced { index } => Self::apply_replaced(inner, index),
            ChangeEvent::Moved { .. } | ChangeEvent::Reset => Self::rebuild(inner),
        }
    }

    fn apply_inserted(inner: &Arc<FilterInner<T>>, first: usize, last: usize) {
        let input = inner.input.lock().clone();
        let output = inner.output.lock().clone();
        let predicate = inner.predicate.lock().clone();
        let mut passes = inner.passes.lock();

        let items = input.items();
        let mut out_index = passes[..first].iter().filter(|&&p| p).count();
        for source in first..=last {
            let pass = predicate(&items[source]);
            passes.insert(source, pass);
            if pass {
                output
                    .insert(out_index, items[source].clone())
                    .expect("filter mapping out of sync with output");
                out_index += 1;
            }
        }
    }

    fn apply_removed(inner: &Arc<FilterInner<T>>, first: usize, last: usize) {
        let output = inner.output.lock().clone();
        let mut passes = inner.passes.lock();

        let out_first = passes[..first].iter().filter(|&&p| p).count();
        let removed_passing = passes[first..=last].iter().filter(|&&p| p).count();
        passes.drain(first..=last);
        for _ in 0..removed_passing {
            output
                .remove_at(out_first)
                .expect("filter mapping out of sync with output");
        }
    }

    fn apply_replaced(inner: &Arc<FilterInner<T>>, index: usize) {
        let input = inner.input.lock().clone();
        let output = inner.output.lock().clone();
        let predicate = inner.predicate.lock().clone();
        let mut passes = inner.passes.lock();

        let item = match input.get(index) {
            Some(item) => item,
            None => return,
        };
        let was = passes[index];
        let now = predicate(&item);
        passes[index] = now;

        let out_index = passes[..index].iter().filter(|&&p| p).count();
        let result = match (was, now) {
            (true, true) => output.replace(out_index, item).map(|_| ()),
            (true, false) => output.remove_at(out_index).map(|_| ()),
            (false, true) => output.insert(out_index, item),
            (false, false) => Ok(()),
        };
        result.expect("filter mapping out of sync with output");
    }

    /// Full recompute: re-evaluates the predicate over the whole input and
    /// resets the output in one go.
    fn rebuild(inner: &Arc<FilterInner<T>>) {
        let input = inner.input.lock().clone();
        let output = inner.output.lock().clone();
        let predicate = inner.predicate.lock().clone();
        let mut passes = inner.passes.lock();

        let items = input.items();
        passes.clear();
        let mut derived = Vec::new();
        for item in items.iter() {
            let pass = predicate(item);
            passes.push(pass);
            if pass {
                derived.push(item.clone());
            }
        }
        tracing::debug!(
            target: "vellum::transform",
            input_len = items.len(),
            output_len = derived.len(),
            "filter rebuilt"
        );
        drop(items);
        output.set_items(derived);
    }
}

impl<T: Clone + Send + Sync + 'static> CollectionTransform<T, T> for FilterTransform<T> {
    fn output(&self) -> Arc<ObservableCollection<T>> {
        self.inner.output.lock().clone()
    }

    fn set_input(&self, input: Arc<ObservableCollection<T>>) {
        *self.inner.input.lock() = input;
        self.resubscribe();
        Self::rebuild(&self.inner);
    }

    fn set_output(&self, output: Arc<ObservableCollection<T>>) {
        *self.inner.output.lock() = output;
        Self::rebuild(&self.inner);
    }

    fn refresh(&self) {
        Self::rebuild(&self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn starts_with_a(s: &String) -> bool {
        s.to_lowercase().starts_with('a')
    }

    #[test]
    fn test_initial_population_preserves_order() {
        let input = Arc::new(ObservableCollection::from_items(strings(&[
            "Apple", "Banana", "Avocado", "Cherry",
        ])));
        let filter = FilterTransform::new(input, starts_with_a);
        assert_eq!(*filter.output().items(), strings(&["Apple", "Avocado"]));
    }

    #[test]
    fn test_predicate_change_with_refresh() {
        // Filter-then-render scenario: swap the predicate at runtime.
        let input = Arc::new(ObservableCollection::from_items(strings(&[
            "Apple", "Banana", "Avocado", "Cherry",
        ])));
        let filter = FilterTransform::new(input, starts_with_a);
        assert_eq!(*filter.output().items(), strings(&["Apple", "Avocado"]));

        filter.set_predicate(|s: &String| s.to_lowercase().starts_with('c'));
        assert_eq!(*filter.output().items(), strings(&["Cherry"]));
    }

    #[test]
    fn test_incremental_insert() {
        let input = Arc::new(ObservableCollection::from_items(vec![1, 2, 3, 4]));
        let filter = FilterTransform::new(input.clone(), |n: &i32| n % 2 == 0);
        let events = Arc::new(Mutex::new(Vec::new()));
        let recv = events.clone();
        filter.output().changed().connect(move |event| {
            recv.lock().push(event.clone());
        });

        input.insert(0, 6).unwrap(); // passes, lands at output front
        input.insert(1, 7).unwrap(); // filtered out

        assert_eq!(*filter.output().items(), vec![6, 2, 4]);
        // Only the passing insertion produced an output event, and it was
        // incremental (not a Reset).
        assert_eq!(
            *events.lock(),
            vec![ChangeEvent::Inserted { first: 0, last: 0 }]
        );
    }

    #[test]
    fn test_incremental_remove() {
        let input = Arc::new(ObservableCollection::from_items(vec![1, 2, 3, 4, 5, 6]));
        let filter = FilterTransform::new(input.clone(), |n: &i32| n % 2 == 0);
        assert_eq!(*filter.output().items(), vec![2, 4, 6]);

        input.remove_at(3).unwrap(); // removes 4
        assert_eq!(*filter.output().items(), vec![2, 6]);

        input.remove_at(0).unwrap(); // removes 1, filtered out anyway
        assert_eq!(*filter.output().items(), vec![2, 6]);
    }

    #[test]
    fn test_replace_transitions() {
        let input = Arc::new(ObservableCollection::from_items(vec![2, 3, 4]));
        let filter = FilterTransform::new(input.clone(), |n: &i32| n % 2 == 0);
        assert_eq!(*filter.output().items(), vec![2, 4]);

        input.replace(1, 10).unwrap(); // fail -> pass
        assert_eq!(*filter.output().items(), vec![2, 10, 4]);

        input.replace(0, 9).unwrap(); // pass -> fail
        assert_eq!(*filter.output().items(), vec![10, 4]);

        input.replace(2, 8).unwrap(); // pass -> pass, in place
        assert_eq!(*filter.output().items(), vec![10, 8]);
    }

    #[test]
    fn test_eventual_consistency_after_mixed_mutations() {
        let input = Arc::new(ObservableCollection::from_items(vec![5, 8, 1, 6]));
        let filter = FilterTransform::new(input.clone(), |n: &i32| *n >= 5);

        input.push(9);
        input.move_item(0, 3).unwrap();
        input.remove_at(1).unwrap();
        {
            let _scope = input.begin_update();
            input.push(2);
            input.push(12);
        }

        let derived: Vec<i32> = input.items().iter().copied().filter(|n| *n >= 5).collect();
        assert_eq!(*filter.output().items(), derived);
    }

    #[test]
    fn test_dropping_transform_severs_chain() {
        let input = Arc::new(ObservableCollection::from_items(vec![1, 2]));
        let filter = FilterTransform::new(input.clone(), |_: &i32| true);
        let output = filter.output();
        drop(filter);

        input.push(3);
        // The output no longer tracks the input.
        assert_eq!(*output.items(), vec![1, 2]);
        assert_eq!(input.changed().connection_count(), 0);
    }

    #[test]
    fn test_set_input_swaps_source() {
        let first = Arc::new(ObservableCollection::from_items(vec![1, 2]));
        let second = Arc::new(ObservableCollection::from_items(vec![10, 11, 12]));
        let filter = FilterTransform::new(first.clone(), |_: &i32| true);

        filter.set_input(second.clone());
        assert_eq!(*filter.output().items(), vec![10, 11, 12]);

        // Old input no longer drives the output.
        first.push(3);
        assert_eq!(filter.output().len(), 3);
        second.push(13);
        assert_eq!(filter.output().len(), 4);
    }

    #[test]
    fn test_set_output_repopulates() {
        let input = Arc::new(ObservableCollection::from_items(vec![1, 2, 3]));
        let filter = FilterTransform::new(input, |n: &i32| *n > 1);

        let replacement = Arc::new(ObservableCollection::from_items(vec![99]));
        filter.set_output(replacement.clone());
        assert_eq!(*replacement.items(), vec![2, 3]);
        assert!(Arc::ptr_eq(&filter.output(), &replacement));
    }
}

//! Bucketing transform with synthetic group headers.

use std::cmp::Ordering;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use vellum_core::ConnectionGuard;

use super::CollectionTransform;
use crate::collection::{ChangeEvent, ObservableCollection};

/// Type alias for a classification function.
///
/// Receives the current ordered list of group headers and the item to
/// classify, and returns the header of the bucket the item belongs to -
/// either one of the existing headers (same `Arc`) or a newly allocated one.
///
/// Bucket identity is `Arc` identity: returning a structurally equal but
/// freshly allocated header creates a *new* bucket. Deduplicating against
/// `existing` is the classifier's responsibility. The function must be
/// deterministic for a given `(existing, item)` pair within one
/// recomputation pass.
pub type Classifier<T, G> = Arc<dyn Fn(&[Arc<G>], &T) -> Arc<G> + Send + Sync>;

/// Type alias for a group ordering function. Without one, buckets appear in
/// first-seen order.
pub type GroupCompare<G> = Arc<dyn Fn(&G, &G) -> Ordering + Send + Sync>;

/// Type alias for a within-bucket item ordering function. Without one,
/// members keep input arrival order.
pub type ItemCompare<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// What happens to a bucket when its last member is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyGroupPolicy {
    /// Remove the header row; the bucket ceases to exist.
    #[default]
    RemoveHeader,
    /// Keep the header and substitute a placeholder row for the missing
    /// member, so grid layouts with a constant block size keep their shape.
    KeepPlaceholder,
}

/// One row of a [`GroupedTransform`] output.
#[derive(Debug)]
pub enum GroupedEntry<T, G> {
    /// A synthetic group header. Compared by `Arc` identity.
    Header(Arc<G>),
    /// A member item.
    Item(T),
    /// Stand-in row for an empty bucket under
    /// [`EmptyGroupPolicy::KeepPlaceholder`].
    Placeholder(Arc<G>),
}

impl<T, G> GroupedEntry<T, G> {
    /// Returns the header this row belongs to, if it is a header or
    /// placeholder row.
    pub fn header(&self) -> Option<&Arc<G>> {
        match self {
            GroupedEntry::Header(h) | GroupedEntry::Placeholder(h) => Some(h),
            GroupedEntry::Item(_) => None,
        }
    }

    /// Returns the member item, if this is an item row.
    pub fn item(&self) -> Option<&T> {
        match self {
            GroupedEntry::Item(item) => Some(item),
            _ => None,
        }
    }
}

impl<T: Clone, G> Clone for GroupedEntry<T, G> {
    fn clone(&self) -> Self {
        match self {
            GroupedEntry::Header(h) => GroupedEntry::Header(h.clone()),
            GroupedEntry::Item(item) => GroupedEntry::Item(item.clone()),
            GroupedEntry::Placeholder(h) => GroupedEntry::Placeholder(h.clone()),
        }
    }
}

impl<T: PartialEq, G> PartialEq for GroupedEntry<T, G> {
    /// Header and placeholder rows compare by `Arc` identity, item rows by
    /// item equality.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GroupedEntry::Header(a), GroupedEntry::Header(b)) => Arc::ptr_eq(a, b),
            (GroupedEntry::Item(a), GroupedEntry::Item(b)) => a == b,
            (GroupedEntry::Placeholder(a), GroupedEntry::Placeholder(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

struct Bucket<T, G> {
    header: Arc<G>,
    members: Vec<T>,
}

/// Bucket bookkeeping. `placements` is parallel to the input: entry `i` is
/// the `(bucket, member)` position of input item `i`.
struct GroupState<T, G> {
    buckets: Vec<Bucket<T, G>>,
    placements: Vec<(usize, usize)>,
}

impl<T, G> GroupState<T, G> {
    fn new() -> Self {
        Self {
            buckets: Vec::new(),
            placements: Vec::new(),
        }
    }

    /// Output rows occupied by `bucket`: header plus members, or header
    /// plus placeholder when empty under `KeepPlaceholder`.
    fn bucket_rows(&self, bucket: usize, policy: EmptyGroupPolicy) -> usize {
        let members = self.buckets[bucket].members.len();
        if members == 0 && policy == EmptyGroupPolicy::KeepPlaceholder {
            2
        } else {
            1 + members
        }
    }

    /// Output row of `bucket`'s header.
    fn bucket_offset(&self, bucket: usize, policy: EmptyGroupPolicy) -> usize {
        (0..bucket).map(|b| self.bucket_rows(b, policy)).sum()
    }

    /// Output row of member `member` of `bucket`.
    fn member_row(&self, bucket: usize, member: usize, policy: EmptyGroupPolicy) -> usize {
        self.bucket_offset(bucket, policy) + 1 + member
    }
}

/// Where `place` put an item, plus the output splices the caller owes.
struct Placed {
    bucket: usize,
    member: usize,
    created_bucket: bool,
    had_placeholder: bool,
}

struct GroupedInner<T, G> {
    input: Mutex<Arc<ObservableCollection<T>>>,
    output: Mutex<Arc<ObservableCollection<GroupedEntry<T, G>>>>,
    classifier: Mutex<Classifier<T, G>>,
    group_compare: Mutex<Option<GroupCompare<G>>>,
    item_compare: Mutex<Option<ItemCompare<T>>>,
    policy: Mutex<EmptyGroupPolicy>,
    state: Mutex<GroupState<T, G>>,
}

/// A transform that buckets input items into groups with synthetic header
/// rows.
///
/// Output shape: `Header(g0), members.., Header(g1), members.., ..` -
/// buckets ordered by the group comparator (or first-seen order), members
/// ordered by the item comparator (or arrival order).
///
/// Header identity is stable: as long as a bucket keeps at least one member
/// (or [`EmptyGroupPolicy::KeepPlaceholder`] is in effect), every output row
/// referring to it carries the same `Arc<G>`, so recycled visuals bound to
/// the header never flicker.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vellum::collection::ObservableCollection;
/// use vellum::transform::{CollectionTransform, GroupedTransform};
///
/// let names = Arc::new(ObservableCollection::from_items(vec![
///     "Bob".to_string(),
///     "Alice".to_string(),
/// ]));
/// let grouped = GroupedTransform::new(names, |existing: &[Arc<String>], name: &String| {
///     let letter = name[..1].to_string();
///     existing
///         .iter()
///         .find(|g| ***g == letter)
///         .cloned()
///         .unwrap_or_else(|| Arc::new(letter))
/// })
/// .with_group_compare(|a: &String, b: &String| a.cmp(b));
///
/// // Header "A", Alice, Header "B", Bob
/// assert_eq!(grouped.output().len(), 4);
/// ```
pub struct GroupedTransform<T, G> {
    inner: Arc<GroupedInner<T, G>>,
    subscription: Mutex<Option<ConnectionGuard<ChangeEvent>>>,
}

impl<T, G> GroupedTransform<T, G>
where
    T: Clone + Send + Sync + 'static,
    G: Send + Sync + 'static,
{
    /// Creates a grouping over `input` and populates a fresh output
    /// collection. Buckets appear in first-seen order, members in arrival
    /// order, and emptied buckets are removed; use the `with_*` builders to
    /// change any of that.
    pub fn new<F>(input: Arc<ObservableCollection<T>>, classifier: F) -> Self
    where
        F: Fn(&[Arc<G>], &T) -> Arc<G> + Send + Sync + 'static,
    {
        let inner = Arc::new(GroupedInner {
            input: Mutex::new(input),
            output: Mutex::new(Arc::new(ObservableCollection::new())),
            classifier: Mutex::new(Arc::new(classifier)),
            group_compare: Mutex::new(None),
            item_compare: Mutex::new(None),
            policy: Mutex::new(EmptyGroupPolicy::default()),
            state: Mutex::new(GroupState::new()),
        });
        Self::rebuild(&inner);
        let transform = Self {
            inner,
            subscription: Mutex::new(None),
        };
        transform.resubscribe();
        transform
    }

    /// Orders buckets with `compare`.
    pub fn with_group_compare<F>(self, compare: F) -> Self
    where
        F: Fn(&G, &G) -> Ordering + Send + Sync + 'static,
    {
        *self.inner.group_compare.lock() = Some(Arc::new(compare));
        Self::rebuild(&self.inner);
        self
    }

    /// Orders members within each bucket with `compare`.
    pub fn with_item_compare<F>(self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        *self.inner.item_compare.lock() = Some(Arc::new(compare));
        Self::rebuild(&self.inner);
        self
    }

    /// Sets the empty-bucket policy.
    pub fn with_empty_group_policy(self, policy: EmptyGroupPolicy) -> Self {
        *self.inner.policy.lock() = policy;
        Self::rebuild(&self.inner);
        self
    }

    /// Replaces the classifier and recomputes the output.
    pub fn set_classifier<F>(&self, classifier: F)
    where
        F: Fn(&[Arc<G>], &T) -> Arc<G> + Send + Sync + 'static,
    {
        *self.inner.classifier.lock() = Arc::new(classifier);
        self.refresh();
    }

    /// Current bucket headers, in output order.
    pub fn headers(&self) -> Vec<Arc<G>> {
        self.inner
            .state
            .lock()
            .buckets
            .iter()
            .map(|b| b.header.clone())
            .collect()
    }

    /// Number of buckets.
    pub fn group_count(&self) -> usize {
        self.inner.state.lock().buckets.len()
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
                    GroupedTransform::on_input_changed(&inner, event);
                }
            });
        *self.subscription.lock() = Some(guard);
    }

    fn on_input_changed(inner: &Arc<GroupedInner<T, G>>, event: &ChangeEvent) {
        tracing::trace!(target: "vellum::transform", ?event, "grouping input changed");
        match *event {
            ChangeEvent::Inserted { first, last } => {
                let input = inner.input.lock().clone();
                let inserted: Vec<T> = input.items()[first..=last].to_vec();
                for (offset, item) in inserted.into_iter().enumerate() {
                    Self::apply_inserted(inner, first + offset, item);
                }
            }
            ChangeEvent::Removed { first, last } => {
                for _ in first..=last {
                    Self::apply_removed(inner, first);
                }
            }
            ChangeEvent::Replaced { index } => {
                let input = inner.input.lock().clone();
                if let Some(item) = input.get(index) {
                    Self::apply_replaced(inner, index, item);
                }
            }
            ChangeEvent::Moved { .. } | ChangeEvent::Reset => Self::rebuild(inner),
        }
    }

    /// Finds or creates the bucket for `item` and records the placement at
    /// `source`. Mutates bookkeeping only; the owed output splices are
    /// described by the returned [`Placed`].
    fn place(
        inner: &GroupedInner<T, G>,
        state: &mut GroupState<T, G>,
        source: usize,
        item: T,
    ) -> Placed {
        let classifier = inner.classifier.lock().clone();
        let group_compare = inner.group_compare.lock().clone();
        let item_compare = inner.item_compare.lock().clone();
        let policy = *inner.policy.lock();

        let headers: Vec<Arc<G>> = state.buckets.iter().map(|b| b.header.clone()).collect();
        let header = classifier(&headers, &item);

        let existing = state
            .buckets
            .iter()
            .position(|b| Arc::ptr_eq(&b.header, &header));
        let (bucket, created_bucket) = match existing {
            Some(b) => (b, false),
            None => {
                let pos = match &group_compare {
                    Some(cmp) => state
                        .buckets
                        .iter()
                        .position(|b| cmp(&b.header, &header) == Ordering::Greater)
                        .unwrap_or(state.buckets.len()),
                    None => state.buckets.len(),
                };
                for p in state.placements.iter_mut() {
                    if p.0 >= pos {
                        p.0 += 1;
                    }
                }
                state.buckets.insert(
                    pos,
                    Bucket {
                        header,
                        members: Vec::new(),
                    },
                );
                (pos, true)
            }
        };

        let had_placeholder = !created_bucket
            && state.buckets[bucket].members.is_empty()
            && policy == EmptyGroupPolicy::KeepPlaceholder;

        let member = match &item_compare {
            Some(cmp) => state.buckets[bucket]
                .members
                .iter()
                .position(|m| cmp(m, &item) == Ordering::Greater)
                .unwrap_or(state.buckets[bucket].members.len()),
            None => state.buckets[bucket].members.len(),
        };
        for p in state.placements.iter_mut() {
            if p.0 == bucket && p.1 >= member {
                p.1 += 1;
            }
        }
        state.placements.insert(source, (bucket, member));
        state.buckets[bucket].members.insert(member, item);

        Placed {
            bucket,
            member,
            created_bucket,
            had_placeholder,
        }
    }

    fn apply_inserted(inner: &Arc<GroupedInner<T, G>>, source: usize, item: T) {
        let output = inner.output.lock().clone();
        let policy = *inner.policy.lock();
        let mut state = inner.state.lock();

        let placed = Self::place(inner, &mut state, source, item.clone());
        let offset = state.bucket_offset(placed.bucket, policy);
        if placed.created_bucket {
            let header = state.buckets[placed.bucket].header.clone();
            output
                .insert(offset, GroupedEntry::Header(header))
                .expect("group mapping out of sync with output");
        }
        if placed.had_placeholder {
            output
                .remove_at(offset + 1)
                .expect("group mapping out of sync with output");
        }
        output
            .insert(offset + 1 + placed.member, GroupedEntry::Item(item))
            .expect("group mapping out of sync with output");
    }

    fn apply_removed(inner: &Arc<GroupedInner<T, G>>, source: usize) {
        let output = inner.output.lock().clone();
        let policy = *inner.policy.lock();
        let mut state = inner.state.lock();

        let (bucket, member) = state.placements.remove(source);
        let row = state.member_row(bucket, member, policy);
        output
            .remove_at(row)
            .expect("group mapping out of sync with output");

        state.buckets[bucket].members.remove(member);
        for p in state.placements.iter_mut() {
            if p.0 == bucket && p.1 > member {
                p.1 -= 1;
            }
        }

        if state.buckets[bucket].members.is_empty() {
            let offset = state.bucket_offset(bucket, policy);
            match policy {
                EmptyGroupPolicy::RemoveHeader => {
                    output
                        .remove_at(offset)
                        .expect("group mapping out of sync with output");
                    state.buckets.remove(bucket);
                    for p in state.placements.iter_mut() {
                        if p.0 > bucket {
                            p.0 -= 1;
                        }
                    }
                }
                EmptyGroupPolicy::KeepPlaceholder => {
                    let header = state.buckets[bucket].header.clone();
                    output
                        .insert(offset + 1, GroupedEntry::Placeholder(header))
                        .expect("group mapping out of sync with output");
                }
            }
        }
    }

    fn apply_replaced(inner: &Arc<GroupedInner<T, G>>, source: usize, item: T) {
        let classifier = inner.classifier.lock().clone();
        let policy = *inner.policy.lock();

        let same_bucket = {
            let state = inner.state.lock();
            let (bucket, _) = state.placements[source];
            let headers: Vec<Arc<G>> = state.buckets.iter().map(|b| b.header.clone()).collect();
            let header = classifier(&headers, &item);
            Arc::ptr_eq(&header, &state.buckets[bucket].header)
        };

        if !same_bucket {
            // The item changed bucket; reuse the removal and insertion
            // paths (this may retire the old bucket per policy).
            Self::apply_removed(inner, source);
            Self::apply_inserted(inner, source, item);
            return;
        }

        let output = inner.output.lock().clone();
        let item_compare = inner.item_compare.lock().clone();
        let mut state = inner.state.lock();

        let (bucket, member) = state.placements[source];
        let old_row = state.member_row(bucket, member, policy);

        state.buckets[bucket].members.remove(member);
        let new_member = match &item_compare {
            Some(cmp) => state.buckets[bucket]
                .members
                .iter()
                .position(|m| cmp(m, &item) == Ordering::Greater)
                .unwrap_or(state.buckets[bucket].members.len()),
            None => member,
        };
        state.buckets[bucket].members.insert(new_member, item.clone());

        if new_member == member {
            output
                .replace(old_row, GroupedEntry::Item(item))
                .expect("group mapping out of sync with output");
            return;
        }

        for p in state.placements.iter_mut() {
            if p.0 == bucket {
                if p.1 > member {
                    p.1 -= 1;
                }
                if p.1 >= new_member {
                    p.1 += 1;
                }
            }
        }
        state.placements[source] = (bucket, new_member);

        output
            .remove_at(old_row)
            .expect("group mapping out of sync with output");
        output
            .insert(
                state.member_row(bucket, new_member, policy),
                GroupedEntry::Item(item),
            )
            .expect("group mapping out of sync with output");
    }

    fn rebuild(inner: &Arc<GroupedInner<T, G>>) {
        let input = inner.input.lock().clone();
        let output = inner.output.lock().clone();
        let policy = *inner.policy.lock();

        let mut state = GroupState::new();
        let items: Vec<T> = input.items().clone();
        for (source, item) in items.into_iter().enumerate() {
            Self::place(inner, &mut state, source, item);
        }

        let mut flattened = Vec::new();
        for bucket in &state.buckets {
            flattened.push(GroupedEntry::Header(bucket.header.clone()));
            if bucket.members.is_empty() && policy == EmptyGroupPolicy::KeepPlaceholder {
                flattened.push(GroupedEntry::Placeholder(bucket.header.clone()));
            }
            for member in &bucket.members {
                flattened.push(GroupedEntry::Item(member.clone()));
            }
        }
        tracing::debug!(
            target: "vellum::transform",
            groups = state.buckets.len(),
            rows = flattened.len(),
            "grouping rebuilt"
        );
        *inner.state.lock() = state;
        output.set_items(flattened);
    }
}

impl<T, G> CollectionTransform<T, GroupedEntry<T, G>> for GroupedTransform<T, G>
where
    T: Clone + Send + Sync + 'static,
    G: Send + Sync + 'static,
{
    fn output(&self) -> Arc<ObservableCollection<GroupedEntry<T, G>>> {
        self.inner.output.lock().clone()
    }

    fn set_input(&self, input: Arc<ObservableCollection<T>>) {
        *self.inner.input.lock() = input;
        self.resubscribe();
        Self::rebuild(&self.inner);
    }

    fn set_output(&self, output: Arc<ObservableCollection<GroupedEntry<T, G>>>) {
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

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn first_letter(existing: &[Arc<String>], name: &String) -> Arc<String> {
        let letter = name[..1].to_uppercase();
        existing
            .iter()
            .find(|g| ***g == letter)
            .cloned()
            .unwrap_or_else(|| Arc::new(letter))
    }

    /// Renders an output row as a short string for assertions.
    fn render(entry: &GroupedEntry<String, String>) -> String {
        match entry {
            GroupedEntry::Header(h) => format!("[{}]", h),
            GroupedEntry::Item(item) => item.clone(),
            GroupedEntry::Placeholder(h) => format!("<{}>", h),
        }
    }

    fn sorted_by_letter(
        input: Arc<ObservableCollection<String>>,
    ) -> GroupedTransform<String, String> {
        GroupedTransform::new(input, first_letter)
            .with_group_compare(|a: &String, b: &String| a.cmp(b))
            .with_item_compare(|a: &String, b: &String| a.cmp(b))
    }

    fn rendered(transform: &GroupedTransform<String, String>) -> Vec<String> {
        transform.output().items().iter().map(render).collect()
    }

    #[test]
    fn test_grouping_scenario() {
        let input = Arc::new(ObservableCollection::from_items(names(&[
            "Bob", "Alice", "Ann", "Charlie",
        ])));
        let grouped = sorted_by_letter(input);
        assert_eq!(
            rendered(&grouped),
            names(&["[A]", "Alice", "Ann", "[B]", "Bob", "[C]", "Charlie"])
        );
    }

    #[test]
    fn test_header_stability_across_membership_churn() {
        let input = Arc::new(ObservableCollection::from_items(names(&["Alice", "Bob"])));
        let grouped = sorted_by_letter(input.clone());

        let header_a = grouped.headers()[0].clone();
        assert_eq!(*header_a, "A");

        // Add and remove "A" members without ever emptying the bucket.
        input.push("Ann".to_string());
        input.remove_at(0).unwrap(); // Alice out, Ann remains
        input.push("Abel".to_string());

        assert!(Arc::ptr_eq(&grouped.headers()[0], &header_a));
        for entry in grouped.output().items().iter() {
            if let Some(h) = entry.header() {
                if **h == "A" {
                    assert!(Arc::ptr_eq(h, &header_a));
                }
            }
        }
    }

    #[test]
    fn test_emptied_bucket_removes_header() {
        let input = Arc::new(ObservableCollection::from_items(names(&["Alice", "Bob"])));
        let grouped = sorted_by_letter(input.clone());
        assert_eq!(grouped.group_count(), 2);

        input.remove_at(0).unwrap();
        assert_eq!(grouped.group_count(), 1);
        assert_eq!(rendered(&grouped), names(&["[B]", "Bob"]));
    }

    #[test]
    fn test_keep_placeholder_policy() {
        let input = Arc::new(ObservableCollection::from_items(names(&["Alice", "Bob"])));
        let grouped = GroupedTransform::new(input.clone(), first_letter)
            .with_group_compare(|a: &String, b: &String| a.cmp(b))
            .with_empty_group_policy(EmptyGroupPolicy::KeepPlaceholder);

        let header_a = grouped.headers()[0].clone();
        input.remove_at(0).unwrap();

        // Header survives with a placeholder row in place of the member.
        assert_eq!(grouped.group_count(), 2);
        assert_eq!(rendered(&grouped), names(&["[A]", "<A>", "[B]", "Bob"]));
        assert!(Arc::ptr_eq(&grouped.headers()[0], &header_a));

        // Refilling the bucket swaps the placeholder back for the member.
        input.push("Ann".to_string());
        assert_eq!(rendered(&grouped), names(&["[A]", "Ann", "[B]", "Bob"]));
        assert!(Arc::ptr_eq(&grouped.headers()[0], &header_a));
    }

    #[test]
    fn test_first_seen_order_without_comparators() {
        let input = Arc::new(ObservableCollection::from_items(names(&[
            "Bob", "Alice", "Ann",
        ])));
        let grouped = GroupedTransform::new(input, first_letter);
        assert_eq!(rendered(&grouped), names(&["[B]", "Bob", "[A]", "Alice", "Ann"]));
    }

    #[test]
    fn test_replace_within_bucket() {
        let input = Arc::new(ObservableCollection::from_items(names(&[
            "Alice", "Ann", "Bob",
        ])));
        let grouped = sorted_by_letter(input.clone());

        let header_a = grouped.headers()[0].clone();
        input.replace(0, "Amy".to_string()).unwrap(); // still an "A"

        assert_eq!(rendered(&grouped), names(&["[A]", "Amy", "Ann", "[B]", "Bob"]));
        assert!(Arc::ptr_eq(&grouped.headers()[0], &header_a));
    }

    #[test]
    fn test_replace_across_buckets() {
        let input = Arc::new(ObservableCollection::from_items(names(&["Alice", "Bob"])));
        let grouped = sorted_by_letter(input.clone());

        input.replace(0, "Carol".to_string()).unwrap();
        assert_eq!(rendered(&grouped), names(&["[B]", "Bob", "[C]", "Carol"]));
    }

    #[test]
    fn test_eventual_consistency_after_mixed_mutations() {
        let input = Arc::new(ObservableCollection::from_items(names(&[
            "Bob", "Alice", "Charlie",
        ])));
        let grouped = sorted_by_letter(input.clone());

        input.push("Ann".to_string());
        input.remove_at(0).unwrap();
        input.move_item(0, 1).unwrap();
        {
            let _scope = input.begin_update();
            input.push("Carol".to_string());
            input.push("Adam".to_string());
        }

        // Compare against a from-scratch derivation over the same items.
        let fresh_input = Arc::new(ObservableCollection::from_items(input.items().clone()));
        let fresh = sorted_by_letter(fresh_input);
        assert_eq!(rendered(&grouped), rendered(&fresh));
    }
}

//! A binary min-heap used as the open set of the A* search.
//!
//! The heap doesn't own its items, it stores indices into an arena (the cells of a
//! [crate::prelude::NavGrid]) and each item records its own position within the heap through
//! [HeapItem]. This gives `O(1)` membership tests and lets an item whose priority improved be
//! re-sifted in place (decrease-key) rather than pushed a second time.
//!
//! ```text
//!                 (f 28, h 14)
//!                /            \
//!       (f 30, h 20)        (f 28, h 18)
//!        /        \
//! (f 42, h 0)  (f 34, h 10)
//! ```
//!

use std::cmp::Ordering;

/// An item which can live inside a [NodeHeap]
pub trait HeapItem {
	/// Position of the item within the heap array, `None` when it was never pushed or has been popped
	fn get_heap_index(&self) -> Option<usize>;
	/// Record the position of the item within the heap array
	fn set_heap_index(&mut self, index: Option<usize>);
	/// `Ordering::Less` means `self` should leave the heap before `other`
	fn compare_priority(&self, other: &Self) -> Ordering;
}

/// Min-heap of arena indices
#[derive(Clone, Debug, Default)]
pub struct NodeHeap {
	/// Arena indices laid out as an implicit binary tree
	items: Vec<usize>,
}

impl NodeHeap {
	/// Create an empty heap
	pub fn new() -> Self {
		NodeHeap::default()
	}
	/// Create an empty heap able to hold `capacity` items without reallocating
	pub fn with_capacity(capacity: usize) -> Self {
		NodeHeap {
			items: Vec::with_capacity(capacity),
		}
	}
	/// Number of items in the heap
	pub fn len(&self) -> usize {
		self.items.len()
	}
	/// Is the heap empty
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
	/// Peek at the arena index with the highest priority
	pub fn peek(&self) -> Option<usize> {
		self.items.first().copied()
	}
	/// Remove every item, clearing the heap index of each one in the `arena`
	pub fn clear<T: HeapItem>(&mut self, arena: &mut [T]) {
		for id in self.items.drain(..) {
			arena[id].set_heap_index(None);
		}
	}
	/// Insert the item at `id` of the `arena`
	pub fn push<T: HeapItem>(&mut self, arena: &mut [T], id: usize) {
		let index = self.items.len();
		self.items.push(id);
		arena[id].set_heap_index(Some(index));
		self.sift_up(arena, index);
	}
	/// Remove the highest priority item and return its arena index
	pub fn pop<T: HeapItem>(&mut self, arena: &mut [T]) -> Option<usize> {
		if self.items.is_empty() {
			return None;
		}
		let last = self.items.len() - 1;
		self.swap(arena, 0, last);
		let id = self.items.pop()?;
		arena[id].set_heap_index(None);
		if !self.items.is_empty() {
			self.sift_down(arena, 0);
		}
		Some(id)
	}
	/// Is the item at `id` of the `arena` within the heap. The recorded heap index is checked
	/// against the heap array so an index left over from an earlier search doesn't count
	pub fn contains<T: HeapItem>(&self, arena: &[T], id: usize) -> bool {
		match arena[id].get_heap_index() {
			Some(index) => self.items.get(index) == Some(&id),
			None => false,
		}
	}
	/// Restore the heap ordering after the priority of the item at `id` improved
	pub fn update<T: HeapItem>(&mut self, arena: &mut [T], id: usize) {
		if let Some(index) = arena[id].get_heap_index() {
			if self.items.get(index) == Some(&id) {
				self.sift_up(arena, index);
			}
		}
	}
	/// Move the item at heap position `index` towards the root while it beats its parent
	fn sift_up<T: HeapItem>(&mut self, arena: &mut [T], mut index: usize) {
		while index > 0 {
			let parent = (index - 1) / 2;
			let ordering = arena[self.items[index]].compare_priority(&arena[self.items[parent]]);
			if ordering == Ordering::Less {
				self.swap(arena, index, parent);
				index = parent;
			} else {
				break;
			}
		}
	}
	/// Move the item at heap position `index` towards the leaves while a child beats it
	fn sift_down<T: HeapItem>(&mut self, arena: &mut [T], mut index: usize) {
		let len = self.items.len();
		loop {
			let left = index * 2 + 1;
			let right = left + 1;
			if left >= len {
				break;
			}
			let mut best = left;
			if right < len
				&& arena[self.items[right]].compare_priority(&arena[self.items[left]])
					== Ordering::Less
			{
				best = right;
			}
			if arena[self.items[best]].compare_priority(&arena[self.items[index]])
				== Ordering::Less
			{
				self.swap(arena, index, best);
				index = best;
			} else {
				break;
			}
		}
	}
	/// Swap two heap positions and record the new positions on the items
	fn swap<T: HeapItem>(&mut self, arena: &mut [T], a: usize, b: usize) {
		self.items.swap(a, b);
		arena[self.items[a]].set_heap_index(Some(a));
		arena[self.items[b]].set_heap_index(Some(b));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, Rng, SeedableRng};

	/// Minimal arena item ordered by `(f, h)`
	#[derive(Debug, Default, Clone, Copy)]
	struct Item {
		/// Primary priority
		f: i32,
		/// Tie breaker
		h: i32,
		/// Slot within the heap
		index: Option<usize>,
	}

	impl HeapItem for Item {
		fn get_heap_index(&self) -> Option<usize> {
			self.index
		}
		fn set_heap_index(&mut self, index: Option<usize>) {
			self.index = index;
		}
		fn compare_priority(&self, other: &Self) -> Ordering {
			self.f.cmp(&other.f).then(self.h.cmp(&other.h))
		}
	}

	/// Build an arena from `(f, h)` pairs
	fn arena(pairs: &[(i32, i32)]) -> Vec<Item> {
		pairs
			.iter()
			.map(|(f, h)| Item {
				f: *f,
				h: *h,
				index: None,
			})
			.collect()
	}

	#[test]
	fn pop_order_breaks_ties_on_h() {
		let mut items = arena(&[(30, 20), (28, 18), (42, 0), (28, 14), (34, 10)]);
		let mut heap = NodeHeap::new();
		for id in 0..items.len() {
			heap.push(&mut items, id);
		}
		let mut result = Vec::new();
		while let Some(id) = heap.pop(&mut items) {
			result.push(id);
		}
		let actual = vec![3, 1, 0, 4, 2];
		assert_eq!(actual, result);
	}
	#[test]
	fn contains_after_push_and_pop() {
		let mut items = arena(&[(5, 0), (3, 0), (9, 0)]);
		let mut heap = NodeHeap::new();
		heap.push(&mut items, 0);
		heap.push(&mut items, 1);
		assert!(heap.contains(&items, 0));
		assert!(heap.contains(&items, 1));
		assert!(!heap.contains(&items, 2));
		let popped = heap.pop(&mut items);
		assert_eq!(Some(1), popped);
		assert!(!heap.contains(&items, 1));
	}
	#[test]
	fn stale_index_is_not_membership() {
		let mut items = arena(&[(5, 0), (3, 0)]);
		// pretend a previous search left an index behind
		items[1].index = Some(0);
		let mut heap = NodeHeap::new();
		heap.push(&mut items, 0);
		assert!(!heap.contains(&items, 1));
	}
	#[test]
	fn decrease_key() {
		let mut items = arena(&[(10, 0), (20, 0), (30, 0)]);
		let mut heap = NodeHeap::new();
		for id in 0..items.len() {
			heap.push(&mut items, id);
		}
		items[2].f = 1;
		heap.update(&mut items, 2);
		assert_eq!(Some(2), heap.peek());
		assert_eq!(3, heap.len());
	}
	#[test]
	fn clear_resets_indices() {
		let mut items = arena(&[(1, 0), (2, 0)]);
		let mut heap = NodeHeap::with_capacity(2);
		heap.push(&mut items, 0);
		heap.push(&mut items, 1);
		heap.clear(&mut items);
		assert!(heap.is_empty());
		assert!(items.iter().all(|i| i.index.is_none()));
	}
	#[test]
	fn random_pushes_pop_sorted() {
		let mut rng = StdRng::seed_from_u64(42);
		let pairs: Vec<(i32, i32)> = (0..500)
			.map(|_| (rng.random_range(0..100), rng.random_range(0..100)))
			.collect();
		let mut items = arena(&pairs);
		let mut heap = NodeHeap::new();
		for id in 0..items.len() {
			heap.push(&mut items, id);
		}
		// improve a handful of items
		for id in (0..items.len()).step_by(7) {
			items[id].f -= 50;
			heap.update(&mut items, id);
		}
		let mut previous = (i32::MIN, i32::MIN);
		while let Some(id) = heap.pop(&mut items) {
			let current = (items[id].f, items[id].h);
			assert!(previous <= current);
			previous = current;
		}
	}
}

//! Keyed list reconciliation.
//!
//! Re-syncs materialized items against a new collection snapshot, walking the
//! incoming values in order. For position `i`:
//!
//! 1. search `values[i..]` for the same value (identity equality),
//! 2. found further down: swap the two items in place (one relocation, no
//!    item is rebuilt),
//! 3. found at `i`: already in position,
//! 4. not found: build a fresh item, either in place of the stale item at
//!    `i` (which is then destroyed) or appended at the end.
//!
//! Items past the new length are destroyed last. The scan is quadratic in the
//! worst case, which keeps reorders and small insertions/removals cheap for
//! list sizes typical of a UI.

use tracing::trace;

use crate::error::Result;
use crate::value::Value;

/// The structural operations reconciliation needs from its host.
pub trait Materialize {
    type Item;

    /// Build an item for `value` at the end of the list.
    fn append(&mut self, value: &Value) -> Result<Self::Item>;

    /// Build an item for `value` occupying `stale`'s position.
    fn replace(&mut self, stale: &Self::Item, value: &Value) -> Result<Self::Item>;

    /// Exchange the positions of two live items.
    fn swap(&mut self, a: &Self::Item, b: &Self::Item);

    fn destroy(&mut self, item: Self::Item);
}

/// Bring `values`/`items` (parallel, index-aligned) in line with `incoming`.
pub fn reconcile<M: Materialize>(
    host: &mut M,
    values: &mut Vec<Value>,
    items: &mut Vec<M::Item>,
    incoming: &[Value],
) -> Result<()> {
    debug_assert_eq!(values.len(), items.len());

    for (i, value) in incoming.iter().enumerate() {
        let found = values
            .iter()
            .skip(i)
            .position(|existing| existing.same(value))
            .map(|offset| offset + i);

        match found {
            Some(at) if at == i => {}
            Some(at) => {
                trace!(from = at, to = i, "moving list item");
                host.swap(&items[i], &items[at]);
                items.swap(i, at);
                values.swap(i, at);
            }
            None if i < items.len() => {
                trace!(index = i, "replacing list item");
                let fresh = host.replace(&items[i], value)?;
                let stale = std::mem::replace(&mut items[i], fresh);
                values[i] = value.clone();
                host.destroy(stale);
            }
            None => {
                trace!(index = i, "appending list item");
                let fresh = host.append(value)?;
                items.push(fresh);
                values.push(value.clone());
            }
        }
    }

    while items.len() > incoming.len() {
        values.pop();
        if let Some(item) = items.pop() {
            host.destroy(item);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    /// Items are ids into `order`, which mirrors the displayed sequence.
    #[derive(Default)]
    struct Recorder {
        next: usize,
        order: Vec<usize>,
        created: Vec<usize>,
        destroyed: Vec<usize>,
        swaps: usize,
    }

    impl Recorder {
        fn fresh(&mut self) -> usize {
            self.next += 1;
            self.created.push(self.next);
            self.next
        }
    }

    impl Materialize for Recorder {
        type Item = usize;

        fn append(&mut self, _: &Value) -> Result<usize> {
            let id = self.fresh();
            self.order.push(id);
            Ok(id)
        }

        fn replace(&mut self, stale: &usize, _: &Value) -> Result<usize> {
            let id = self.fresh();
            let at = self.order.iter().position(|x| x == stale).unwrap();
            self.order[at] = id;
            Ok(id)
        }

        fn swap(&mut self, a: &usize, b: &usize) {
            self.swaps += 1;
            let ia = self.order.iter().position(|x| x == a).unwrap();
            let ib = self.order.iter().position(|x| x == b).unwrap();
            self.order.swap(ia, ib);
        }

        fn destroy(&mut self, item: usize) {
            self.destroyed.push(item);
            self.order.retain(|x| *x != item);
        }
    }

    fn objects(n: usize) -> Vec<Value> {
        (0..n).map(|_| Value::from(Object::new())).collect()
    }

    fn seeded(initial: &[Value]) -> (Recorder, Vec<Value>, Vec<usize>) {
        let mut host = Recorder::default();
        let mut values = Vec::new();
        let mut items = Vec::new();
        reconcile(&mut host, &mut values, &mut items, initial).unwrap();
        host.created.clear();
        (host, values, items)
    }

    #[test]
    fn rotation_reuses_every_item() {
        let v = objects(3);
        let (a, b, c) = (v[0].clone(), v[1].clone(), v[2].clone());
        let (mut host, mut values, mut items) = seeded(&[a.clone(), b.clone(), c.clone()]);
        let before = items.clone();

        reconcile(&mut host, &mut values, &mut items, &[c.clone(), a.clone(), b.clone()]).unwrap();

        assert!(host.created.is_empty());
        assert!(host.destroyed.is_empty());
        assert_eq!(items, vec![before[2], before[0], before[1]]);
        assert_eq!(host.order, items);
        assert_eq!(values, vec![c, a, b]);
    }

    #[test]
    fn replace_and_truncate() {
        let v = objects(4);
        let (a, b, c, d) = (v[0].clone(), v[1].clone(), v[2].clone(), v[3].clone());
        let (mut host, mut values, mut items) = seeded(&[a.clone(), b, c]);
        let before = items.clone();

        reconcile(&mut host, &mut values, &mut items, &[a.clone(), d.clone()]).unwrap();

        assert_eq!(items[0], before[0], "A keeps its item");
        assert_eq!(host.created.len(), 1, "D gets a fresh item in B's slot");
        assert_eq!(host.destroyed, vec![before[1], before[2]]);
        assert_eq!(host.order, items);
        assert_eq!(values, vec![a, d]);
    }

    #[test]
    fn append_and_clear() {
        let v = objects(2);
        let (mut host, mut values, mut items) = seeded(&v[..1]);
        reconcile(&mut host, &mut values, &mut items, &v).unwrap();
        assert_eq!(host.created.len(), 1);
        assert_eq!(items.len(), 2);

        reconcile(&mut host, &mut values, &mut items, &[]).unwrap();
        assert!(items.is_empty());
        assert!(values.is_empty());
        assert!(host.order.is_empty());
    }

    #[test]
    fn primitives_match_by_value() {
        let initial = vec![Value::from("x"), Value::from("y")];
        let (mut host, mut values, mut items) = seeded(&initial);
        reconcile(&mut host, &mut values, &mut items, &[Value::from("y"), Value::from("x")]).unwrap();
        assert!(host.created.is_empty());
        assert_eq!(host.swaps, 1);
    }
}

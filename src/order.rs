use crate::entities::{goal, task};

/// A record carrying a manual sort key. Missing keys sort as 0.
pub trait Ordered {
    fn id(&self) -> i64;
    fn sort_order(&self) -> Option<i64>;
}

impl Ordered for task::Model {
    fn id(&self) -> i64 {
        self.id
    }

    fn sort_order(&self) -> Option<i64> {
        self.sort_order
    }
}

impl Ordered for goal::Model {
    fn id(&self) -> i64 {
        self.id
    }

    fn sort_order(&self) -> Option<i64> {
        self.sort_order
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OrderChange {
    pub id: i64,
    pub order: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reorder {
    /// Partition ids in their new order; position equals the new sort key.
    pub sequence: Vec<i64>,
    /// Only the records whose stored key differs from the new one.
    pub changes: Vec<OrderChange>,
}

/// Order for a record appended to `partition`: one past the current maximum.
pub fn next_order<T: Ordered>(partition: &[T]) -> i64 {
    partition
        .iter()
        .map(|item| item.sort_order().unwrap_or(0))
        .fold(0, i64::max)
        + 1
}

/// Moves `dragged` into the slot `target` holds and renumbers the partition
/// densely from 0. Returns `None` when either id is absent or both are equal.
pub fn reorder<T: Ordered>(partition: &[T], dragged: i64, target: i64) -> Option<Reorder> {
    if dragged == target {
        return None;
    }
    let mut items: Vec<&T> = partition.iter().collect();
    items.sort_by_key(|item| item.sort_order().unwrap_or(0));

    let from = items.iter().position(|item| item.id() == dragged)?;
    let to = items.iter().position(|item| item.id() == target)?;

    let moving = items.remove(from);
    items.insert(to, moving);

    let sequence: Vec<i64> = items.iter().map(|item| item.id()).collect();
    let changes = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let order = idx as i64;
            (item.sort_order() != Some(order)).then_some(OrderChange {
                id: item.id(),
                order,
            })
        })
        .collect();
    Some(Reorder { sequence, changes })
}

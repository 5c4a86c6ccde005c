//! Binding buckets.
//!
//! Every value a statement binds belongs to exactly one clause category.
//! The flattened binding array is the concatenation of the buckets in the
//! order the grammar emits the corresponding components.

use crate::value::SqlValue;

/// The clause category a bound value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingType {
    /// Raw select expressions and subselects.
    Select,
    /// Subquery sources in FROM.
    From,
    /// Join subqueries and ON predicates.
    Join,
    /// WHERE predicates.
    Where,
    /// Raw GROUP BY expressions.
    GroupBy,
    /// HAVING predicates.
    Having,
    /// Raw ORDER BY expressions.
    Order,
    /// Unioned queries.
    Union,
    /// Raw ORDER BY expressions applied to the union.
    UnionOrder,
}

impl BindingType {
    /// Bucket order matching the default select component order.
    pub const DEFAULT_ORDER: [Self; 9] = [
        Self::Select,
        Self::From,
        Self::Join,
        Self::Where,
        Self::GroupBy,
        Self::Having,
        Self::Order,
        Self::Union,
        Self::UnionOrder,
    ];

    /// Bucket order when a group limit compiles to `ROW_NUMBER()`: the
    /// orders are emitted inside the window, within the select list.
    pub const WINDOW_GROUP_LIMIT_ORDER: [Self; 9] = [
        Self::Select,
        Self::Order,
        Self::From,
        Self::Join,
        Self::Where,
        Self::GroupBy,
        Self::Having,
        Self::Union,
        Self::UnionOrder,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Bound values partitioned by clause category.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bindings {
    buckets: [Vec<SqlValue>; 9],
}

impl Bindings {
    /// Creates empty buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns one bucket.
    #[must_use]
    pub fn get(&self, kind: BindingType) -> &[SqlValue] {
        &self.buckets[kind.index()]
    }

    /// Appends values to a bucket.
    pub fn extend(&mut self, kind: BindingType, values: impl IntoIterator<Item = SqlValue>) {
        self.buckets[kind.index()].extend(values);
    }

    /// Empties a bucket and returns its previous contents.
    pub fn take(&mut self, kind: BindingType) -> Vec<SqlValue> {
        std::mem::take(&mut self.buckets[kind.index()])
    }

    /// Total number of values across buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Returns `true` when no bucket holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Concatenates buckets in `order`. Buckets not named are skipped.
    #[must_use]
    pub fn flatten(&self, order: &[BindingType]) -> Vec<SqlValue> {
        order
            .iter()
            .flat_map(|kind| self.get(*kind).iter().cloned())
            .collect()
    }

    /// Concatenates every bucket except those in `skip`, in default order.
    #[must_use]
    pub fn flatten_except(&self, skip: &[BindingType]) -> Vec<SqlValue> {
        let order: Vec<BindingType> = BindingType::DEFAULT_ORDER
            .into_iter()
            .filter(|kind| !skip.contains(kind))
            .collect();
        self.flatten(&order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_follows_requested_order() {
        let mut bindings = Bindings::new();
        bindings.extend(BindingType::Where, [SqlValue::Int(2)]);
        bindings.extend(BindingType::Select, [SqlValue::Int(1)]);
        bindings.extend(BindingType::Order, [SqlValue::Int(3)]);

        assert_eq!(
            bindings.flatten(&BindingType::DEFAULT_ORDER),
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        );
        assert_eq!(
            bindings.flatten(&[BindingType::Order, BindingType::Where]),
            vec![SqlValue::Int(3), SqlValue::Int(2)]
        );
        assert_eq!(
            bindings.flatten_except(&[BindingType::Select]),
            vec![SqlValue::Int(2), SqlValue::Int(3)]
        );
    }
}

//! Field wrappers used in patch types. The wrapper a patch field uses is that field's merge policy.

/// Overwrite policy: `set(v)` replaces the state field, the default leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite<T>(Option<T>);

impl<T> Default for Overwrite<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> Overwrite<T> {
    /// A write of `value`.
    pub fn set(value: T) -> Self {
        Self(Some(value))
    }

    /// True when this patch writes the field.
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// The written value, if any.
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Replaces `slot` when set.
    pub fn merge_into(self, slot: &mut T) {
        if let Some(value) = self.0 {
            *slot = value;
        }
    }
}

/// Append policy: items are added after whatever the field already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Append<T>(Vec<T>);

impl<T> Default for Append<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Append<T> {
    /// Appends a single item.
    pub fn one(item: T) -> Self {
        Self(vec![item])
    }

    /// Appends all items, in order.
    pub fn many(items: impl IntoIterator<Item = T>) -> Self {
        Self(items.into_iter().collect())
    }

    pub fn items(&self) -> &[T] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `slot = slot ++ items`.
    pub fn merge_into(self, slot: &mut Vec<T>) {
        slot.extend(self.0);
    }
}

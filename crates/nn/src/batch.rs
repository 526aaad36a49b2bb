/// Pending requests of one kind for one replica.
///
/// Slots are handed out in push order and stay valid until [`BatchBuffer::take`]
/// drains the buffer for the batched call.
#[derive(Debug, Clone)]
pub struct BatchBuffer<T> {
    items: Vec<T>,
}

impl<T> BatchBuffer<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drain all pending items, leaving the buffer empty but allocated
    pub fn take(&mut self) -> Vec<T> {
        let capacity = self.items.capacity();
        std::mem::replace(&mut self.items, Vec::with_capacity(capacity))
    }
}

impl<T> Default for BatchBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_push_order() {
        let mut batch = BatchBuffer::new();
        assert_eq!(batch.push("a"), 0);
        assert_eq!(batch.push("b"), 1);
        assert_eq!(batch.len(), 2);

        let items = batch.take();
        assert_eq!(items, vec!["a", "b"]);
        assert!(batch.is_empty());
        assert_eq!(batch.push("c"), 0);
    }
}

pub trait Batching: Iterator {
    /// Groups elements in batches of `batch_size`. The last, shorter batch is kept
    /// unless `drop_last` is set.
    fn batching(self, batch_size: usize, drop_last: bool) -> Batcher<Self>
    where
        Self: std::marker::Sized,
    {
        assert!(batch_size > 0, "batch size must be positive");
        Batcher {
            iterator: self,
            batch_size,
            drop_last,
        }
    }
}

pub struct Batcher<T: Iterator> {
    iterator: T,
    batch_size: usize,
    drop_last: bool,
}

impl<T: Iterator> Iterator for Batcher<T> {
    type Item = Vec<T::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut output = Vec::with_capacity(self.batch_size);
        for _i in 0..self.batch_size {
            match self.iterator.next() {
                Some(element) => output.push(element),
                None => break,
            }
        }
        if output.is_empty() || (self.drop_last && output.len() < self.batch_size) {
            return None;
        }
        Some(output)
    }
}

impl<T: ?Sized> Batching for T where T: Iterator {}

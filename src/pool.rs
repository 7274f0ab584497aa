//! Shape-keyed buffer pool for hot-path decoder tensors
//!
//! The beam-search loop rebuilds four batched tensors on every step; pooling
//! them avoids per-step allocation at keystroke rate. Buffers are keyed by
//! shape per element kind, handed out zero-initialized, and returned by an
//! RAII guard so release happens on every exit path, error paths included.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type FreeList<T> = Mutex<HashMap<Vec<usize>, Vec<Vec<T>>>>;

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for i64 {}
    impl Sealed for bool {}
}

/// Element kinds the pool stores. Sealed: the model contract only uses
/// f32, i64 and bool tensors.
pub trait PoolElement: sealed::Sealed + Copy + Default + 'static {
    fn free_list(pool: &TensorPool) -> &FreeList<Self>;
}

impl PoolElement for f32 {
    fn free_list(pool: &TensorPool) -> &FreeList<Self> {
        &pool.f32_buffers
    }
}

impl PoolElement for i64 {
    fn free_list(pool: &TensorPool) -> &FreeList<Self> {
        &pool.i64_buffers
    }
}

impl PoolElement for bool {
    fn free_list(pool: &TensorPool) -> &FreeList<Self> {
        &pool.bool_buffers
    }
}

/// Reuse pool for fixed-shape numeric buffers.
#[derive(Debug, Default)]
pub struct TensorPool {
    f32_buffers: FreeList<f32>,
    i64_buffers: FreeList<i64>,
    bool_buffers: FreeList<bool>,
    outstanding: AtomicUsize,
}

impl TensorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a zero-initialized buffer for the given shape.
    ///
    /// The returned guard dereferences to the flat element slice and returns
    /// the buffer to the pool when dropped. Guards must not be held across
    /// beam-search steps.
    pub fn acquire<T: PoolElement>(&self, shape: &[usize]) -> PooledBuffer<'_, T> {
        let numel: usize = shape.iter().product();
        let mut free = T::free_list(self).lock().expect("pool lock poisoned");
        let data = match free.get_mut(shape).and_then(|list| list.pop()) {
            Some(mut buf) => {
                buf.fill(T::default());
                buf
            }
            None => vec![T::default(); numel],
        };
        drop(free);

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        PooledBuffer {
            data,
            shape: shape.to_vec(),
            pool: self,
        }
    }

    /// Number of buffers currently acquired and not yet returned.
    /// Zero whenever no prediction is mid-step; tests assert this to catch
    /// leaks.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn release<T: PoolElement>(&self, shape: Vec<usize>, data: Vec<T>) {
        let mut free = T::free_list(self).lock().expect("pool lock poisoned");
        free.entry(shape).or_default().push(data);
        drop(free);
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard over a pooled buffer. Mutable access covers the flat element
/// storage; the shape is fixed at acquisition.
#[derive(Debug)]
pub struct PooledBuffer<'a, T: PoolElement> {
    data: Vec<T>,
    shape: Vec<usize>,
    pool: &'a TensorPool,
}

impl<T: PoolElement> PooledBuffer<'_, T> {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl<T: PoolElement> Deref for PooledBuffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: PoolElement> DerefMut for PooledBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: PoolElement> Drop for PooledBuffer<'_, T> {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        let shape = std::mem::take(&mut self.shape);
        self.pool.release(shape, data);
    }
}

//! Compacting FIFO queue shared by every buffer of the streaming pipeline.
//!
//! The pipeline moves three kinds of elements (raw bytes, packed token
//! pairs, and literal bytes) between stages that rarely agree on chunk
//! boundaries. A [`Queue`] is a fixed-size array with a read cursor and a
//! write end: consumers pop from the cursor, producers append at the end,
//! and [`Queue::compact`] moves the unread tail back to the start so the
//! next refill has room.
//!
//! The queue also counts every element that has ever been popped, which
//! gives callers a stable stream position for bookkeeping that must survive
//! compaction (the bit packer's pending slot, error offsets).

use crate::error::{IoContext, Result, SwdError};
use std::io::{ErrorKind, Read, Write};

/// A fixed-capacity FIFO with explicit compaction.
#[derive(Debug, Clone)]
pub struct Queue<T> {
    /// Backing storage; its length is the capacity.
    buf: Vec<T>,
    /// Read cursor.
    head: usize,
    /// Write end.
    tail: usize,
    /// Elements popped or consumed over the queue's lifetime.
    consumed: u64,
}

impl<T: Copy + Default> Queue<T> {
    /// Allocate a queue holding up to `capacity` elements.
    ///
    /// Allocation failure is reported as [`SwdError::NoMemory`].
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| SwdError::no_memory(capacity * std::mem::size_of::<T>()))?;
        buf.resize(capacity, T::default());

        Ok(Self {
            buf,
            head: 0,
            tail: 0,
            consumed: 0,
        })
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of unread elements.
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    /// Check if there is nothing left to read.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Check if every slot holds an unread element.
    pub fn is_full(&self) -> bool {
        self.len() == self.buf.len()
    }

    /// Slots available after the write end without compacting.
    pub fn spare(&self) -> usize {
        self.buf.len() - self.tail
    }

    /// Elements consumed since creation (or the last [`Queue::clear`]).
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Stream position one past the last unread element.
    pub fn end_position(&self) -> u64 {
        self.consumed + self.len() as u64
    }

    /// Unread elements in order.
    pub fn as_slice(&self) -> &[T] {
        &self.buf[self.head..self.tail]
    }

    /// Mutable access to the `index`-th unread element.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            self.buf.get_mut(self.head + index)
        } else {
            None
        }
    }

    /// Append one element, compacting first when the write end is at the
    /// physical end of the buffer.
    ///
    /// Returns `false` if the queue is full.
    #[must_use = "a full queue drops the element"]
    pub fn push(&mut self, value: T) -> bool {
        if self.tail == self.buf.len() {
            if self.head == 0 {
                return false;
            }
            self.compact();
        }
        self.buf[self.tail] = value;
        self.tail += 1;
        true
    }

    /// Remove and return the element at the read cursor.
    pub fn pop(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        let value = self.buf[self.head];
        self.head += 1;
        self.consumed += 1;
        if self.head == self.tail {
            self.head = 0;
            self.tail = 0;
        }
        Some(value)
    }

    /// Discard up to `count` unread elements.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.len());
        self.head += count;
        self.consumed += count as u64;
        if self.head == self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }

    /// Move the unread elements to the start of the buffer.
    pub fn compact(&mut self) {
        if self.head == 0 {
            return;
        }
        self.buf.copy_within(self.head..self.tail, 0);
        self.tail -= self.head;
        self.head = 0;
    }

    /// Make sure `additional` more elements can be appended, compacting and
    /// then growing the buffer if needed.
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<()> {
        if self.spare() >= additional {
            return Ok(());
        }
        self.compact();
        if self.spare() >= additional {
            return Ok(());
        }

        let needed = self.tail + additional - self.buf.len();
        self.buf
            .try_reserve_exact(needed)
            .map_err(|_| SwdError::no_memory(needed * std::mem::size_of::<T>()))?;
        let new_len = self.buf.len() + needed;
        self.buf.resize(new_len, T::default());
        Ok(())
    }

    /// Drop all elements and reset the consumed counter.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.consumed = 0;
    }
}

impl Queue<u8> {
    /// Append as many bytes from `data` as fit; returns the number taken.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        if self.spare() < data.len() {
            self.compact();
        }
        let count = data.len().min(self.spare());
        self.buf[self.tail..self.tail + count].copy_from_slice(&data[..count]);
        self.tail += count;
        count
    }

    /// Refill from `reader` into the free space after compacting.
    ///
    /// Returns the number of bytes read; `0` means the reader is exhausted
    /// (or the queue is full).
    pub fn fill_from<R: Read>(&mut self, reader: &mut R) -> Result<usize> {
        self.compact();
        if self.spare() == 0 {
            return Ok(0);
        }
        loop {
            match reader.read(&mut self.buf[self.tail..]) {
                Ok(n) => {
                    self.tail += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).on_read(),
            }
        }
    }

    /// Write the first `count` unread bytes to `writer` and consume them.
    pub fn drain_to<W: Write>(&mut self, writer: &mut W, count: usize) -> Result<()> {
        let count = count.min(self.len());
        if count == 0 {
            return Ok(());
        }
        writer
            .write_all(&self.buf[self.head..self.head + count])
            .on_write()?;
        self.consume(count);
        Ok(())
    }
}

//! Fixed-capacity handle tables
//!
//! A handle is the index of the slot holding the engine cursor. It stays
//! valid until released and is never handed out twice while in use.

use alloc::vec::Vec;

use crate::{Error, Result};

/// Handle type - slot index, opaque to callers
pub type Handle = usize;

/// Slot table for one kind of engine cursor
#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> HandleTable<T> {
    /// Create an empty table with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        HandleTable { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots in use
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// First free slot
    ///
    /// Nothing is claimed until [`bind`](Self::bind); this lets callers check
    /// capacity before creating the object that goes into the slot.
    pub fn allocate(&self) -> Result<Handle> {
        self.slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(Error::NoCapacity)
    }

    /// Store `value` in a slot obtained from [`allocate`](Self::allocate)
    pub fn bind(&mut self, handle: Handle, value: T) -> Result<()> {
        match self.slots.get_mut(handle) {
            Some(slot) if slot.is_none() => {
                *slot = Some(value);
                Ok(())
            }
            _ => Err(Error::InvalidHandle),
        }
    }

    /// Allocate and bind in one step
    pub fn insert(&mut self, value: T) -> Result<Handle> {
        let handle = self.allocate()?;
        self.bind(handle, value)?;
        Ok(handle)
    }

    /// Object behind a live handle
    pub fn resolve(&mut self, handle: Handle) -> Result<&mut T> {
        self.slots
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    pub fn get(&self, handle: Handle) -> Result<&T> {
        self.slots
            .get(handle)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    /// Free a slot, returning its object
    pub fn release(&mut self, handle: Handle) -> Result<T> {
        self.slots
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or(Error::InvalidHandle)
    }

    /// Free every slot, returning the objects in slot order
    pub fn drain(&mut self) -> Vec<T> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

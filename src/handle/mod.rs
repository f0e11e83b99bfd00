//! Handles to slots
//!
//! A handle is a name plus the index the name was last seen at. The index is
//! only a cache: every resolution checks that the slot at that index still
//! carries the name, and rescans by name when it does not. Slot lists are
//! rebuilt on every relink, so handles held across a hot reload keep working
//! without being re-fetched.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{name_not_found, ShaderResult};
use crate::name::Name;
use crate::slot::{NamedSlot, ShaderDefine, ShaderUniform};

const UNRESOLVED: u32 = u32::MAX;

pub struct Handle<S> {
    name: Name,
    index: Cell<u32>,
    marker: PhantomData<fn() -> S>,
}

pub type UniformHandle = Handle<ShaderUniform>;
pub type DefineHandle = Handle<ShaderDefine>;

impl<S> Handle<S> {
    /// Unresolved handle; the first use looks the name up
    pub fn new(name: Name) -> Self {
        Self {
            name,
            index: Cell::new(UNRESOLVED),
            marker: PhantomData,
        }
    }

    pub(crate) fn with_index(name: Name, index: usize) -> Self {
        let handle = Self::new(name);
        handle.index.set(index as u32);
        handle
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Last known position, if the handle was ever resolved
    pub fn cached_index(&self) -> Option<usize> {
        match self.index.get() {
            UNRESOLVED => None,
            index => Some(index as usize),
        }
    }
}

impl<S: NamedSlot> Handle<S> {
    /// Position of the handle's slot in `slots`, refreshing the cached index
    pub fn resolve_index(&self, slots: &[S]) -> ShaderResult<usize> {
        let cached = self.index.get() as usize;
        if slots.get(cached).is_some_and(|slot| slot.name() == &self.name) {
            return Ok(cached);
        }

        let index = find(slots, &self.name).ok_or_else(|| name_not_found(self.name.as_str()))?;
        if self.index.get() != UNRESOLVED {
            log::debug!(
                "[handle] '{}' moved from slot {} to {}",
                self.name,
                self.index.get(),
                index
            );
        }
        self.index.set(index as u32);
        Ok(index)
    }

    pub fn resolve<'a>(&self, slots: &'a [S]) -> ShaderResult<&'a S> {
        let index = self.resolve_index(slots)?;
        Ok(&slots[index])
    }

    pub fn resolve_mut<'a>(&self, slots: &'a mut [S]) -> ShaderResult<&'a mut S> {
        let index = self.resolve_index(slots)?;
        Ok(&mut slots[index])
    }
}

/// Linear scan by name; slot lists are tens of entries, not thousands
pub fn find<S: NamedSlot>(slots: &[S], name: &Name) -> Option<usize> {
    slots.iter().position(|slot| slot.name() == name)
}

impl<S> Clone for Handle<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            index: Cell::new(self.index.get()),
            marker: PhantomData,
        }
    }
}

impl<S> PartialEq for Handle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<S> Eq for Handle<S> {}

impl<S> fmt::Debug for Handle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("name", &self.name)
            .field("index", &self.cached_index())
            .finish()
    }
}

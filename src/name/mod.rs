//! Name interning
//!
//! Uniform and define names are looked up constantly (every handle
//! resolution compares them), so they are interned once into small ids.
//! Comparisons, ordering and hashing only ever look at the id.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// An interned identifier.
///
/// Names are only comparable with names produced by the same
/// [`NameInterner`]; the interner lives in the [`crate::ShaderContext`].
#[derive(Clone)]
pub struct Name {
    id: u32,
    text: Rc<str>,
}

impl Name {
    /// Interned id, stable for the lifetime of the interner
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({}: {:?})", self.id, &*self.text)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Default)]
struct NameTable {
    ids: HashMap<Rc<str>, u32>,
    texts: Vec<Rc<str>>,
}

/// Table of interned names.
///
/// Cloning is cheap and yields a handle to the same table. There is no
/// removal; the table lives as long as its last clone.
#[derive(Clone, Default)]
pub struct NameInterner {
    table: Rc<RefCell<NameTable>>,
}

impl NameInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `text`, returning the existing name if it was seen before
    pub fn intern(&self, text: &str) -> Name {
        let mut table = self.table.borrow_mut();
        if let Some((text, &id)) = table.ids.get_key_value(text) {
            return Name {
                id,
                text: text.clone(),
            };
        }

        let id = table.texts.len() as u32;
        let text: Rc<str> = Rc::from(text);
        table.texts.push(text.clone());
        table.ids.insert(text.clone(), id);
        Name { id, text }
    }

    /// Find an already interned name without inserting
    pub fn lookup(&self, text: &str) -> Option<Name> {
        let table = self.table.borrow();
        table.ids.get_key_value(text).map(|(text, &id)| Name {
            id,
            text: text.clone(),
        })
    }

    /// Text of an id, if the id belongs to this table
    pub fn resolve(&self, id: u32) -> Option<Name> {
        let table = self.table.borrow();
        table.texts.get(id as usize).map(|text| Name {
            id,
            text: text.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.table.borrow().texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for NameInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameInterner")
            .field("len", &self.len())
            .finish()
    }
}

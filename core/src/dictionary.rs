use std::collections::HashMap;

use crate::error::{Corruption, Error, Result};

/// Bidirectional string <-> dense id mapping. Ids are handed out in first-seen order
/// and never reassigned, so `keys[id]` is always the key that was interned as `id`.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    ids: HashMap<String, u32>,
    keys: Vec<String>,
}

impl Dictionary {
    pub fn new() -> Self { Self::default() }

    /// Returns the id for `key`, allocating the next unused one if the key is new.
    pub fn intern(&mut self, key: &str) -> Result<u32> {
        if let Some(&id) = self.ids.get(key) {
            return Ok(id);
        }
        let id = u32::try_from(self.keys.len()).map_err(|_| Error::IdSpaceExhausted("dictionary"))?;
        self.ids.insert(key.to_owned(), id);
        self.keys.push(key.to_owned());
        Ok(id)
    }

    pub fn id(&self, key: &str) -> Option<u32> { self.ids.get(key).copied() }

    pub fn key(&self, id: u32) -> Option<&str> { self.keys.get(id as usize).map(String::as_str) }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    /// Keys in id order.
    pub fn keys(&self) -> &[String] { &self.keys }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.keys.iter().enumerate().map(|(id, key)| (id as u32, key.as_str()))
    }

    /// Rebuilds a dictionary from keys stored in id order. `what` names the
    /// dictionary in the error if a key repeats.
    pub(crate) fn from_keys(keys: Vec<String>, what: &'static str) -> Result<Self> {
        let mut ids = HashMap::with_capacity(keys.len());
        for (id, key) in keys.iter().enumerate() {
            let id = u32::try_from(id).map_err(|_| Error::IdSpaceExhausted(what))?;
            if ids.insert(key.clone(), id).is_some() {
                return Err(Corruption::DuplicateKey { what, key: key.clone() }.into());
            }
        }
        Ok(Self { ids, keys })
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool { self.keys == other.keys }
}

impl Eq for Dictionary {}

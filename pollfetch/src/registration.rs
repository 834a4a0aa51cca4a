use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::os::fd::RawFd;

use mio::Token;

use crate::error::RegistryError;
use crate::selector::Interest;

/// One handle's current interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub fd: RawFd,
    pub interest: Interest,
}

/// Handle → interest, at most one entry per handle.
///
/// Switching interest is always remove-then-insert: the table never holds
/// two interests for one handle.
#[derive(Debug, Default)]
pub struct RegistrationTable {
    entries: HashMap<Token, Registration>,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Fails if `token` already has one.
    pub fn insert(
        &mut self,
        token: Token,
        fd: RawFd,
        interest: Interest,
    ) -> Result<(), RegistryError> {
        match self.entries.entry(token) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateRegistration(token)),
            Entry::Vacant(slot) => {
                slot.insert(Registration { fd, interest });
                Ok(())
            }
        }
    }

    /// Remove an entry. Fails if `token` has none.
    pub fn remove(&mut self, token: Token) -> Result<Registration, RegistryError> {
        self.entries
            .remove(&token)
            .ok_or(RegistryError::NotRegistered(token))
    }

    pub fn get(&self, token: Token) -> Option<&Registration> {
        self.entries.get(&token)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.entries.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

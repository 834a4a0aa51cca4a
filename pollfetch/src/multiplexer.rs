use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

use mio::Token;
use tracing::trace;

use crate::error::RegistryError;
use crate::registration::RegistrationTable;
use crate::selector::{Interest, Notify, Readiness, Selector};

/// Registration table bound to a selector.
///
/// Every entry in the table is registered with the selector and vice versa.
/// [`wait_for_events`](Self::wait_for_events) is the only call that blocks.
pub struct Multiplexer<S> {
    selector: S,
    table: RegistrationTable,
    ready: Vec<Readiness>,
}

impl<S: Selector> Multiplexer<S> {
    pub fn new(selector: S) -> Self {
        Multiplexer {
            selector,
            table: RegistrationTable::new(),
            ready: Vec::new(),
        }
    }

    /// Register `interest` for `token`. Fails with `DuplicateRegistration`
    /// if the handle already has an entry; the selector is not touched.
    pub fn register(
        &mut self,
        token: Token,
        fd: RawFd,
        interest: Interest,
    ) -> Result<(), RegistryError> {
        self.table.insert(token, fd, interest)?;
        if let Err(e) = self.selector.register(fd, token, interest) {
            let _ = self.table.remove(token);
            return Err(RegistryError::Io(e));
        }
        trace!(token = token.0, ?interest, "registered");
        Ok(())
    }

    /// Remove the handle's entry. Fails with `NotRegistered` if absent.
    ///
    /// If the selector refuses, the entry stays in the table.
    pub fn unregister(&mut self, token: Token) -> Result<Interest, RegistryError> {
        let fd = self
            .table
            .get(token)
            .ok_or(RegistryError::NotRegistered(token))?
            .fd;
        self.selector.deregister(fd)?;
        let registration = self.table.remove(token)?;
        trace!(token = token.0, interest = ?registration.interest, "unregistered");
        Ok(registration.interest)
    }

    /// Block until the OS reports registered handles ready, then return
    /// each `(handle, interest)` pair that fired, in reported order.
    ///
    /// An empty result means the wait timed out or was interrupted by a
    /// [`Notify`] wake-up.
    pub fn wait_for_events(
        &mut self,
        timeout: Option<Duration>,
    ) -> io::Result<Vec<(Token, Interest)>> {
        self.ready.clear();
        self.selector.select(&mut self.ready, timeout)?;

        let mut fired = Vec::with_capacity(self.ready.len());
        for readiness in &self.ready {
            match self.table.get(readiness.token) {
                Some(reg) if readiness.satisfies(reg.interest) => {
                    fired.push((readiness.token, reg.interest));
                }
                Some(reg) => {
                    trace!(token = readiness.token.0, interest = ?reg.interest, ?readiness, "readiness does not match interest");
                }
                None => {
                    trace!(token = readiness.token.0, "readiness for unregistered handle");
                }
            }
        }
        Ok(fired)
    }

    pub fn is_registered(&self, token: Token) -> bool {
        self.table.contains(token)
    }

    /// Current interest for `token`, if registered.
    pub fn interest(&self, token: Token) -> Option<Interest> {
        self.table.get(token).map(|reg| reg.interest)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn notifier(&self) -> io::Result<Arc<dyn Notify>> {
        self.selector.notifier()
    }

    pub fn selector(&self) -> &S {
        &self.selector
    }

    #[cfg(test)]
    pub(crate) fn selector_mut(&mut self) -> &mut S {
        &mut self.selector
    }
}

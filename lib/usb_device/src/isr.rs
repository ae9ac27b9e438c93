use log::{error, warn};
use spinning_top::Spinlock;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReentrancyError {
    /// The cell is already being serviced. This means the interrupt was not masked while the
    /// previous event was handled.
    Reentered,
    NotInstalled,
    AlreadyInstalled,
}

/// Holds a value (usually a `UsbDevice`) in a `static`, so it can be reached from an interrupt
/// handler. The value is installed once, at init, and then only ever accessed through
/// [`InterruptCell::service`], which refuses to hand it out a second time if it is entered while
/// already in use.
pub struct InterruptCell<T> {
    inner: Spinlock<Option<T>>,
}

impl<T> InterruptCell<T> {
    pub const fn new() -> InterruptCell<T> {
        InterruptCell { inner: Spinlock::new(None) }
    }

    pub fn install(&self, value: T) -> Result<(), ReentrancyError> {
        let mut inner = self.inner.try_lock().ok_or(ReentrancyError::Reentered)?;
        if inner.is_some() {
            warn!("Tried to install a value in an InterruptCell twice");
            return Err(ReentrancyError::AlreadyInstalled);
        }
        *inner = Some(value);
        Ok(())
    }

    /// Run `f` with exclusive access to the value. This never spins: if the cell is already in use,
    /// we must have been called re-entrantly, and waiting would deadlock.
    pub fn service<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ReentrancyError> {
        let Some(mut inner) = self.inner.try_lock() else {
            error!("InterruptCell entered re-entrantly. Is the interrupt masked while it is serviced?");
            return Err(ReentrancyError::Reentered);
        };
        let value = inner.as_mut().ok_or(ReentrancyError::NotInstalled)?;
        Ok(f(value))
    }
}

impl<T> Default for InterruptCell<T> {
    fn default() -> Self {
        InterruptCell::new()
    }
}

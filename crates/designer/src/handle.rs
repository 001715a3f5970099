//! Imperative handle exposed to the owning page.
//!
//! The owner keeps a [`HandleSlot`]; a mounted designer publishes a
//! [`DesignerHandle`] into it and withdraws it on unmount. Handles hold a
//! weak reference, so calling one after the designer is gone fails with
//! [`HandleError::Unmounted`] instead of keeping the designer alive.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::debug;

use crate::designer::{Designer, Inner};
use crate::export::{ExportError, ExportOutcome};

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("designer is not mounted")]
    Unmounted,

    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Clone)]
pub struct DesignerHandle {
    designer: Weak<Inner>,
}

impl std::fmt::Debug for DesignerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignerHandle")
            .field("alive", &(self.designer.strong_count() > 0))
            .finish()
    }
}

impl DesignerHandle {
    pub(crate) const fn new(designer: Weak<Inner>) -> Self {
        Self { designer }
    }

    fn designer(&self) -> Result<Designer, HandleError> {
        self.designer
            .upgrade()
            .map(Designer::from_inner)
            .ok_or(HandleError::Unmounted)
    }

    /// Open the save prompt pre-filled with the current metadata
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Unmounted` if the designer is gone.
    pub fn show_save_dialog(&self) -> Result<(), HandleError> {
        self.designer()?.show_save_dialog();
        Ok(())
    }

    /// Restore the default diagram and clear selection
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Unmounted` if the designer is gone.
    pub fn reset_designer(&self) -> Result<(), HandleError> {
        self.designer()?.reset_designer();
        Ok(())
    }

    /// Run the export pipeline
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Unmounted` if the designer is gone, or the
    /// export failure (already notified to the user).
    pub async fn export_pdf(&self) -> Result<ExportOutcome, HandleError> {
        let designer = self.designer()?;
        Ok(designer.export_pdf().await?)
    }
}

/// Where the owner receives the handle, like a component ref
#[derive(Debug, Clone, Default)]
pub struct HandleSlot {
    current: Rc<RefCell<Option<DesignerHandle>>>,
}

impl HandleSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The published handle, if a designer is mounted
    #[must_use]
    pub fn get(&self) -> Option<DesignerHandle> {
        self.current.borrow().clone()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.current.borrow().is_some()
    }
}

/// Keeps a handle published; withdraws it on drop
#[derive(Debug)]
#[must_use = "the handle is withdrawn as soon as the guard drops"]
pub struct MountGuard {
    slot: HandleSlot,
    handle: DesignerHandle,
}

impl MountGuard {
    pub(crate) fn register(slot: &HandleSlot, handle: DesignerHandle) -> Self {
        *slot.current.borrow_mut() = Some(handle.clone());
        debug!("Designer handle published");
        Self {
            slot: slot.clone(),
            handle,
        }
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        let mut current = self.slot.current.borrow_mut();
        // A later mount may have replaced us; leave its handle alone
        if current
            .as_ref()
            .is_some_and(|h| Weak::ptr_eq(&h.designer, &self.handle.designer))
        {
            *current = None;
            debug!("Designer handle withdrawn");
        }
    }
}

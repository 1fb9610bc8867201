//! Modal editor state shared by every admin collection screen.

use uuid::Uuid;

use crate::domain::ordering::OrderedItem;

/// Which form, if any, is open.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModalMode<T> {
    #[default]
    Closed,
    Create,
    Edit(T),
}

/// Gate in front of destructive actions.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DeleteConfirmation<T> {
    #[default]
    Idle,
    Confirming(T),
}

/// Request produced by submitting the open form.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction<D> {
    Create(D),
    Update { id: Uuid, draft: D },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Editor<T> {
    mode: ModalMode<T>,
    delete: DeleteConfirmation<T>,
    submitting: bool,
    deleting: bool,
}

impl<T: OrderedItem> Editor<T> {
    pub fn new() -> Self {
        Self {
            mode: ModalMode::Closed,
            delete: DeleteConfirmation::Idle,
            submitting: false,
            deleting: false,
        }
    }

    pub fn mode(&self) -> &ModalMode<T> {
        &self.mode
    }

    pub fn delete_state(&self) -> &DeleteConfirmation<T> {
        &self.delete
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.mode, ModalMode::Closed)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    pub fn editing(&self) -> Option<&T> {
        match &self.mode {
            ModalMode::Edit(item) => Some(item),
            _ => None,
        }
    }

    pub fn open_create(&mut self) {
        if !self.submitting {
            self.mode = ModalMode::Create;
        }
    }

    pub fn open_edit(&mut self, item: T) {
        if !self.submitting {
            self.mode = ModalMode::Edit(item);
        }
    }

    /// Dismiss the form. Ignored while a submission is in flight.
    pub fn close(&mut self) {
        if !self.submitting {
            self.mode = ModalMode::Closed;
        }
    }

    /// Turn the submitted draft into a request; `None` when closed or already submitting.
    pub fn submit<D>(&mut self, draft: D) -> Option<EditorAction<D>> {
        if self.submitting {
            return None;
        }
        let action = match &self.mode {
            ModalMode::Closed => return None,
            ModalMode::Create => EditorAction::Create(draft),
            ModalMode::Edit(item) => EditorAction::Update {
                id: item.id(),
                draft,
            },
        };
        self.submitting = true;
        Some(action)
    }

    /// Report the outcome of the last submission; the modal closes on success only.
    pub fn finish_submit(&mut self, succeeded: bool) {
        self.submitting = false;
        if succeeded {
            self.mode = ModalMode::Closed;
        }
    }

    pub fn request_delete(&mut self, item: T) {
        if !self.deleting {
            self.delete = DeleteConfirmation::Confirming(item);
        }
    }

    pub fn cancel_delete(&mut self) {
        if !self.deleting {
            self.delete = DeleteConfirmation::Idle;
        }
    }

    /// Confirm the pending deletion and return the id to delete.
    pub fn confirm_delete(&mut self) -> Option<Uuid> {
        if self.deleting {
            return None;
        }
        match &self.delete {
            DeleteConfirmation::Confirming(item) => {
                self.deleting = true;
                Some(item.id())
            }
            DeleteConfirmation::Idle => None,
        }
    }

    /// The confirmation closes on success; on failure it stays open for a retry.
    pub fn finish_delete(&mut self, succeeded: bool) {
        self.deleting = false;
        if succeeded {
            self.delete = DeleteConfirmation::Idle;
        }
    }
}

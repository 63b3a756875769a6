pub mod editor;
pub mod focus;
pub mod projection;
pub mod sanitize;
pub mod state;

pub use editor::{Confirm, FormSubmission, LinkEditor};
pub use focus::{FocusController, FocusTarget, ModalDialog};
pub use projection::{EditForm, Projection};
pub use state::{FormData, LinkAppState};

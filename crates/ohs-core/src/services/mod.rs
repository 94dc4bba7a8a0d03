//! Services shared by every front end.

mod local_store;
pub mod resources;

pub use local_store::LocalStore;
pub use resources::{CorrectiveActionService, DocumentService, ResourceService};

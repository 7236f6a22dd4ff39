//! SurrealDB repository implementations.

mod association;
pub(crate) mod person;
mod session;

pub use association::SurrealAssociationRepository;
pub use person::SurrealPersonRepository;
pub use session::SurrealSessionRepository;

pub use crate::search::SurrealPersonSearch;

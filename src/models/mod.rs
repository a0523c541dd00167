pub mod user;
pub mod card;
pub mod tag;
pub mod link;
pub mod card_request;

// Re-export models for convenience
pub use user::{User, UserCredentials, CardAccessUser};
pub use card::{Card, CardWithTags, CardInput, CardFilter};
pub use tag::{Tag, TagInput};
pub use link::Link;
pub use card_request::{CardRequest, CardRequestStatus, CreateCardRequest};

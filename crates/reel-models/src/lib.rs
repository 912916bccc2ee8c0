pub mod movie;
pub mod pending;
pub mod persona;
pub mod rating;

pub use movie::{ImageRef, Movie};
pub use pending::PendingAction;
pub use persona::Persona;
pub use rating::UserRating;

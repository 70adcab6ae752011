//! Feature modules hosted by the monolith

pub mod identity;
pub mod web;
pub mod workout;

pub use identity::IdentityModule;
pub use web::WebModule;
pub use workout::WorkoutModule;

//! HTTP surface: the HTML form, its result page, and a JSON twin of the
//! form endpoint for scripted clients.

pub mod error;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;

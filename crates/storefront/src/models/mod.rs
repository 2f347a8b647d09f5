//! Domain models local to the storefront.

pub mod session;

pub use session::CurrentUser;

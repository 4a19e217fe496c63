pub mod inspect;
pub mod session;
pub mod state;

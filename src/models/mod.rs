pub mod audit;
pub mod event;
pub mod feedback;
pub mod ticket;
pub mod user;

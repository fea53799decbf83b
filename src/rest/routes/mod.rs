pub mod health;
pub mod notify;
pub mod query;
pub mod terminate;

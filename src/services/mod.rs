pub mod order_queries;
pub mod order_state;
pub mod orders;
pub mod parties;

pub mod order_writer;

pub use order_writer::{OrderOutcome, OrderParams, OrderStore, OrderWriter};

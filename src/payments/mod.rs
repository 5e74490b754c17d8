pub mod error;
pub mod gateway;
pub mod stripe;
pub mod types;
pub mod utils;

pub use error::{PaymentError, PaymentResult};
pub use gateway::PaymentGateway;
pub use stripe::StripeClient;

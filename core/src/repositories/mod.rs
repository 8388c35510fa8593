pub mod memory;
pub mod otp;
pub mod outbox;

pub use memory::InMemoryOutboxStore;
pub use otp::OtpRepository;
pub use outbox::DeliveryQueue;

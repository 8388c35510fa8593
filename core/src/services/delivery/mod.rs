//! Channel delivery: the sender port, notification copy, and the dispatcher
//! routing each task to the sender registered for its channel.

mod dispatcher;
mod message;
mod sender;

pub use dispatcher::Dispatcher;
pub use message::{email_body, email_subject, text_message};
pub use sender::{ChannelSender, DEFAULT_SEND_TIMEOUT};

#[cfg(test)]
pub(crate) mod testing;

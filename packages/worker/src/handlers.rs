pub mod message;

pub use message::{HandlerSettings, MessageHandler, MessageReport};

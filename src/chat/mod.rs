mod conversation;
pub mod format;
mod session;

pub use conversation::{APOLOGY, Conversation, SendOutcome};
pub use session::{ChatSession, SessionStore};

pub mod conversation;
pub mod user;

pub use conversation::{ConversationState, ConversationStore, Message, Speaker};
pub use user::UserStore;

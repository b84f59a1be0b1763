mod answers;
mod chat;
mod question;
mod rating;
mod recommendation;

pub use answers::*;
pub use chat::*;
pub use question::*;
pub use rating::*;
pub use recommendation::*;

pub mod chat;
pub mod prompts;
pub mod providers;
pub mod quiz;
pub mod recommendations;
pub mod response_parser;
pub mod viewing_tips;

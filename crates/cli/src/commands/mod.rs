pub mod chat;
pub mod coach;
pub mod history;
pub mod onboard;
pub mod runtime;

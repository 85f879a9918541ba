pub mod grades;
pub mod headers;
pub mod notify;
pub mod session;
pub mod telegram;

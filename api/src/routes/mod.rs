pub mod ask;
pub mod files;
pub mod health;
pub mod history;

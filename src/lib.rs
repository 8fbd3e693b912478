pub mod auth;
pub mod db;
pub mod mailer;
pub mod models;
pub mod routes;
pub mod settings;
pub mod state;
pub mod wizard;

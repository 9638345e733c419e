mod auth;
mod discussions;
mod questions;

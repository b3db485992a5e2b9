/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: health check endpoint
/// - `auth`: authentication endpoints (signup, login)
/// - `items`: item CRUD and voting endpoints

pub mod auth;
pub mod health;
pub mod items;

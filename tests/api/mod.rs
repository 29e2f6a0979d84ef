//! REST API tests

mod conversation_tests;
mod health_tests;
mod user_tests;

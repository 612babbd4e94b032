//! Integration tests for the SparkUp chat server.

mod chat_test;
mod helpers;
mod ws_test;

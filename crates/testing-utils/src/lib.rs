//! # Movie Backend Testing Utils
//!
//! Shared testing utilities for the movie backend workspace.
//!
//! ## Features
//!
//! - **Mock Brokers**: recording, failing, slow and panicking `TaskBroker` doubles
//! - **Mock Movie Search**: canned OMDB results without network access
//! - **RabbitMQ Test Container**: a real broker for end-to-end dispatch tests
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! movie-backend-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! ```rust,ignore
//! use movie_backend_testing_utils::mocks::RecordingBroker;
//! use movie_backend_testing_utils::containers::RabbitMqTestContainer;
//! ```

pub mod containers;
pub mod mocks;

pub use containers::*;
pub use mocks::*;

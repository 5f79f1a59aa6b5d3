// Tabio services
// Stateless or backend-facing pieces: prompting, parsing, normalization, secret sealing.

pub mod category_normalizer;
pub mod crypto_service;
pub mod on_device;
pub mod prompt_builder;
pub mod prompt_runner;
pub mod remote;
pub mod response_parser;

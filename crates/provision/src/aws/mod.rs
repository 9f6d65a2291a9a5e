//! AWS implementations of the provider traits (Imperative Shell).

mod apigateway;
mod client;
mod dynamodb;
mod error;
mod iam;
mod lambda;

pub use client::AwsCloud;

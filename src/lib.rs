pub mod config;
pub mod core;
pub mod runtime;
pub mod session;
pub mod tools;

// Reasoning loop and step parsing
pub mod agent;

// Model tiers and skill profiles
pub mod llm;
pub mod skills;

// Optional components
pub mod cli;
pub mod logging;

#[cfg(test)]
mod test_support;

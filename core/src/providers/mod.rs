pub mod factory;
pub mod openai;
#[cfg(test)]
pub(crate) mod scripted;

pub use factory::create_provider;
pub use openai::OpenAIProvider;

//! Concrete collaborators for the automaton runtime.
//!
//! - **OpenAiCompatClient**: reasoning backend over any OpenAI-compatible
//!   chat completions endpoint
//! - **LocalSandbox**: execution backend on the host shell

pub mod local_sandbox;
pub mod openai_compat;

pub use local_sandbox::LocalSandbox;
pub use openai_compat::OpenAiCompatClient;

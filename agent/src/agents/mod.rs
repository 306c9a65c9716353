pub mod planner;
pub mod say;

pub use planner::{AzureOpenAiPlanner, Planner, PromptTemplate};
pub use say::{format_response, say_command};

//! Scripted tool runner for tests
//!
//! Records every invocation and answers from a handler closure, so callers
//! can assert exactly which commands were issued.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{ToolInvocation, ToolOutput, ToolResult, ToolRunner};

type Handler = Box<dyn Fn(&ToolInvocation) -> ToolResult<ToolOutput> + Send + Sync>;

pub struct ScriptedRunner {
    handler: Handler,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl ScriptedRunner {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ToolInvocation) -> ToolResult<ToolOutput> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation so far, in order
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().clone()
    }

    /// Argument lists of every invocation, joined with spaces
    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|call| call.args.join(" "))
            .collect()
    }

    /// Number of invocations whose first argument is `verb`
    pub fn count_verb(&self, verb: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.args.first().map(String::as_str) == Some(verb))
            .count()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
        self.calls.lock().push(invocation.clone());
        (self.handler)(invocation)
    }
}

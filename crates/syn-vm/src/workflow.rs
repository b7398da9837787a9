//! Workflow composer.
//!
//! A workflow is an ordered list of catalogued opcode names executed in
//! sequence under one context, with an optional trigger tag and webhook
//! URL. Unknown names reject at composition time, not at execution.

use crate::context::ExecutionContext;
use crate::dispatcher::{Dispatcher, Flow};
use crate::errors::{VmError, VmResult};

/// A composed, validated opcode sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    /// Workflow name.
    pub name: String,
    /// Catalogued opcode names, in execution order.
    pub ops: Vec<String>,
    /// Optional trigger tag (e.g. "on-block").
    pub trigger: Option<String>,
    /// Optional webhook notified after execution.
    pub webhook_url: Option<String>,
}

/// Composes and runs workflows against a dispatcher.
pub struct WorkflowComposer<'d> {
    dispatcher: &'d Dispatcher,
}

impl<'d> WorkflowComposer<'d> {
    /// Composer over `dispatcher`'s frozen catalogue.
    pub fn new(dispatcher: &'d Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Validate and build a workflow.
    ///
    /// # Errors
    ///
    /// `UnknownOpcodeName` for any name outside the catalogue.
    pub fn compose(
        &self,
        name: impl Into<String>,
        ops: Vec<String>,
        trigger: Option<String>,
        webhook_url: Option<String>,
    ) -> VmResult<Workflow> {
        for op in &ops {
            if !self.dispatcher.knows(op) {
                return Err(VmError::UnknownOpcodeName(op.clone()));
            }
        }
        Ok(Workflow {
            name: name.into(),
            ops,
            trigger,
            webhook_url,
        })
    }

    /// Execute a workflow's ops in order under one context. A `Stop` or
    /// `Return` ends the run successfully; a `Revert` surfaces as an
    /// error for the enclosing frame to roll back.
    pub fn execute(
        &self,
        workflow: &Workflow,
        ctx: &mut ExecutionContext<'_>,
    ) -> VmResult<Vec<u8>> {
        for op in &workflow.ops {
            match self.dispatcher.dispatch_name(op, ctx)? {
                Flow::Continue => {}
                Flow::Stop => return Ok(Vec::new()),
                Flow::Return(data) => return Ok(data),
                Flow::Revert(data) => return Err(VmError::Revert(data)),
            }
        }
        Ok(Vec::new())
    }
}

//! Workflow builder with registration validation.

use super::{Workflow, WorkflowConfig};
use crate::core::EventTag;
use crate::errors::{ErrorInfo, ValidationError};
use crate::observability::{NoOpObserver, Observer};
use crate::steps::Step;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Builder for creating validated workflows.
#[derive(Debug)]
pub struct WorkflowBuilder {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    config: WorkflowConfig,
    observer: Arc<dyn Observer>,
}

impl WorkflowBuilder {
    /// Creates a new workflow builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            config: WorkflowConfig::default(),
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Registers a step.
    #[must_use]
    pub fn step(self, step: impl Step + 'static) -> Self {
        self.step_arc(Arc::new(step))
    }

    /// Registers a shared step.
    #[must_use]
    pub fn step_arc(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets the run configuration.
    #[must_use]
    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the observer notified about every run.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of registered steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validates the registrations and builds the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the step set is empty, two steps share a name or
    /// an accepted tag, a step accepts a reserved tag, a declared emission
    /// has no consumer, or nothing can ever emit `stop`.
    pub fn build(self) -> Result<Workflow, ValidationError> {
        if self.steps.is_empty() {
            return Err(ValidationError::new(format!("Workflow '{}' has no steps", self.name))
                .with_error_info(
                    ErrorInfo::new("WORKFLOW-EMPTY", "Cannot build a workflow without steps")
                        .with_fix_hint("Register at least one step before building."),
                ));
        }

        let mut names = HashSet::new();
        let mut consumers: HashMap<EventTag, Arc<dyn Step>> = HashMap::new();
        for step in &self.steps {
            if !names.insert(step.name().to_string()) {
                return Err(ValidationError::new(format!(
                    "Step name '{}' is registered twice",
                    step.name()
                ))
                .with_steps(vec![step.name().to_string()])
                .with_error_info(
                    ErrorInfo::new("WORKFLOW-DUPLICATE_STEP", "Step names must be unique")
                        .with_fix_hint("Rename one of the steps."),
                ));
            }

            let accepts = step.accepts();
            if accepts.is_reserved() {
                return Err(ValidationError::new(format!(
                    "Step '{}' accepts the reserved tag '{accepts}'",
                    step.name()
                ))
                .with_steps(vec![step.name().to_string()])
                .with_error_info(
                    ErrorInfo::new(
                        "WORKFLOW-RESERVED_TAG",
                        format!("'{accepts}' is handled by the runner"),
                    )
                    .with_fix_hint("Consume 'human_response' or a custom event instead."),
                ));
            }

            if let Some(existing) = consumers.get(&accepts) {
                return Err(ValidationError::new(format!(
                    "Steps '{}' and '{}' both accept '{accepts}'",
                    existing.name(),
                    step.name()
                ))
                .with_steps(vec![existing.name().to_string(), step.name().to_string()])
                .with_error_info(
                    ErrorInfo::new(
                        "WORKFLOW-DUPLICATE_CONSUMER",
                        "Exactly one step may consume a tag",
                    )
                    .with_context_entry("tag", accepts.as_str())
                    .with_fix_hint("Give each step its own event type."),
                ));
            }
            consumers.insert(accepts, step.clone());
        }

        let mut emits_stop = false;
        for step in &self.steps {
            for tag in step.emits() {
                if tag.is_terminal() {
                    emits_stop = true;
                    continue;
                }
                if tag.is_input_required() {
                    continue;
                }
                if !consumers.contains_key(&tag) {
                    return Err(ValidationError::new(format!(
                        "Step '{}' emits '{tag}' but no step accepts it",
                        step.name()
                    ))
                    .with_steps(vec![step.name().to_string()])
                    .with_error_info(
                        ErrorInfo::new("WORKFLOW-MISSING_CONSUMER", "Emitted tag has no consumer")
                            .with_context_entry("tag", tag.as_str())
                            .with_fix_hint("Register a step that accepts the tag."),
                    ));
                }
            }
        }

        if !emits_stop {
            return Err(ValidationError::new(format!(
                "No step of workflow '{}' emits 'stop'",
                self.name
            ))
            .with_error_info(
                ErrorInfo::new("WORKFLOW-NO_STOP", "The workflow can never finish")
                    .with_fix_hint("Declare 'stop' among the emissions of the final step."),
            ));
        }

        Ok(Workflow::new(
            self.name,
            self.steps,
            consumers,
            self.config,
            self.observer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EmitStep;

    fn terminal(name: &str, accepts: &str) -> EmitStep {
        EmitStep::new(name, accepts).emits("stop")
    }

    #[test]
    fn test_build_valid_workflow() {
        let workflow = WorkflowBuilder::new("joke")
            .step(EmitStep::new("generate", "start").emits("joke"))
            .step(terminal("critique", "joke"))
            .build()
            .unwrap();

        assert_eq!(workflow.name(), "joke");
        assert_eq!(workflow.steps().len(), 2);
        assert_eq!(workflow.consumer_of("joke").map(|s| s.name().to_string()), Some("critique".to_string()));
    }

    #[test]
    fn test_empty_workflow_rejected() {
        let err = WorkflowBuilder::new("empty").build().unwrap_err();
        assert_eq!(err.code(), Some("WORKFLOW-EMPTY"));
    }

    #[test]
    fn test_duplicate_consumer_rejected() {
        let err = WorkflowBuilder::new("dup")
            .step(terminal("a", "start"))
            .step(terminal("b", "start"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("WORKFLOW-DUPLICATE_CONSUMER"));
        assert_eq!(err.steps, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_duplicate_step_name_rejected() {
        let err = WorkflowBuilder::new("dup")
            .step(terminal("a", "start"))
            .step(terminal("a", "other"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("WORKFLOW-DUPLICATE_STEP"));
    }

    #[test]
    fn test_reserved_tag_rejected() {
        let err = WorkflowBuilder::new("reserved")
            .step(terminal("a", "start"))
            .step(EmitStep::new("b", "input_required"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("WORKFLOW-RESERVED_TAG"));
    }

    #[test]
    fn test_missing_consumer_rejected() {
        let err = WorkflowBuilder::new("missing")
            .step(EmitStep::new("a", "start").emits("nowhere").emits("stop"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("WORKFLOW-MISSING_CONSUMER"));
    }

    #[test]
    fn test_no_stop_rejected() {
        let err = WorkflowBuilder::new("endless")
            .step(EmitStep::new("a", "start").emits("input_required"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("WORKFLOW-NO_STOP"));
    }
}

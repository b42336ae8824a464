//! Execution tracing / the single-step hook (ambient stack, §4.H).
//!
//! `StepTracer::on_statement` is called once before each statement executes
//! — the step hook referenced by §1's non-goals ("source-level debugging
//! beyond the single-step hook already present"). Debugging UIs built on
//! top of this hook are out of scope; the hook itself is in scope.

use crate::runtime_location::RuntimeLocation;

pub trait StepTracer {
    fn on_statement(&mut self, location: &RuntimeLocation);
}

/// Zero-cost default: no tracing.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl StepTracer for NoopTracer {
    fn on_statement(&mut self, _location: &RuntimeLocation) {}
}

/// Collects every visited location, in order — used by tests asserting on
/// execution order, and as a minimal building block for a step debugger.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    pub visited: Vec<RuntimeLocation>,
}

impl StepTracer for RecordingTracer {
    fn on_statement(&mut self, location: &RuntimeLocation) {
        self.visited.push(location.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_tracer_accumulates_in_order() {
        let mut tracer = RecordingTracer::default();
        let a = RuntimeLocation { location: crate::runtime_location::Location { line: 1, ..Default::default() }, unit: None };
        let b = RuntimeLocation { location: crate::runtime_location::Location { line: 2, ..Default::default() }, unit: None };
        tracer.on_statement(&a);
        tracer.on_statement(&b);
        assert_eq!(tracer.visited.len(), 2);
        assert_eq!(tracer.visited[0].location.line, 1);
    }
}

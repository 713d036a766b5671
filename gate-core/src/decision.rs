//! Gate decision engine and output sink.

use crate::debounce::DebouncedState;
use crate::zones::Classification;

/// Receives the gate output whenever it changes (LED on the reference board).
pub trait OutputSink {
    /// Drives the output. Calling it twice with the same value has no
    /// additional effect.
    fn set_output(&mut self, active: bool);
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn set_output(&mut self, active: bool) {
        (**self).set_output(active);
    }
}

/// Output sink that discards every update.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopOutputSink;

impl NoopOutputSink {
    pub const fn new() -> Self {
        Self
    }
}

impl OutputSink for NoopOutputSink {
    fn set_output(&mut self, _: bool) {}
}

/// Persistent memory of the engine.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DecisionState {
    pub last_output: bool,
}

/// Result of one engine step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Decision {
    pub output: bool,
    pub changed: bool,
}

/// Applies the selected combinator to the confirmed buttons and reports
/// output edges to the sink.
pub struct DecisionEngine<S> {
    sink: S,
    state: DecisionState,
}

impl<S: OutputSink> DecisionEngine<S> {
    /// Creates an engine whose output starts low. The sink is not touched
    /// until the first edge.
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            state: DecisionState { last_output: false },
        }
    }

    pub const fn state(&self) -> DecisionState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Computes the new output; the sink is called at most once, and only
    /// when the output changes.
    pub fn step<const N: usize>(
        &mut self,
        debounced: &DebouncedState<N>,
        classification: Classification,
    ) -> Decision {
        let previous = self.state.last_output;
        let output = match classification {
            Classification::Gate(combinator) => {
                let (a, b) = debounced.gate_inputs();
                combinator.apply(a, b)
            }
            Classification::NoOp => previous,
        };

        self.state.last_output = output;
        let changed = output != previous;
        if changed {
            self.sink.set_output(output);
        }

        Decision { output, changed }
    }
}

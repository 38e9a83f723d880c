//! Observing the gates a decomposition emits.
//!
//! Tracing is opt-in and carried by the caller: wrap any register in a
//! [`TracedRegister`] with a [`GateTraceSink`] and every gate that reaches
//! the register is reported with a running index. Nothing is kept in
//! process-wide state.

use std::io::Write;

use num_traits::Float;
use serde::Serialize;
use tracing::trace;

use crate::error::NcuResult;
use crate::register::GateRegister;
use crate::unitary::Unitary2x2;

/// One gate application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateEvent<T = f64> {
    /// Position of the gate in the emitted sequence, starting at 0.
    pub index: usize,
    /// Control qubit, `None` for an uncontrolled gate.
    pub control: Option<usize>,
    /// Target qubit.
    pub target: usize,
    /// Matrix applied to the target.
    pub matrix: Unitary2x2<T>,
}

impl<T> GateEvent<T> {
    /// Whether the gate carries a control qubit.
    pub fn is_controlled(&self) -> bool {
        self.control.is_some()
    }
}

/// Receives every gate a [`TracedRegister`] forwards.
pub trait GateTraceSink<T = f64> {
    /// Observe one gate.
    fn record(&mut self, event: &GateEvent<T>);
}

impl<T, F: FnMut(&GateEvent<T>)> GateTraceSink<T> for F {
    fn record(&mut self, event: &GateEvent<T>) {
        self(event);
    }
}

/// Register decorator that reports each gate before forwarding it.
#[derive(Debug)]
pub struct TracedRegister<R, S> {
    inner: R,
    sink: S,
    ops: usize,
}

impl<R, S> TracedRegister<R, S> {
    /// Wrap `inner`, reporting to `sink`.
    pub fn new(inner: R, sink: S) -> Self {
        Self { inner, sink, ops: 0 }
    }

    /// Number of gates forwarded so far.
    pub fn op_count(&self) -> usize {
        self.ops
    }

    /// The wrapped register.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Unwrap into the register and the sink.
    pub fn into_parts(self) -> (R, S) {
        (self.inner, self.sink)
    }

    fn emit<T>(&mut self, control: Option<usize>, target: usize, matrix: &Unitary2x2<T>)
    where
        T: Float,
        S: GateTraceSink<T>,
    {
        let event = GateEvent {
            index: self.ops,
            control,
            target,
            matrix: *matrix,
        };
        trace!(index = self.ops, ?control, target, "gate");
        self.sink.record(&event);
        self.ops += 1;
    }
}

impl<T, R, S> GateRegister<T> for TracedRegister<R, S>
where
    T: Float,
    R: GateRegister<T>,
    S: GateTraceSink<T>,
{
    fn apply_controlled_unitary(&mut self, control: usize, target: usize, gate: &Unitary2x2<T>) {
        self.emit(Some(control), target, gate);
        self.inner.apply_controlled_unitary(control, target, gate);
    }

    fn apply_single_qubit_unitary(&mut self, qubit: usize, gate: &Unitary2x2<T>) {
        self.emit(None, qubit, gate);
        self.inner.apply_single_qubit_unitary(qubit, gate);
    }

    fn num_qubits(&self) -> usize {
        self.inner.num_qubits()
    }
}

/// In-memory list of gate events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GateTrace<T = f64> {
    events: Vec<GateEvent<T>>,
}

impl<T> GateTrace<T> {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Recorded events, in emission order.
    pub fn events(&self) -> &[GateEvent<T>] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of controlled gates.
    pub fn controlled_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_controlled()).count()
    }
}

impl<T: Serialize> GateTrace<T> {
    /// Serialize the trace to pretty-printed JSON.
    pub fn to_json(&self) -> NcuResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<T: Copy> GateTraceSink<T> for GateTrace<T> {
    fn record(&mut self, event: &GateEvent<T>) {
        self.events.push(*event);
    }
}

/// Sink that only counts gates, split by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountingSink {
    /// Controlled gates seen.
    pub controlled: usize,
    /// Uncontrolled gates seen.
    pub single: usize,
}

impl CountingSink {
    /// Total gates seen.
    pub fn total(&self) -> usize {
        self.controlled + self.single
    }
}

impl<T> GateTraceSink<T> for CountingSink {
    fn record(&mut self, event: &GateEvent<T>) {
        if event.control.is_some() {
            self.controlled += 1;
        } else {
            self.single += 1;
        }
    }
}

/// Header row written by [`CsvTraceWriter`].
pub const CSV_HEADER: &str = "index,control,target,re00,im00,re01,im01,re10,im10,re11,im11";

/// Streams gate events as CSV rows.
///
/// Write errors are latched: after the first failure no further rows are
/// written and [`finish`](Self::finish) returns the error.
#[derive(Debug)]
pub struct CsvTraceWriter<W: Write> {
    writer: W,
    error: Option<std::io::Error>,
}

impl<W: Write> CsvTraceWriter<W> {
    /// Create a writer and emit the header row.
    pub fn new(mut writer: W) -> NcuResult<Self> {
        writeln!(writer, "{CSV_HEADER}")?;
        Ok(Self {
            writer,
            error: None,
        })
    }

    /// Flush and return the underlying writer, or the first write error.
    pub fn finish(mut self) -> NcuResult<W> {
        if let Some(err) = self.error.take() {
            return Err(err.into());
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_row<T: Float>(&mut self, event: &GateEvent<T>) -> std::io::Result<()> {
        let control = event.control.map(|c| c.to_string()).unwrap_or_default();
        write!(self.writer, "{},{},{}", event.index, control, event.target)?;
        for entry in &event.matrix.data {
            write!(
                self.writer,
                ",{},{}",
                entry.re.to_f64().unwrap_or(f64::NAN),
                entry.im.to_f64().unwrap_or(f64::NAN)
            )?;
        }
        writeln!(self.writer)
    }
}

impl<T: Float, W: Write> GateTraceSink<T> for CsvTraceWriter<W> {
    fn record(&mut self, event: &GateEvent<T>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.write_row(event) {
            self.error = Some(err);
        }
    }
}

/// A register that applies nothing and records every gate it receives.
///
/// Useful for extracting the emitted circuit without simulating it.
#[derive(Debug, Clone, Default)]
pub struct RecordingRegister<T = f64> {
    num_qubits: usize,
    trace: GateTrace<T>,
}

impl<T: Float> RecordingRegister<T> {
    /// Create a recorder for a register of `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            trace: GateTrace::new(),
        }
    }

    /// The recorded trace.
    pub fn trace(&self) -> &GateTrace<T> {
        &self.trace
    }

    /// Consume the recorder and return its trace.
    pub fn into_trace(self) -> GateTrace<T> {
        self.trace
    }

    fn push(&mut self, control: Option<usize>, target: usize, matrix: &Unitary2x2<T>) {
        let event = GateEvent {
            index: self.trace.len(),
            control,
            target,
            matrix: *matrix,
        };
        self.trace.record(&event);
    }
}

impl<T: Float> GateRegister<T> for RecordingRegister<T> {
    fn apply_controlled_unitary(&mut self, control: usize, target: usize, gate: &Unitary2x2<T>) {
        self.push(Some(control), target, gate);
    }

    fn apply_single_qubit_unitary(&mut self, qubit: usize, gate: &Unitary2x2<T>) {
        self.push(None, qubit, gate);
    }

    fn num_qubits(&self) -> usize {
        self.num_qubits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traced_register_forwards_and_indexes() {
        let mut reg = TracedRegister::new(RecordingRegister::<f64>::new(3), GateTrace::new());
        reg.apply_pauli_x(0);
        reg.apply_cx(0, 2);
        reg.apply_controlled_unitary(1, 2, &Unitary2x2::h());

        assert_eq!(reg.op_count(), 3);
        assert_eq!(reg.num_qubits(), 3);
        let (inner, trace) = reg.into_parts();
        assert_eq!(inner.trace(), &trace);
        let indices: Vec<_> = trace.events().iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(trace.controlled_count(), 2);
        assert_eq!(trace.events()[2].matrix, Unitary2x2::h());
    }

    #[test]
    fn test_closure_sink() {
        let mut targets = Vec::new();
        {
            let mut reg = TracedRegister::new(RecordingRegister::<f64>::new(2), |e: &GateEvent| {
                targets.push(e.target)
            });
            reg.apply_pauli_x(1);
            reg.apply_cx(1, 0);
        }
        assert_eq!(targets, vec![1, 0]);
    }

    #[test]
    fn test_swap_is_three_cnots() {
        let mut reg = TracedRegister::new(RecordingRegister::<f64>::new(2), CountingSink::default());
        reg.swap_qubits(0, 1);
        reg.swap_qubits(1, 1);
        assert_eq!(reg.sink().controlled, 3);
        assert_eq!(reg.sink().single, 0);
    }

    #[test]
    fn test_csv_rows() {
        let mut csv = CsvTraceWriter::new(Vec::new()).unwrap();
        csv.record(&GateEvent {
            index: 0,
            control: Some(1),
            target: 2,
            matrix: Unitary2x2::<f64>::x(),
        });
        csv.record(&GateEvent {
            index: 1,
            control: None,
            target: 0,
            matrix: Unitary2x2::<f64>::identity(),
        });
        let text = String::from_utf8(csv.finish().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "0,1,2,0,0,1,0,1,0,0,0");
        assert_eq!(lines[2], "1,,0,1,0,0,0,0,0,1,0");
    }

    #[test]
    fn test_trace_json_export() {
        let mut rec = RecordingRegister::<f64>::new(2);
        rec.apply_cx(0, 1);
        let json = rec.trace().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["events"][0]["control"], 0);
        assert_eq!(value["events"][0]["target"], 1);
    }
}

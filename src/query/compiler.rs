use log::debug;

use crate::{
    LapQueryError,
    processor::{
        ArithmeticProcessor, ConstantProcessor, DEFAULT_BUFFER_CAPACITY, DecreasingSumProcessor,
        LapAverageProcessor, LapDeltaProcessor, Processor, VariableProcessor,
    },
    telemetry::{ResultPoint, Sample, Value, VariableResolver},
};

use super::{Expression, Function, parser::parse};

/// Turns expression trees into processor trees, resolving variables against `resolver`.
pub struct Compiler<'r> {
    resolver: &'r VariableResolver,
    buffer_capacity: usize,
}

impl<'r> Compiler<'r> {
    pub fn new(resolver: &'r VariableResolver) -> Self {
        Self {
            resolver,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    pub fn compile(&self, expression: &Expression) -> Result<Box<dyn Processor>, LapQueryError> {
        match expression {
            Expression::NumberLiteral(n) => Ok(Box::new(ConstantProcessor::new(*n as f64))),
            Expression::Variable(name) => {
                let extractor = self.resolver.resolve(name)?;
                Ok(Box::new(VariableProcessor::new(extractor)))
            }
            Expression::Binary { operator, lhs, rhs } => Ok(Box::new(ArithmeticProcessor::new(
                *operator,
                self.compile(lhs)?,
                self.compile(rhs)?,
            ))),
            Expression::FunctionCall(name, args) => {
                let function = Function::resolve(name, args.len())?;
                let child = self.compile(&args[0])?;
                let processor: Box<dyn Processor> = match function {
                    Function::LapDelta => {
                        Box::new(LapDeltaProcessor::new(child, self.buffer_capacity))
                    }
                    Function::LapAverage => Box::new(LapAverageProcessor::new(
                        child,
                        window_laps(function, &args[1])?,
                        self.buffer_capacity,
                    )),
                    Function::DecreasingSum => Box::new(DecreasingSumProcessor::new(
                        child,
                        window_laps(function, &args[1])?,
                        self.buffer_capacity,
                    )),
                };
                Ok(processor)
            }
        }
    }

    pub fn compile_query(&self, text: &str) -> Result<CompiledQuery, LapQueryError> {
        let expression = parse(text)?;
        let processor = self.compile(&expression)?;
        debug!(
            "Compiled query {} with a lookback of {} laps",
            expression,
            processor.required_lookback()
        );
        Ok(CompiledQuery {
            text: text.trim().to_string(),
            expression,
            processor,
        })
    }
}

/// Window sizes must be literal lap counts.
fn window_laps(function: Function, argument: &Expression) -> Result<u32, LapQueryError> {
    let Expression::NumberLiteral(laps) = argument else {
        return Err(LapQueryError::WindowNotConstant {
            function: function.name().to_string(),
        });
    };
    match u32::try_from(*laps) {
        Ok(laps) if laps > 0 => Ok(laps),
        _ => Err(LapQueryError::InvalidWindow {
            function: function.name().to_string(),
            laps: *laps,
        }),
    }
}

/// Compiles an expression tree with the default buffer capacity.
pub fn compile(
    expression: &Expression,
    resolver: &VariableResolver,
) -> Result<Box<dyn Processor>, LapQueryError> {
    Compiler::new(resolver).compile(expression)
}

/// Parses and compiles a query string with the default buffer capacity.
pub fn compile_query(text: &str, resolver: &VariableResolver) -> Result<CompiledQuery, LapQueryError> {
    Compiler::new(resolver).compile_query(text)
}

/// A registered query: its source text and the processor tree evaluating it.
pub struct CompiledQuery {
    text: String,
    expression: Expression,
    processor: Box<dyn Processor>,
}

impl CompiledQuery {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn required_lookback(&self) -> f32 {
        self.processor.required_lookback()
    }

    pub fn process(&mut self, sample: &Sample) -> ResultPoint {
        self.processor.process(sample)
    }

    /// Value for the sample, without the position stamp.
    pub fn evaluate(&mut self, sample: &Sample) -> Value {
        self.process(sample).value
    }
}

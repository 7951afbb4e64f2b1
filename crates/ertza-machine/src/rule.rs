use std::fmt;

use crate::error::ForwardError;
use crate::value::Value;

/// How a forwarded value is derived from the master's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    Forward,
    Multiply,
    Divide,
    Add,
    Subtract,
    Default,
}

impl ForwardMode {
    /// Parse a configured mode name. `substract` is accepted for `subtract`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "forward" => Some(ForwardMode::Forward),
            "multiply" => Some(ForwardMode::Multiply),
            "divide" => Some(ForwardMode::Divide),
            "add" => Some(ForwardMode::Add),
            "subtract" | "substract" => Some(ForwardMode::Subtract),
            "default" => Some(ForwardMode::Default),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardMode::Forward => "forward",
            ForwardMode::Multiply => "multiply",
            ForwardMode::Divide => "divide",
            ForwardMode::Add => "add",
            ForwardMode::Subtract => "subtract",
            ForwardMode::Default => "default",
        }
    }
}

impl fmt::Display for ForwardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated transform rule for one `(slave, key)` pair.
///
/// Every mode except `forward` carries a configured value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForwardRule {
    Forward,
    Multiply(f64),
    Divide(f64),
    Add(f64),
    Subtract(f64),
    Default(f64),
}

impl ForwardRule {
    /// Validate a configured `(mode, value)` pair for `key` on slave `serial`.
    pub fn new(
        serial: &str,
        key: &str,
        mode: &str,
        value: Option<f64>,
    ) -> Result<Self, ForwardError> {
        let mode = ForwardMode::parse(mode).ok_or_else(|| ForwardError::InvalidTransformMode {
            mode: mode.to_string(),
            key: key.to_string(),
        })?;
        if mode == ForwardMode::Forward {
            return Ok(ForwardRule::Forward);
        }

        let k = value.ok_or_else(|| ForwardError::MissingTransformValue {
            serial: serial.to_string(),
            key: key.to_string(),
        })?;
        Ok(match mode {
            ForwardMode::Forward => ForwardRule::Forward,
            ForwardMode::Multiply => ForwardRule::Multiply(k),
            ForwardMode::Divide => ForwardRule::Divide(k),
            ForwardMode::Add => ForwardRule::Add(k),
            ForwardMode::Subtract => ForwardRule::Subtract(k),
            ForwardMode::Default => ForwardRule::Default(k),
        })
    }

    pub fn mode(&self) -> ForwardMode {
        match self {
            ForwardRule::Forward => ForwardMode::Forward,
            ForwardRule::Multiply(_) => ForwardMode::Multiply,
            ForwardRule::Divide(_) => ForwardMode::Divide,
            ForwardRule::Add(_) => ForwardMode::Add,
            ForwardRule::Subtract(_) => ForwardMode::Subtract,
            ForwardRule::Default(_) => ForwardMode::Default,
        }
    }

    /// The configured value that replaces any input, for `default` rules.
    pub fn fixed_value(&self) -> Option<Value> {
        match self {
            ForwardRule::Default(k) => Some(Value::Float(*k)),
            _ => None,
        }
    }

    /// Apply the rule to an input value.
    ///
    /// `add` and `subtract` branch on the sign of the input, not of the
    /// configured value.
    pub fn apply(&self, key: &str, input: &Value) -> Result<Value, ForwardError> {
        if let ForwardRule::Forward = self {
            return Ok(input.clone());
        }
        if let Some(fixed) = self.fixed_value() {
            return Ok(fixed);
        }

        let x = input.as_f64().ok_or_else(|| ForwardError::NonNumeric {
            key: key.to_string(),
            value: input.clone(),
        })?;
        let out = match *self {
            ForwardRule::Multiply(k) => k * x,
            ForwardRule::Divide(k) => {
                if x == 0.0 {
                    return Err(ForwardError::DivisionByZero {
                        key: key.to_string(),
                    });
                }
                k / x
            }
            ForwardRule::Add(k) if x >= 0.0 => k + x,
            ForwardRule::Add(k) => k - x,
            ForwardRule::Subtract(k) if x >= 0.0 => k - x,
            ForwardRule::Subtract(k) => k + x,
            ForwardRule::Forward | ForwardRule::Default(_) => x,
        };
        Ok(Value::Float(out))
    }
}

//! Runtime values of rule expressions
//!
//! Booleans behave as 1/0 in arithmetic and comparisons, equality never fails
//! across types, and ordering across incompatible types is an error.

use super::parser::{ArithOp, CompareOp};
use crate::types::PortValue;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Port without a recorded value, or the `None` literal
    None,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Value>),
}

impl From<&PortValue> for Value {
    fn from(value: &PortValue) -> Self {
        match value {
            PortValue::Number(v) => Value::Number(*v),
            PortValue::Text(s) => Value::Text(s.clone()),
            PortValue::List(items) => Value::List(items.iter().map(Value::from).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Number(v) => *v != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// Equality that never fails; mismatched types are unequal
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => return a == b,
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => false,
        }
    }

    fn order(&self, other: &Value) -> Result<Option<Ordering>, String> {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return Ok(a.partial_cmp(&b));
        }
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Ok(Some(a.cmp(b))),
            _ => Err(format!(
                "cannot order {} ({}) and {} ({})",
                self,
                self.type_name(),
                other,
                other.type_name()
            )),
        }
    }

    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool, String> {
        // A NaN operand yields no ordering, so every ordering operator is false
        Ok(match op {
            CompareOp::Eq => self.loose_eq(other),
            CompareOp::Ne => !self.loose_eq(other),
            CompareOp::Lt => self.order(other)? == Some(Ordering::Less),
            CompareOp::Le => matches!(self.order(other)?, Some(Ordering::Less | Ordering::Equal)),
            CompareOp::Gt => self.order(other)? == Some(Ordering::Greater),
            CompareOp::Ge => {
                matches!(self.order(other)?, Some(Ordering::Greater | Ordering::Equal))
            }
        })
    }

    pub fn arith(&self, op: ArithOp, other: &Value) -> Result<Value, String> {
        if let (ArithOp::Add, Value::Text(a), Value::Text(b)) = (op, self, other) {
            return Ok(Value::Text(format!("{}{}", a, b)));
        }

        let (a, b) = match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(format!(
                    "unsupported operands {} ({}) and {} ({})",
                    self,
                    self.type_name(),
                    other,
                    other.type_name()
                ))
            }
        };

        let result = match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div | ArithOp::Rem if b == 0.0 => {
                return Err("division by zero".to_string());
            }
            ArithOp::Div => a / b,
            // Floored modulo, sign follows the divisor
            ArithOp::Rem => a - b * (a / b).floor(),
        };
        Ok(Value::Number(result))
    }

    pub fn negate(&self) -> Result<Value, String> {
        match self.numeric() {
            Some(v) => Ok(Value::Number(-v)),
            None => Err(format!("cannot negate {} ({})", self, self.type_name())),
        }
    }

    /// List indexing; negative indices count from the end
    pub fn index(&self, index: &Value) -> Result<Value, String> {
        let items = match self {
            Value::List(items) => items,
            other => return Err(format!("cannot index {} ({})", other, other.type_name())),
        };
        let raw = match index.numeric() {
            Some(v) if v.fract() == 0.0 => v as i64,
            _ => return Err(format!("list index must be an integer, got {}", index)),
        };
        let len = items.len() as i64;
        let position = if raw < 0 { len + raw } else { raw };
        if position < 0 || position >= len {
            return Err(format!("list index {} out of range (length {})", raw, len));
        }
        Ok(items[position as usize].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_number_equivalence() {
        assert!(Value::Bool(true).loose_eq(&Value::Number(1.0)));
        assert!(Value::Bool(false).loose_eq(&Value::Number(0.0)));
        assert!(!Value::Text("1".to_string()).loose_eq(&Value::Number(1.0)));
        assert!(!Value::None.loose_eq(&Value::Number(0.0)));
        assert!(Value::None.loose_eq(&Value::None));
    }

    #[test]
    fn test_ordering() {
        let one = Value::Number(1.0);
        let two = Value::Number(2.0);
        assert!(one.compare(CompareOp::Lt, &two).unwrap());
        assert!(two.compare(CompareOp::Ge, &one).unwrap());
        assert!(Value::Text("a".into()).compare(CompareOp::Lt, &Value::Text("b".into())).unwrap());
        assert!(Value::None.compare(CompareOp::Gt, &one).is_err());
        assert!(Value::Text("a".into()).compare(CompareOp::Lt, &one).is_err());
        assert!(!Value::Number(f64::NAN).compare(CompareOp::Le, &one).unwrap());
    }

    #[test]
    fn test_arithmetic() {
        let v = Value::Number(7.0).arith(ArithOp::Rem, &Value::Number(3.0)).unwrap();
        assert_eq!(v, Value::Number(1.0));
        let v = Value::Number(-7.0).arith(ArithOp::Rem, &Value::Number(3.0)).unwrap();
        assert_eq!(v, Value::Number(2.0));
        let v = Value::Bool(true).arith(ArithOp::Add, &Value::Number(1.0)).unwrap();
        assert_eq!(v, Value::Number(2.0));
        assert!(Value::Number(1.0).arith(ArithOp::Div, &Value::Number(0.0)).is_err());
        let v = Value::Text("a".into()).arith(ArithOp::Add, &Value::Text("b".into())).unwrap();
        assert_eq!(v, Value::Text("ab".into()));
    }

    #[test]
    fn test_indexing() {
        let list = Value::from(&PortValue::List(vec![
            PortValue::Number(1.0),
            PortValue::Text("on".into()),
        ]));
        assert_eq!(list.index(&Value::Number(0.0)).unwrap(), Value::Number(1.0));
        assert_eq!(list.index(&Value::Number(-1.0)).unwrap(), Value::Text("on".into()));
        assert!(list.index(&Value::Number(2.0)).is_err());
        assert!(list.index(&Value::Number(0.5)).is_err());
        assert!(Value::Number(1.0).index(&Value::Number(0.0)).is_err());
    }
}

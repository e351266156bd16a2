//! Expression evaluation against a port snapshot

use super::parser::{Expr, UnaryOp};
use super::value::Value;
use crate::snapshot::Snapshot;

/// Evaluate an expression; port leaves read the snapshot's current values
///
/// `and`/`or` short-circuit, so the right-hand side of a guard such as
/// `in:a != None and in:a > 0` is never evaluated when the guard fails.
pub fn evaluate(expr: &Expr, snapshot: &Snapshot<'_>) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Port { kind, name } => {
            let stream = snapshot
                .stream(*kind, name)
                .ok_or_else(|| format!("unknown port {}:{}", kind, name))?;
            Ok(stream.current_value().map(Value::from).unwrap_or(Value::None))
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, snapshot)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => value.negate(),
            }
        }
        Expr::Arith { op, lhs, rhs } => {
            let lhs = evaluate(lhs, snapshot)?;
            let rhs = evaluate(rhs, snapshot)?;
            lhs.arith(*op, &rhs)
        }
        Expr::Compare { first, rest } => {
            let mut lhs = evaluate(first, snapshot)?;
            for (op, next) in rest {
                let rhs = evaluate(next, snapshot)?;
                if !lhs.compare(*op, &rhs)? {
                    return Ok(Value::Bool(false));
                }
                lhs = rhs;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(lhs, rhs) => {
            if !evaluate(lhs, snapshot)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(evaluate(rhs, snapshot)?.is_truthy()))
        }
        Expr::Or(lhs, rhs) => {
            if evaluate(lhs, snapshot)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(evaluate(rhs, snapshot)?.is_truthy()))
        }
        Expr::Index { target, index } => {
            let target = evaluate(target, snapshot)?;
            let index = evaluate(index, snapshot)?;
            target.index(&index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::StreamMonitor;
    use crate::rules::parser::parse_expr;
    use crate::snapshot::PortMap;
    use std::io::Cursor;

    fn ports(entries: &[(&str, &'static str, bool)]) -> PortMap {
        entries
            .iter()
            .map(|(name, data, multi)| {
                let mut m = StreamMonitor::from_reader(name, Cursor::new(*data), *multi).unwrap();
                m.advance().unwrap();
                (name.to_string(), m)
            })
            .collect()
    }

    fn check(src: &str, inputs: &PortMap, outputs: &PortMap) -> Result<bool, String> {
        let expr = parse_expr(src)?;
        let snap = Snapshot::new(0, inputs, outputs);
        evaluate(&expr, &snap).map(|v| v.is_truthy())
    }

    #[test]
    fn test_port_bindings() {
        let inputs = ports(&[
            ("x1", "00:00:00 1\n", false),
            ("x12", "00:00:00 12\n", false),
        ]);
        let outputs = ports(&[("mode", "00:00:00 idle\n", false)]);

        assert!(check("in:x1 == 1 and in:x12 == 12", &inputs, &outputs).unwrap());
        assert!(check("out:mode == 'idle'", &inputs, &outputs).unwrap());
        assert!(check("in:x12 - in:x1 * 2 == 10", &inputs, &outputs).unwrap());
    }

    #[test]
    fn test_chained_and_negated() {
        let inputs = PortMap::new();
        let outputs = ports(&[
            ("l1", "00:00:00 0.5\n", false),
            ("r1", "00:00:00 1\n", false),
            ("r2", "00:00:00 1\n", false),
            ("l2", "00:00:00 0\n", false),
        ]);

        assert!(check("0 < out:l1 < out:r1", &inputs, &outputs).unwrap());
        assert!(!check("0 < out:r1 < out:l1", &inputs, &outputs).unwrap());
        assert!(check("not (out:r2 > 0 and out:l2 > 0)", &inputs, &outputs).unwrap());
    }

    #[test]
    fn test_multi_value_indexing() {
        let inputs = ports(&[("gen", "00:00:00 3 4.5 on\n", true)]);
        let outputs = PortMap::new();

        assert!(check("in:gen[0] + in:gen[1] == 7.5", &inputs, &outputs).unwrap());
        assert!(check("in:gen[-1] == 'on'", &inputs, &outputs).unwrap());
        assert!(check("in:gen[3] == 1", &inputs, &outputs).is_err());
    }

    #[test]
    fn test_unset_port_is_none() {
        let inputs = ports(&[("late", "", false)]);
        let outputs = PortMap::new();

        assert!(check("in:late == None", &inputs, &outputs).unwrap());
        assert!(!check("in:late == 0", &inputs, &outputs).unwrap());
        assert!(check("in:late > 0", &inputs, &outputs).is_err());
        assert!(!check("in:late != None and in:late > 0", &inputs, &outputs).unwrap());
    }

    #[test]
    fn test_unknown_port() {
        let err = check("in:ghost == 1", &PortMap::new(), &PortMap::new()).unwrap_err();
        assert!(err.contains("in:ghost"));
    }
}

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use num::{BigInt, BigRational, Num};
use thiserror::Error;

use moxide_ir::{Logic, Sort, Term, Value};

use crate::backends::smtlib_printer::{print_symbol, sort_to_smtlib, to_smtlib};
use crate::oracle::{Model, Oracle, SatResult};

#[derive(Debug, Error)]
pub enum Cvc5Error {
    #[error("cvc5 I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cvc5 not found: {0}")]
    NotFound(String),
    #[error("cvc5 error: {0}")]
    SolverError(String),
    #[error("failed to parse cvc5 output: {0}")]
    ParseError(String),
}

/// Out-of-process cvc5 oracle speaking SMT-LIB2 over pipes.
pub struct Cvc5Oracle {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    logic: Logic,
    vars: HashMap<String, Sort>,
}

impl Cvc5Oracle {
    pub fn new(logic: Logic) -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout("cvc5", logic, None)
    }

    pub fn with_timeout_secs(logic: Logic, timeout_secs: u64) -> Result<Self, Cvc5Error> {
        if timeout_secs == 0 {
            return Self::new(logic);
        }
        Self::with_command_and_timeout("cvc5", logic, Some(timeout_secs.saturating_mul(1000)))
    }

    pub fn with_command(cmd: &str, logic: Logic) -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout(cmd, logic, None)
    }

    pub fn with_command_and_timeout(
        cmd: &str,
        logic: Logic,
        timeout_ms: Option<u64>,
    ) -> Result<Self, Cvc5Error> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
        ];
        if let Some(ms) = timeout_ms {
            args.push(format!("--tlimit-per={ms}"));
        }

        let mut child = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Cvc5Error::NotFound(format!("{cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stderr".into()))?;

        let mut oracle = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
            logic,
            vars: HashMap::new(),
        };

        oracle.send_command_no_response(&format!("(set-logic {})", logic.name()))?;
        Ok(oracle)
    }

    fn send_command(&mut self, cmd: &str) -> Result<String, Cvc5Error> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;

        let mut response = String::new();
        self.stdout.read_line(&mut response)?;
        if response.is_empty() {
            let mut stderr = String::new();
            let _ = self.stderr.read_line(&mut stderr);
            return Err(Cvc5Error::SolverError(format!(
                "no response from cvc5 for command `{cmd}`. stderr: {}",
                stderr.trim()
            )));
        }
        Ok(response.trim_end().to_string())
    }

    fn send_command_no_response(&mut self, cmd: &str) -> Result<(), Cvc5Error> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for Cvc5Oracle {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl Oracle for Cvc5Oracle {
    type Error = Cvc5Error;

    fn declare_var(&mut self, name: &str, sort: &Sort) -> Result<(), Cvc5Error> {
        if self.vars.contains_key(name) {
            return Ok(());
        }
        let symbol = print_symbol(name);
        let sort_str = sort_to_smtlib(sort);
        self.send_command_no_response(&format!("(declare-const {symbol} {sort_str})"))?;
        self.vars.insert(name.to_string(), sort.clone());
        Ok(())
    }

    fn assert(&mut self, term: &Term) -> Result<(), Cvc5Error> {
        let smt = to_smtlib(term);
        self.send_command_no_response(&format!("(assert {smt})"))?;
        Ok(())
    }

    fn push(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(push 1)")?;
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(pop 1)")?;
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Cvc5Error> {
        let response = self.send_command("(check-sat)")?;
        match response.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown("cvc5 returned unknown".into())),
            other => Err(Cvc5Error::SolverError(other.to_string())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        vars: &[(&str, &Sort)],
    ) -> Result<(SatResult, Option<Model>), Cvc5Error> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }

        let mut model = Model::default();
        for &(name, sort) in vars {
            if !sort.is_scalar() {
                continue;
            }
            let symbol = print_symbol(name);
            let response = self.send_command(&format!("(get-value ({symbol}))"))?;
            if let Some(value) = parse_value(&response, sort) {
                model.values.insert(name.to_string(), value);
            }
        }
        Ok((SatResult::Sat, Some(model)))
    }

    fn reset(&mut self) -> Result<(), Cvc5Error> {
        self.send_command_no_response("(reset)")?;
        self.send_command_no_response(&format!("(set-logic {})", self.logic.name()))?;
        self.vars.clear();
        Ok(())
    }
}

/// Parse one `((symbol value))` response for a variable of the given sort.
fn parse_value(response: &str, sort: &Sort) -> Option<Value> {
    let inner = response
        .trim()
        .strip_prefix("((")?
        .strip_suffix("))")?
        .trim();
    // Skip the (possibly |quoted|) symbol token; names never contain spaces.
    let value_str = inner.splitn(2, ' ').nth(1)?.trim();
    parse_scalar(value_str, sort)
}

fn parse_scalar(value: &str, sort: &Sort) -> Option<Value> {
    match sort {
        Sort::Bool => match value {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Sort::Int => parse_int(value).map(Value::Int),
        Sort::Real => parse_rational(value).map(Value::Real),
        Sort::BitVec(width) => parse_bv(value).map(|bits| Value::BitVec {
            bits,
            width: *width,
        }),
        Sort::Array(_, _) => None,
    }
}

fn parse_int(value: &str) -> Option<i64> {
    if let Some(rest) = value.strip_prefix("(- ") {
        let inner = rest.strip_suffix(')')?.trim();
        inner.parse::<i64>().ok().map(|n| -n)
    } else {
        value.parse::<i64>().ok()
    }
}

fn parse_rational(value: &str) -> Option<BigRational> {
    if let Some(rest) = value.strip_prefix("(- ") {
        let inner = rest.strip_suffix(')')?.trim();
        return parse_rational(inner).map(|r| -r);
    }
    if let Some(rest) = value.strip_prefix("(/ ") {
        let inner = rest.strip_suffix(')')?.trim();
        let mut parts = inner.split_whitespace();
        let numer = parse_rational(parts.next()?)?;
        let denom = parse_rational(parts.next()?)?;
        return Some(numer / denom);
    }
    if let Some((int_part, frac_part)) = value.split_once('.') {
        let digits = format!("{int_part}{frac_part}");
        let numer = BigInt::from_str_radix(&digits, 10).ok()?;
        let denom = BigInt::from(10u32).pow(frac_part.len() as u32);
        return Some(BigRational::new(numer, denom));
    }
    let n = BigInt::from_str_radix(value, 10).ok()?;
    Some(BigRational::from_integer(n))
}

fn parse_bv(value: &str) -> Option<u64> {
    if let Some(bin) = value.strip_prefix("#b") {
        u64::from_str_radix(bin, 2).ok()
    } else if let Some(hex) = value.strip_prefix("#x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(rest) = value.strip_prefix("(_ bv") {
        let inner = rest.strip_suffix(')')?;
        let mut parts = inner.split_whitespace();
        parts.next()?.parse::<u64>().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_value() {
        assert_eq!(parse_value("((x 42))", &Sort::Int), Some(Value::Int(42)));
    }

    #[test]
    fn parse_negative_int_value() {
        assert_eq!(
            parse_value("((x (- 7)))", &Sort::Int),
            Some(Value::Int(-7))
        );
    }

    #[test]
    fn parse_bool_value() {
        assert_eq!(
            parse_value("((b true))", &Sort::Bool),
            Some(Value::Bool(true))
        );
        assert_eq!(
            parse_value("((b false))", &Sort::Bool),
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn parse_quoted_symbol_value() {
        assert_eq!(
            parse_value("((|next(x)| 3))", &Sort::Int),
            Some(Value::Int(3))
        );
    }

    #[test]
    fn parse_rational_values() {
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        assert_eq!(
            parse_value("((r (/ 1 2)))", &Sort::Real),
            Some(Value::Real(half.clone()))
        );
        assert_eq!(
            parse_value("((r (- (/ 1 2))))", &Sort::Real),
            Some(Value::Real(-half))
        );
        assert_eq!(
            parse_value("((r 1.5))", &Sort::Real),
            Some(Value::Real(BigRational::new(
                BigInt::from(3),
                BigInt::from(2)
            )))
        );
    }

    #[test]
    fn parse_bitvector_values() {
        assert_eq!(
            parse_value("((b #b0101))", &Sort::BitVec(4)),
            Some(Value::BitVec { bits: 5, width: 4 })
        );
        assert_eq!(
            parse_value("((b #x1f))", &Sort::BitVec(8)),
            Some(Value::BitVec {
                bits: 31,
                width: 8
            })
        );
        assert_eq!(
            parse_value("((b (_ bv9 8)))", &Sort::BitVec(8)),
            Some(Value::BitVec { bits: 9, width: 8 })
        );
    }
}

//! Recursive-descent evaluator for in-skin `@eval:` expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr   := bool
//! bool   := rel (('&' | '|') rel)*
//! rel    := sum (('<' | '<=' | '>' | '>=' | '=') sum)*
//! sum    := prod (('+' | '-') prod)*
//! prod   := factor (('*' | '/' | '%') factor)*
//! factor := '!' factor | '(' expr ')' | number | 'string'
//! ```
//!
//! Strings holding numbers coerce at arithmetic operators; booleans do not.
//! Division and modulo by zero report an error and evaluate to 0, legacy
//! semantics that existing skins depend on.

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    /// Textual form used when substituting the result back into a value.
    pub fn render(&self) -> String {
        match self {
            Value::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(_) => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Num(n) => Some(*n != 0.0),
            Value::Str(s) => s.trim().parse::<f64>().ok().map(|n| n != 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub value: Value,
    pub errors: Vec<String>,
}

impl EvalOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Evaluate an expression. Pure: the result depends on the input text only.
pub fn evaluate(src: &str) -> EvalOutcome {
    let mut parser = Parser { src: src.as_bytes(), pos: 0, errors: Vec::new() };
    let value = parser.expr();
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        parser
            .errors
            .push(format!("Unexpected '{}'", parser.src[parser.pos] as char));
    }
    EvalOutcome { value, errors: parser.errors }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    errors: Vec<String>,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn number(&mut self, op: u8, lhs: &Value, rhs: &Value) -> Option<(f64, f64)> {
        match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => {
                let verb = match op {
                    b'+' => "add",
                    b'-' => "subtract",
                    b'*' => "multiply",
                    b'/' | b'%' => "divide",
                    _ => "compare",
                };
                self.errors.push(format!("Cannot {} non-numeric operands.", verb));
                None
            }
        }
    }

    fn expr(&mut self) -> Value {
        self.bool_expr()
    }

    fn bool_expr(&mut self) -> Value {
        let mut lhs = self.rel();
        while let Some(op @ (b'&' | b'|')) = self.peek() {
            self.pos += 1;
            let rhs = self.rel();
            let (a, b) = match (lhs.as_bool(), rhs.as_bool()) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    self.errors.push("Cannot evaluate non-boolean operands.".to_string());
                    (false, false)
                }
            };
            lhs = Value::Bool(if op == b'&' { a && b } else { a || b });
        }
        lhs
    }

    fn rel(&mut self) -> Value {
        let mut lhs = self.sum();
        while let Some(op @ (b'<' | b'>' | b'=')) = self.peek() {
            self.pos += 1;
            let or_equal = (op == b'<' || op == b'>') && self.src.get(self.pos) == Some(&b'=');
            if or_equal {
                self.pos += 1;
            }
            let rhs = self.sum();
            lhs = if op == b'=' {
                match (lhs.as_number(), rhs.as_number()) {
                    (Some(a), Some(b)) => Value::Bool(a == b),
                    _ => Value::Bool(lhs.render() == rhs.render()),
                }
            } else {
                match self.number(b'=', &lhs, &rhs) {
                    Some((a, b)) => Value::Bool(match (op, or_equal) {
                        (b'<', false) => a < b,
                        (b'<', true) => a <= b,
                        (b'>', false) => a > b,
                        _ => a >= b,
                    }),
                    None => Value::Bool(false),
                }
            };
        }
        lhs
    }

    fn sum(&mut self) -> Value {
        let mut lhs = self.prod();
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.prod();
            lhs = match self.number(op, &lhs, &rhs) {
                Some((a, b)) => Value::Num(if op == b'+' { a + b } else { a - b }),
                None => Value::Num(0.0),
            };
        }
        lhs
    }

    fn prod(&mut self) -> Value {
        let mut lhs = self.factor();
        while let Some(op @ (b'*' | b'/' | b'%')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor();
            lhs = match self.number(op, &lhs, &rhs) {
                Some((a, b)) => match op {
                    b'*' => Value::Num(a * b),
                    b'/' if b == 0.0 => {
                        self.errors.push("Cannot divide by 0.".to_string());
                        Value::Num(0.0)
                    }
                    b'/' => Value::Num(a / b),
                    _ if b == 0.0 => {
                        self.errors.push("Cannot take a remainder of a division by 0.".to_string());
                        Value::Num(0.0)
                    }
                    _ => Value::Num(a % b),
                },
                None => Value::Num(0.0),
            };
        }
        lhs
    }

    fn factor(&mut self) -> Value {
        match self.peek() {
            Some(b'!') => {
                self.pos += 1;
                let operand = self.factor();
                match operand.as_bool() {
                    Some(b) => Value::Bool(!b),
                    None => {
                        self.errors.push("Cannot negate a non-boolean operand.".to_string());
                        Value::Bool(false)
                    }
                }
            }
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expr();
                if self.peek() == Some(b')') {
                    self.pos += 1;
                } else {
                    self.errors.push("Missing ')'.".to_string());
                }
                inner
            }
            Some(b'\'') => {
                self.pos += 1;
                let start = self.pos;
                while self.pos < self.src.len() && self.src[self.pos] != b'\'' {
                    self.pos += 1;
                }
                let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                if self.pos < self.src.len() {
                    self.pos += 1;
                } else {
                    self.errors.push("Unterminated string literal.".to_string());
                }
                Value::Str(text)
            }
            Some(c) if c.is_ascii_digit() || c == b'-' || c == b'.' => {
                let start = self.pos;
                if c == b'-' {
                    self.pos += 1;
                }
                while self
                    .src
                    .get(self.pos)
                    .is_some_and(|b| b.is_ascii_digit() || *b == b'.')
                {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("");
                match text.parse::<f64>() {
                    Ok(n) => Value::Num(n),
                    Err(_) => {
                        self.errors.push(format!("Invalid number '{}'.", text));
                        Value::Num(0.0)
                    }
                }
            }
            Some(b'$') => {
                // an unresolved variable reached the evaluator
                let start = self.pos;
                self.pos += 1;
                while self
                    .src
                    .get(self.pos)
                    .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.')
                {
                    self.pos += 1;
                }
                let name = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                self.errors.push(format!("Cannot evaluate unresolved variable '{}'.", name));
                Value::Num(0.0)
            }
            Some(c) => {
                self.errors.push(format!("Unexpected '{}'", c as char));
                self.pos += 1;
                Value::Num(0.0)
            }
            None => {
                self.errors.push("Unexpected end of expression.".to_string());
                Value::Num(0.0)
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

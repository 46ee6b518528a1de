//! Fraction arithmetic: `<operand> <op> <operand>` with mixed numbers.
//!
//! Operands are whole numbers (`3`), fractions (`3/4`) or mixed numbers
//! (`1_3/4`, `-2_1/2`). Results are reduced and printed as mixed numbers
//! (`1 1/2`, `-3/4`, `2`).

use std::fmt;

const HELP: &str = "Fraction calculator: <operand> <op> <operand>\n\
operands: 3, 3/4, 1_3/4 (mixed numbers use _ between whole and fraction)\n\
operators: + - * /\n\
harness: test create <id> | test end | test <id> [true|false] | quit";

/// Handler entry point: `help` or one binary expression.
pub fn process_command(input: &str) -> String {
    if input.trim().eq_ignore_ascii_case("help") {
        return HELP.to_string();
    }
    match evaluate(input) {
        Ok(value) => value.to_string(),
        Err(message) => format!("ERROR: {message}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    fn new(num: i64, den: i64) -> Result<Self, String> {
        if den == 0 {
            return Err("division by zero".to_string());
        }
        let divisor = gcd(num, den);
        let sign = if den < 0 { -1 } else { 1 };
        Ok(Self {
            num: sign * num / divisor,
            den: sign * den / divisor,
        })
    }

    fn parse(token: &str) -> Result<Self, String> {
        let invalid = || format!("invalid operand {token:?}");
        let (whole, fraction) = match token.split_once('_') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None if token.contains('/') => ("0", Some(token)),
            None => (token, None),
        };
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let Some(fraction) = fraction else {
            return Self::new(whole, 1);
        };
        let (num, den) = fraction.split_once('/').ok_or_else(invalid)?;
        let num: i64 = num.parse().map_err(|_| invalid())?;
        let den: i64 = den.parse().map_err(|_| invalid())?;
        if den == 0 {
            return Err("division by zero".to_string());
        }
        // The sign of a mixed number applies to its fraction too: -1_1/2 is -3/2.
        let negative = whole < 0 || token.starts_with('-');
        let num = if negative { -num.abs() } else { num };
        let whole_part = whole.checked_mul(den).ok_or_else(overflow)?;
        Self::new(whole_part.checked_add(num).ok_or_else(overflow)?, den)
    }

    fn apply(self, op: &str, rhs: Self) -> Result<Self, String> {
        let cross = |a: i64, b: i64| a.checked_mul(b).ok_or_else(overflow);
        match op {
            "+" | "-" => {
                let left = cross(self.num, rhs.den)?;
                let right = cross(rhs.num, self.den)?;
                let num = if op == "+" {
                    left.checked_add(right)
                } else {
                    left.checked_sub(right)
                };
                Self::new(num.ok_or_else(overflow)?, cross(self.den, rhs.den)?)
            }
            "*" => Self::new(cross(self.num, rhs.num)?, cross(self.den, rhs.den)?),
            "/" => Self::new(cross(self.num, rhs.den)?, cross(self.den, rhs.num)?),
            other => Err(format!("unknown operator {other:?}")),
        }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.num / self.den;
        let rem = self.num % self.den;
        if rem == 0 {
            write!(f, "{whole}")
        } else if whole == 0 {
            write!(f, "{rem}/{}", self.den)
        } else {
            write!(f, "{whole} {}/{}", rem.abs(), self.den)
        }
    }
}

fn evaluate(input: &str) -> Result<Fraction, String> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let [left, op, right] = tokens.as_slice() else {
        return Err("expected <operand> <operator> <operand>".to_string());
    };
    Fraction::parse(left)?.apply(op, Fraction::parse(right)?)
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

fn overflow() -> String {
    "number too large".to_string()
}

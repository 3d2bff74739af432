use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression. Use this for any calculations. Use '**' for power, e.g., '2**10'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "A mathematical expression like '2 + 2', '2**10', 'sqrt(16)'."
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let expression = extract_string_arg(&args, "expression")?;

        match evaluate_expression(&expression) {
            Ok(value) => Ok(ToolResult::output(format_number(value))),
            Err(e) => Ok(ToolResult::error(e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    Pow,
    LParen,
    RParen,
    Comma,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse()
                    .map_err(|_| format!("invalid number '{}'", literal))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '^' => {
                tokens.push(Token::Pow);
                i += 1;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => return Err(format!("Invalid character '{}' in expression", other)),
        }
    }

    Ok(tokens)
}

const MAX_NESTING: usize = 200;

/// Recursive descent over `+ -`, `* /`, unary sign, then right-associative
/// `**`/`^` which binds tighter than a leading minus.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {:?}, found {:?}", expected, token)),
            None => Err(format!("expected {:?} at end of expression", expected)),
        }
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Op('+')) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Op('-')) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Op('*')) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(Token::Op('/')) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    /// Every nested sign, paren, exponent and call argument passes through
    /// here, so this is where recursion depth is bounded.
    fn unary(&mut self) -> Result<f64, String> {
        if self.depth >= MAX_NESTING {
            return Err("expression too deeply nested".to_string());
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) if name == "pi" => Ok(std::f64::consts::PI),
            Some(Token::Ident(name)) => {
                self.expect(Token::LParen)?;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.expr()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                        args.push(self.expr()?);
                    }
                }
                self.expect(Token::RParen)?;
                apply_function(&name, &args)
            }
            Some(token) => Err(format!("unexpected token {:?}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn apply_function(name: &str, args: &[f64]) -> Result<f64, String> {
    let domain_error = || "math domain error".to_string();

    match (name, args) {
        ("sqrt", [x]) if *x < 0.0 => Err(domain_error()),
        ("sqrt", [x]) => Ok(x.sqrt()),
        ("sin", [x]) => Ok(x.sin()),
        ("cos", [x]) => Ok(x.cos()),
        ("tan", [x]) => Ok(x.tan()),
        ("log", [x]) if *x <= 0.0 => Err(domain_error()),
        ("log", [x]) => Ok(x.ln()),
        ("log", [x, base]) if *x <= 0.0 || *base <= 0.0 || *base == 1.0 => Err(domain_error()),
        ("log", [x, base]) => Ok(x.ln() / base.ln()),
        ("exp", [x]) => Ok(x.exp()),
        ("int", [x]) => Ok(x.trunc()),
        ("pow", [x, y]) => Ok(x.powf(*y)),
        ("sqrt" | "sin" | "cos" | "tan" | "log" | "exp" | "int" | "pow", _) => Err(format!(
            "{}() got an unexpected number of arguments ({})",
            name,
            args.len()
        )),
        _ => Err(format!("name '{}' is not defined", name)),
    }
}

pub fn evaluate_expression(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(format!("unexpected token {:?}", token));
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err("math range error".to_string())
    }
}

/// Integral values print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> f64 {
        evaluate_expression(expr).unwrap()
    }

    #[test]
    fn precedence_and_power() {
        assert_eq!(eval("2**10"), 1024.0);
        assert_eq!(eval("2 ^ 8"), 256.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval("-2 ** 2"), -4.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("10 / 4"), 2.5);
    }

    #[test]
    fn functions_and_constants() {
        assert_eq!(eval("sqrt(16)"), 4.0);
        assert_eq!(eval("pow(2, 5)"), 32.0);
        assert_eq!(eval("int(7.9)"), 7.0);
        assert!((eval("log(100, 10)") - 2.0).abs() < 1e-12);
        assert!((eval("cos(pi)") + 1.0).abs() < 1e-12);
        assert!((eval("exp(0)") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn errors_are_reported() {
        assert_eq!(evaluate_expression("1/0").unwrap_err(), "division by zero");
        assert_eq!(evaluate_expression("sqrt(-1)").unwrap_err(), "math domain error");
        assert!(evaluate_expression("import os").is_err());
        assert!(evaluate_expression("2 +").is_err());
        assert!(evaluate_expression("(1").is_err());
        assert!(evaluate_expression("1; 2").is_err());
        assert!(evaluate_expression("").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            evaluate_expression(&parens).unwrap_err(),
            "expression too deeply nested"
        );

        let signs = format!("{}1", "-".repeat(200_000));
        assert_eq!(
            evaluate_expression(&signs).unwrap_err(),
            "expression too deeply nested"
        );

        let calls = format!("{}4{}", "sqrt(".repeat(5_000), ")".repeat(5_000));
        assert!(evaluate_expression(&calls).is_err());

        let moderate = format!("{}7{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval(&moderate), 7.0);
        assert_eq!(eval(&format!("{}3", "-".repeat(10))), 3.0);
    }

    #[tokio::test]
    async fn deep_nesting_is_a_soft_error() {
        let expression = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let result = CalculatorTool
            .execute(json!({"expression": expression}))
            .await
            .unwrap();
        assert!(!result.terminates);
        assert_eq!(result.output, "Error: expression too deeply nested");
    }

    #[test]
    fn integral_results_drop_fraction() {
        assert_eq!(format_number(1024.0), "1024");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[tokio::test]
    async fn bad_expressions_are_soft_errors() {
        let result = CalculatorTool
            .execute(json!({"expression": "1/0"}))
            .await
            .unwrap();
        assert!(!result.terminates);
        assert_eq!(result.output, "Error: division by zero");

        let result = CalculatorTool
            .execute(json!({"expression": "2**10"}))
            .await
            .unwrap();
        assert_eq!(result.output, "1024");
    }
}

//! String rendering of programs.
//!
//! Three formats are supported:
//! - [`Format::Console`]: a plain infix expression, e.g. `((10)/(X_1) + 3.14)(X_0) - (X_0)`
//! - [`Format::Latex`]: the same expression as LaTeX, e.g. `(\frac{10}{X_1} + 3.14)(X_0) - (X_0)`
//! - [`Format::Stack`]: one line per instruction, e.g. `4   <= (3) / (1)`
//!
//! The infix formats render only the instructions the output depends on. Shared
//! sub-expressions are repeated in the infix output, as an expression tree has
//! no other way of expressing reuse.

use std::fmt;
use std::str::FromStr;

use crate::operators::Operator;
use crate::program::{Instruction, Program};

/// Output format of [`Program::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Console,
    Latex,
    Stack,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Format::Console),
            "latex" => Ok(Format::Latex),
            "stack" => Ok(Format::Stack),
            other => Err(format!("unknown format '{other}'")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Console => f.write_str("console"),
            Format::Latex => f.write_str("latex"),
            Format::Stack => f.write_str("stack"),
        }
    }
}

pub(crate) fn render(program: &Program, format: Format, constants: Option<&[f64]>) -> String {
    match format {
        Format::Stack => render_stack(program, constants),
        Format::Console | Format::Latex => render_infix(program, format, constants),
    }
}

fn constant_string(index: usize, constants: Option<&[f64]>) -> String {
    match constants.and_then(|values| values.get(index)) {
        Some(value) => value.to_string(),
        None => format!("C_{index}"),
    }
}

fn render_stack(program: &Program, constants: Option<&[f64]>) -> String {
    let mut out = String::new();
    for (position, instruction) in program.iter().enumerate() {
        let body = match instruction.operator() {
            Operator::Variable => format!("X{}", instruction.lhs()),
            Operator::Constant => constant_string(instruction.lhs(), constants),
            operator => stack_operation(operator, instruction),
        };
        out.push_str(&format!("{position:<4}<= {body}\n"));
    }
    out
}

fn stack_operation(operator: Operator, instruction: &Instruction) -> String {
    let (a, b) = (instruction.lhs(), instruction.rhs());
    match operator {
        Operator::Add => format!("({a}) + ({b})"),
        Operator::Subtract => format!("({a}) - ({b})"),
        Operator::Multiply => format!("({a}) * ({b})"),
        Operator::Divide => format!("({a}) / ({b})"),
        Operator::Power => format!("({a}) ^ ({b})"),
        Operator::SafePower => format!("|({a})| ^ ({b})"),
        Operator::Negate => format!("-({a})"),
        unary => format!("{} ({a})", unary.name()),
    }
}

fn render_infix(program: &Program, format: Format, constants: Option<&[f64]>) -> String {
    let used = program.utilized_commands();
    let mut strings: Vec<String> = Vec::with_capacity(program.len());
    for (position, instruction) in program.iter().enumerate() {
        if !used[position] {
            strings.push(String::new());
            continue;
        }
        let a = || strings[instruction.lhs()].as_str();
        let b = || strings[instruction.rhs()].as_str();
        let rendered = match (instruction.operator(), format) {
            (Operator::Variable, _) => format!("X_{}", instruction.lhs()),
            (Operator::Constant, _) => constant_string(instruction.lhs(), constants),
            (Operator::Add, _) => format!("{} + {}", a(), b()),
            (Operator::Subtract, _) => format!("{} - ({})", a(), b()),
            (Operator::Multiply, _) => format!("({})({})", a(), b()),
            (Operator::Divide, Format::Latex) => format!("\\frac{{{}}}{{{}}}", a(), b()),
            (Operator::Divide, _) => format!("({})/({})", a(), b()),
            (Operator::Power, Format::Latex) => format!("({})^{{ ({}) }}", a(), b()),
            (Operator::Power, _) => format!("({})^({})", a(), b()),
            (Operator::SafePower, Format::Latex) => format!("(|{}|)^{{ ({}) }}", a(), b()),
            (Operator::SafePower, _) => format!("(|{}|)^({})", a(), b()),
            (Operator::Abs, _) => format!("|{}|", a()),
            (Operator::Negate, _) => format!("-({})", a()),
            (function, Format::Latex) => format!("\\{}{{ {} }}", function.name(), a()),
            (function, _) => format!("{}({})", function.name(), a()),
        };
        strings.push(rendered);
    }
    strings.swap_remove(program.output())
}

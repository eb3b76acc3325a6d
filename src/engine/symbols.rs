use crate::engine::instruction::{Instruction, Program};

fn record(symbols: &mut Vec<String>, name: String) {
    if !symbols.contains(&name) {
        symbols.push(name);
    }
}

/// Collects the variable names referenced by a program into `symbols`,
/// de-duplicating while preserving first-seen order.
///
/// With `with_members` set, a variable reference followed by member-access
/// steps is fused into one dotted path (`obj.a.b`) before being recorded;
/// otherwise only base names are recorded. Nested sub-programs are walked
/// recursively.
pub(crate) fn get_symbols(program: &Program, symbols: &mut Vec<String>, with_members: bool) {
    let mut prev_var: Option<String> = None;

    for item in &program.instructions {
        match item {
            Instruction::Var(name) | Instruction::VarName(name) => {
                if !with_members && !symbols.contains(name) {
                    symbols.push(name.clone());
                } else if let Some(prev) = prev_var.take() {
                    record(symbols, prev);
                    prev_var = Some(name.clone());
                } else {
                    prev_var = Some(name.clone());
                }
            },

            Instruction::Member(name) if with_members && prev_var.is_some() => {
                if let Some(prev) = &mut prev_var {
                    prev.push('.');
                    prev.push_str(name);
                }
            },

            Instruction::Expr(sub) => {
                get_symbols(sub, symbols, with_members);
            },

            _ => {
                if let Some(prev) = prev_var.take() {
                    record(symbols, prev);
                }
            },
        }
    }

    if let Some(prev) = prev_var {
        record(symbols, prev);
    }
}

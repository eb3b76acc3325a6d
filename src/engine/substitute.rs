use std::rc::Rc;

use crate::engine::instruction::{Instruction, Program};

/// Replaces every bare reference to `variable` with a copy of
/// `replacement`'s instructions, spliced in place.
///
/// All other instructions are copied unchanged; nested sub-programs are
/// substituted into recursively. A program with no occurrence of the
/// variable comes back structurally identical (but freshly copied), which
/// also makes repeated substitution of the same name a no-op once no free
/// occurrence remains.
pub(crate) fn substitute(program: &Program, variable: &str, replacement: &Program) -> Program {
    let mut out = Vec::with_capacity(program.instructions.len());

    for item in &program.instructions {
        match item {
            Instruction::Var(name) if name == variable => {
                out.extend(replacement.instructions.iter().cloned());
            },
            Instruction::Expr(sub) => {
                out.push(Instruction::Expr(Rc::new(substitute(sub, variable, replacement))));
            },
            _ => out.push(item.clone()),
        }
    }

    Program::new(out)
}

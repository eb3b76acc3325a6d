use std::{collections::HashMap, rc::Rc};

use crate::engine::{
    instruction::{Instruction, Program},
    parser::Parser,
    value::Value,
};

/// Moves every pending literal into the output, oldest first, preserving
/// the program's relative order.
fn flush(pending: &mut Vec<Instruction>, out: &mut Vec<Instruction>) {
    out.extend(pending.drain(..));
}

fn literal(instruction: &Instruction) -> Option<&Value> {
    match instruction {
        Instruction::Number(v) => Some(v),
        _ => None,
    }
}

/// Constant-folds a program against a set of known-constant bindings.
///
/// Single forward pass with its own literal stack: literals and variables
/// present in `values` push literal replacements, and an operator whose
/// operands are all literal is folded through the same table function the
/// evaluator would call. Anything unresolved, and any fold that would fail
/// at evaluation time, flushes the pending literals and the instruction
/// itself into the output verbatim. Nested sub-programs are simplified
/// recursively and stay nested, so folding never crosses a deferred
/// boundary.
///
/// The result is a generally shorter program that is observationally
/// equivalent to the input for any context consistent with `values`.
pub(crate) fn simplify(program: &Program,
                       parser: &Parser,
                       values: &HashMap<String, Value>)
                       -> Program {
    let mut pending: Vec<Instruction> = Vec::new();
    let mut out: Vec<Instruction> = Vec::new();

    for item in &program.instructions {
        match item {
            Instruction::Number(value) => {
                if let Value::Array(elements) = value {
                    // Re-expand a literal array so its elements stay
                    // foldable alongside later instructions.
                    let mut expanded: Vec<Instruction> =
                        elements.iter()
                                .map(|element| Instruction::Number(element.clone()))
                                .collect();
                    expanded.push(Instruction::Array(elements.len()));

                    let sub = simplify(&Program::new(expanded), parser, values);
                    pending.extend(sub.instructions);
                } else {
                    pending.push(item.clone());
                }
            },

            Instruction::VarName(..) => pending.push(item.clone()),

            Instruction::Var(name) if values.contains_key(name) => {
                pending.push(Instruction::Number(values[name].clone()));
            },

            Instruction::Binary(op) if pending.len() >= 2 => {
                let n2 = pending.pop().unwrap_or(Instruction::EndStatement);
                let n1 = pending.pop().unwrap_or(Instruction::EndStatement);

                let folded = match (literal(&n1), literal(&n2)) {
                    (Some(v1), Some(v2)) => parser.binary_op(op)
                                                  .and_then(|f| f.call(&[v1.clone(), v2.clone()])
                                                                 .ok()),
                    _ => None,
                };

                match folded {
                    Some(value) => pending.push(Instruction::Number(value)),
                    None => {
                        pending.push(n1);
                        pending.push(n2);
                        flush(&mut pending, &mut out);
                        out.push(item.clone());
                    },
                }
            },

            Instruction::Ternary(op) if pending.len() >= 3 => {
                let n3 = pending.pop().unwrap_or(Instruction::EndStatement);
                let n2 = pending.pop().unwrap_or(Instruction::EndStatement);
                let n1 = pending.pop().unwrap_or(Instruction::EndStatement);

                let folded = match (literal(&n1), literal(&n2), literal(&n3)) {
                    (Some(v1), Some(v2), Some(v3)) => {
                        if op == "?" {
                            Some(if v1.is_truthy() { v2.clone() } else { v3.clone() })
                        } else {
                            parser.ternary_op(op)
                                  .and_then(|f| {
                                      f.call(&[v1.clone(), v2.clone(), v3.clone()]).ok()
                                  })
                        }
                    },
                    _ => None,
                };

                match folded {
                    Some(value) => pending.push(Instruction::Number(value)),
                    None => {
                        pending.push(n1);
                        pending.push(n2);
                        pending.push(n3);
                        flush(&mut pending, &mut out);
                        out.push(item.clone());
                    },
                }
            },

            Instruction::Unary(op) if !pending.is_empty() => {
                let n1 = pending.pop().unwrap_or(Instruction::EndStatement);

                let folded = literal(&n1).and_then(|v1| {
                                             parser.unary_op(op)
                                                   .and_then(|f| f.call(&[v1.clone()]).ok())
                                         });

                match folded {
                    Some(value) => pending.push(Instruction::Number(value)),
                    None => {
                        pending.push(n1);
                        flush(&mut pending, &mut out);
                        out.push(item.clone());
                    },
                }
            },

            Instruction::Expr(sub) => {
                flush(&mut pending, &mut out);
                out.push(Instruction::Expr(Rc::new(simplify(sub, parser, values))));
            },

            Instruction::Member(name) if !pending.is_empty() => {
                let n1 = pending.pop().unwrap_or(Instruction::EndStatement);

                let folded = match literal(&n1) {
                    Some(Value::Map(map)) => map.get(name).cloned(),
                    _ => None,
                };

                match folded {
                    Some(value) => pending.push(Instruction::Number(value)),
                    None => {
                        pending.push(n1);
                        flush(&mut pending, &mut out);
                        out.push(item.clone());
                    },
                }
            },

            _ => {
                flush(&mut pending, &mut out);
                out.push(item.clone());
            },
        }
    }

    flush(&mut pending, &mut out);
    Program::new(out)
}

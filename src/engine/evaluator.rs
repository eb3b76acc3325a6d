use std::rc::Rc;

use crate::{
    engine::{
        instruction::{Instruction, Program},
        parser::Parser,
        value::{Context, NativeFn, Value},
    },
    error::{EvalError, SecurityError},
};

/// Names that would reach the host object model in the source language.
/// Rejected unconditionally, as bare variables and as member steps.
fn is_reserved_name(name: &str) -> bool {
    name.starts_with("__proto__") || name.contains("prototype") || name.ends_with("constructor")
}

/// A lazy sub-program captured with the tables it was parsed against.
///
/// Resolution evaluates the program against whatever context the consumer
/// supplies; this is what gives lambda bodies fresh-scope-on-call semantics.
#[derive(Clone)]
pub(crate) struct Thunk {
    program: Rc<Program>,
    parser:  Parser,
}

impl Thunk {
    pub fn resolve(&self, context: &Context) -> Result<Value, EvalError> {
        evaluate(&self.program, &self.parser, context)
    }
}

/// What the evaluator's value stack holds: realized values, binding-target
/// names pushed by `VarName`, and unevaluated sub-programs pushed by `Expr`.
enum StackValue {
    Value(Value),
    Name(String),
    Thunk(Thunk),
}

fn pop(stack: &mut Vec<StackValue>) -> Result<StackValue, EvalError> {
    stack.pop()
         .ok_or_else(|| EvalError::InvalidExpression { details: "stack underflow".to_string(), })
}

fn resolve(item: StackValue, context: &Context) -> Result<Value, EvalError> {
    match item {
        StackValue::Value(v) => Ok(v),
        StackValue::Thunk(t) => t.resolve(context),
        StackValue::Name(..) => {
            Err(EvalError::InvalidExpression { details: "unresolved binding name".to_string(), })
        },
    }
}

fn pop_value(stack: &mut Vec<StackValue>, context: &Context) -> Result<Value, EvalError> {
    let item = pop(stack)?;
    resolve(item, context)
}

/// Runs a program against a context and produces its value.
///
/// Single pass, single explicit value stack. Deferred sub-programs are
/// pushed as thunks and only resolved when a consuming instruction demands
/// them, which implements short-circuiting and branch selection. Assignment
/// writes through to the caller's context, visible to every subsequently
/// executed instruction sharing it.
///
/// # Errors
/// Returns an [`EvalError`] for malformed programs (stack parity), type
/// problems, and undefined variables, and the distinguished
/// [`SecurityError`] subtype when the trust gate rejects a callable or a
/// reserved name.
pub(crate) fn evaluate(program: &Program,
                       parser: &Parser,
                       context: &Context)
                       -> Result<Value, EvalError> {
    let mut stack: Vec<StackValue> = Vec::new();

    for item in &program.instructions {
        match item {
            Instruction::Number(value) => stack.push(StackValue::Value(value.clone())),

            Instruction::VarName(name) => stack.push(StackValue::Name(name.clone())),

            Instruction::Binary(op) => eval_binary(op, &mut stack, parser, context)?,

            Instruction::Ternary(op) => eval_ternary(op, &mut stack, parser, context)?,

            Instruction::Var(name) => eval_var(name, &mut stack, parser, context)?,

            Instruction::Unary(op) => {
                let value = pop_value(&mut stack, context)?;
                let f = parser.unary_op(op)
                              .ok_or_else(|| EvalError::UnknownOperator { name: op.clone() })?;
                stack.push(StackValue::Value(f.call(&[value])?));
            },

            Instruction::FunCall(argc) => eval_funcall(*argc, &mut stack, parser, context)?,

            Instruction::FunDef(argc) => eval_fundef(*argc, &mut stack, parser, context)?,

            Instruction::Expr(sub) => {
                stack.push(StackValue::Thunk(Thunk { program: Rc::clone(sub),
                                                     parser:  parser.clone(), }));
            },

            Instruction::Member(name) => eval_member(name, &mut stack, parser, context)?,

            Instruction::EndStatement => {
                // Discards without resolving; a deferred statement value
                // that nothing consumed is never run.
                pop(&mut stack)?;
            },

            Instruction::Array(argc) => {
                let mut elements = Vec::with_capacity(*argc);
                for _ in 0..*argc {
                    elements.push(pop_value(&mut stack, context)?);
                }
                elements.reverse();
                stack.push(StackValue::Value(Value::from(elements)));
            },
        }
    }

    if stack.len() > 1 {
        return Err(EvalError::InvalidExpression { details: "stack parity violation".to_string(), });
    }

    let result = resolve(pop(&mut stack)?, context)?;
    Ok(match result {
           // Normalize negative zero out of arithmetic results.
           Value::Number(n) if n == 0.0 => Value::Number(0.0),
           other => other,
       })
}

fn eval_binary(op: &str,
               stack: &mut Vec<StackValue>,
               parser: &Parser,
               context: &Context)
               -> Result<(), EvalError> {
    let n2 = pop(stack)?;
    let n1 = pop(stack)?;

    match op {
        "and" => {
            let left = resolve(n1, context)?;
            let result = left.is_truthy() && resolve(n2, context)?.is_truthy();
            stack.push(StackValue::Value(Value::Bool(result)));
        },
        "or" => {
            let left = resolve(n1, context)?;
            let result = left.is_truthy() || resolve(n2, context)?.is_truthy();
            stack.push(StackValue::Value(Value::Bool(result)));
        },
        "=" => {
            let StackValue::Name(name) = n1 else {
                return Err(EvalError::InvalidExpression { details:
                                                              "assignment without a target name".to_string(), });
            };
            let value = resolve(n2, context)?;
            context.set(&name, value.clone());
            stack.push(StackValue::Value(value));
        },
        _ => {
            let v1 = resolve(n1, context)?;
            let v2 = resolve(n2, context)?;
            let f = parser.binary_op(op)
                          .ok_or_else(|| EvalError::UnknownOperator { name: op.to_string() })?;
            stack.push(StackValue::Value(f.call(&[v1, v2])?));
        },
    }
    Ok(())
}

fn eval_ternary(op: &str,
                stack: &mut Vec<StackValue>,
                parser: &Parser,
                context: &Context)
                -> Result<(), EvalError> {
    let n3 = pop(stack)?;
    let n2 = pop(stack)?;
    let n1 = pop(stack)?;

    if op == "?" {
        let condition = resolve(n1, context)?;
        let chosen = if condition.is_truthy() { n2 } else { n3 };
        stack.push(StackValue::Value(resolve(chosen, context)?));
        return Ok(());
    }

    let v1 = resolve(n1, context)?;
    let v2 = resolve(n2, context)?;
    let v3 = resolve(n3, context)?;
    let f = parser.ternary_op(op)
                  .ok_or_else(|| EvalError::UnknownOperator { name: op.to_string() })?;
    stack.push(StackValue::Value(f.call(&[v1, v2, v3])?));
    Ok(())
}

/// Variable lookup with the security gate.
///
/// Resolution order: reserved-name rejection, then the named-function
/// table, then the unary table (exposing enabled built-ins as values), then
/// the context. A context value that is callable is only pushed when it is
/// reference-identical to a table entry.
fn eval_var(name: &str,
            stack: &mut Vec<StackValue>,
            parser: &Parser,
            context: &Context)
            -> Result<(), EvalError> {
    if is_reserved_name(name) {
        return Err(SecurityError::ReservedName { name: name.to_string() }.into());
    }

    if let Some(f) = parser.registered_function(name) {
        stack.push(StackValue::Value(Value::Function(f)));
        return Ok(());
    }

    if parser.is_operator_enabled(name)
       && let Some(f) = parser.unary_op(name)
    {
        stack.push(StackValue::Value(Value::Function(f)));
        return Ok(());
    }

    match context.get(name) {
        Some(value) => {
            if let Value::Function(f) = &value
               && !parser.is_allowed_func(f)
            {
                return Err(SecurityError::UntrustedVariable { name: name.to_string() }.into());
            }
            stack.push(StackValue::Value(value));
            Ok(())
        },
        None => Err(EvalError::UndefinedVariable { name: name.to_string() }),
    }
}

fn eval_funcall(argc: usize,
                stack: &mut Vec<StackValue>,
                parser: &Parser,
                context: &Context)
                -> Result<(), EvalError> {
    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        args.push(pop_value(stack, context)?);
    }
    args.reverse();

    let f = match pop_value(stack, context)? {
        Value::Function(f) => f,
        other => {
            return Err(EvalError::NotAFunction { found: other.kind_name().to_string(), });
        },
    };

    if !parser.is_allowed_func(&f) {
        return Err(SecurityError::UntrustedCall.into());
    }

    stack.push(StackValue::Value(f.call(&args)?));
    Ok(())
}

/// Synthesizes a lambda: pops the body, the parameter names, and the
/// function name; registers the closure under a fresh unique name (making
/// it trusted from now on) and binds it in the context.
fn eval_fundef(argc: usize,
               stack: &mut Vec<StackValue>,
               parser: &Parser,
               context: &Context)
               -> Result<(), EvalError> {
    let StackValue::Thunk(body) = pop(stack)? else {
        return Err(EvalError::InvalidExpression { details:
                                                      "function definition without a body".to_string(), });
    };

    let mut params = Vec::with_capacity(argc);
    for _ in 0..argc {
        let StackValue::Name(param) = pop(stack)? else {
            return Err(EvalError::InvalidExpression { details:
                                                          "function definition with a non-name parameter".to_string(), });
        };
        params.push(param);
    }
    params.reverse();

    let StackValue::Name(fname) = pop(stack)? else {
        return Err(EvalError::InvalidExpression { details:
                                                      "function definition without a name".to_string(), });
    };

    // The closure shares the definition context and flat-copies it at each
    // call, so arguments overlay the outer bindings without leaking back.
    let def_context = context.clone();
    let f = NativeFn::new(move |args: &[Value]| {
                let scope = def_context.flat_copy();
                for (param, value) in params.iter().zip(args.iter()) {
                    scope.set(param, value.clone());
                }
                body.resolve(&scope)
            });

    let lambda_name = parser.next_lambda_name();
    parser.tables()
          .functions
          .borrow_mut()
          .insert(lambda_name, f.clone());
    context.set(&fname, Value::Function(f.clone()));
    stack.push(StackValue::Value(Value::Function(f)));
    Ok(())
}

fn eval_member(name: &str,
               stack: &mut Vec<StackValue>,
               parser: &Parser,
               context: &Context)
               -> Result<(), EvalError> {
    let object = pop_value(stack, context)?;

    if is_reserved_name(name) {
        return Err(SecurityError::ReservedName { name: name.to_string() }.into());
    }

    let Value::Map(map) = &object else {
        return Err(EvalError::TypeMismatch { details: format!("member access on a {}",
                                                              object.kind_name()), });
    };

    let value = map.get(name)
                   .cloned()
                   .ok_or_else(|| EvalError::UnknownMember { name: name.to_string() })?;

    if let Value::Function(f) = &value
       && !parser.is_allowed_func(f)
    {
        return Err(SecurityError::UntrustedMember { name: name.to_string() }.into());
    }

    stack.push(StackValue::Value(value));
    Ok(())
}

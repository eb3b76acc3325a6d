use std::{collections::HashMap, f64::consts};

use crate::{
    engine::value::{NativeFn, Value},
    error::EvalError,
};

type FnResult = Result<Value, EvalError>;

fn nth<'v>(args: &'v [Value], index: usize) -> Result<&'v Value, EvalError> {
    args.get(index)
        .ok_or_else(|| EvalError::InvalidArgument { details: format!("expected at least {} argument(s), found {}",
                                                                     index + 1,
                                                                     args.len()), })
}

fn number(args: &[Value], index: usize) -> Result<f64, EvalError> {
    nth(args, index)?.as_number()
}

// ---------- Arithmetic ----------

pub fn add(args: &[Value]) -> FnResult {
    Ok(Value::Number(number(args, 0)? + number(args, 1)?))
}

pub fn sub(args: &[Value]) -> FnResult {
    Ok(Value::Number(number(args, 0)? - number(args, 1)?))
}

pub fn mul(args: &[Value]) -> FnResult {
    Ok(Value::Number(number(args, 0)? * number(args, 1)?))
}

pub fn div(args: &[Value]) -> FnResult {
    Ok(Value::Number(number(args, 0)? / number(args, 1)?))
}

pub fn rem(args: &[Value]) -> FnResult {
    Ok(Value::Number(number(args, 0)? % number(args, 1)?))
}

pub fn pow(args: &[Value]) -> FnResult {
    Ok(Value::Number(number(args, 0)?.powf(number(args, 1)?)))
}

/// `||`: concatenates two arrays, or stringifies and joins anything else.
pub fn concat(args: &[Value]) -> FnResult {
    let a = nth(args, 0)?;
    let b = nth(args, 1)?;

    if let (Value::Array(x), Value::Array(y)) = (a, b) {
        let mut joined = x.as_ref().clone();
        joined.extend(y.iter().cloned());
        return Ok(Value::from(joined));
    }

    Ok(Value::Str(format!("{a}{b}")))
}

// ---------- Comparisons and logic ----------

/// Orders two values: strings compare lexically, everything else compares
/// numerically. `None` means the comparison is undefined (NaN involved).
fn compare(a: &Value, b: &Value) -> Result<Option<std::cmp::Ordering>, EvalError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        _ => Ok(a.as_number()?.partial_cmp(&b.as_number()?)),
    }
}

pub fn equal(args: &[Value]) -> FnResult {
    Ok(Value::Bool(nth(args, 0)? == nth(args, 1)?))
}

pub fn not_equal(args: &[Value]) -> FnResult {
    Ok(Value::Bool(nth(args, 0)? != nth(args, 1)?))
}

pub fn greater_than(args: &[Value]) -> FnResult {
    let ord = compare(nth(args, 0)?, nth(args, 1)?)?;
    Ok(Value::Bool(ord == Some(std::cmp::Ordering::Greater)))
}

pub fn less_than(args: &[Value]) -> FnResult {
    let ord = compare(nth(args, 0)?, nth(args, 1)?)?;
    Ok(Value::Bool(ord == Some(std::cmp::Ordering::Less)))
}

pub fn greater_than_equal(args: &[Value]) -> FnResult {
    let ord = compare(nth(args, 0)?, nth(args, 1)?)?;
    Ok(Value::Bool(matches!(ord,
                            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal))))
}

pub fn less_than_equal(args: &[Value]) -> FnResult {
    let ord = compare(nth(args, 0)?, nth(args, 1)?)?;
    Ok(Value::Bool(matches!(ord, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal))))
}

pub fn and_operator(args: &[Value]) -> FnResult {
    Ok(Value::Bool(nth(args, 0)?.is_truthy() && nth(args, 1)?.is_truthy()))
}

pub fn or_operator(args: &[Value]) -> FnResult {
    Ok(Value::Bool(nth(args, 0)?.is_truthy() || nth(args, 1)?.is_truthy()))
}

/// `in`: membership in an array, or substring search in a string.
pub fn in_operator(args: &[Value]) -> FnResult {
    let a = nth(args, 0)?;
    match nth(args, 1)? {
        Value::Array(items) => Ok(Value::Bool(items.iter().any(|item| item == a))),
        Value::Str(s) => Ok(Value::Bool(s.contains(&a.to_string()))),
        other => Err(EvalError::TypeMismatch { details: format!("'in' expects an array or string on the right, found {}",
                                                                other.kind_name()), }),
    }
}

pub fn not(args: &[Value]) -> FnResult {
    Ok(Value::Bool(!nth(args, 0)?.is_truthy()))
}

/// `=`: the evaluator performs the context write itself; this table entry
/// exists so the assignment operator has an identity for feature gating.
pub fn set_var(args: &[Value]) -> FnResult {
    Ok(nth(args, 1)?.clone())
}

/// `[`: indexes an array or string, truncating the index toward zero.
pub fn array_index(args: &[Value]) -> FnResult {
    #[allow(clippy::cast_possible_truncation)]
    let index = number(args, 1)?.trunc() as i64;

    match nth(args, 0)? {
        Value::Array(items) => {
            usize::try_from(index).ok()
                                  .and_then(|i| items.get(i).cloned())
                                  .ok_or(EvalError::IndexOutOfBounds { len:   items.len(),
                                                                       found: index, })
        },
        Value::Str(s) => {
            usize::try_from(index).ok()
                                  .and_then(|i| s.chars().nth(i))
                                  .map(|c| Value::Str(c.to_string()))
                                  .ok_or(EvalError::IndexOutOfBounds { len:   s.chars().count(),
                                                                       found: index, })
        },
        other => Err(EvalError::TypeMismatch { details: format!("cannot index a {}",
                                                                other.kind_name()), }),
    }
}

/// `?` / `if`: selects the second or third argument by truthiness of the
/// first.
pub fn condition(args: &[Value]) -> FnResult {
    if nth(args, 0)?.is_truthy() {
        Ok(nth(args, 1)?.clone())
    } else {
        Ok(nth(args, 2)?.clone())
    }
}

// ---------- Unary numeric helpers ----------

/// Rounding with halves toward positive infinity, like the source language.
fn js_round(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Sign that preserves signed zero and NaN.
fn js_sign(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() { x } else { x.signum() }
}

/// `length`: element count of an array, character count of anything else.
#[allow(clippy::cast_precision_loss)]
pub fn length(args: &[Value]) -> FnResult {
    match nth(args, 0)? {
        Value::Array(items) => Ok(Value::Number(items.len() as f64)),
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Ok(Value::Number(other.to_string().chars().count() as f64)),
    }
}

/// `!` and `fac`: factorial through the gamma function.
pub fn factorial(args: &[Value]) -> FnResult {
    Ok(Value::Number(gamma(number(args, 0)? + 1.0)))
}

const GAMMA_G: f64 = 4.742_187_5;

#[allow(clippy::unreadable_literal, clippy::excessive_precision)]
const GAMMA_P: [f64; 15] = [0.99999999999999709182,
                            57.156235665862923517,
                            -59.597960355475491248,
                            14.136097974741747174,
                            -0.49191381609762019978,
                            0.33994649984811888699e-4,
                            0.46523628927048575665e-4,
                            -0.98374475304879564677e-4,
                            0.15808870322491248884e-3,
                            -0.21026444172410488319e-3,
                            0.2174396181152126432e-3,
                            -0.16431810653676389022e-3,
                            0.84418223983852743293e-4,
                            -0.2619083840158140867e-4,
                            0.36899182659531622704e-5];

fn is_integer(x: f64) -> bool {
    x.is_finite() && x.fract() == 0.0
}

/// The gamma function, ported from the math.js Lanczos/Stirling
/// implementation.
///
/// Integers use the exact product (infinity at non-positive integers and
/// above 171), arguments below 0.5 use the reflection formula, arguments
/// above 85 use the extended Stirling approximation, and everything else
/// uses the Lanczos series.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gamma(n: f64) -> f64 {
    if is_integer(n) {
        if n <= 0.0 {
            return if n.is_finite() { f64::INFINITY } else { f64::NAN };
        }

        if n > 171.0 {
            return f64::INFINITY;
        }

        let mut value = n - 2.0;
        let mut res = n - 1.0;
        while value > 1.0 {
            res *= value;
            value -= 1.0;
        }

        if res == 0.0 {
            res = 1.0;
        }

        return res;
    }

    if n < 0.5 {
        return consts::PI / ((consts::PI * n).sin() * gamma(1.0 - n));
    }

    if n >= 171.35 {
        return f64::INFINITY;
    }

    if n > 85.0 {
        let two_n = n * n;
        let three_n = two_n * n;
        let four_n = three_n * n;
        let five_n = four_n * n;
        return (2.0 * consts::PI / n).sqrt()
               * (n / consts::E).powf(n)
               * (1.0
                  + 1.0 / (12.0 * n)
                  + 1.0 / (288.0 * two_n)
                  - 139.0 / (51840.0 * three_n)
                  - 571.0 / (2488320.0 * four_n)
                  + 163879.0 / (209018880.0 * five_n)
                  + 5246819.0 / (75246796800.0 * five_n * n));
    }

    let n = n - 1.0;
    let mut x = GAMMA_P[0];
    for (i, p) in GAMMA_P.iter().enumerate().skip(1) {
        x += p / (n + i as f64);
    }

    let t = n + GAMMA_G + 0.5;
    (2.0 * consts::PI).sqrt() * t.powf(n + 0.5) * (-t).exp() * x
}

/// `roundTo`: decimal adjustment of a number to `exp` decimal places.
///
/// The value is shifted by rewriting its exponent in e-notation, rounded,
/// and shifted back, so `roundTo(1.005, 2)` is `1.01` rather than the `1.0`
/// that naive binary scaling produces.
pub fn round_to(args: &[Value]) -> FnResult {
    let value = number(args, 0)?;
    let exp = match args.get(1) {
        Some(v) => v.as_number()?,
        None => 0.0,
    };
    Ok(Value::Number(decimal_adjust(value, exp)))
}

#[allow(clippy::cast_possible_truncation)]
fn decimal_adjust(value: f64, exp: f64) -> f64 {
    if exp == 0.0 {
        return js_round(value);
    }

    let e = -exp;
    if value.is_nan() || !e.is_finite() || e.fract() != 0.0 {
        return f64::NAN;
    }

    let rounded = js_round(shift_exponent(value, -(e as i64)));
    shift_exponent(rounded, e as i64)
}

fn shift_exponent(value: f64, delta: i64) -> f64 {
    let formatted = format!("{value:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => exponent.parse::<i64>()
                                              .ok()
                                              .and_then(|e| {
                                                  format!("{mantissa}e{}", e + delta).parse().ok()
                                              })
                                              .unwrap_or(f64::NAN),
        None => f64::NAN,
    }
}

// ---------- Variadic and sequence functions ----------

/// `random`: a uniform value in `[0, scale)`, with scale defaulting to 1.
pub fn random(args: &[Value]) -> FnResult {
    let scale = match args.first() {
        Some(v) => {
            let n = v.as_number()?;
            if n == 0.0 || n.is_nan() { 1.0 } else { n }
        },
        None => 1.0,
    };
    Ok(Value::Number(rand::random::<f64>() * scale))
}

fn numbers_of<'v>(values: impl Iterator<Item = &'v Value>) -> Result<Vec<f64>, EvalError> {
    values.map(Value::as_number).collect()
}

fn fold_extremum(nums: &[f64], init: f64, pick: fn(f64, f64) -> f64) -> f64 {
    nums.iter().fold(init, |acc, &v| {
                   if v.is_nan() || acc.is_nan() { f64::NAN } else { pick(acc, v) }
               })
}

/// `max`: the largest of an array or of the arguments; negative infinity
/// when empty, NaN-propagating.
pub fn max(args: &[Value]) -> FnResult {
    let nums = match args {
        [Value::Array(items)] => numbers_of(items.iter())?,
        _ => numbers_of(args.iter())?,
    };
    Ok(Value::Number(fold_extremum(&nums, f64::NEG_INFINITY, f64::max)))
}

/// `min`: the smallest of an array or of the arguments; positive infinity
/// when empty, NaN-propagating.
pub fn min(args: &[Value]) -> FnResult {
    let nums = match args {
        [Value::Array(items)] => numbers_of(items.iter())?,
        _ => numbers_of(args.iter())?,
    };
    Ok(Value::Number(fold_extremum(&nums, f64::INFINITY, f64::min)))
}

/// `hypot`: overflow-safe Euclidean norm of the arguments.
pub fn hypot(args: &[Value]) -> FnResult {
    let mut sum = 0.0;
    let mut larg: f64 = 0.0;

    for value in args {
        let arg = value.as_number()?.abs();

        if larg < arg {
            let div = larg / arg;
            sum = sum * div * div + 1.0;
            larg = arg;
        } else if arg > 0.0 {
            let div = arg / larg;
            sum += div * div;
        } else {
            sum += arg;
        }
    }

    Ok(Value::Number(if larg == f64::INFINITY {
                         f64::INFINITY
                     } else {
                         larg * sum.sqrt()
                     }))
}

pub fn atan2(args: &[Value]) -> FnResult {
    Ok(Value::Number(number(args, 0)?.atan2(number(args, 1)?)))
}

/// `sum`: numeric total of an array.
pub fn sum(args: &[Value]) -> FnResult {
    match nth(args, 0)? {
        Value::Array(items) => {
            let mut total = 0.0;
            for item in items.iter() {
                total += item.as_number()?;
            }
            Ok(Value::Number(total))
        },
        _ => Err(EvalError::InvalidArgument { details: "sum argument is not an array".to_string(), }),
    }
}

fn function_arg<'v>(args: &'v [Value], index: usize, caller: &str) -> Result<&'v NativeFn, EvalError> {
    match nth(args, index)? {
        Value::Function(f) => Ok(f),
        _ => Err(EvalError::InvalidArgument { details: format!("first argument to {caller} is not a function"), }),
    }
}

fn array_arg<'v>(args: &'v [Value], index: usize, caller: &str) -> Result<&'v Vec<Value>, EvalError> {
    match nth(args, index)? {
        Value::Array(items) => Ok(items),
        _ => Err(EvalError::InvalidArgument { details: format!("expected an array argument to {caller}"), }),
    }
}

/// `map(f, a)`: applies `f` to each element; `f` receives the element and
/// its index.
#[allow(clippy::cast_precision_loss)]
pub fn array_map(args: &[Value]) -> FnResult {
    let f = function_arg(args, 0, "map")?;
    let items = array_arg(args, 1, "map")?;

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        out.push(f.call(&[item.clone(), Value::Number(i as f64)])?);
    }
    Ok(Value::from(out))
}

/// `fold(f, init, a)`: left fold; `f` receives the accumulator, the
/// element, and its index.
#[allow(clippy::cast_precision_loss)]
pub fn array_fold(args: &[Value]) -> FnResult {
    let f = function_arg(args, 0, "fold")?;
    let init = nth(args, 1)?;
    let items = array_arg(args, 2, "fold")?;

    let mut acc = init.clone();
    for (i, item) in items.iter().enumerate() {
        acc = f.call(&[acc, item.clone(), Value::Number(i as f64)])?;
    }
    Ok(acc)
}

/// `filter(f, a)`: keeps the elements for which `f` is truthy.
#[allow(clippy::cast_precision_loss)]
pub fn array_filter(args: &[Value]) -> FnResult {
    let f = function_arg(args, 0, "filter")?;
    let items = array_arg(args, 1, "filter")?;

    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if f.call(&[item.clone(), Value::Number(i as f64)])?.is_truthy() {
            out.push(item.clone());
        }
    }
    Ok(Value::from(out))
}

/// `indexOf(target, s)`: first position of `target` in a string or array,
/// `-1` when absent.
#[allow(clippy::cast_precision_loss)]
pub fn index_of(args: &[Value]) -> FnResult {
    let target = nth(args, 0)?;
    match nth(args, 1)? {
        Value::Str(s) => {
            let needle = target.to_string();
            let position = s.find(&needle)
                            .map_or(-1.0, |byte| s[..byte].chars().count() as f64);
            Ok(Value::Number(position))
        },
        Value::Array(items) => {
            let position = items.iter()
                                .position(|item| item == target)
                                .map_or(-1.0, |i| i as f64);
            Ok(Value::Number(position))
        },
        _ => Err(EvalError::InvalidArgument { details:
                                                  "second argument to indexOf is not a string or array".to_string(), }),
    }
}

/// `join(sep, a)`: stringifies and joins the elements of an array.
pub fn array_join(args: &[Value]) -> FnResult {
    let sep = nth(args, 0)?.to_string();
    let items = array_arg(args, 1, "join")?;

    let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
    Ok(Value::Str(joined.join(&sep)))
}

// ---------- Default tables ----------

fn num_unary(f: fn(f64) -> f64) -> NativeFn {
    NativeFn::new(move |args| Ok(Value::Number(f(nth(args, 0)?.as_number()?))))
}

/// The default unary operator table: prefix operators, postfix factorial,
/// and the single-argument numeric built-ins usable in prefix position.
pub(crate) fn default_unary_ops() -> HashMap<String, NativeFn> {
    let numeric: [(&str, fn(f64) -> f64); 29] = [("sin", f64::sin),
                                                 ("cos", f64::cos),
                                                 ("tan", f64::tan),
                                                 ("asin", f64::asin),
                                                 ("acos", f64::acos),
                                                 ("atan", f64::atan),
                                                 ("sinh", f64::sinh),
                                                 ("cosh", f64::cosh),
                                                 ("tanh", f64::tanh),
                                                 ("asinh", f64::asinh),
                                                 ("acosh", f64::acosh),
                                                 ("atanh", f64::atanh),
                                                 ("sqrt", f64::sqrt),
                                                 ("cbrt", f64::cbrt),
                                                 ("log", f64::ln),
                                                 ("ln", f64::ln),
                                                 ("log2", f64::log2),
                                                 ("lg", f64::log10),
                                                 ("log10", f64::log10),
                                                 ("expm1", f64::exp_m1),
                                                 ("log1p", f64::ln_1p),
                                                 ("abs", f64::abs),
                                                 ("ceil", f64::ceil),
                                                 ("floor", f64::floor),
                                                 ("round", js_round),
                                                 ("trunc", f64::trunc),
                                                 ("exp", f64::exp),
                                                 ("sign", js_sign),
                                                 ("-", std::ops::Neg::neg)];

    let mut ops = HashMap::new();
    for (name, f) in numeric {
        ops.insert(name.to_string(), num_unary(f));
    }

    ops.insert("+".to_string(), num_unary(|x| x));
    ops.insert("not".to_string(), NativeFn::new(not));
    ops.insert("length".to_string(), NativeFn::new(length));
    ops.insert("!".to_string(), NativeFn::new(factorial));
    ops
}

/// The default binary operator table.
pub(crate) fn default_binary_ops() -> HashMap<String, NativeFn> {
    let entries: [(&str, fn(&[Value]) -> FnResult); 18] = [("+", add),
                                                           ("-", sub),
                                                           ("*", mul),
                                                           ("/", div),
                                                           ("%", rem),
                                                           ("^", pow),
                                                           ("||", concat),
                                                           ("==", equal),
                                                           ("!=", not_equal),
                                                           (">", greater_than),
                                                           ("<", less_than),
                                                           (">=", greater_than_equal),
                                                           ("<=", less_than_equal),
                                                           ("and", and_operator),
                                                           ("or", or_operator),
                                                           ("in", in_operator),
                                                           ("=", set_var),
                                                           ("[", array_index)];

    entries.into_iter()
           .map(|(name, f)| (name.to_string(), NativeFn::new(f)))
           .collect()
}

/// The default ternary operator table.
pub(crate) fn default_ternary_ops() -> HashMap<String, NativeFn> {
    HashMap::from([("?".to_string(), NativeFn::new(condition))])
}

/// The default named-function table.
pub(crate) fn default_functions() -> HashMap<String, NativeFn> {
    let entries: [(&str, fn(&[Value]) -> FnResult); 17] = [("random", random),
                                                           ("fac", factorial),
                                                           ("min", min),
                                                           ("max", max),
                                                           ("hypot", hypot),
                                                           ("pyt", hypot),
                                                           ("pow", pow),
                                                           ("atan2", atan2),
                                                           ("if", condition),
                                                           ("gamma", |args| {
                                                               Ok(Value::Number(gamma(number(args, 0)?)))
                                                           }),
                                                           ("roundTo", round_to),
                                                           ("map", array_map),
                                                           ("fold", array_fold),
                                                           ("filter", array_filter),
                                                           ("indexOf", index_of),
                                                           ("join", array_join),
                                                           ("sum", sum)];

    entries.into_iter()
           .map(|(name, f)| (name.to_string(), NativeFn::new(f)))
           .collect()
}

/// The default constants table.
pub(crate) fn default_consts() -> HashMap<String, Value> {
    HashMap::from([("E".to_string(), Value::Number(consts::E)),
                   ("PI".to_string(), Value::Number(consts::PI)),
                   ("true".to_string(), Value::Bool(true)),
                   ("false".to_string(), Value::Bool(false))])
}

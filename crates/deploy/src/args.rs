//! Constructor and function argument encoding.
//!
//! Arguments arrive as one flat string: top-level values are separated by `^`, and a
//! value wrapped in `[...]` is an array whose elements are separated by `,`. The reserved
//! characters cannot be escaped.
//!
//! ```
//! use ethkit_deploy::args::{Arg, parse_arg_string};
//!
//! let args = parse_arg_string("0x00000000000000000000000000000000000000aa^[1,2]^[]");
//! assert_eq!(args[1], Arg::Array(vec!["1".into(), "2".into()]));
//! assert_eq!(args[2], Arg::Array(vec![]));
//! ```

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{Function, JsonAbi, Param},
};

use crate::{Error, Result};

/// Separator between top-level arguments.
pub const ARG_DELIMITER: char = '^';
/// Separator between array elements.
pub const ARRAY_DELIMITER: char = ',';

/// One raw argument, before it is matched against a declared parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Scalar(String),
    Array(Vec<String>),
}

/// Split an argument string into raw [`Arg`]s, preserving order.
pub fn parse_arg_string(input: &str) -> Vec<Arg> {
    input.split(ARG_DELIMITER).map(parse_token).collect()
}

fn parse_token(token: &str) -> Arg {
    match token
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        Some("") => Arg::Array(Vec::new()),
        Some(inner) => Arg::Array(inner.split(ARRAY_DELIMITER).map(String::from).collect()),
        None => Arg::Scalar(token.to_string()),
    }
}

/// Coerce raw arguments positionally against `params`.
pub fn coerce_args(params: &[Param], args: &[Arg]) -> Result<Vec<DynSolValue>> {
    if args.len() != params.len() {
        let position = args.len().min(params.len());
        let expected = params
            .get(position)
            .map_or_else(|| "no further arguments".to_string(), |p| p.ty.clone());
        return Err(Error::encoding(
            position,
            expected,
            format!("expected {} arguments, got {}", params.len(), args.len()),
        ));
    }

    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(position, (param, arg))| coerce_arg(position, param, arg))
        .collect()
}

fn coerce_arg(position: usize, param: &Param, arg: &Arg) -> Result<DynSolValue> {
    let ty = param
        .resolve()
        .map_err(|e| Error::encoding(position, &param.ty, e))?;

    match (arg, &ty) {
        (Arg::Scalar(value), _) => ty
            .coerce_str(value)
            .map_err(|e| Error::encoding(position, &param.ty, e)),
        (Arg::Array(items), DynSolType::Array(inner)) => {
            coerce_items(position, &param.ty, inner, items).map(DynSolValue::Array)
        }
        (Arg::Array(items), DynSolType::FixedArray(inner, len)) => {
            if items.len() != *len {
                return Err(Error::encoding(
                    position,
                    &param.ty,
                    format!("expected {len} elements, got {}", items.len()),
                ));
            }
            coerce_items(position, &param.ty, inner, items).map(DynSolValue::FixedArray)
        }
        (Arg::Array(_), _) => Err(Error::encoding(
            position,
            &param.ty,
            "array given for a non-array parameter",
        )),
    }
}

fn coerce_items(
    position: usize,
    declared: &str,
    inner: &DynSolType,
    items: &[String],
) -> Result<Vec<DynSolValue>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            inner
                .coerce_str(item)
                .map_err(|e| Error::encoding(position, declared, format!("element {index}: {e}")))
        })
        .collect()
}

/// Parse `arg_string` and coerce it against the inputs selected by `selector`.
///
/// An empty selector targets the constructor; any other selector names a function. An
/// empty argument string yields no values and is only valid for zero-parameter targets.
pub fn encode_args(abi: &JsonAbi, selector: &str, arg_string: &str) -> Result<Vec<DynSolValue>> {
    let params: &[Param] = if selector.is_empty() {
        abi.constructor()
            .map(|constructor| constructor.inputs.as_slice())
            .unwrap_or_default()
    } else {
        let arity = arg_count(arg_string);
        find_function(abi, selector, arity)?.inputs.as_slice()
    };

    if arg_string.is_empty() {
        return coerce_args(params, &[]);
    }

    coerce_args(params, &parse_arg_string(arg_string))
}

/// ABI-encode constructor arguments, ready to be appended to creation bytecode.
pub fn encode_constructor_input(abi: &JsonAbi, arg_string: &str) -> Result<Vec<u8>> {
    let values = encode_args(abi, "", arg_string)?;
    match abi.constructor() {
        Some(constructor) => constructor
            .abi_encode_input(&values)
            .map_err(|e| Error::encoding(0, "constructor", e)),
        None => Ok(Vec::new()),
    }
}

/// ABI-encode a function call (selector included).
pub fn encode_function_call(abi: &JsonAbi, function: &str, arg_string: &str) -> Result<Vec<u8>> {
    let values = encode_args(abi, function, arg_string)?;
    find_function(abi, function, values.len())?
        .abi_encode_input(&values)
        .map_err(|e| Error::encoding(0, function, e))
}

/// Resolve the first overload of `name` taking `arity` inputs.
pub fn find_function<'a>(abi: &'a JsonAbi, name: &str, arity: usize) -> Result<&'a Function> {
    abi.function(name)
        .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
        .ok_or_else(|| {
            Error::encoding(
                0,
                name,
                format!("no function `{name}` taking {arity} arguments in ABI"),
            )
        })
}

fn arg_count(arg_string: &str) -> usize {
    if arg_string.is_empty() {
        0
    } else {
        arg_string.split(ARG_DELIMITER).count()
    }
}

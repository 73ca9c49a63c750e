//! Line-oriented parser for the textual IR.
//!
//! Each instruction sits on its own line and `;` starts a comment. Values must be defined above
//! their first use; blocks may be referenced before their label appears. Errors carry the
//! 1-based line number and the offending raw line.

use crate::ir::{BinaryOp, Function, IcmpPred, InstKind, Module, ValueId};
use crate::result::{Error, Result};
use crate::types::Type;
use petgraph::graph::NodeIndex;

/// One significant source line.
struct Line<'a> {
    number: usize,
    raw: &'a str,
    text: &'a str,
}

impl Line<'_> {
    fn error(&self, msg: impl Into<String>) -> Error {
        Error::ParseError {
            line: self.number,
            msg: msg.into(),
            raw: self.raw.to_string(),
        }
    }
}

/// Parses every `define` in `text`.
pub fn parse_module(text: &str) -> Result<Module> {
    let lines: Vec<Line<'_>> = text
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let text = raw.split(';').next().unwrap_or("").trim();
            (!text.is_empty()).then_some(Line {
                number: i + 1,
                raw,
                text,
            })
        })
        .collect();

    if lines.is_empty() {
        return Err(Error::ParseError {
            line: 0,
            msg: "empty input".into(),
            raw: text.to_string(),
        });
    }

    let mut module = Module::default();
    let mut idx = 0;
    while idx < lines.len() {
        let header = &lines[idx];
        let close = lines[idx + 1..]
            .iter()
            .position(|l| l.text == "}")
            .map(|offset| idx + 1 + offset)
            .ok_or_else(|| header.error("function body is not closed with '}'"))?;

        let func = parse_function_lines(header, &lines[idx + 1..close])?;
        if module.functions.iter().any(|f| f.name == func.name) {
            return Err(header.error(format!("duplicate function '@{}'", func.name)));
        }
        module.functions.push(func);
        idx = close + 1;
    }
    Ok(module)
}

/// Parses input that must contain exactly one function.
pub fn parse_function(text: &str) -> Result<Function> {
    let mut module = parse_module(text)?;
    if module.functions.len() != 1 {
        return Err(Error::ParseError {
            line: 0,
            msg: format!("expected one function, found {}", module.functions.len()),
            raw: String::new(),
        });
    }
    Ok(module.functions.remove(0))
}

fn parse_function_lines(header: &Line<'_>, body: &[Line<'_>]) -> Result<Function> {
    let mut func = parse_header(header)?;

    // Labels first so branches can point forward.
    if body.first().is_some_and(|l| !l.text.ends_with(':')) {
        func.add_block("entry")
            .map_err(|e| header.error(e.to_string()))?;
    }
    for line in body {
        if let Some(label) = line.text.strip_suffix(':') {
            func.add_block(label)
                .map_err(|e| line.error(e.to_string()))?;
        }
    }

    let mut current = func.entry().ok_or_else(|| header.error("function has no blocks"))?;
    for line in body {
        if let Some(label) = line.text.strip_suffix(':') {
            current = func
                .block_by_label(label)
                .ok_or_else(|| line.error(format!("unknown label '{label}'")))?;
            continue;
        }
        parse_instruction(&mut func, current, line)?;
    }
    Ok(func)
}

fn parse_header(line: &Line<'_>) -> Result<Function> {
    let rest = line
        .text
        .strip_prefix("define ")
        .ok_or_else(|| line.error("expected 'define'"))?;
    let (ret_text, rest) = rest
        .split_once('@')
        .ok_or_else(|| line.error("missing function name"))?;
    let (name, rest) = rest
        .split_once('(')
        .ok_or_else(|| line.error("missing parameter list"))?;
    let (params, tail) = rest
        .split_once(')')
        .ok_or_else(|| line.error("unclosed parameter list"))?;
    if tail.trim() != "{" {
        return Err(line.error("expected '{' after parameter list"));
    }

    let ret_ty: Type = ret_text
        .trim()
        .parse()
        .map_err(|e: Error| line.error(e.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(line.error("empty function name"));
    }

    let mut func = Function::new(name, ret_ty);
    for param in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (ty_text, param_name) = param
            .split_once(char::is_whitespace)
            .ok_or_else(|| line.error(format!("malformed parameter '{param}'")))?;
        let ty: Type = ty_text
            .parse()
            .map_err(|e: Error| line.error(e.to_string()))?;
        let param_name = param_name
            .trim()
            .strip_prefix('%')
            .ok_or_else(|| line.error(format!("parameter '{param}' needs a %name")))?;
        func.add_param(param_name, ty)
            .map_err(|e| line.error(e.to_string()))?;
    }
    Ok(func)
}

fn parse_instruction(func: &mut Function, block: NodeIndex, line: &Line<'_>) -> Result<()> {
    let (result_name, rhs) = match line.text.split_once('=') {
        Some((lhs, rhs)) => {
            let name = lhs
                .trim()
                .strip_prefix('%')
                .ok_or_else(|| line.error("result must be a %name"))?;
            (Some(name), rhs)
        }
        None => (None, line.text),
    };

    let tokens: Vec<&str> = rhs
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    let Some((&opcode, args)) = tokens.split_first() else {
        return Err(line.error("missing opcode"));
    };

    let require_result = || {
        result_name.ok_or_else(|| line.error(format!("'{opcode}' needs a result name")))
    };
    let forbid_result = || match result_name {
        Some(_) => Err(line.error(format!("'{opcode}' does not produce a value"))),
        None => Ok(()),
    };
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(line.error(format!("'{opcode}' expects {n} operands, found {}", args.len())))
        }
    };
    let parse_ty =
        |text: &str| -> Result<Type> { text.parse().map_err(|e: Error| line.error(e.to_string())) };
    let append = |func: &mut Function,
                  kind: InstKind,
                  operands: Vec<ValueId>,
                  ty: Type,
                  name: Option<&str>| {
        func.append_inst(block, kind, operands, ty, name)
            .map_err(|e| line.error(e.to_string()))
    };

    if let Some(op) = BinaryOp::from_mnemonic(opcode) {
        let name = require_result()?;
        arity(3)?;
        let ty = parse_ty(args[0])?;
        let valid = if op.is_float() { ty.is_float() } else { ty.is_int() };
        if !valid {
            return Err(line.error(format!("'{opcode}' cannot operate on {ty}")));
        }
        let lhs = operand(func, line, args[1], ty)?;
        let rhs = operand(func, line, args[2], ty)?;
        append(func, InstKind::Binary(op), vec![lhs, rhs], ty, Some(name))?;
        return Ok(());
    }

    match opcode {
        "icmp" => {
            let name = require_result()?;
            arity(4)?;
            let pred = IcmpPred::from_mnemonic(args[0])
                .ok_or_else(|| line.error(format!("unknown predicate '{}'", args[0])))?;
            let ty = parse_ty(args[1])?;
            if !(ty.is_int() || ty == Type::Ptr) {
                return Err(line.error(format!("icmp cannot compare {ty}")));
            }
            let lhs = operand(func, line, args[2], ty)?;
            let rhs = operand(func, line, args[3], ty)?;
            append(func, InstKind::Icmp(pred), vec![lhs, rhs], Type::Int(1), Some(name))?;
        }
        "load" => {
            let name = require_result()?;
            arity(3)?;
            let ty = parse_ty(args[0])?;
            expect_keyword(line, args[1], "ptr")?;
            let ptr = operand(func, line, args[2], Type::Ptr)?;
            append(func, InstKind::Load, vec![ptr], ty, Some(name))?;
        }
        "alloca" => {
            let name = require_result()?;
            arity(1)?;
            let ty = parse_ty(args[0])?;
            append(func, InstKind::Alloca(ty), Vec::new(), Type::Ptr, Some(name))?;
        }
        "store" => {
            forbid_result()?;
            arity(4)?;
            let ty = parse_ty(args[0])?;
            let value = operand(func, line, args[1], ty)?;
            expect_keyword(line, args[2], "ptr")?;
            let ptr = operand(func, line, args[3], Type::Ptr)?;
            append(func, InstKind::Store, vec![value, ptr], Type::Void, None)?;
        }
        "br" => {
            forbid_result()?;
            match args.len() {
                2 => {
                    expect_keyword(line, args[0], "label")?;
                    let target = label(func, line, args[1])?;
                    append(func, InstKind::Br(target), Vec::new(), Type::Void, None)?;
                }
                6 => {
                    expect_keyword(line, args[0], "i1")?;
                    let cond = operand(func, line, args[1], Type::Int(1))?;
                    expect_keyword(line, args[2], "label")?;
                    let then_dest = label(func, line, args[3])?;
                    expect_keyword(line, args[4], "label")?;
                    let else_dest = label(func, line, args[5])?;
                    append(
                        func,
                        InstKind::CondBr {
                            then_dest,
                            else_dest,
                        },
                        vec![cond],
                        Type::Void,
                        None,
                    )?;
                }
                n => return Err(line.error(format!("'br' expects 2 or 6 tokens, found {n}"))),
            }
        }
        "ret" => {
            forbid_result()?;
            let operands = match args {
                ["void"] => Vec::new(),
                [ty, value] => {
                    let ty = parse_ty(*ty)?;
                    vec![operand(func, line, *value, ty)?]
                }
                _ => return Err(line.error("expected 'ret void' or 'ret <ty> <value>'")),
            };
            append(func, InstKind::Ret, operands, Type::Void, None)?;
        }
        other => return Err(line.error(format!("unknown opcode '{other}'"))),
    }
    Ok(())
}

fn expect_keyword(line: &Line<'_>, token: &str, keyword: &str) -> Result<()> {
    if token == keyword {
        Ok(())
    } else {
        Err(line.error(format!("expected '{keyword}', found '{token}'")))
    }
}

fn label(func: &Function, line: &Line<'_>, token: &str) -> Result<NodeIndex> {
    let name = token
        .strip_prefix('%')
        .ok_or_else(|| line.error(format!("label reference '{token}' needs a %")))?;
    func.block_by_label(name)
        .ok_or_else(|| line.error(format!("unknown label '%{name}'")))
}

/// Resolves `%name` or a literal, checking it has type `ty`.
fn operand(func: &mut Function, line: &Line<'_>, token: &str, ty: Type) -> Result<ValueId> {
    if let Some(name) = token.strip_prefix('%') {
        let id = func
            .lookup(name)
            .ok_or_else(|| line.error(format!("use of undefined value '%{name}'")))?;
        let found = func.ty(id).map_err(|e| line.error(e.to_string()))?;
        if found != ty {
            return Err(line.error(format!("'%{name}' has type {found}, expected {ty}")));
        }
        return Ok(id);
    }

    let constant = match ty {
        Type::Int(_) => {
            let value = match token {
                "true" => 1,
                "false" => 0,
                _ => token
                    .parse::<i128>()
                    .ok()
                    .filter(|v| *v >= i64::MIN as i128 && *v <= u64::MAX as i128)
                    .map(|v| v as i64)
                    .ok_or_else(|| line.error(format!("invalid integer literal '{token}'")))?,
            };
            func.const_int(ty, value)
        }
        Type::F32 | Type::F64 => {
            let value = token
                .parse::<f64>()
                .map_err(|_| line.error(format!("invalid float literal '{token}'")))?;
            func.const_float(ty, value)
        }
        _ => return Err(line.error(format!("no literal syntax for {ty}"))),
    };
    constant.map_err(|e| line.error(e.to_string()))
}

//! Expression lowering.

use qtjir_core::{BuiltinRegistry, GateType, NodeId, Opcode, QuantumMetadata, Tenancy};

use crate::ast::{AstId, AstNodeKind, AstSnapshot, TokenKind};
use crate::context::LoweringContext;
use crate::error::LowerError;

/// Parses an integer literal honoring `0x/0b/0o` prefixes and `_`
/// separators.
pub fn parse_integer_literal(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()
    } else {
        cleaned.parse::<i64>().ok()
    }
}

/// Strips surrounding quotes and decodes the closed escape set
/// (`\n \t \r \0 \\ \" \'`).
pub fn decode_string_literal(text: &str) -> String {
    let stripped = text
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
        .or_else(|| text.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(text);

    let mut out = String::with_capacity(stripped.len());
    let mut chars = stripped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn token_text<'a>(ast: &'a dyn AstSnapshot, token_id: u32) -> Option<&'a str> {
    let token = ast.get_token(token_id)?;
    ast.intern_lookup(token.interned_string_id?)
}

/// Finds the operator token strictly between `lhs_last` and `rhs_first`,
/// skipping whitespace/comments/newlines/parens.
pub fn find_binary_operator(ast: &dyn AstSnapshot, lhs_last: u32, rhs_first: u32) -> Option<TokenKind> {
    for token_id in (lhs_last + 1)..rhs_first {
        let Some(token) = ast.get_token(token_id) else { continue };
        match token.kind {
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::Newline | TokenKind::LeftParen | TokenKind::RightParen => continue,
            other => return Some(other),
        }
    }
    None
}

fn opcode_for_arithmetic(kind: TokenKind) -> Option<Opcode> {
    match kind {
        TokenKind::Plus | TokenKind::PlusAssign => Some(Opcode::Add),
        TokenKind::Minus | TokenKind::MinusAssign => Some(Opcode::Sub),
        TokenKind::Star | TokenKind::StarAssign => Some(Opcode::Mul),
        TokenKind::Slash | TokenKind::SlashAssign => Some(Opcode::Div),
        TokenKind::Percent | TokenKind::PercentAssign => Some(Opcode::Mod),
        TokenKind::Amp | TokenKind::AmpAssign => Some(Opcode::BitAnd),
        TokenKind::Pipe | TokenKind::PipeAssign => Some(Opcode::BitOr),
        TokenKind::Caret | TokenKind::CaretAssign => Some(Opcode::Xor),
        TokenKind::ShiftLeft | TokenKind::ShiftLeftAssign => Some(Opcode::Shl),
        TokenKind::ShiftRight | TokenKind::ShiftRightAssign => Some(Opcode::Shr),
        _ => None,
    }
}

fn opcode_for_comparison(kind: TokenKind) -> Option<Opcode> {
    match kind {
        TokenKind::Equal => Some(Opcode::Equal),
        TokenKind::NotEqual => Some(Opcode::NotEqual),
        TokenKind::Less => Some(Opcode::Less),
        TokenKind::LessEqual => Some(Opcode::LessEqual),
        TokenKind::Greater => Some(Opcode::Greater),
        TokenKind::GreaterEqual => Some(Opcode::GreaterEqual),
        _ => None,
    }
}

/// Dispatches on AST kind, returning the graph ID of
/// the lowered value. Memoization against `node_map` is the caller's
/// responsibility via `lower_expression_memoized`.
pub fn lower_expression(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<NodeId, LowerError> {
    let node = ast.get_node(ast_id).ok_or(LowerError::InvalidNode(ast_id))?;

    let result = match node.kind {
        AstNodeKind::IntegerLiteral => {
            let text = token_text(ast, node.first_token).ok_or(LowerError::InvalidToken(node.first_token))?;
            let value = parse_integer_literal(text).ok_or(LowerError::InvalidToken(node.first_token))?;
            ctx.builder.create_constant_int(value)
        }
        AstNodeKind::FloatLiteral => {
            let text = token_text(ast, node.first_token).ok_or(LowerError::InvalidToken(node.first_token))?;
            let value: f64 = text.parse().map_err(|_| LowerError::InvalidToken(node.first_token))?;
            ctx.builder.create_constant_float(value)
        }
        AstNodeKind::BoolLiteral => {
            let text = token_text(ast, node.first_token).ok_or(LowerError::InvalidToken(node.first_token))?;
            ctx.builder.create_constant_bool(text == "true")
        }
        AstNodeKind::CharLiteral => {
            let text = token_text(ast, node.first_token).ok_or(LowerError::InvalidToken(node.first_token))?;
            let decoded = decode_string_literal(text);
            let value = decoded.chars().next().map(|c| c as i64).unwrap_or(0);
            ctx.builder.create_constant_int(value)
        }
        AstNodeKind::NullLiteral => ctx.builder.create_constant_int(0),
        AstNodeKind::StringLiteral => {
            let text = token_text(ast, node.first_token).ok_or(LowerError::InvalidToken(node.first_token))?;
            ctx.builder.create_constant_string(decode_string_literal(text))
        }
        AstNodeKind::Identifier => {
            let name = token_text(ast, node.first_token).ok_or(LowerError::InvalidToken(node.first_token))?;
            let bound = ctx.lookup(name).ok_or_else(|| LowerError::UndefinedVariable(name.to_string()))?;
            let is_alloca = matches!(ctx.builder.graph().node(bound).map(|n| &n.op), Some(Opcode::Alloca { .. }));
            if is_alloca {
                ctx.builder.build_load(bound, name)
            } else {
                bound
            }
        }
        AstNodeKind::UnaryExpr => lower_unary(ctx, ast, ast_id, &node)?,
        AstNodeKind::BinaryExpr => lower_binary(ctx, ast, ast_id, &node)?,
        AstNodeKind::CallExpr => lower_call(ctx, ast, ast_id)?,
        AstNodeKind::ArrayLiteral => {
            let children = ast.get_children(ast_id);
            let mut elements = Vec::with_capacity(children.len());
            for child in children {
                elements.push(lower_expression(ctx, ast, child)?);
            }
            ctx.builder.build_array_construct(&elements)
        }
        AstNodeKind::IndexExpr => {
            let children = ast.get_children(ast_id);
            let &array_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
            let &index_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;
            let array = lower_expression(ctx, ast, array_ast)?;
            let index = lower_expression(ctx, ast, index_ast)?;
            if ctx.slice_values.contains(&array) {
                ctx.builder.build_slice_index(array, index)
            } else {
                let addr = ctx.builder.build_index(array, index);
                ctx.builder.build_load(addr, "index_load")
            }
        }
        AstNodeKind::SliceInclusiveExpr | AstNodeKind::SliceExclusiveExpr => {
            let inclusive = node.kind == AstNodeKind::SliceInclusiveExpr;
            let children = ast.get_children(ast_id);
            let &array_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
            let &start_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;
            let &end_ast = children.get(2).ok_or(LowerError::MissingOperand(ast_id))?;
            let array = lower_expression(ctx, ast, array_ast)?;
            let start = lower_expression(ctx, ast, start_ast)?;
            let end = lower_expression(ctx, ast, end_ast)?;
            let slice = ctx.builder.build_slice(array, start, end, inclusive);
            ctx.slice_values.insert(slice);
            slice
        }
        AstNodeKind::FieldExpr => {
            let children = ast.get_children(ast_id);
            let &struct_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
            let struct_value = lower_expression(ctx, ast, struct_ast)?;
            let field_name = token_text(ast, node.last_token).ok_or(LowerError::InvalidToken(node.last_token))?;
            ctx.builder.build_field_access(struct_value, field_name)
        }
        AstNodeKind::StructLiteral => {
            let children = ast.get_children(ast_id);
            let mut names = Vec::new();
            let mut values = Vec::new();
            let mut iter = children.into_iter();
            while let (Some(name_ast), Some(value_ast)) = (iter.next(), iter.next()) {
                let name_node = ast.get_node(name_ast).ok_or(LowerError::InvalidNode(name_ast))?;
                let name = token_text(ast, name_node.first_token).ok_or(LowerError::InvalidToken(name_node.first_token))?;
                names.push(name.to_string());
                values.push(lower_expression(ctx, ast, value_ast)?);
            }
            ctx.builder.build_struct_construct(&names, &values)
        }
        AstNodeKind::RangeInclusiveExpr | AstNodeKind::RangeExclusiveExpr => {
            let inclusive = node.kind == AstNodeKind::RangeInclusiveExpr;
            let children = ast.get_children(ast_id);
            let &start_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
            let &end_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;
            let start = lower_expression(ctx, ast, start_ast)?;
            let end = lower_expression(ctx, ast, end_ast)?;
            ctx.builder.build_range(start, end, inclusive)
        }
        AstNodeKind::CatchExpr => crate::errors::lower_catch(ctx, ast, ast_id)?,
        AstNodeKind::TryExpr => crate::errors::lower_try(ctx, ast, ast_id)?,
        other => return Err(LowerError::InvalidNode(ast_id)).map_err(|e| {
            let _ = other;
            e
        }),
    };

    ctx.node_map.insert(ast_id, result);
    Ok(result)
}

/// Memoized wrapper: returns the cached graph ID for `ast_id` if this
/// lowering pass already visited it.
pub fn lower_expression_memoized(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<NodeId, LowerError> {
    if let Some(&cached) = ctx.node_map.get(&ast_id) {
        return Ok(cached);
    }
    lower_expression(ctx, ast, ast_id)
}

fn lower_unary(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId, node: &crate::ast::AstNode) -> Result<NodeId, LowerError> {
    let children = ast.get_children(ast_id);
    let &operand_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let operand = lower_expression(ctx, ast, operand_ast)?;
    let op_text = token_text(ast, node.first_token).unwrap_or("");

    Ok(match op_text {
        "-" => {
            let zero = ctx.builder.create_constant_int(0);
            ctx.builder.build_binary(Opcode::Sub, zero, operand)
        }
        "!" | "not" => {
            let zero = ctx.builder.create_constant_bool(false);
            ctx.builder.build_binary(Opcode::Equal, operand, zero)
        }
        "~" => ctx.builder.build_bit_not(operand),
        _ => ctx.builder.build_unary(Opcode::BitNot, operand),
    })
}

fn lower_binary(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId, _node: &crate::ast::AstNode) -> Result<NodeId, LowerError> {
    let children = ast.get_children(ast_id);
    let &lhs_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let &rhs_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;

    let lhs_node = ast.get_node(lhs_ast).ok_or(LowerError::InvalidNode(lhs_ast))?;
    let rhs_node = ast.get_node(rhs_ast).ok_or(LowerError::InvalidNode(rhs_ast))?;
    let operator = find_binary_operator(ast, lhs_node.last_token, rhs_node.first_token)
        .ok_or(LowerError::InvalidBinaryExpr { lhs_last: lhs_node.last_token, rhs_first: rhs_node.first_token })?;

    match operator {
        TokenKind::Assign => {
            let addr = lower_lvalue(ctx, ast, lhs_ast)?;
            let value = lower_expression(ctx, ast, rhs_ast)?;
            ctx.builder.build_store(value, addr);
            Ok(value)
        }
        TokenKind::AndAnd | TokenKind::KeywordAnd => lower_short_circuit(ctx, ast, lhs_ast, rhs_ast, false),
        TokenKind::OrOr | TokenKind::KeywordOr => lower_short_circuit(ctx, ast, lhs_ast, rhs_ast, true),
        TokenKind::At => {
            ctx.builder.current_tenancy = Tenancy::NpuTensor;
            let lhs = lower_expression(ctx, ast, lhs_ast)?;
            let rhs = lower_expression(ctx, ast, rhs_ast)?;
            let result = ctx.builder.build_tensor_op(Opcode::TensorMatmul, &[lhs, rhs]);
            ctx.builder.current_tenancy = Tenancy::CpuSerial;
            Ok(result)
        }
        TokenKind::StarStar => {
            let lhs = lower_expression(ctx, ast, lhs_ast)?;
            let rhs = lower_expression(ctx, ast, rhs_ast)?;
            Ok(ctx.builder.create_call("pow", &[lhs, rhs]))
        }
        compound if opcode_for_arithmetic(compound).is_some() && is_compound_assign(compound) => {
            let op = opcode_for_arithmetic(compound).unwrap();
            let addr = lower_lvalue(ctx, ast, lhs_ast)?;
            let current = ctx.builder.build_load(addr, "compound_lhs");
            let rhs = lower_expression(ctx, ast, rhs_ast)?;
            let computed = ctx.builder.build_binary(op, current, rhs);
            ctx.builder.build_store(computed, addr);
            Ok(computed)
        }
        other => {
            let lhs = lower_expression(ctx, ast, lhs_ast)?;
            let rhs = lower_expression(ctx, ast, rhs_ast)?;
            if let Some(op) = opcode_for_arithmetic(other) {
                Ok(ctx.builder.build_binary(op, lhs, rhs))
            } else if let Some(op) = opcode_for_comparison(other) {
                Ok(ctx.builder.build_binary(op, lhs, rhs))
            } else {
                Err(LowerError::InvalidBinaryExpr { lhs_last: lhs_node.last_token, rhs_first: rhs_node.first_token })
            }
        }
    }
}

fn is_compound_assign(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::StarAssign
            | TokenKind::SlashAssign
            | TokenKind::PercentAssign
            | TokenKind::AmpAssign
            | TokenKind::PipeAssign
            | TokenKind::CaretAssign
            | TokenKind::ShiftLeftAssign
            | TokenKind::ShiftRightAssign
    )
}

/// Short-circuit `and`/`or` via a result temporary, a branch on the LHS,
/// and a merge label.
fn lower_short_circuit(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, lhs_ast: AstId, rhs_ast: AstId, is_or: bool) -> Result<NodeId, LowerError> {
    let result_slot = ctx.builder.build_alloca("short_circuit_result");
    let lhs = lower_expression(ctx, ast, lhs_ast)?;

    let branch = if is_or {
        ctx.builder.build_branch_placeholder(lhs)
    } else {
        ctx.builder.build_branch_placeholder(lhs)
    };

    let short_circuit_label = ctx.builder.build_label();
    let short_circuit_value = ctx.builder.create_constant_bool(is_or);
    ctx.builder.build_store(short_circuit_value, result_slot);
    let jump_to_merge = ctx.builder.build_jump_placeholder();

    let evaluate_rhs_label = ctx.builder.build_label();
    let rhs = lower_expression(ctx, ast, rhs_ast)?;
    ctx.builder.build_store(rhs, result_slot);

    let merge_label = ctx.builder.build_label();

    if is_or {
        ctx.builder.patch_input(branch, 1, short_circuit_label);
        ctx.builder.patch_input(branch, 2, evaluate_rhs_label);
    } else {
        ctx.builder.patch_input(branch, 1, evaluate_rhs_label);
        ctx.builder.patch_input(branch, 2, short_circuit_label);
    }
    ctx.builder.patch_input(jump_to_merge, 0, merge_label);

    Ok(ctx.builder.build_load(result_slot, "short_circuit_result"))
}

/// Returns an address, not a loaded value.
pub fn lower_lvalue(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<NodeId, LowerError> {
    let node = ast.get_node(ast_id).ok_or(LowerError::InvalidNode(ast_id))?;
    match node.kind {
        AstNodeKind::Identifier => {
            let name = token_text(ast, node.first_token).ok_or(LowerError::InvalidToken(node.first_token))?;
            ctx.lookup(name).ok_or_else(|| LowerError::UndefinedVariable(name.to_string()))
        }
        AstNodeKind::IndexExpr => {
            let children = ast.get_children(ast_id);
            let &array_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
            let &index_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;
            let array = lower_expression(ctx, ast, array_ast)?;
            let index = lower_expression(ctx, ast, index_ast)?;
            Ok(ctx.builder.build_index(array, index))
        }
        AstNodeKind::FieldExpr => {
            let children = ast.get_children(ast_id);
            let &struct_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
            let struct_addr = lower_lvalue(ctx, ast, struct_ast)?;
            let field_name = token_text(ast, node.last_token).ok_or(LowerError::InvalidToken(node.last_token))?;
            let placeholder = ctx.builder.create_constant_int(0);
            Ok(ctx.builder.build_field_store(struct_addr, field_name, placeholder))
        }
        _ => Err(LowerError::UnsupportedLvalue),
    }
}

/// Resolves a (possibly dotted) callee path from a `call_expr`'s callee
/// child: `Identifier` returns the bare name, `FieldExpr` recurses and
/// appends `.field`.
pub fn resolve_callee_path(ast: &dyn AstSnapshot, ast_id: AstId) -> Result<String, LowerError> {
    let node = ast.get_node(ast_id).ok_or(LowerError::InvalidNode(ast_id))?;
    match node.kind {
        AstNodeKind::Identifier => {
            token_text(ast, node.first_token).map(str::to_string).ok_or(LowerError::InvalidToken(node.first_token))
        }
        AstNodeKind::FieldExpr => {
            let children = ast.get_children(ast_id);
            let &object_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
            let object_path = resolve_callee_path(ast, object_ast)?;
            let field_name = token_text(ast, node.last_token).ok_or(LowerError::InvalidToken(node.last_token))?;
            Ok(format!("{object_path}.{field_name}"))
        }
        _ => Err(LowerError::InvalidCall("callee is not an identifier or dotted path".to_string())),
    }
}

fn quantum_gate_for_name(name: &str) -> Option<GateType> {
    match name {
        "hadamard" => Some(GateType::Hadamard),
        "pauli_x" | "x" => Some(GateType::PauliX),
        "pauli_y" | "y" => Some(GateType::PauliY),
        "pauli_z" | "z" => Some(GateType::PauliZ),
        "cnot" => Some(GateType::Cnot),
        "cz" => Some(GateType::Cz),
        "swap" => Some(GateType::Swap),
        "toffoli" => Some(GateType::Toffoli),
        "fredkin" => Some(GateType::Fredkin),
        "rx" => Some(GateType::Rx),
        "ry" => Some(GateType::Ry),
        "rz" => Some(GateType::Rz),
        _ => None,
    }
}

/// Three-layer call resolution.
pub fn lower_call(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<NodeId, LowerError> {
    let children = ast.get_children(ast_id);
    let &callee_ast = children.first().ok_or_else(|| LowerError::InvalidCall("call has no callee".to_string()))?;
    let arg_asts = &children[1.min(children.len())..];

    let callee_path = resolve_callee_path(ast, callee_ast)?;
    let final_component = callee_path.rsplit('.').next().unwrap_or(&callee_path).to_string();

    if let Some(category) = BuiltinRegistry::is_category_path(&callee_path) {
        let mut args = Vec::with_capacity(arg_asts.len());
        for &arg_ast in arg_asts {
            args.push(lower_expression(ctx, ast, arg_ast)?);
        }
        return lower_category_call(ctx, category, &final_component, &args);
    }

    if let Some(gate) = quantum_gate_for_name(&final_component) {
        let previous_tenancy = ctx.builder.current_tenancy;
        ctx.builder.current_tenancy = Tenancy::QpuQuantum;
        let mut args = Vec::with_capacity(arg_asts.len());
        for &arg_ast in arg_asts {
            args.push(lower_expression(ctx, ast, arg_ast)?);
        }
        let qubits: Vec<usize> = args
            .iter()
            .filter_map(|&id| ctx.builder.graph().node(id).and_then(|n| n.data.as_integer()))
            .map(|v| v as usize)
            .take(gate.arity())
            .collect();
        let parameters: Vec<f64> = if gate.is_rotation() {
            args.iter()
                .filter_map(|&id| ctx.builder.graph().node(id).and_then(|n| n.data.as_float()))
                .collect()
        } else {
            Vec::new()
        };
        let result = ctx.builder.build_quantum_gate(QuantumMetadata::new(gate, qubits, parameters), &args);
        ctx.builder.current_tenancy = previous_tenancy;
        return Ok(result);
    }

    if final_component == "assert" {
        let &cond_ast = arg_asts.first().ok_or_else(|| LowerError::MissingArgument("assert".to_string()))?;
        let cond = lower_expression(ctx, ast, cond_ast)?;
        let branch = ctx.builder.build_branch_placeholder(cond);
        let fail_label = ctx.builder.build_label();
        let one = ctx.builder.create_constant_int(1);
        ctx.builder.create_return(Some(one));
        let ok_label = ctx.builder.build_label();
        let zero = ctx.builder.create_constant_int(0);
        ctx.builder.patch_input(branch, 1, ok_label);
        ctx.builder.patch_input(branch, 2, fail_label);
        return Ok(zero);
    }

    if final_component == "string_data_intrinsic" || final_component == "string_len_intrinsic" {
        let &operand_ast = arg_asts.first().ok_or_else(|| LowerError::MissingArgument(final_component.clone()))?;
        let operand = lower_expression(ctx, ast, operand_ast)?;
        let opcode_result = if final_component == "string_data_intrinsic" {
            ctx.builder.create_call("qtjir_rt_string_data", &[operand])
        } else {
            ctx.builder.create_call("qtjir_rt_string_len", &[operand])
        };
        return Ok(opcode_result);
    }

    if let Some(entry) = ctx.builtins.lookup(&final_component) {
        let runtime_name = entry.runtime_name;
        let min_args = entry.min_args;
        let max_args = entry.max_args;
        let mut args = Vec::with_capacity(arg_asts.len());
        for &arg_ast in arg_asts {
            args.push(lower_expression(ctx, ast, arg_ast)?);
        }
        let accepted = args.len() >= min_args && max_args.map_or(true, |max| args.len() <= max);
        if !accepted {
            return Err(LowerError::InvalidCall(format!("'{final_component}' called with wrong argument count")));
        }
        return Ok(ctx.builder.create_call(runtime_name, &args));
    }

    if ctx.externs.lookup(&final_component).is_some() {
        let mut args = Vec::with_capacity(arg_asts.len());
        for &arg_ast in arg_asts {
            args.push(lower_expression(ctx, ast, arg_ast)?);
        }
        return Ok(ctx.builder.create_call(final_component, &args));
    }

    let mut args = Vec::with_capacity(arg_asts.len());
    for &arg_ast in arg_asts {
        args.push(lower_expression(ctx, ast, arg_ast)?);
    }
    Ok(ctx.builder.create_call(final_component, &args))
}

fn lower_category_call(ctx: &mut LoweringContext, category: &str, name: &str, args: &[NodeId]) -> Result<NodeId, LowerError> {
    let previous_tenancy = ctx.builder.current_tenancy;
    ctx.builder.current_tenancy = Tenancy::NpuTensor;
    let result = match category {
        "tensor" => {
            let op = match name {
                "matmul" => Opcode::TensorMatmul,
                "conv" => Opcode::TensorConv,
                "reduce" => Opcode::TensorReduce,
                "scalar_mul" => Opcode::TensorScalarMul,
                "contract" => Opcode::TensorContract,
                "relu" => Opcode::TensorRelu,
                "softmax" => Opcode::TensorSoftmax,
                other => return Err(LowerError::UnsupportedCall(format!("tensor.{other}"))),
            };
            ctx.builder.build_tensor_op(op, args)
        }
        "ssm" => {
            let op = match name {
                "scan" => Opcode::SsmScan,
                "selective_scan" => Opcode::SsmSelectiveScan,
                other => return Err(LowerError::UnsupportedCall(format!("ssm.{other}"))),
            };
            ctx.builder.build_tensor_op(op, args)
        }
        "quantum" => {
            ctx.builder.current_tenancy = Tenancy::QpuQuantum;
            if name == "measure" {
                let qubits: Vec<usize> = args
                    .iter()
                    .filter_map(|&id| ctx.builder.graph().node(id).and_then(|n| n.data.as_integer()))
                    .map(|v| v as usize)
                    .collect();
                let &input = args.first().ok_or_else(|| LowerError::MissingArgument("quantum.measure".to_string()))?;
                ctx.builder.build_quantum_measure(&qubits, input)
            } else {
                let gate = quantum_gate_for_name(name).ok_or_else(|| LowerError::UnsupportedCall(format!("quantum.{name}")))?;
                let qubits: Vec<usize> = args
                    .iter()
                    .filter_map(|&id| ctx.builder.graph().node(id).and_then(|n| n.data.as_integer()))
                    .map(|v| v as usize)
                    .take(gate.arity())
                    .collect();
                let parameters: Vec<f64> = if gate.is_rotation() {
                    args.iter()
                        .filter_map(|&id| ctx.builder.graph().node(id).and_then(|n| n.data.as_float()))
                        .collect()
                } else {
                    Vec::new()
                };
                ctx.builder.build_quantum_gate(QuantumMetadata::new(gate, qubits, parameters), args)
            }
        }
        other => return Err(LowerError::UnsupportedCall(format!("{other}.{name}"))),
    };
    ctx.builder.current_tenancy = previous_tenancy;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::fixtures::FakeAst;
    use crate::context::ScopeKind;

    #[test]
    fn parses_integer_literal_variants() {
        assert_eq!(parse_integer_literal("1_000"), Some(1000));
        assert_eq!(parse_integer_literal("0x1F"), Some(31));
        assert_eq!(parse_integer_literal("0b101"), Some(5));
        assert_eq!(parse_integer_literal("0o17"), Some(15));
    }

    #[test]
    fn decodes_escape_sequences() {
        assert_eq!(decode_string_literal("\"a\\nb\""), "a\nb");
        assert_eq!(decode_string_literal("\"\"\"raw\"\"\""), "raw");
    }

    #[test]
    fn lowers_an_integer_literal_to_a_constant() {
        let mut ast = FakeAst::new();
        let text_id = ast.intern("42");
        let tok = ast.push_token(TokenKind::Other, (0, 2), Some(text_id));
        let node = ast.push_node(AstNodeKind::IntegerLiteral, tok, tok, vec![]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        let id = lower_expression(&mut ctx, &ast, node).unwrap();
        assert_eq!(ctx.builder.graph().node(id).unwrap().data.as_integer(), Some(42));
    }

    #[test]
    fn identifier_bound_to_alloca_emits_a_load() {
        let mut ast = FakeAst::new();
        let text_id = ast.intern("x");
        let tok = ast.push_token(TokenKind::Other, (0, 1), Some(text_id));
        let ident = ast.push_node(AstNodeKind::Identifier, tok, tok, vec![]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        let alloca = ctx.builder.build_alloca("x");
        ctx.bind("x", alloca);

        let result = lower_expression(&mut ctx, &ast, ident).unwrap();
        assert_eq!(ctx.builder.graph().node(result).unwrap().op, Opcode::Load);
    }

    #[test]
    fn identifier_bound_to_value_returns_it_directly() {
        let mut ast = FakeAst::new();
        let text_id = ast.intern("y");
        let tok = ast.push_token(TokenKind::Other, (0, 1), Some(text_id));
        let ident = ast.push_node(AstNodeKind::Identifier, tok, tok, vec![]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        let constant = ctx.builder.create_constant_int(7);
        ctx.bind("y", constant);

        let result = lower_expression(&mut ctx, &ast, ident).unwrap();
        assert_eq!(result, constant);
    }

    #[test]
    fn binary_add_scans_operator_token_between_operands() {
        let mut ast = FakeAst::new();
        let one = ast.intern("1");
        let two = ast.intern("2");
        let lhs_tok = ast.push_token(TokenKind::Other, (0, 1), Some(one));
        let _plus_tok = ast.push_token(TokenKind::Plus, (2, 3), None);
        let rhs_tok = ast.push_token(TokenKind::Other, (4, 5), Some(two));
        let lhs = ast.push_node(AstNodeKind::IntegerLiteral, lhs_tok, lhs_tok, vec![]);
        let rhs = ast.push_node(AstNodeKind::IntegerLiteral, rhs_tok, rhs_tok, vec![]);
        let add = ast.push_node(AstNodeKind::BinaryExpr, lhs_tok, rhs_tok, vec![lhs, rhs]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        let result = lower_expression(&mut ctx, &ast, add).unwrap();
        assert_eq!(ctx.builder.graph().node(result).unwrap().op, Opcode::Add);
    }

    #[test]
    fn unsupported_callee_kind_is_rejected() {
        let mut ast = FakeAst::new();
        let tok = ast.push_token(TokenKind::Other, (0, 1), None);
        let literal = ast.push_node(AstNodeKind::IntegerLiteral, tok, tok, vec![]);
        assert!(resolve_callee_path(&ast, literal).is_err());
    }
}

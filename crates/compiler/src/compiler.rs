//! Single-pass recursive-descent compiler.
//!
//! Emission is forward-only into the [`Chunk`] except for jump
//! back-patching (spec §4.2.3): a conditional or unconditional jump whose
//! target is not yet known emits a placeholder `LOAD_CONST` pointing at a
//! throw-away pool slot; once the target offset is known, a *fresh* pool
//! entry holding that offset is appended and the placeholder's two operand
//! bytes are rewritten to point at it. Nothing is ever rewritten in the
//! bytecode array itself except those two bytes, and each placeholder is
//! patched exactly once.
//!
//! The compiler never builds an AST: every statement and expression form
//! emits directly into the `Chunk` as it is recognized, using at most one
//! token of lookahead (`current`) beyond the token just consumed
//! (`previous`).

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use gen_core::{Chunk, GenError, OpCode, Value};

pub struct Compiler {
    lexer: Lexer,
    previous: Token,
    current: Token,
    chunk: Chunk,
    /// One entry per enclosing `while`; each holds the operand offsets of
    /// every `break` (and the loop's own false-condition exit) still
    /// waiting to be patched to the post-loop address.
    break_stack: Vec<Vec<usize>>,
    /// One entry per enclosing `while`: the byte offset of its condition,
    /// the target `continue` jumps back to.
    continue_stack: Vec<usize>,
    line: i32,
}

/// Compiles `source` into a finished [`Chunk`], or fails with a
/// [`GenError::Compile`] at the first lexical or syntactic error.
pub fn compile(source: &str) -> Result<Chunk, GenError> {
    Compiler::new(source)?.compile_program()
}

impl Compiler {
    pub fn new(source: &str) -> Result<Self, GenError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        let line = current.line;
        Ok(Compiler {
            lexer,
            previous: current.clone(),
            current,
            chunk: Chunk::new(),
            break_stack: Vec::new(),
            continue_stack: Vec::new(),
            line,
        })
    }

    pub fn compile_program(mut self) -> Result<Chunk, GenError> {
        while !self.check(TokenKind::Eof) {
            self.declaration()?;
        }
        self.emit_main_call()?;
        Ok(self.chunk)
    }

    // ---- token plumbing -------------------------------------------------

    fn advance(&mut self) -> Result<(), GenError> {
        let next = self.lexer.next_token()?;
        self.previous = std::mem::replace(&mut self.current, next);
        self.line = self.previous.line;
        Ok(())
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_tok(&mut self, kind: TokenKind) -> Result<bool, GenError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<(), GenError> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&self, message: &str) -> GenError {
        GenError::compile(self.current.line, message)
    }

    fn error_at_previous(&self, message: &str) -> GenError {
        GenError::compile(self.previous.line, message)
    }

    fn at_postfix_continuation(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Dot | TokenKind::LeftBracket | TokenKind::LeftParen
        )
    }

    // ---- emission helpers -------------------------------------------------

    fn emit(&mut self, op: OpCode) -> usize {
        self.chunk.write_op(op, self.line)
    }

    fn emit_load_const(&mut self, value: Value) -> usize {
        let index = self.chunk.add_constant(value);
        self.chunk.write_load_const(index, self.line)
    }

    fn emit_load_const_name(&mut self, name: &str) {
        self.emit_load_const(Value::string(name));
    }

    fn emit_number(&mut self, n: f64) {
        self.emit_load_const(Value::Number(n));
    }

    /// Emits a placeholder jump (`LOAD_CONST <throwaway> <op>`) and returns
    /// the offset of the placeholder's 2-byte operand, to be passed to
    /// [`Compiler::patch_jump`] once the real target is known.
    fn emit_jump_placeholder(&mut self, op: OpCode) -> usize {
        let throwaway = self.chunk.add_constant(Value::Number(0.0));
        let op_offset = self.chunk.write_load_const(throwaway, self.line);
        self.emit(op);
        op_offset + 1
    }

    /// Emits a jump to an already-known target (loop back-edges, `continue`)
    /// — no placeholder or later patch needed.
    fn emit_jump_to(&mut self, target: usize, op: OpCode) {
        self.emit_number(target as f64);
        self.emit(op);
    }

    /// Patches a placeholder from [`Compiler::emit_jump_placeholder`] to the
    /// current write position.
    fn patch_jump(&mut self, operand_offset: usize) {
        let target = self.chunk.offset();
        self.patch_jump_to_absolute(operand_offset, target);
    }

    fn patch_jump_to_absolute(&mut self, operand_offset: usize, target: usize) {
        let index = self.chunk.add_constant(Value::Number(target as f64));
        self.chunk.patch_u16(operand_offset, index);
    }

    // ---- top-level declarations -------------------------------------------

    fn declaration(&mut self) -> Result<(), GenError> {
        if self.match_tok(TokenKind::Var)? {
            self.var_decl()
        } else if self.match_tok(TokenKind::Func)? {
            self.func_decl()
        } else if self.match_tok(TokenKind::Object)? {
            self.object_decl()
        } else if self.match_tok(TokenKind::Enum)? {
            self.enum_decl()
        } else {
            Err(self.error_at_current(
                "expected a top-level declaration ('var', 'func', 'object', or 'enum')",
            ))
        }
    }

    fn var_decl(&mut self) -> Result<(), GenError> {
        self.expect(TokenKind::Identifier, "expected a variable name after 'var'")?;
        let name = self.previous.lexeme.clone();
        if self.match_tok(TokenKind::Equal)? {
            self.expression()?;
        } else {
            self.emit_number(0.0);
        }
        self.expect(TokenKind::Semicolon, "expected ';' after variable declaration")?;
        self.emit_load_const_name(&name);
        self.emit(OpCode::StoreVar);
        Ok(())
    }

    fn func_decl(&mut self) -> Result<(), GenError> {
        self.expect(TokenKind::Identifier, "expected a function name after 'func'")?;
        let name = self.previous.lexeme.clone();
        self.expect(TokenKind::LeftParen, "expected '(' after function name")?;
        self.expect(
            TokenKind::RightParen,
            "GEN functions take no parameters; expected ')'",
        )?;
        self.emit_load_const_name(&name);
        self.emit(OpCode::FuncDef);
        self.expect(TokenKind::LeftBrace, "expected '{' to start function body")?;
        self.block()?;
        self.expect(TokenKind::RightBrace, "expected '}' to close function body")?;
        self.emit(OpCode::FuncEnd);
        Ok(())
    }

    fn object_decl(&mut self) -> Result<(), GenError> {
        self.expect(TokenKind::Identifier, "expected an object name after 'object'")?;
        let name = self.previous.lexeme.clone();
        self.emit_load_const_name(&name);
        self.emit(OpCode::ObjDef);
        self.expect(TokenKind::LeftBrace, "expected '{' to start object body")?;
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.expect(
                TokenKind::Var,
                "object bodies contain only property initializers ('var name = expr;')",
            )?;
            self.expect(TokenKind::Identifier, "expected a property name after 'var'")?;
            let prop = self.previous.lexeme.clone();
            if self.match_tok(TokenKind::Equal)? {
                self.expression()?;
            } else {
                self.emit_number(0.0);
            }
            self.expect(TokenKind::Semicolon, "expected ';' after property initializer")?;
            self.emit_load_const_name(&prop);
            self.emit(OpCode::InitProp);
        }
        self.expect(TokenKind::RightBrace, "expected '}' to close object body")?;
        self.emit(OpCode::ObjEnd);
        Ok(())
    }

    fn enum_decl(&mut self) -> Result<(), GenError> {
        self.expect(TokenKind::Identifier, "expected an enum name after 'enum'")?;
        let name = self.previous.lexeme.clone();
        self.emit_load_const_name(&name);
        self.emit(OpCode::EnumDef);
        self.expect(TokenKind::LeftBrace, "expected '{' to start enum body")?;
        if !self.check(TokenKind::RightBrace) {
            loop {
                self.expect(TokenKind::Identifier, "expected an enum member name")?;
                let member = self.previous.lexeme.clone();
                self.emit_load_const_name(&member);
                self.emit(OpCode::StoreEnum);
                if !self.match_tok(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBrace, "expected '}' to close enum body")?;
        self.emit(OpCode::EnumEnd);
        Ok(())
    }

    // ---- statements --------------------------------------------------------

    fn block(&mut self) -> Result<(), GenError> {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.statement()?;
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<(), GenError> {
        if self.match_tok(TokenKind::Var)? {
            self.var_decl()
        } else if self.match_tok(TokenKind::If)? {
            self.if_statement()
        } else if self.match_tok(TokenKind::While)? {
            self.while_statement()
        } else if self.match_tok(TokenKind::Break)? {
            self.break_statement()
        } else if self.match_tok(TokenKind::Continue)? {
            self.continue_statement()
        } else if self.match_tok(TokenKind::Return)? {
            self.return_statement()
        } else if self.match_tok(TokenKind::Print)? {
            self.print_statement()
        } else if self.check(TokenKind::Identifier) {
            self.ident_statement()
        } else {
            Err(self.error_at_current("expected a statement"))
        }
    }

    fn if_statement(&mut self) -> Result<(), GenError> {
        self.expect(TokenKind::LeftParen, "expected '(' after 'if'")?;
        self.expression()?;
        self.expect(TokenKind::RightParen, "expected ')' after condition")?;
        let else_jump = self.emit_jump_placeholder(OpCode::JumpIfFalse);

        self.expect(TokenKind::LeftBrace, "expected '{' to start if-body")?;
        self.block()?;
        self.expect(TokenKind::RightBrace, "expected '}' to close if-body")?;

        if self.match_tok(TokenKind::Else)? {
            let end_jump = self.emit_jump_placeholder(OpCode::Jump);
            self.patch_jump(else_jump);
            self.expect(TokenKind::LeftBrace, "expected '{' to start else-body")?;
            self.block()?;
            self.expect(TokenKind::RightBrace, "expected '}' to close else-body")?;
            self.patch_jump(end_jump);
        } else {
            self.patch_jump(else_jump);
        }
        Ok(())
    }

    fn while_statement(&mut self) -> Result<(), GenError> {
        let loop_start = self.chunk.offset();
        self.continue_stack.push(loop_start);
        self.break_stack.push(Vec::new());

        self.expect(TokenKind::LeftParen, "expected '(' after 'while'")?;
        self.expression()?;
        self.expect(TokenKind::RightParen, "expected ')' after condition")?;
        let exit_jump = self.emit_jump_placeholder(OpCode::JumpIfFalse);
        self.break_stack.last_mut().expect("just pushed").push(exit_jump);

        self.expect(TokenKind::LeftBrace, "expected '{' to start loop body")?;
        self.block()?;
        self.expect(TokenKind::RightBrace, "expected '}' to close loop body")?;

        self.emit_jump_to(loop_start, OpCode::Jump);

        let end = self.chunk.offset();
        self.continue_stack.pop();
        let breaks = self.break_stack.pop().expect("just pushed");
        for offset in breaks {
            self.patch_jump_to_absolute(offset, end);
        }
        Ok(())
    }

    fn break_statement(&mut self) -> Result<(), GenError> {
        self.expect(TokenKind::Semicolon, "expected ';' after 'break'")?;
        if self.break_stack.is_empty() {
            return Err(self.error_at_previous("'break' used outside of a loop"));
        }
        let offset = self.emit_jump_placeholder(OpCode::Jump);
        self.break_stack.last_mut().expect("checked non-empty").push(offset);
        Ok(())
    }

    fn continue_statement(&mut self) -> Result<(), GenError> {
        self.expect(TokenKind::Semicolon, "expected ';' after 'continue'")?;
        let Some(&target) = self.continue_stack.last() else {
            return Err(self.error_at_previous("'continue' used outside of a loop"));
        };
        self.emit_jump_to(target, OpCode::Jump);
        Ok(())
    }

    fn return_statement(&mut self) -> Result<(), GenError> {
        if self.match_tok(TokenKind::Semicolon)? {
            self.emit_number(0.0);
        } else {
            self.expression()?;
            self.expect(TokenKind::Semicolon, "expected ';' after return value")?;
        }
        self.emit(OpCode::Return);
        Ok(())
    }

    fn print_statement(&mut self) -> Result<(), GenError> {
        self.expression()?;
        let with_endl = self.match_tok(TokenKind::Endl)?;
        self.expect(TokenKind::Semicolon, "expected ';' after print statement")?;
        self.emit(OpCode::Print);
        if with_endl {
            self.emit(OpCode::Endl);
        }
        Ok(())
    }

    /// Dispatches the four identifier-led statement forms: plain
    /// assignment, call, property assignment, and index assignment (spec
    /// §4.2.2). One token of lookahead after the identifier (and after each
    /// postfix accessor) is enough to tell them apart.
    fn ident_statement(&mut self) -> Result<(), GenError> {
        self.advance()?; // the identifier itself
        let name = self.previous.lexeme.clone();

        if self.match_tok(TokenKind::Equal)? {
            self.expression()?;
            self.expect(TokenKind::Semicolon, "expected ';' after assignment")?;
            self.emit_load_const_name(&name);
            self.emit(OpCode::StoreVar);
            return Ok(());
        }

        if self.match_tok(TokenKind::LeftParen)? {
            self.emit_load_const_name(&name);
            self.emit(OpCode::LoadVar);
            self.finish_call()?;
            self.expect(TokenKind::Semicolon, "expected ';' after call statement")?;
            self.emit_number(1.0);
            self.emit(OpCode::StackClear);
            return Ok(());
        }

        if self.check(TokenKind::Dot) || self.check(TokenKind::LeftBracket) {
            self.emit_load_const_name(&name);
            self.emit(OpCode::LoadVar);
            return self.assign_through_chain();
        }

        Err(self.error_at_current(
            "expected '=', '(', '.', or '[' after an identifier used as a statement",
        ))
    }

    /// Navigates a `.prop`/`[idx]` chain whose base container is already on
    /// the stack, stopping at the first accessor directly followed by `=`
    /// and compiling that as `STORE_PROP`/`ARRAY_SET`.
    fn assign_through_chain(&mut self) -> Result<(), GenError> {
        loop {
            if self.match_tok(TokenKind::Dot)? {
                self.expect(TokenKind::Identifier, "expected a property name after '.'")?;
                let prop = self.previous.lexeme.clone();
                if self.match_tok(TokenKind::Equal)? {
                    self.expression()?;
                    self.expect(TokenKind::Semicolon, "expected ';' after assignment")?;
                    self.emit_load_const_name(&prop);
                    self.emit(OpCode::StoreProp);
                    return Ok(());
                }
                self.emit_load_const_name(&prop);
                self.emit(OpCode::LoadProp);
            } else if self.match_tok(TokenKind::LeftBracket)? {
                self.expression()?;
                self.expect(TokenKind::RightBracket, "expected ']' after index")?;
                if self.match_tok(TokenKind::Equal)? {
                    self.expression()?;
                    self.expect(TokenKind::Semicolon, "expected ';' after assignment")?;
                    self.emit(OpCode::ArraySet);
                    return Ok(());
                }
                self.emit(OpCode::ArrayGet);
            } else {
                return Err(self.error_at_current(
                    "expected '.', '[', or '=' to continue or finish an assignment target",
                ));
            }
        }
    }

    /// Compiles a call's argument list and the `CALL` itself. Assumes `(`
    /// has already been consumed and the callee's entry offset is already
    /// on the stack (pushed by whatever compiled the callee reference).
    fn finish_call(&mut self) -> Result<(), GenError> {
        let mut argc = 0u32;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression()?;
                argc += 1;
                if !self.match_tok(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "expected ')' after arguments")?;
        self.emit_number(argc as f64);
        self.emit(OpCode::Call);
        Ok(())
    }

    // ---- expressions (§4.2.5, lowest to highest precedence) ---------------

    fn expression(&mut self) -> Result<(), GenError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<(), GenError> {
        self.and_expr()?;
        while self.match_tok(TokenKind::Or)? {
            self.and_expr()?;
            self.emit(OpCode::Or);
        }
        Ok(())
    }

    fn and_expr(&mut self) -> Result<(), GenError> {
        self.relational()?;
        while self.match_tok(TokenKind::And)? {
            self.relational()?;
            self.emit(OpCode::And);
        }
        Ok(())
    }

    /// Non-associative: at most one relational operator per expression, per
    /// spec §4.2.5 ("relational ... non-associative").
    fn relational(&mut self) -> Result<(), GenError> {
        self.additive()?;
        let op = match self.current.kind {
            TokenKind::EqualEqual => Some(OpCode::CmpEq),
            TokenKind::BangEqual => Some(OpCode::CmpNe),
            TokenKind::Less => Some(OpCode::CmpLt),
            TokenKind::LessEqual => Some(OpCode::CmpLe),
            TokenKind::Greater => Some(OpCode::CmpGt),
            TokenKind::GreaterEqual => Some(OpCode::CmpGe),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            self.additive()?;
            self.emit(op);
        }
        Ok(())
    }

    fn additive(&mut self) -> Result<(), GenError> {
        self.multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => OpCode::Add,
                TokenKind::Minus => OpCode::Sub,
                _ => break,
            };
            self.advance()?;
            self.multiplicative()?;
            self.emit(op);
        }
        Ok(())
    }

    fn multiplicative(&mut self) -> Result<(), GenError> {
        self.unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => OpCode::Mul,
                TokenKind::Slash => OpCode::Div,
                TokenKind::Backslash => OpCode::DivFloor,
                _ => break,
            };
            self.advance()?;
            self.unary()?;
            self.emit(op);
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<(), GenError> {
        if self.match_tok(TokenKind::Minus)? {
            self.unary()?;
            self.emit(OpCode::Neg);
            return Ok(());
        }
        if self.match_tok(TokenKind::Bang)? {
            // No dedicated NOT opcode exists in the ISA; `!x` desugars to
            // `x == false`. See DESIGN.md.
            self.unary()?;
            self.emit_load_const(Value::Boolean(false));
            self.emit(OpCode::CmpEq);
            return Ok(());
        }
        if self.match_tok(TokenKind::Pipe)? {
            self.expression()?;
            self.expect(TokenKind::Pipe, "expected closing '|' for the length operator")?;
            self.emit(OpCode::Sizeof);
            return Ok(());
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<(), GenError> {
        self.primary()?;
        loop {
            if self.match_tok(TokenKind::Dot)? {
                self.expect(TokenKind::Identifier, "expected a property name after '.'")?;
                let prop = self.previous.lexeme.clone();
                self.emit_load_const_name(&prop);
                if self.at_postfix_continuation() {
                    self.emit(OpCode::LoadProp);
                } else {
                    self.emit(OpCode::LoadPropConst);
                }
            } else if self.match_tok(TokenKind::LeftBracket)? {
                self.expression()?;
                self.expect(TokenKind::RightBracket, "expected ']' after index")?;
                self.emit(OpCode::ArrayGet);
            } else if self.match_tok(TokenKind::LeftParen)? {
                self.finish_call()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn primary(&mut self) -> Result<(), GenError> {
        if self.match_tok(TokenKind::Number)? {
            let n: f64 = self
                .previous
                .lexeme
                .parse()
                .map_err(|_| self.error_at_previous("invalid number literal"))?;
            self.emit_number(n);
            return Ok(());
        }
        if self.match_tok(TokenKind::String)? {
            let s = self.previous.lexeme.clone();
            self.emit_load_const(Value::string(s));
            return Ok(());
        }
        if self.match_tok(TokenKind::True)? {
            self.emit_load_const(Value::Boolean(true));
            return Ok(());
        }
        if self.match_tok(TokenKind::False)? {
            self.emit_load_const(Value::Boolean(false));
            return Ok(());
        }
        if self.match_tok(TokenKind::LeftParen)? {
            self.expression()?;
            self.expect(TokenKind::RightParen, "expected ')' after expression")?;
            return Ok(());
        }
        if self.match_tok(TokenKind::New)? {
            self.expect(TokenKind::Identifier, "expected an object-template name after 'new'")?;
            let name = self.previous.lexeme.clone();
            self.emit_load_const_name(&name);
            self.emit(OpCode::NewObj);
            return Ok(());
        }
        if self.match_tok(TokenKind::LeftBracket)? {
            let mut count = 0u32;
            if !self.check(TokenKind::RightBracket) {
                loop {
                    self.expression()?;
                    count += 1;
                    if !self.match_tok(TokenKind::Comma)? {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RightBracket, "expected ']' to close array literal")?;
            self.emit_number(count as f64);
            self.emit(OpCode::ArrayDef);
            return Ok(());
        }
        if self.match_tok(TokenKind::Identifier)? {
            let name = self.previous.lexeme.clone();
            self.emit_load_const_name(&name);
            self.emit(OpCode::LoadVar);
            return Ok(());
        }
        Err(self.error_at_current("expected an expression"))
    }

    // ---- program entry (§4.2.1) --------------------------------------------

    fn emit_main_call(&mut self) -> Result<(), GenError> {
        let entry = self.find_main_entry()?;
        self.emit_number(entry as f64);
        self.emit_number(0.0);
        self.emit(OpCode::Call);
        Ok(())
    }

    /// Scans the already-emitted buffer for `LOAD_CONST "main"` immediately
    /// followed by `FUNC_DEF`, per spec §4.2.1. Runs once, after every
    /// top-level declaration has been compiled.
    fn find_main_entry(&self) -> Result<usize, GenError> {
        let code = &self.chunk.code;
        let mut ip = 0usize;
        while ip < code.len() {
            let Ok(op) = OpCode::try_from(code[ip]) else {
                ip += 1;
                continue;
            };
            if op == OpCode::LoadConst {
                let index = self.chunk.read_u16(ip + 1);
                let is_main = matches!(
                    self.chunk.constants.get(index as usize),
                    Some(Value::String(s)) if &**s == "main"
                );
                let after = ip + 1 + 2;
                if is_main && after < code.len() && code[after] == OpCode::FuncDef as u8 {
                    return Ok(after + 1);
                }
            }
            ip += 1 + op.operand_len();
        }
        Err(GenError::compile(self.line, "no 'main' function defined"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gen_core::OpCode;

    fn ops(chunk: &Chunk) -> Vec<OpCode> {
        let mut out = Vec::new();
        let mut ip = 0;
        while ip < chunk.code.len() {
            let op = OpCode::try_from(chunk.code[ip]).unwrap();
            out.push(op);
            ip += 1 + op.operand_len();
        }
        out
    }

    #[test]
    fn missing_main_is_a_compile_error() {
        let err = compile("var x = 1;").unwrap_err();
        assert!(matches!(err, GenError::Compile { .. }));
        assert!(err.message().contains("main"));
    }

    #[test]
    fn minimal_main_compiles_and_synthesizes_the_trailing_call() {
        let chunk = compile("func main() { return 0; }").unwrap();
        let sequence = ops(&chunk);
        assert_eq!(
            sequence,
            vec![
                OpCode::LoadConst, // "main"
                OpCode::FuncDef,
                OpCode::LoadConst, // 0 (return value)
                OpCode::Return,
                OpCode::FuncEnd,
                OpCode::LoadConst, // main's entry offset
                OpCode::LoadConst, // argc = 0
                OpCode::Call,
            ]
        );
    }

    #[test]
    fn var_decl_pushes_value_before_name() {
        let chunk = compile("func main() { var x = 5; return 0; }").unwrap();
        assert_eq!(
            ops(&chunk)[2..5],
            [OpCode::LoadConst, OpCode::LoadConst, OpCode::StoreVar]
        );
    }

    #[test]
    fn break_outside_loop_is_a_compile_error() {
        let err = compile("func main() { break; return 0; }").unwrap_err();
        assert!(err.message().contains("break"));
    }

    #[test]
    fn continue_outside_loop_is_a_compile_error() {
        let err = compile("func main() { continue; return 0; }").unwrap_err();
        assert!(err.message().contains("continue"));
    }

    #[test]
    fn if_without_else_patches_a_single_jump() {
        let chunk = compile("func main() { if (true) { print 1; } return 0; }").unwrap();
        // JUMP_IF_FALSE's placeholder constant must resolve to an offset
        // that lands exactly on the instruction after the if-body.
        let jump_op_index = ops(&chunk)
            .iter()
            .position(|op| *op == OpCode::JumpIfFalse)
            .unwrap();
        assert!(jump_op_index > 0);
    }

    #[test]
    fn while_loop_back_edge_targets_the_condition() {
        let chunk = compile("func main() { var i = 0; while (i < 1) { i = i + 1; } return 0; }")
            .unwrap();
        let sequence = ops(&chunk);
        assert!(sequence.contains(&OpCode::JumpIfFalse));
        assert!(sequence.contains(&OpCode::Jump));
    }

    #[test]
    fn property_assignment_uses_store_prop() {
        let chunk = compile(
            "object Point { var x = 0; } func main() { var p = new Point; p.x = 3; return 0; }",
        )
        .unwrap();
        assert!(ops(&chunk).contains(&OpCode::StoreProp));
        assert!(ops(&chunk).contains(&OpCode::InitProp));
        assert!(ops(&chunk).contains(&OpCode::NewObj));
    }

    #[test]
    fn array_index_assignment_uses_array_set() {
        let chunk =
            compile("func main() { var xs = [1,2]; xs[0] = 9; return 0; }").unwrap();
        assert!(ops(&chunk).contains(&OpCode::ArraySet));
        assert!(ops(&chunk).contains(&OpCode::ArrayDef));
    }

    #[test]
    fn unary_not_desugars_to_compare_with_false() {
        let chunk = compile("func main() { print !true; return 0; }").unwrap();
        let sequence = ops(&chunk);
        assert!(sequence.contains(&OpCode::CmpEq));
    }

    #[test]
    fn enum_members_get_sequential_store_enum_ops() {
        let chunk = compile("enum Color { RED, GREEN, BLUE } func main() { return 0; }").unwrap();
        let count = ops(&chunk)
            .iter()
            .filter(|op| **op == OpCode::StoreEnum)
            .count();
        assert_eq!(count, 3);
    }
}

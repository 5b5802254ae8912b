//! recursive descent for top-level declarations and statements;
//! precedence-climbing for expressions. twelve levels, lowest to highest:
//! assignment, logical-or, logical-and, bitwise-or, bitwise-xor,
//! bitwise-and, equality, relational, shift, additive, multiplicative,
//! unary - matching §4.6. unlike the original's twelve-pass array
//! reduction (`parsePrecedenceN` in `parser_precedences.cpp`), each level
//! here is one recursive call; the resulting tree is identical in shape.

use crate::compiler::ast::{Ast, BinOp, NodeId, NodeKind, UnaryOp};
use crate::compiler::error::{ParseError, SemanticError, SourceLoc};
use crate::compiler::scope::ScopeStack;
use crate::compiler::token::{Token, TokenKind};
use crate::compiler::types::{Primitive, Type};

#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Semantic(SemanticError),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Error {
        Error::Parse(e)
    }
}

impl From<SemanticError> for Error {
    fn from(e: SemanticError) -> Error {
        Error::Semantic(e)
    }
}

pub fn parse(tokens: &[Token]) -> Result<Ast, Error> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        ast: Ast::new(),
        scopes: ScopeStack::new(),
    };
    parser.parse_program()?;
    Ok(parser.ast)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    ast: Ast,
    scopes: ScopeStack,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn loc(&self) -> SourceLoc {
        self.peek().loc
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(ParseError::UnexpectedToken(self.loc(), expected.to_string(), self.peek().describe()))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, SourceLoc), ParseError> {
        let loc = self.loc();
        match self.advance().kind {
            TokenKind::Identifier(name) => Ok((name, loc)),
            other => Err(ParseError::UnexpectedToken(loc, "an identifier".to_string(), format!("{:?}", other))),
        }
    }

    fn primitive_type(&self) -> Option<Primitive> {
        match self.peek().kind {
            TokenKind::Int => Some(Primitive::Int),
            TokenKind::Float => Some(Primitive::Float),
            TokenKind::Char => Some(Primitive::Char),
            TokenKind::Bool => Some(Primitive::Bool),
            TokenKind::Void => Some(Primitive::Void),
            _ => None,
        }
    }

    /// `<primitive> ('*')*` - a type name followed by zero or more pointer
    /// stars. array modifiers are parsed separately by the declaration
    /// sites that allow them (var decls, params).
    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let primitive = self
            .primitive_type()
            .ok_or_else(|| ParseError::UnexpectedToken(self.loc(), "a type name".to_string(), self.peek().describe()))?;
        self.advance();
        let mut ty = Type::new(primitive);
        while self.check(&TokenKind::Star) {
            self.advance();
            ty.pointer_depth += 1;
        }
        Ok(ty)
    }

    /// parses `[N]` / `[]` array modifiers onto `ty`, in declaration order
    /// (outermost first, matching the source text left-to-right).
    fn parse_array_modifiers(&mut self, ty: &mut Type) -> Result<(), ParseError> {
        while self.check(&TokenKind::LBracket) {
            self.advance();
            if self.check(&TokenKind::RBracket) {
                ty.array_modifiers.push(None);
            } else {
                let loc = self.loc();
                match self.advance().kind {
                    TokenKind::IntLit(n) if n >= 0 => ty.array_modifiers.push(Some(n as usize)),
                    other => return Err(ParseError::UnexpectedToken(loc, "an integer literal".to_string(), format!("{:?}", other))),
                }
            }
            self.expect(TokenKind::RBracket, "']'")?;
        }
        Ok(())
    }

    fn parse_program(&mut self) -> Result<(), Error> {
        while !self.check(&TokenKind::Eof) {
            let func = self.parse_function()?;
            self.ast.functions.push(func);
        }
        Ok(())
    }

    fn parse_function(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        let mut return_type = self.parse_type()?;
        self.parse_array_modifiers(&mut return_type)?;
        let (name, name_loc) = self.expect_identifier()?;

        if !self.scopes.declare(&name, return_type.clone()) {
            return Err(SemanticError::DuplicateIdentifier(name_loc, name).into());
        }

        self.expect(TokenKind::LParen, "'('")?;
        self.scopes.push();
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param_loc = self.loc();
            let mut param_type = self.parse_type()?;
            let (param_name, param_name_loc) = self.expect_identifier()?;
            self.parse_array_modifiers(&mut param_type)?;
            let param_type = param_type.decay_for_param();

            if !self.scopes.declare(&param_name, param_type.clone()) {
                return Err(SemanticError::DuplicateIdentifier(param_name_loc, param_name).into());
            }
            let param = self.ast.push(NodeKind::Param { name: param_name }, param_loc, param_type);
            params.push(param);

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let body = self.parse_body()?;
        self.expect(TokenKind::RBrace, "'}'")?;
        self.scopes.pop();

        Ok(self.ast.push(
            NodeKind::Function {
                name,
                return_type: return_type.clone(),
                params,
                body,
            },
            loc,
            return_type,
        ))
    }

    fn parse_body(&mut self) -> Result<Vec<NodeId>, Error> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<NodeId, Error> {
        match &self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Int | TokenKind::Float | TokenKind::Char | TokenKind::Bool | TokenKind::Void => self.parse_var_decl(),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_block_or_single(&mut self) -> Result<Vec<NodeId>, Error> {
        if self.check(&TokenKind::LBrace) {
            self.advance();
            let body = self.parse_body()?;
            self.expect(TokenKind::RBrace, "'}'")?;
            Ok(body)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_if(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        self.advance(); // if
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_body = self.parse_block_or_single()?;
        let else_body = if self.check(&TokenKind::Else) {
            self.advance();
            self.parse_block_or_single()?
        } else {
            Vec::new()
        };
        Ok(self.ast.push(
            NodeKind::If {
                condition,
                then_body,
                else_body,
            },
            loc,
            Type::void(),
        ))
    }

    fn parse_while(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        self.advance(); // while
        self.expect(TokenKind::LParen, "'('")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block_or_single()?;
        Ok(self.ast.push(NodeKind::WhileLoop { condition, body }, loc, Type::void()))
    }

    fn parse_for(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        self.advance(); // for
        self.expect(TokenKind::LParen, "'('")?;
        let init = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        let update = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block_or_single()?;
        Ok(self.ast.push(
            NodeKind::ForLoop {
                init,
                condition,
                update,
                body,
            },
            loc,
            Type::void(),
        ))
    }

    fn parse_return(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        self.advance(); // return
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(self.ast.push(NodeKind::Return { value }, loc, Type::void()))
    }

    fn parse_var_decl(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        let mut declared_type = self.parse_type()?;
        let (name, name_loc) = self.expect_identifier()?;
        self.parse_array_modifiers(&mut declared_type)?;

        if !self.scopes.declare(&name, declared_type.clone()) {
            return Err(SemanticError::DuplicateIdentifier(name_loc, name).into());
        }

        let init = if self.check(&TokenKind::Assign) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(self.ast.push(
            NodeKind::VarDecl {
                name,
                declared_type: declared_type.clone(),
                init,
            },
            loc,
            declared_type,
        ))
    }

    fn parse_expr_statement(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        let inner = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(self.ast.push(NodeKind::Expr { inner }, loc, Type::void()))
    }

    // ---- expressions, lowest precedence first ----

    fn parse_expression(&mut self) -> Result<NodeId, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        let lhs = self.parse_logical_or()?;
        if self.check(&TokenKind::Assign) {
            if !matches!(self.ast.get(lhs).kind, NodeKind::Identifier { .. } | NodeKind::ArraySubscript { .. }) {
                return Err(SemanticError::AssignToNonLvalue(loc).into());
            }
            self.advance();
            let rhs = self.parse_assignment()?; // right-associative
            let ty = self.ast.get(lhs).ty.clone();
            return Ok(self.ast.push(NodeKind::BinOp { op: BinOp::Assign, lhs, rhs }, loc, ty));
        }
        Ok(lhs)
    }

    fn parse_logical_or(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_logical_and()?;
        while self.check(&TokenKind::OrOr) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_logical_and()?;
            lhs = self.ast.push(NodeKind::BinOp { op: BinOp::Or, lhs, rhs }, loc, Type::bool_());
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_bit_or()?;
        while self.check(&TokenKind::AndAnd) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bit_or()?;
            lhs = self.ast.push(NodeKind::BinOp { op: BinOp::And, lhs, rhs }, loc, Type::bool_());
        }
        Ok(lhs)
    }

    fn parse_bit_or(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_bit_xor()?;
        while self.check(&TokenKind::Pipe) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bit_xor()?;
            let ty = self.ast.get(lhs).ty.clone();
            lhs = self.ast.push(NodeKind::BinOp { op: BinOp::BitOr, lhs, rhs }, loc, ty);
        }
        Ok(lhs)
    }

    fn parse_bit_xor(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_bit_and()?;
        while self.check(&TokenKind::Caret) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bit_and()?;
            let ty = self.ast.get(lhs).ty.clone();
            lhs = self.ast.push(NodeKind::BinOp { op: BinOp::BitXor, lhs, rhs }, loc, ty);
        }
        Ok(lhs)
    }

    fn parse_bit_and(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_equality()?;
        while self.check(&TokenKind::Ampersand) {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_equality()?;
            let ty = self.ast.get(lhs).ty.clone();
            lhs = self.ast.push(NodeKind::BinOp { op: BinOp::BitAnd, lhs, rhs }, loc, ty);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Neq => BinOp::Neq,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = self.ast.push(NodeKind::BinOp { op, lhs, rhs }, loc, Type::bool_());
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_shift()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Lte => BinOp::Lte,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Gte => BinOp::Gte,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_shift()?;
            lhs = self.ast.push(NodeKind::BinOp { op, lhs, rhs }, loc, Type::bool_());
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_additive()?;
            let ty = self.ast.get(lhs).ty.clone();
            lhs = self.ast.push(NodeKind::BinOp { op, lhs, rhs }, loc, ty);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let ty = wider(&self.ast.get(lhs).ty, &self.ast.get(rhs).ty);
            lhs = self.ast.push(NodeKind::BinOp { op, lhs, rhs }, loc, ty);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId, Error> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_unary()?;
            let ty = wider(&self.ast.get(lhs).ty, &self.ast.get(rhs).ty);
            lhs = self.ast.push(NodeKind::BinOp { op, lhs, rhs }, loc, ty);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        let op = match self.peek().kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Ampersand => Some(UnaryOp::AddressOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let ty = match op {
                UnaryOp::Not => Type::bool_(),
                UnaryOp::Deref => {
                    let mut t = self.ast.get(operand).ty.clone();
                    t.pointer_depth = t.pointer_depth.saturating_sub(1);
                    t
                }
                UnaryOp::AddressOf => {
                    let mut t = self.ast.get(operand).ty.clone();
                    t.pointer_depth += 1;
                    t
                }
                _ => self.ast.get(operand).ty.clone(),
            };
            return Ok(self.ast.push(NodeKind::UnaryOp { op, operand }, loc, ty));
        }
        if self.check(&TokenKind::Sizeof) {
            self.advance();
            self.expect(TokenKind::LParen, "'('")?;
            let ty = self.parse_type()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(self.ast.push(NodeKind::IntLit(ty.size_bytes() as i32), loc, Type::int()));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeId, Error> {
        let mut node = self.parse_primary()?;
        loop {
            if self.check(&TokenKind::LBracket) {
                let loc = self.loc();
                self.advance();
                let index = self.parse_expression()?;
                self.expect(TokenKind::RBracket, "']'")?;
                let base_ty = self.ast.get(node).ty.clone();
                if !base_ty.is_array() && !base_ty.is_pointer() {
                    return Err(SemanticError::NotAnArrayOrPointer(loc, format!("{:?}", self.ast.get(node).kind)).into());
                }
                let mut elem_ty = base_ty;
                if !elem_ty.array_modifiers.is_empty() {
                    elem_ty.array_modifiers.remove(0);
                } else {
                    elem_ty.pointer_depth = elem_ty.pointer_depth.saturating_sub(1);
                }
                node = self.ast.push(NodeKind::ArraySubscript { base: node, index }, loc, elem_ty);
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<NodeId, Error> {
        let loc = self.loc();
        match self.peek().kind.clone() {
            TokenKind::IntLit(v) => {
                self.advance();
                Ok(self.ast.push(NodeKind::IntLit(v), loc, Type::int()))
            }
            TokenKind::FloatLit(v) => {
                self.advance();
                Ok(self.ast.push(NodeKind::FloatLit(v), loc, Type::new(Primitive::Float)))
            }
            TokenKind::CharLit(v) => {
                self.advance();
                Ok(self.ast.push(NodeKind::CharLit(v), loc, Type::new(Primitive::Char)))
            }
            TokenKind::BoolLit(v) => {
                self.advance();
                Ok(self.ast.push(NodeKind::BoolLit(v), loc, Type::bool_()))
            }
            TokenKind::Void => {
                self.advance();
                Ok(self.ast.push(NodeKind::VoidLit, loc, Type::void()))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                let mut elements = Vec::new();
                for b in s.bytes().chain(std::iter::once(0u8)) {
                    elements.push(self.ast.push(NodeKind::CharLit(b), loc, Type::new(Primitive::Char)));
                }
                let mut ty = Type::new(Primitive::Char);
                ty.array_modifiers.push(Some(elements.len()));
                Ok(self.ast.push(NodeKind::ArrayLiteral { elements }, loc, ty))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RBrace) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBrace, "'}'")?;
                let elem_ty = elements.first().map(|&e| self.ast.get(e).ty.clone()).unwrap_or_else(Type::int);
                let mut ty = elem_ty;
                ty.array_modifiers.push(Some(elements.len()));
                Ok(self.ast.push(NodeKind::ArrayLiteral { elements }, loc, ty))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    return self.parse_call(name, loc);
                }
                let ty = self
                    .scopes
                    .lookup(&name)
                    .cloned()
                    .ok_or_else(|| SemanticError::UnknownIdentifier(loc, name.clone()))?
                    .as_lvalue();
                let is_assign_target = self.check(&TokenKind::Assign);
                Ok(self.ast.push(NodeKind::Identifier { name, is_assign_target }, loc, ty))
            }
            other => Err(ParseError::UnexpectedToken(loc, "an expression".to_string(), format!("{:?}", other)).into()),
        }
    }

    fn parse_call(&mut self, name: String, loc: SourceLoc) -> Result<NodeId, Error> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let ty = self
            .scopes
            .lookup(&name)
            .cloned()
            .ok_or_else(|| SemanticError::UnknownIdentifier(loc, name.clone()))?;
        Ok(self.ast.push(NodeKind::FunctionCall { name, args }, loc, ty))
    }
}

/// arithmetic type reconciliation: float dominates int, otherwise the wider
/// operand's type wins. not the original's full `getDominantType` table,
/// but covers the supported subset (no implicit int/char promotion rules
/// beyond width).
fn wider(a: &Type, b: &Type) -> Type {
    if a.primitive == Primitive::Float || b.primitive == Primitive::Float {
        return Type::new(Primitive::Float);
    }
    if a.size_bytes() >= b.size_bytes() {
        a.clone()
    } else {
        b.clone()
    }
}

#[cfg(test)]
#[path = "./parser_test.rs"]
mod parser_test;

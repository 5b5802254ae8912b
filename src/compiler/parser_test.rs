use super::*;
use crate::compiler::lexer::tokenize;

fn parse_src(source: &str) -> Result<Ast, Error> {
    let tokens = tokenize(source).expect("lexing should succeed in these fixtures");
    parse(&tokens)
}

#[test]
fn parses_a_function_returning_a_literal() {
    let ast = parse_src("int main() { return 0; }").unwrap();
    assert_eq!(ast.functions.len(), 1);
    match &ast.get(ast.functions[0]).kind {
        NodeKind::Function { name, body, .. } => {
            assert_eq!(name, "main");
            assert_eq!(body.len(), 1);
            match &ast.get(body[0]).kind {
                NodeKind::Return { value: Some(v) } => {
                    assert!(matches!(ast.get(*v).kind, NodeKind::IntLit(0)));
                }
                other => panic!("expected a return statement, got {:?}", other),
            }
        }
        other => panic!("expected a function, got {:?}", other),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let ast = parse_src("int main() { int x = 1 + 2 * 3; return x; }").unwrap();
    let body = match &ast.get(ast.functions[0]).kind {
        NodeKind::Function { body, .. } => body.clone(),
        _ => unreachable!(),
    };
    match &ast.get(body[0]).kind {
        NodeKind::VarDecl { init: Some(init), .. } => match &ast.get(*init).kind {
            NodeKind::BinOp { op: BinOp::Add, rhs, .. } => match &ast.get(*rhs).kind {
                NodeKind::BinOp { op: BinOp::Mul, .. } => {}
                other => panic!("expected the right side of + to be a multiplication, got {:?}", other),
            },
            other => panic!("expected a top-level addition, got {:?}", other),
        },
        other => panic!("expected a var decl with an initializer, got {:?}", other),
    }
}

#[test]
fn assignment_is_right_associative() {
    let ast = parse_src("int main() { int a; int b; int c; a = b = c; return a; }").unwrap();
    let body = match &ast.get(ast.functions[0]).kind {
        NodeKind::Function { body, .. } => body.clone(),
        _ => unreachable!(),
    };
    // statements: decl a, decl b, decl c, expr(a = (b = c)), return a
    match &ast.get(body[3]).kind {
        NodeKind::Expr { inner } => match &ast.get(*inner).kind {
            NodeKind::BinOp { op: BinOp::Assign, rhs, .. } => match &ast.get(*rhs).kind {
                NodeKind::BinOp { op: BinOp::Assign, .. } => {}
                other => panic!("expected the right side of a = b = c to be an assignment, got {:?}", other),
            },
            other => panic!("expected an assignment, got {:?}", other),
        },
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn rejects_duplicate_declarations_in_the_same_scope() {
    let err = parse_src("int main() { int a; int a; return a; }").unwrap_err();
    assert!(matches!(err, Error::Semantic(SemanticError::DuplicateIdentifier(_, _))));
}

#[test]
fn rejects_unknown_identifiers() {
    let err = parse_src("int main() { return y; }").unwrap_err();
    assert!(matches!(err, Error::Semantic(SemanticError::UnknownIdentifier(_, _))));
}

#[test]
fn parses_an_if_else_chain() {
    let ast = parse_src("int main() { int a; if (a) { return 1; } else { return 0; } }").unwrap();
    let body = match &ast.get(ast.functions[0]).kind {
        NodeKind::Function { body, .. } => body.clone(),
        _ => unreachable!(),
    };
    match &ast.get(body[1]).kind {
        NodeKind::If { then_body, else_body, .. } => {
            assert_eq!(then_body.len(), 1);
            assert_eq!(else_body.len(), 1);
        }
        other => panic!("expected an if statement, got {:?}", other),
    }
}

#[test]
fn parses_a_for_loop_header() {
    let ast = parse_src("int main() { int i; for (i = 0; i; i = i) { } return i; }").unwrap();
    let body = match &ast.get(ast.functions[0]).kind {
        NodeKind::Function { body, .. } => body.clone(),
        _ => unreachable!(),
    };
    assert!(matches!(ast.get(body[1]).kind, NodeKind::ForLoop { .. }));
}

#[test]
fn array_subscript_of_a_non_array_is_a_semantic_error() {
    let err = parse_src("int main() { int a; return a[0]; }").unwrap_err();
    assert!(matches!(err, Error::Semantic(SemanticError::NotAnArrayOrPointer(_, _))));
}

#[test]
fn function_parameters_are_visible_in_the_body() {
    let ast = parse_src("int add(int a, int b) { return a; }").unwrap();
    match &ast.get(ast.functions[0]).kind {
        NodeKind::Function { params, .. } => assert_eq!(params.len(), 2),
        other => panic!("expected a function, got {:?}", other),
    }
}

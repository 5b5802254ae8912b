use super::generate;
use crate::compiler::lexer::tokenize;
use crate::compiler::parser::parse;

fn gen(src: &str) -> String {
    let tokens = tokenize(src).expect("source must lex");
    let ast = parse(&tokens).expect("source must parse");
    generate(&ast).expect("source must generate")
}

#[test]
fn main_exits_through_the_vm_exit_syscall() {
    let asm = gen("int main() { return 0; }");
    assert!(asm.contains("main:"), "{}", asm);
    assert!(asm.contains("movw AX, 2"), "{}", asm);
    assert!(asm.contains("syscall"), "{}", asm);
    assert!(asm.contains("hlt"), "{}", asm);
}

#[test]
fn non_main_function_returns_via_ret() {
    let asm = gen("int f(int x) { return x; }");
    assert!(asm.contains("ret"), "{}", asm);
    assert!(!asm.contains("hlt"), "{}", asm);
}

#[test]
fn conditional_control_flow_emits_a_compare_and_a_conditional_branch() {
    // scenario 4: if (x > 3) return 1; return 0;
    let asm = gen("int f(int x) { if (x > 3) { return 1; } return 0; }");
    assert!(asm.contains("cmp AX, BX"), "{}", asm);
    assert!(asm.contains("jc "), "{}", asm);
    assert!(asm.contains("jz "), "{}", asm);
    // both branches of the if must reach a return.
    assert!(asm.matches("jmp ").count() >= 1, "{}", asm);
}

#[test]
fn loop_condition_is_re_tested_every_iteration() {
    // scenario 5: accumulate t += i while i < 5.
    let asm = gen(
        "int s() { int i = 0; int t = 0; while (i < 5) { t = t + i; i = i + 1; } return t; }",
    );
    // the loop header label is jumped back to from the bottom of the body.
    let jumps_back = asm.lines().filter(|l| l.trim_start().starts_with("jmp __J")).count();
    assert!(jumps_back >= 1, "{}", asm);
    assert!(asm.contains("jz "), "{}", asm);
    assert!(asm.contains("add AX, BX"), "{}", asm);
}

#[test]
fn stack_offsets_remain_internally_consistent_across_several_locals() {
    // scenario 6: three locals of the same width must never collide on the
    // same SP-relative offset once all three are live.
    let asm = gen("int g() { int a = 1; int b = 2; int c = 3; return a + b + c; }");
    assert!(asm.contains("pushw 1"), "{}", asm);
    assert!(asm.contains("pushw 2"), "{}", asm);
    assert!(asm.contains("pushw 3"), "{}", asm);
    assert!(asm.contains("ret"), "{}", asm);
}

#[test]
fn function_call_passes_arguments_and_unwinds_them_after_the_return_value() {
    let asm = gen("int add(int a, int b) { return a + b; } int main() { return add(2, 3); }");
    assert!(asm.contains("call __UF0"), "{}", asm);
    assert!(asm.contains("__UF0:"), "{}", asm);
    assert!(asm.contains("main:"), "{}", asm);
}

#[test]
fn string_literal_is_hoisted_into_a_data_section() {
    let asm = gen("int main() { char* s = \"hi\"; return 0; }");
    assert!(asm.starts_with("section .data\n"), "{}", asm);
    assert!(asm.contains("__S0 str"), "{}", asm);
    assert!(asm.contains("section .text\n"), "{}", asm);
}

#[test]
fn unary_minus_flips_the_sign_bit_rather_than_negating() {
    let asm = gen("int main() { int x = 5; return -x; }");
    assert!(asm.contains("xor AX, 0x8000"), "{}", asm);
}

#[test]
fn array_element_assignment_writes_through_a_materialized_address() {
    let asm = gen("int main() { int a[4]; a[1] = 9; return a[1]; }");
    assert!(asm.contains("movw BP, SP"), "{}", asm);
    assert!(asm.contains("mov [BP+0], AL"), "{}", asm);
    assert!(asm.contains("mov [BP+1], AH"), "{}", asm);
}

#[test]
fn logical_and_normalizes_both_operands_before_combining() {
    let asm = gen("int main() { int a = 1; int b = 0; return a && b; }");
    assert!(asm.contains("and AL, BL"), "{}", asm);
}

quick_error! {
    /// fatal to the assembly pass that raised it; never recovered from. see
    /// the error handling policy - no partial `.tpu` output survives one of
    /// these.
    #[derive(Debug)]
    pub enum AssembleError {
        UnknownMnemonic(line: usize, text: String) {
            display("line {}: unknown mnemonic '{}'", line, text)
        }
        WrongOperandCount(line: usize, expected: usize, got: usize) {
            display("line {}: expected {} operand(s), got {}", line, expected, got)
        }
        WidthMismatch(line: usize, text: String) {
            display("line {}: operand width mismatch: '{}'", line, text)
        }
        LiteralOutOfRange(line: usize, text: String) {
            display("line {}: literal out of range: '{}'", line, text)
        }
        UnresolvedLabel(name: String) {
            display("unresolved label '{}'", name)
        }
        MissingMain {
            display("missing 'main' label")
        }
        InvalidSection(line: usize, text: String) {
            display("line {}: invalid section '{}'", line, text)
        }
        UnknownRegister(line: usize, text: String) {
            display("line {}: unknown register '{}'", line, text)
        }
        InvalidOperand(line: usize, text: String) {
            display("line {}: invalid operand '{}'", line, text)
        }
        UnclosedCharLiteral(line: usize) {
            display("line {}: unclosed char literal", line)
        }
        DuplicateLabel(line: usize, name: String) {
            display("line {}: duplicate label '{}'", line, name)
        }
        ReservedLabel(line: usize, name: String) {
            display("line {}: '{}' is a reserved kernel label and may not be redefined", line, name)
        }
    }
}

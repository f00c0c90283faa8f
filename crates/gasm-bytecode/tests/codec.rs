use gasm_bytecode::{ascii_to_bytecode, bytecode_to_ascii, parse_program, program_to_text, unzip, zip, ALL_OPCODES};

#[test]
fn fibonacci_program_parses_to_the_documented_bytecode() {
    let text = "MOV R, A\n\
                INC\n\
                MOV A, P\n\
                MOV R, A\n\
                LOP A\n\
                DEC\n\
                MOV A, R\n\
                INC\n\
                ADD R\n\
                INC\n\
                MOV R, A\n\
                MOV A, P\n\
                END\n\
                MOV A, R\n\
                MOV I, A\n";
    let bytecode = parse_program(text).unwrap();
    assert_eq!(bytecode.len(), 15);
    assert_eq!(bytecode[4], gasm_bytecode::Opcode::LopA.to_byte());
    assert_eq!(bytecode[12], gasm_bytecode::Opcode::End.to_byte());
}

#[test]
fn ascii_codec_is_identity_on_all_defined_opcodes() {
    let bytecode: Vec<u8> = ALL_OPCODES.iter().map(|op| op.to_byte()).collect();
    let ascii = bytecode_to_ascii(&bytecode).unwrap();
    assert_eq!(ascii.chars().count(), 32);
    assert_eq!(ascii_to_bytecode(&ascii).unwrap(), bytecode);
}

#[test]
fn zip_unzip_is_identity_on_repeated_program() {
    let one_program: Vec<u8> = ALL_OPCODES.iter().map(|op| op.to_byte()).collect();
    let bytecode: Vec<u8> = one_program.iter().cycle().take(137).copied().collect();
    let zipped = zip(&bytecode).unwrap();
    let restored = unzip(&zipped, bytecode.len()).unwrap();
    assert_eq!(restored, bytecode);
}

#[test]
fn text_round_trip_is_identity_modulo_formatting() {
    let bytecode: Vec<u8> = ALL_OPCODES.iter().map(|op| op.to_byte()).collect();
    let text = program_to_text(&bytecode);
    let reparsed = parse_program(&text).unwrap();
    assert_eq!(reparsed, bytecode);
}

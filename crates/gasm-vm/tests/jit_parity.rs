//! End-to-end scenarios from spec §8: the JIT and interpreter must agree on
//! final `inputs` and `processTime` for the same bytecode and starting
//! state. Uses `Individual` so both paths go through the identical
//! zero-registers-on-entry contract.

use gasm_vm::Individual;
use rand::Rng;

const FIBONACCI: &str = "MOV R, A\n\
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

#[test]
fn fibonacci_matches_between_jit_and_interpreter() {
    for seed_input in [1.0, 10.0, 0.0, -3.0] {
        let mut jit = Individual::new_from_text(FIBONACCI, 2).unwrap();
        jit.set_use_jit(true);
        let mut interpreted = Individual::new_from_text(FIBONACCI, 2).unwrap();
        interpreted.set_use_jit(false);

        let mut jit_inputs = [seed_input];
        let mut interpreted_inputs = [seed_input];
        let jit_time = jit.run(&mut jit_inputs).unwrap();
        let interpreted_time = interpreted.run(&mut interpreted_inputs).unwrap();

        assert_eq!(jit_time, interpreted_time);
        assert_eq!(jit_inputs[0], interpreted_inputs[0]);
    }
}

#[test]
fn fuzzed_random_bytecode_agrees_on_processtime_and_outputs() {
    let mut rng = rand::thread_rng();
    for _ in 0..1000 {
        let len = rng.gen_range(1..200);
        let bytecode: Vec<u8> = (0..len).map(|_| rng.gen::<u8>()).collect();
        let input_len = rng.gen_range(1..8);
        let inputs: Vec<f64> = (0..input_len).map(|_| rng.gen_range(-100.0..100.0)).collect();

        let mut jit = Individual::new(bytecode.clone(), 4).unwrap();
        jit.set_use_jit(true);
        jit.set_max_process_time(5_000);
        let mut interpreted = Individual::new(bytecode, 4).unwrap();
        interpreted.set_use_jit(false);
        interpreted.set_max_process_time(5_000);

        let mut jit_inputs = inputs.clone();
        let mut interpreted_inputs = inputs;
        let jit_time = jit.run(&mut jit_inputs).unwrap();
        let interpreted_time = interpreted.run(&mut interpreted_inputs).unwrap();

        assert_eq!(jit_time, interpreted_time, "processTime mismatch for bytecode {:?}", jit.bytecode());
        for (a, b) in jit_inputs.iter().zip(interpreted_inputs.iter()) {
            if a.is_finite() && b.is_finite() {
                assert!((a - b).abs() <= a.abs().max(b.abs()) * 1e-9 + 1e-9, "output mismatch: {a} vs {b}");
            } else {
                assert_eq!(a.is_nan(), b.is_nan());
            }
        }
    }
}

#[test]
fn negative_p_skips_lop_p_body_on_both_paths() {
    // DEC drives P to -1 before the guard is ever tested (LOP_P is a
    // while-loop: the guard runs before the body on the first pass too).
    // A signed guard reads -1 as "less than inputLen" and spins; the
    // correct unsigned guard reads it as huge and skips the body.
    let text = "DEC\nLOP P\nINC\nEND\nMOV A, P\nMOV I, A\n";

    let mut jit = Individual::new_from_text(text, 1).unwrap();
    jit.set_use_jit(true);
    jit.set_max_process_time(1_000);
    let mut interpreted = Individual::new_from_text(text, 1).unwrap();
    interpreted.set_use_jit(false);
    interpreted.set_max_process_time(1_000);

    let mut jit_inputs = [7.0, 8.0];
    let mut interpreted_inputs = [7.0, 8.0];
    let jit_time = jit.run(&mut jit_inputs).unwrap();
    let interpreted_time = interpreted.run(&mut interpreted_inputs).unwrap();

    assert_eq!(jit_time, interpreted_time);
    assert_eq!(jit_inputs, interpreted_inputs);
    assert!(jit_time < 50, "LOP_P body ran when the guard should have skipped it: {jit_time}");
}

#[test]
fn for_loop_driven_negative_exits_on_both_paths() {
    // Each FOR iteration nets P -= 1 (two DECs against END's one INC), so P
    // goes negative well before inputLen. Same signed/unsigned guard bug as
    // LOP_P, just reached through FOR's END instead.
    let text = "FOR\nDEC\nDEC\nEND\nMOV A, P\nMOV I, A\n";

    let mut jit = Individual::new_from_text(text, 1).unwrap();
    jit.set_use_jit(true);
    jit.set_max_process_time(1_000);
    let mut interpreted = Individual::new_from_text(text, 1).unwrap();
    interpreted.set_use_jit(false);
    interpreted.set_max_process_time(1_000);

    let mut jit_inputs = [1.0, 2.0];
    let mut interpreted_inputs = [1.0, 2.0];
    let jit_time = jit.run(&mut jit_inputs).unwrap();
    let interpreted_time = interpreted.run(&mut interpreted_inputs).unwrap();

    assert_eq!(jit_time, interpreted_time);
    assert_eq!(jit_inputs, interpreted_inputs);
    assert!(jit_time < 50, "FOR kept looping when the guard should have exited: {jit_time}");
}

#[test]
fn mov_p_a_saturates_like_the_interpreter_on_overflowing_a() {
    // `A` reaches +1e300 through an ordinary multiply, well past what
    // `cvttsd2si` can represent: hardware returns the "integer indefinite"
    // sentinel, but `a as i64` in the interpreter saturates to `i64::MAX`.
    let text = "MOV A, I\nMUL I\nMOV P, A\nMOV A, P\nMOV I, A\n";

    let mut jit = Individual::new_from_text(text, 1).unwrap();
    jit.set_use_jit(true);
    let mut interpreted = Individual::new_from_text(text, 1).unwrap();
    interpreted.set_use_jit(false);

    let mut jit_inputs = [1e300, 0.0];
    let mut interpreted_inputs = [1e300, 0.0];
    jit.run(&mut jit_inputs).unwrap();
    interpreted.run(&mut interpreted_inputs).unwrap();

    assert_eq!(jit_inputs, interpreted_inputs);
    // P (now i64::MAX, odd) maps to input index 1, not 0.
    assert_eq!(jit_inputs[1], i64::MAX as f64);
}

#[test]
fn mov_p_a_zeroes_on_nan_a_like_the_interpreter() {
    // 0.0 / 0.0 = NaN. `cvttsd2si` would leave P at `i64::MIN`; `a as i64`
    // in the interpreter maps NaN to 0.
    let text = "MOV A, I\nDIV I\nMOV P, A\nMOV A, P\nMOV I, A\n";

    let mut jit = Individual::new_from_text(text, 1).unwrap();
    jit.set_use_jit(true);
    let mut interpreted = Individual::new_from_text(text, 1).unwrap();
    interpreted.set_use_jit(false);

    let mut jit_inputs = [0.0, 5.0];
    let mut interpreted_inputs = [0.0, 5.0];
    jit.run(&mut jit_inputs).unwrap();
    interpreted.run(&mut interpreted_inputs).unwrap();

    assert_eq!(jit_inputs, interpreted_inputs);
    assert_eq!(jit_inputs[0], 0.0);
}

#[test]
fn fuel_cap_returns_partial_progress_on_both_paths() {
    let mut jit = Individual::new_from_text(FIBONACCI, 2).unwrap();
    jit.set_use_jit(true);
    jit.set_max_process_time(5);
    let mut interpreted = Individual::new_from_text(FIBONACCI, 2).unwrap();
    interpreted.set_use_jit(false);
    interpreted.set_max_process_time(5);

    let mut jit_inputs = [10.0];
    let mut interpreted_inputs = [10.0];
    let jit_time = jit.run(&mut jit_inputs).unwrap();
    let interpreted_time = interpreted.run(&mut interpreted_inputs).unwrap();

    assert!(jit_time <= 6);
    assert!(interpreted_time <= 6);
    assert_ne!(jit_inputs[0], 55.0);
}

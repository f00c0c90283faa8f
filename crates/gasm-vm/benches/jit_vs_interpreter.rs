use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gasm_vm::Individual;

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

fn bench_jit(c: &mut Criterion) {
    let mut individual = Individual::new_from_text(FIBONACCI, 2).unwrap();
    individual.set_use_jit(true);
    c.bench_function("fibonacci_jit", |b| {
        b.iter(|| {
            let mut inputs = [black_box(20.0)];
            individual.run(&mut inputs).unwrap();
            inputs[0]
        });
    });
}

fn bench_interpreter(c: &mut Criterion) {
    let mut individual = Individual::new_from_text(FIBONACCI, 2).unwrap();
    individual.set_use_jit(false);
    c.bench_function("fibonacci_interpreter", |b| {
        b.iter(|| {
            let mut inputs = [black_box(20.0)];
            individual.run(&mut inputs).unwrap();
            inputs[0]
        });
    });
}

criterion_group!(benches, bench_jit, bench_interpreter);
criterion_main!(benches);

//! Benchmarks for the bytecode interpreter and the collector.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use picovm::ast::{BinaryOp, Expr, Stmt};
use picovm::vm::{Compiler, Heap, Value, Vm};

fn var(name: &str) -> Expr {
    Expr::Var(name.to_string())
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// A loop summing the integers below `n`.
fn sum_loop(n: i32) -> Vec<Stmt> {
    vec![
        Stmt::Let {
            name: "i".to_string(),
            init: Some(Expr::Int(0)),
        },
        Stmt::Let {
            name: "sum".to_string(),
            init: Some(Expr::Int(0)),
        },
        Stmt::While {
            condition: binary(BinaryOp::Less, var("i"), Expr::Int(n)),
            body: vec![
                Stmt::Assign {
                    name: "sum".to_string(),
                    value: binary(BinaryOp::Add, var("sum"), var("i")),
                },
                Stmt::Assign {
                    name: "i".to_string(),
                    value: binary(BinaryOp::Add, var("i"), Expr::Int(1)),
                },
            ],
        },
    ]
}

fn bench_interpreter(c: &mut Criterion) {
    let program = Compiler::compile(&sum_loop(10_000)).expect("compile error");
    c.bench_function("vm_sum_loop_10k", |b| {
        b.iter(|| {
            let mut vm = Vm::new(black_box(program.clone()));
            vm.run().expect("vm run failed");
            black_box(vm.instruction_count())
        })
    });
}

fn bench_collector(c: &mut Criterion) {
    c.bench_function("gc_linked_list_10k", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            let root = heap.allocate_pair(None, None);
            let mut tail = root;
            for _ in 0..10_000 {
                let next = heap.allocate_pair(None, None);
                heap.set_right(tail, Some(next));
                tail = next;
            }
            let roots = [Value::Obj(root)];
            black_box(heap.collect(roots.iter()))
        })
    });
}

criterion_group!(benches, bench_interpreter, bench_collector);
criterion_main!(benches);

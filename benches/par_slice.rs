#![feature(test)]
extern crate test;
// Bench documentation
// https://doc.rust-lang.org/unstable-book/library-features/test.html

#[cfg(test)]
use test::Bencher;

use fvwave::domain::*;
use fvwave::field::*;
use fvwave::fvm::*;
use fvwave::linear::*;
use fvwave::mesh::CartesianMesh;
use fvwave::par_slice::{self, ExecutionPolicy};
use fvwave::schemes::interpolation_scheme;
use fvwave::time::*;

#[bench]
fn bench_dot_01(bencher: &mut Bencher) {
    let chunk_size = 50000;
    let n = 20000000;
    let a = vec![1.1; n];
    let b = vec![0.9; n];
    bencher.iter(|| par_slice::dot(&a, &b, chunk_size));
}

#[bench]
fn bench_axpy_01(bencher: &mut Bencher) {
    let chunk_size = 50000;
    let n = 20000000;
    let x = vec![1.1; n];
    let mut y = vec![0.0; n];
    bencher.iter(|| {
        par_slice::axpy(0.5, &x, &mut y, chunk_size);
    });
}

fn wave_system(n: usize, policy: ExecutionPolicy) -> (FvMatrix, Vec<f64>) {
    let mesh = CartesianMesh::<2>::unit_cells(n).unwrap();
    let aabb = *mesh.aabb();
    let mut initial = OwnedDomain::new(aabb);
    fvwave::initial_conditions::impulse_ic(&mut initial, 1000);
    let h = Field::new("h", DIMLESS, initial.clone());
    let c = Field::uniform("C", DIM_VELOCITY, aabb, 1.0);
    let history = TimeHistory::seed_zero_velocity(initial, 0.0, 0.5);
    let assembler = EquationAssembler::new(
        BoundaryConditions::zero_gradient(),
        interpolation_scheme("linear").unwrap(),
        policy,
    );
    let matrix = assembler.assemble(&mesh, &h, &c, &history, 0.5).unwrap();
    (matrix, h.snapshot())
}

#[bench]
fn bench_assemble_1000(bencher: &mut Bencher) {
    bencher.iter(|| wave_system(1000, ExecutionPolicy::default()));
}

#[bench]
fn bench_pcg_1000(bencher: &mut Bencher) {
    let policy = ExecutionPolicy::default();
    let (matrix, guess) = wave_system(1000, policy);
    let solver = Pcg::new(SolverControls::default(), policy).unwrap();
    bencher.iter(|| {
        let mut x = guess.clone();
        solver.solve(&matrix, &mut x, "h").unwrap()
    });
}

use std::error::Error;

use criterion::{criterion_group, criterion_main, Criterion};
use relhf::{
    atom::Atom,
    config::{parse_core, ConfigAtom},
    coulomb::YkTable,
    grid::{Grid, GridParameters},
    hf::{HartreeFock, HartreeFockConfig, Method},
    nucleus::Nucleus,
    periodic_table::ElementType,
};

macro_rules! atom {
    ($json:literal) => {{
        Atom::try_from($json.parse::<ConfigAtom>()?)?
    }};
}

fn bench_yk_table(c: &mut Criterion) -> Result<(), Box<dyn Error>> {
    let atoms = [
        ("Na", atom!(r#"{ "element": "Na", "core": "[Ne]", "hartree_fock": { "method": "Local" } }"#)),
        ("Cs", atom!(r#"{ "element": "Cs", "core": "[Xe]", "hartree_fock": { "method": "Local" } }"#)),
    ];

    for (name, mut atom) in atoms {
        atom.solve();
        let orbitals = atom.core().to_vec();

        c.bench_function(&format!("YkTable {name}"), move |b| {
            b.iter(|| YkTable::new(&orbitals))
        });
    }

    Ok(())
}

fn bench_approx_core(c: &mut Criterion) -> Result<(), Box<dyn Error>> {
    let grid = std::sync::Arc::new(Grid::new(&GridParameters::default())?);
    let element: ElementType = "Na".parse()?;
    let nucleus = Nucleus::for_element(element);
    let core = parse_core("[Ne]")?
        .iter()
        .flat_map(|term| term.orbitals(&grid))
        .collect::<Vec<_>>();
    let config = HartreeFockConfig {
        method: Method::ApproxHF,
        ..Default::default()
    };

    c.bench_function("ApproxHF core Na", |b| {
        b.iter(|| {
            let mut hf = HartreeFock::new(grid.clone(), &nucleus, core.clone(), config.clone());
            hf.solve_core()
        })
    });

    Ok(())
}

fn bench_scf(c: &mut Criterion) {
    bench_yk_table(c).unwrap();
    bench_approx_core(c).unwrap();
}

criterion_group!(benches, bench_scf);
criterion_main!(benches);

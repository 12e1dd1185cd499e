//! End-to-end packing sessions through the public API

use std::fs;
use std::path::PathBuf;

use densepack_rs::output::format_scientific;
use densepack_rs::*;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("densepack_{}_{}", std::process::id(), name))
}

fn session(volume: VolumeSpec, groups: Vec<ParticleGroupSpec>, output: PathBuf, refinement: Option<RefinementParams>) -> PackingConfig {
    PackingConfig {
        volume,
        groups,
        output,
        refinement,
        seed: None,
    }
}

/// Parse a distribution file into (x, y, z, radius, tag)
fn read_distribution(path: &PathBuf) -> Vec<(Vec3, f64, String)> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let f: Vec<&str> = line.split_whitespace().collect();
            assert_eq!(f.len(), 5, "bad line: {}", line);
            let n = |i: usize| f[i].parse::<f64>().unwrap();
            (Vec3::new(n(0), n(1), n(2)), n(3), f[4].to_string())
        })
        .collect()
}

#[test]
fn test_sphere_scenario() {
    let out = temp_path("scenario.txt");
    let config = session(
        VolumeSpec::Sphere { radius: 10.0 },
        vec![ParticleGroupSpec::new(100.0, 0.5, "1")],
        out.clone(),
        None,
    );
    let mut packer = config.packer(2024).unwrap();
    packer.run().unwrap();
    verify_packing(packer.state()).unwrap();
    write_distribution(&config.output, packer.registry()).unwrap();

    let spheres = read_distribution(&out);
    assert_eq!(spheres.len(), 100);
    for (p, r, tag) in &spheres {
        assert_eq!(*r, 0.5);
        assert_eq!(tag, "1");
        assert!(p.mag_squared() <= 9.5 * 9.5 + 1e-9);
    }
    let mut pairs = 0;
    for i in 0..spheres.len() {
        for j in (i + 1)..spheres.len() {
            // printed values are rounded to 13 significant digits
            assert!(spheres[i].0.distance_squared(&spheres[j].0).sqrt() >= 1.0 - 1e-9);
            pairs += 1;
        }
    }
    assert_eq!(pairs, 4950);
    let _ = fs::remove_file(&out);
}

#[test]
fn test_density_cap_rejected_without_output() {
    let out = temp_path("infeasible.txt");
    let _ = fs::remove_file(&out);
    let config = session(
        VolumeSpec::Cube { half_width: 5.0 },
        vec![
            ParticleGroupSpec::new(0.5, 0.25, "a"),
            ParticleGroupSpec::new(0.3, 0.4, "b"),
        ],
        out.clone(),
        Some(RefinementParams::new(0.1, 0.01)),
    );
    config.validate().unwrap();
    match config.packer(1) {
        Err(PackError::Infeasible { requested, limit }) => {
            assert!(requested > 0.75);
            assert_eq!(limit, MAX_PACKING_FRACTION);
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("0.8 packing fraction accepted"),
    }
    assert!(!out.exists());
}

#[test]
fn test_same_seed_same_bytes() {
    let run = |name: &str| {
        let out = temp_path(name);
        let config = session(
            VolumeSpec::Cylinder { radius: 3.0, zmin: -2.0, zmax: 2.0 },
            vec![
                ParticleGroupSpec::new(0.1, 0.2, "fuel"),
                ParticleGroupSpec::new(20.0, 0.35, "moderator"),
            ],
            out.clone(),
            Some(RefinementParams::new(0.2, 0.1)),
        );
        let mut packer = config.packer(77).unwrap();
        packer.run().unwrap();
        write_distribution(&out, packer.registry()).unwrap();
        let bytes = fs::read(&out).unwrap();
        let _ = fs::remove_file(&out);
        bytes
    };
    let first = run("det_a.txt");
    let second = run("det_b.txt");
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_different_seeds_differ() {
    let positions = |seed: u64| {
        let volume = BoundingVolume::from_spec(&VolumeSpec::Cube { half_width: 2.0 }).unwrap();
        let mut packer = DensePacker::new(volume, &[ParticleGroupSpec::new(10.0, 0.3, "a")], None, seed).unwrap();
        packer.run().unwrap();
        packer.registry().iter().map(|p| p.position()).collect::<Vec<_>>()
    };
    assert_ne!(positions(1), positions(2));
}

#[test]
fn test_skip_refinement_keeps_exact_radii() {
    let volume = BoundingVolume::from_spec(&VolumeSpec::Cuboid { half_x: 4.0, half_y: 2.0, half_z: 3.0 }).unwrap();
    let groups = [
        ParticleGroupSpec::new(0.05, 0.3, "small"),
        ParticleGroupSpec::new(15.0, 0.6, "large"),
    ];
    let mut packer = DensePacker::new(volume, &groups, None, 5).unwrap();
    let report = packer.run().unwrap();
    assert!(report.refinement.is_none());

    let mut writer = output::DistributionWriter::new();
    writer.registry(packer.registry()).unwrap();
    for (line, p) in writer.content().lines().zip(packer.registry().iter()) {
        let radius = line.split_whitespace().nth(3).unwrap();
        assert_eq!(radius, format_scientific(p.radius()));
        assert_eq!(p.current_radius(), p.radius());
    }
}

#[test]
fn test_refinement_reaches_target_monotonically() {
    let volume = BoundingVolume::from_spec(&VolumeSpec::Sphere { radius: 5.0 }).unwrap();
    let mut packer = DensePacker::new(
        volume,
        &[ParticleGroupSpec::new(0.35, 0.4, "triso")],
        Some(RefinementParams::new(0.15, 0.05)),
        31,
    )
    .unwrap();
    let report = packer.run().unwrap();
    let refinement = report.refinement.unwrap();

    assert_eq!(refinement.sweeps, refinement.min_ratio_history.len());
    for pair in refinement.min_ratio_history.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert_eq!(refinement.min_ratio_history.last().copied(), Some(1.0));
    assert!(packer.registry().iter().all(|p| p.state() == ParticleState::Grown));
    verify_packing(packer.state()).unwrap();
}

#[test]
fn test_every_volume_type() {
    let volumes = [
        VolumeSpec::Sphere { radius: 3.0 },
        VolumeSpec::Cylinder { radius: 2.0, zmin: 0.0, zmax: 5.0 },
        VolumeSpec::Cube { half_width: 2.5 },
        VolumeSpec::AnnularCylinder { inner_radius: 1.0, outer_radius: 3.0, zmin: -1.5, zmax: 1.5 },
        VolumeSpec::Cuboid { half_x: 1.5, half_y: 3.0, half_z: 2.0 },
        VolumeSpec::Parallelepiped { la: 5.0, lb: 5.0, lc: 5.0, psi: 20.0, theta: 25.0, phi: 40.0 },
    ];
    for (i, spec) in volumes.iter().enumerate() {
        let volume = BoundingVolume::from_spec(spec).unwrap();
        let mut packer = DensePacker::new(
            volume,
            &[ParticleGroupSpec::new(0.15, 0.25, "g")],
            Some(RefinementParams::new(0.1, 0.2)),
            i as u64,
        )
        .unwrap();
        let report = packer.run().unwrap();
        assert!(report.particles > 0, "{} produced no particles", spec.name());
        verify_packing(packer.state()).unwrap();
        packer.state().grid.verify(packer.registry()).unwrap();
    }
}

#[test]
fn test_batch_file_session() {
    let batch = temp_path("session.inp");
    let out = temp_path("session_out.txt");
    fs::write(
        &batch,
        format!(
            "# pebble bed test\n3 4.0\n40 0.5 pebble yes\n0.02 0.2 triso no\n{}\nno\n",
            out.display()
        ),
    )
    .unwrap();

    let config = PackingConfig::from_batch_file(&batch).unwrap();
    assert_eq!(config.groups.len(), 2);
    let mut packer = config.packer(3).unwrap();
    packer.run().unwrap();
    write_distribution(&config.output, packer.registry()).unwrap();

    let spheres = read_distribution(&out);
    assert_eq!(spheres.len(), packer.registry().len());
    assert_eq!(spheres.iter().filter(|s| s.2 == "pebble").count(), 40);
    let _ = fs::remove_file(&batch);
    let _ = fs::remove_file(&out);
}

#[test]
fn test_json_session() {
    let config = PackingConfig::from_json(
        r#"{
            "volume": { "type": "parallelepiped", "la": 4.0, "lb": 4.0, "lc": 4.0, "psi": 0.0, "theta": 0.0, "phi": 0.0 },
            "groups": [ { "amount": 25, "radius": 0.3, "tag": "cell" } ],
            "output": "unused.txt",
            "seed": 99
        }"#,
    )
    .unwrap();
    assert_eq!(config.seed, Some(99));
    let mut packer = config.packer(config.seed.unwrap()).unwrap();
    let report = packer.run().unwrap();
    assert_eq!(report.particles, 25);
    for p in packer.registry().iter() {
        let q = p.position();
        assert!(q.x.abs() <= 1.7 + 1e-9 && q.y.abs() <= 1.7 + 1e-9 && q.z.abs() <= 1.7 + 1e-9);
    }
}

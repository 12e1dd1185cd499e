//! # Output Module
//!
//! Distribution file writer.
//!
//! ## Format
//!
//! One line per particle in creation order:
//!
//! ```text
//! x y z radius tag
//! -1.234567890123E+00 4.000000000000E-01 9.876543210000E+00 5.000000000000E-01 fuel
//! ```
//!
//! Numbers use C `%1.12E` notation: twelve fractional digits, explicit
//! exponent sign and at least two exponent digits.

use std::fmt::Write;
use std::fs;
use std::path::Path;

use crate::error::{PackError, PackResult};
use crate::particle::ParticleRegistry;
use crate::types::Vec3;

/// Format `value` like C's `%1.12E`
pub fn format_scientific(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string().to_uppercase();
    }
    let s = format!("{:.12E}", value);
    match s.split_once('E') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}E{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}

/// Reject output paths that can never be written, before any sampling
pub fn validate_output_path(path: &Path) -> PackResult<()> {
    if path.as_os_str().is_empty() {
        return Err(PackError::config("output path is empty"));
    }
    if path.is_dir() {
        return Err(PackError::config(format!("output path {} is a directory", path.display())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(PackError::config(format!(
                "output directory {} does not exist",
                parent.display()
            )));
        }
    }
    Ok(())
}

/// Distribution file writer
pub struct DistributionWriter {
    content: String,
    lines: usize,
}

impl DistributionWriter {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            lines: 0,
        }
    }

    /// Append one particle line
    pub fn particle(&mut self, position: &Vec3, radius: f64, tag: &str) {
        // writing to a String cannot fail
        let _ = writeln!(
            self.content,
            "{} {} {} {} {}",
            format_scientific(position.x),
            format_scientific(position.y),
            format_scientific(position.z),
            format_scientific(radius),
            tag
        );
        self.lines += 1;
    }

    /// Append every particle of the registry at its current radius
    pub fn registry(&mut self, registry: &ParticleRegistry) -> PackResult<()> {
        self.content.try_reserve(registry.len().saturating_mul(96))?;
        for p in registry.iter() {
            self.particle(&p.position(), p.current_radius(), registry.group_tag(p.id()));
        }
        Ok(())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Write the distribution to `path`
    pub fn write_to_file(&self, path: &Path) -> PackResult<()> {
        fs::write(path, &self.content)?;
        log::info!("wrote {} particles to {}", self.lines, path.display());
        Ok(())
    }
}

impl Default for DistributionWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the final packing of `registry` to `path`
pub fn write_distribution(path: &Path, registry: &ParticleRegistry) -> PackResult<()> {
    let mut writer = DistributionWriter::new();
    writer.registry(registry)?;
    writer.write_to_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleGroupSpec;

    #[test]
    fn test_format_scientific() {
        assert_eq!(format_scientific(-1.234567890123), "-1.234567890123E+00");
        assert_eq!(format_scientific(0.5), "5.000000000000E-01");
        assert_eq!(format_scientific(0.0), "0.000000000000E+00");
        assert_eq!(format_scientific(12345.0), "1.234500000000E+04");
        assert_eq!(format_scientific(2.5e-120), "2.500000000000E-120");
    }

    #[test]
    fn test_particle_line() {
        let mut w = DistributionWriter::new();
        w.particle(&Vec3::new(1.0, -2.0, 0.25), 0.5, "u7");
        assert_eq!(
            w.content(),
            "1.000000000000E+00 -2.000000000000E+00 2.500000000000E-01 5.000000000000E-01 u7\n"
        );
        assert_eq!(w.lines(), 1);
    }

    #[test]
    fn test_registry_in_creation_order() {
        let mut reg = ParticleRegistry::new();
        reg.add_group(ParticleGroupSpec::new(2.0, 1.0, "a"), 1000.0, 1.0).unwrap();
        reg.add_group(ParticleGroupSpec::new(3.0, 0.5, "b"), 1000.0, 1.0).unwrap();

        let mut w = DistributionWriter::new();
        w.registry(&reg).unwrap();
        assert!(w.content.capacity() >= 5 * 96);
        let tags: Vec<&str> = w
            .content()
            .lines()
            .map(|l| l.split_whitespace().last().unwrap())
            .collect();
        assert_eq!(tags, vec!["a", "a", "b", "b", "b"]);
        assert!(w.content().lines().all(|l| l.split_whitespace().count() == 5));
    }

    #[test]
    fn test_validate_output_path() {
        let dir = std::env::temp_dir();
        assert!(validate_output_path(&dir.join("densepack_out.txt")).is_ok());
        assert!(validate_output_path(Path::new("relative.txt")).is_ok());
        assert!(validate_output_path(&dir).is_err());
        assert!(validate_output_path(&dir.join("no_such_dir_for_densepack").join("x.txt")).is_err());
        assert!(validate_output_path(Path::new("")).is_err());
    }
}

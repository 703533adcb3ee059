//! Synthetic address streams.
//!
//! Every stream is fully determined by its [`GeneratorConfig`], seed included,
//! so experiments can be replayed and compared across policies.

use std::str::FromStr;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SimError},
    hierarchy::{AccessRequest, Op},
};

fn default_stride() -> u64 {
    4
}

fn default_hot_spots() -> usize {
    1
}

fn default_std_dev() -> f64 {
    100.0
}

/// How a locality stream picks among the current hot spots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Random,
    Cycle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Pattern {
    /// `i * stride`, wrapping at the end of the address space.
    Sequential {
        #[serde(default = "default_stride")]
        stride: u64,
    },
    /// Uniform over the whole address space.
    Uniform,
    /// Gaussian jitter around hot spots that move every `phase_len` accesses.
    Locality {
        #[serde(default = "default_hot_spots")]
        hot_spots: usize,
        #[serde(default = "default_std_dev")]
        std_dev: f64,
        /// Defaults to a tenth of the stream.
        #[serde(default)]
        phase_len: Option<u64>,
        #[serde(default)]
        rotation: Rotation,
    },
}

impl Pattern {
    pub fn sequential() -> Self {
        Pattern::Sequential {
            stride: default_stride(),
        }
    }

    pub fn locality() -> Self {
        Pattern::Locality {
            hot_spots: default_hot_spots(),
            std_dev: default_std_dev(),
            phase_len: None,
            rotation: Rotation::Random,
        }
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::locality()
    }
}

impl FromStr for Pattern {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Pattern::sequential()),
            "uniform" | "random" => Ok(Pattern::Uniform),
            "locality" => Ok(Pattern::locality()),
            _ => Err(SimError::config(format!("unrecognized access pattern: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub count: u64,
    /// Addresses fall in `[0, address_space)`.
    pub address_space: u64,
    /// Every address is rounded down to a multiple of this.
    pub alignment: u64,
    /// Probability that an access is a write.
    pub write_ratio: f64,
    pub seed: u64,
    pub pattern: Pattern,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            count: 5000,
            address_space: 1 << 30,
            alignment: 4,
            write_ratio: 0.0,
            seed: 0,
            pattern: Pattern::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(count: u64, pattern: Pattern) -> Self {
        GeneratorConfig {
            count,
            pattern,
            ..GeneratorConfig::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.address_space == 0 {
            return Err(SimError::config("address space must be positive"));
        }
        if self.alignment == 0 {
            return Err(SimError::config("alignment must be positive"));
        }
        if !(0.0..=1.0).contains(&self.write_ratio) {
            return Err(SimError::config(format!(
                "write ratio {} is outside [0, 1]",
                self.write_ratio
            )));
        }
        match &self.pattern {
            Pattern::Sequential { stride: 0 } => {
                Err(SimError::config("sequential stride must be positive"))
            }
            Pattern::Locality { hot_spots: 0, .. } => {
                Err(SimError::config("locality needs at least one hot spot"))
            }
            Pattern::Locality { std_dev, .. } if !std_dev.is_finite() || *std_dev < 0.0 => Err(
                SimError::config(format!("invalid locality standard deviation {std_dev}")),
            ),
            Pattern::Locality {
                phase_len: Some(0), ..
            } => Err(SimError::config("locality phase length must be positive")),
            _ => Ok(()),
        }
    }
}

/// Lazy, finite, restartable stream of accesses.
///
/// `next()` returning `None` marks the end of the stream; [`total`](Self::total)
/// tells an exhausted stream apart from one configured with zero accesses.
pub struct AccessGenerator {
    config: GeneratorConfig,
    rng: StdRng,
    jitter: Option<Normal<f64>>,
    phase_len: u64,
    centers: Vec<u64>,
    next_center: usize,
    emitted: u64,
}

impl AccessGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let (jitter, phase_len) = match &config.pattern {
            Pattern::Locality {
                std_dev, phase_len, ..
            } => {
                let normal = Normal::new(0.0, *std_dev).map_err(|e| {
                    SimError::config(format!("invalid locality standard deviation: {e}"))
                })?;
                let phase_len = phase_len.unwrap_or(config.count / 10).max(1);
                (Some(normal), phase_len)
            }
            _ => (None, 1),
        };

        Ok(AccessGenerator {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            jitter,
            phase_len,
            centers: Vec::new(),
            next_center: 0,
            emitted: 0,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Accesses this stream produces in total.
    pub fn total(&self) -> u64 {
        self.config.count
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.emitted >= self.config.count
    }

    /// Rewinds to the first access; the replay is identical.
    pub fn restart(&mut self) {
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.centers.clear();
        self.next_center = 0;
        self.emitted = 0;
    }

    fn next_address(&mut self) -> u64 {
        let space = self.config.address_space;
        match self.config.pattern {
            Pattern::Sequential { stride } => {
                ((self.emitted as u128 * stride as u128) % space as u128) as u64
            }
            Pattern::Uniform => self.rng.random_range(0..space),
            Pattern::Locality {
                hot_spots,
                rotation,
                ..
            } => {
                if self.emitted % self.phase_len == 0 {
                    self.centers = (0..hot_spots)
                        .map(|_| self.rng.random_range(0..space))
                        .collect();
                    self.next_center = 0;
                }
                let center = match rotation {
                    Rotation::Random => self.centers[self.rng.random_range(0..self.centers.len())],
                    Rotation::Cycle => {
                        let center = self.centers[self.next_center];
                        self.next_center = (self.next_center + 1) % self.centers.len();
                        center
                    }
                };
                let offset = self
                    .jitter
                    .as_ref()
                    .map_or(0.0, |normal| normal.sample(&mut self.rng));
                (center as f64 + offset).round().clamp(0.0, (space - 1) as f64) as u64
            }
        }
    }
}

impl Iterator for AccessGenerator {
    type Item = AccessRequest;

    fn next(&mut self) -> Option<AccessRequest> {
        if self.is_exhausted() {
            return None;
        }
        let address = self.next_address();
        let address = address - address % self.config.alignment;
        let op = if self.config.write_ratio > 0.0 && self.rng.random_bool(self.config.write_ratio) {
            Op::Write
        } else {
            Op::Read
        };
        self.emitted += 1;
        Some(AccessRequest { address, op })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.config.count - self.emitted) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for AccessGenerator {}

#[cfg(test)]
mod tests {
    use super::*;

    fn addresses(config: GeneratorConfig) -> Vec<u64> {
        AccessGenerator::new(config)
            .unwrap()
            .map(|r| r.address)
            .collect()
    }

    #[test]
    fn sequential_walks_by_stride_and_wraps() {
        let config = GeneratorConfig {
            address_space: 16,
            ..GeneratorConfig::new(6, Pattern::sequential())
        };
        assert_eq!(addresses(config), vec![0, 4, 8, 12, 0, 4]);
    }

    #[test]
    fn same_seed_same_stream() {
        for pattern in [Pattern::Uniform, Pattern::locality()] {
            let config = GeneratorConfig::new(500, pattern).with_seed(99);
            assert_eq!(addresses(config.clone()), addresses(config));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let a = addresses(GeneratorConfig::new(100, Pattern::Uniform).with_seed(1));
        let b = addresses(GeneratorConfig::new(100, Pattern::Uniform).with_seed(2));
        assert_ne!(a, b);
    }

    #[test]
    fn restart_replays_the_stream() {
        let config = GeneratorConfig {
            write_ratio: 0.5,
            ..GeneratorConfig::new(200, Pattern::locality()).with_seed(5)
        };
        let mut stream = AccessGenerator::new(config).unwrap();
        let first: Vec<AccessRequest> = stream.by_ref().collect();
        assert!(stream.is_exhausted());
        assert_eq!(stream.next(), None);

        stream.restart();
        let second: Vec<AccessRequest> = stream.collect();
        assert_eq!(first, second);
        assert!(first.iter().any(|r| r.op == Op::Write));
        assert!(first.iter().any(|r| r.op == Op::Read));
    }

    #[test]
    fn addresses_are_aligned_and_in_range() {
        for pattern in [Pattern::Uniform, Pattern::locality(), Pattern::sequential()] {
            let config = GeneratorConfig {
                address_space: 4096,
                alignment: 8,
                ..GeneratorConfig::new(1000, pattern).with_seed(11)
            };
            for addr in addresses(config) {
                assert!(addr < 4096);
                assert_eq!(addr % 8, 0);
            }
        }
    }

    #[test]
    fn locality_stays_near_hot_spots() {
        let pattern = Pattern::Locality {
            hot_spots: 1,
            std_dev: 16.0,
            phase_len: Some(1000),
            rotation: Rotation::Cycle,
        };
        let addrs = addresses(GeneratorConfig::new(1000, pattern).with_seed(3));
        let min = *addrs.iter().min().unwrap();
        let max = *addrs.iter().max().unwrap();
        // 1000 draws from N(0, 16) essentially never spread past 16 sigma
        assert!(max - min < 16 * 16);
    }

    #[test]
    fn zero_std_dev_cycles_exact_centers() {
        let pattern = Pattern::Locality {
            hot_spots: 3,
            std_dev: 0.0,
            phase_len: Some(30),
            rotation: Rotation::Cycle,
        };
        let config = GeneratorConfig {
            alignment: 1,
            ..GeneratorConfig::new(30, pattern).with_seed(8)
        };
        let addrs = addresses(config);
        for (i, addr) in addrs.iter().enumerate().skip(3) {
            assert_eq!(*addr, addrs[i % 3]);
        }
    }

    #[test]
    fn zero_count_is_empty_not_an_error() {
        let stream = AccessGenerator::new(GeneratorConfig::new(0, Pattern::Uniform)).unwrap();
        assert_eq!(stream.total(), 0);
        assert_eq!(stream.len(), 0);
        assert!(stream.is_exhausted());
    }

    #[test]
    fn len_counts_down() {
        let mut stream = AccessGenerator::new(GeneratorConfig::new(3, Pattern::Uniform)).unwrap();
        assert_eq!(stream.len(), 3);
        stream.next();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.emitted(), 1);
    }

    #[test]
    fn rejects_bad_parameters() {
        let bad = [
            GeneratorConfig {
                address_space: 0,
                ..GeneratorConfig::default()
            },
            GeneratorConfig {
                alignment: 0,
                ..GeneratorConfig::default()
            },
            GeneratorConfig {
                write_ratio: 1.5,
                ..GeneratorConfig::default()
            },
            GeneratorConfig::new(10, Pattern::Sequential { stride: 0 }),
            GeneratorConfig::new(
                10,
                Pattern::Locality {
                    hot_spots: 0,
                    std_dev: 1.0,
                    phase_len: None,
                    rotation: Rotation::Random,
                },
            ),
            GeneratorConfig::new(
                10,
                Pattern::Locality {
                    hot_spots: 1,
                    std_dev: f64::NAN,
                    phase_len: None,
                    rotation: Rotation::Random,
                },
            ),
        ];
        for config in bad {
            assert!(matches!(
                AccessGenerator::new(config),
                Err(SimError::Configuration(_))
            ));
        }
    }

    #[test]
    fn pattern_names_parse() {
        assert_eq!("sequential".parse::<Pattern>().unwrap(), Pattern::sequential());
        assert_eq!("Random".parse::<Pattern>().unwrap(), Pattern::Uniform);
        assert_eq!("locality".parse::<Pattern>().unwrap(), Pattern::locality());
        assert!("zipf".parse::<Pattern>().is_err());
    }

    #[test]
    fn config_deserializes_from_json() {
        let config: GeneratorConfig = serde_json::from_str(
            r#"{ "count": 7, "pattern": { "kind": "locality", "hot_spots": 4, "rotation": "cycle" } }"#,
        )
        .unwrap();
        assert_eq!(config.count, 7);
        assert_eq!(config.alignment, 4);
        assert_eq!(
            config.pattern,
            Pattern::Locality {
                hot_spots: 4,
                std_dev: 100.0,
                phase_len: None,
                rotation: Rotation::Cycle,
            }
        );
    }
}
